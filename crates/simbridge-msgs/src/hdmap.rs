//! Apollo HD map (`apollo.hdmap.*`) and its export formats.
//!
//! Apollo loads a map directory holding `base_map.txt` (protobuf text
//! format) or `base_map.bin` (binary).  [`to_text`] and [`to_bytes`]
//! produce those files from a [`Map`].

use bytes::Bytes;
use simbridge_types::wire::{proto, text};
use simbridge_types::{Dialect, Message, TypeDescriptor, message, one_of, proto_enum};

pub use crate::apollo::PointENU;

/// Render `map` in protobuf text format, the contents of `base_map.txt`.
pub fn to_text(map: &Map) -> String {
    text::to_text(&map.to_record(Dialect::Protobuf))
}

/// Serialize `map` as binary protobuf, the contents of `base_map.bin`.
pub fn to_bytes(map: &Map) -> Bytes {
    proto::encode(&map.to_record(Dialect::Protobuf))
}

// ────────────────────────────────────────────────────────────────────────────
// Geometry
// ────────────────────────────────────────────────────────────────────────────

message! {
    pub struct Id [TypeDescriptor::NESTED] {
        pub id: Option<String> = 1,
    }
}

impl Id {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: Some(id.into()) }
    }
}

impl From<&str> for Id {
    fn from(id: &str) -> Self {
        Id::new(id)
    }
}

message! {
    pub struct Polygon [TypeDescriptor::NESTED] {
        pub point: Vec<PointENU> = 1,
    }
}

message! {
    pub struct LineSegment [TypeDescriptor::NESTED] {
        pub point: Vec<PointENU> = 1,
    }
}

one_of! {
    pub enum CurveType {
        LineSegment(LineSegment) = 1 => "line_segment",
    }
}

message! {
    pub struct CurveSegment [TypeDescriptor::NESTED] {
        pub curve_type: Option<CurveType> = oneof,
        /// Start position along the reference line.
        pub s: Option<f64> = 6,
        pub start_position: Option<PointENU> = 7,
        pub heading: Option<f64> = 8,
        pub length: Option<f64> = 9,
    }
}

message! {
    pub struct Curve [TypeDescriptor::NESTED] {
        pub segment: Vec<CurveSegment> = 1,
    }
}

impl Curve {
    /// A single straight-line-segment curve through `points`, with its
    /// start position, heading and length filled in.
    pub fn line(points: Vec<PointENU>) -> Self {
        let length = polyline_length(&points);
        let start_position = points.first().cloned();
        let heading = match (points.first(), points.get(1)) {
            (Some(a), Some(b)) => Some(
                (b.y.unwrap_or_default() - a.y.unwrap_or_default())
                    .atan2(b.x.unwrap_or_default() - a.x.unwrap_or_default()),
            ),
            _ => None,
        };
        Self {
            segment: vec![CurveSegment {
                curve_type: Some(CurveType::LineSegment(LineSegment { point: points })),
                s: Some(0.0),
                start_position,
                heading,
                length: Some(length),
            }],
        }
    }
}

fn polyline_length(points: &[PointENU]) -> f64 {
    points
        .windows(2)
        .map(|pair| {
            let dx = pair[1].x.unwrap_or_default() - pair[0].x.unwrap_or_default();
            let dy = pair[1].y.unwrap_or_default() - pair[0].y.unwrap_or_default();
            let dz = pair[1].z.unwrap_or_default() - pair[0].z.unwrap_or_default();
            (dx * dx + dy * dy + dz * dz).sqrt()
        })
        .sum()
}

// ────────────────────────────────────────────────────────────────────────────
// Lanes
// ────────────────────────────────────────────────────────────────────────────

proto_enum! {
    pub enum BoundaryType {
        Unknown = 0 => "UNKNOWN",
        DottedYellow = 1 => "DOTTED_YELLOW",
        DottedWhite = 2 => "DOTTED_WHITE",
        SolidYellow = 3 => "SOLID_YELLOW",
        SolidWhite = 4 => "SOLID_WHITE",
        DoubleYellow = 5 => "DOUBLE_YELLOW",
        Curb = 6 => "CURB",
    }
}

message! {
    /// Boundary marking kinds starting at arc length `s`.
    pub struct LaneBoundaryType [TypeDescriptor::NESTED] {
        pub s: Option<f64> = 1,
        pub types: Vec<BoundaryType> = 2,
    }
}

message! {
    pub struct LaneBoundary [TypeDescriptor::NESTED] {
        pub curve: Option<Curve> = 1,
        pub length: Option<f64> = 2,
        pub is_virtual: Option<bool> = 3 => "virtual",
        pub boundary_type: Vec<LaneBoundaryType> = 4,
    }
}

message! {
    /// Lane half-width at arc length `s`.
    pub struct LaneSampleAssociation [TypeDescriptor::NESTED] {
        pub s: Option<f64> = 1,
        pub width: Option<f64> = 2,
    }
}

proto_enum! {
    pub enum LaneType {
        None = 1 => "NONE",
        CityDriving = 2 => "CITY_DRIVING",
        Biking = 3 => "BIKING",
        Sidewalk = 4 => "SIDEWALK",
        Parking = 5 => "PARKING",
        Shoulder = 6 => "SHOULDER",
    }
}

proto_enum! {
    pub enum LaneTurn {
        NoTurn = 1 => "NO_TURN",
        LeftTurn = 2 => "LEFT_TURN",
        RightTurn = 3 => "RIGHT_TURN",
        UTurn = 4 => "U_TURN",
    }
}

proto_enum! {
    pub enum LaneDirection {
        Forward = 1 => "FORWARD",
        Backward = 2 => "BACKWARD",
        Bidirection = 3 => "BIDIRECTION",
    }
}

message! {
    pub struct Lane [TypeDescriptor::NESTED] {
        pub id: Option<Id> = 1,
        pub central_curve: Option<Curve> = 2,
        pub left_boundary: Option<LaneBoundary> = 3,
        pub right_boundary: Option<LaneBoundary> = 4,
        /// Metres along the central curve.
        pub length: Option<f64> = 5,
        /// Metres per second.
        pub speed_limit: Option<f64> = 6,
        pub overlap_id: Vec<Id> = 7,
        pub predecessor_id: Vec<Id> = 8,
        pub successor_id: Vec<Id> = 9,
        pub left_neighbor_forward_lane_id: Vec<Id> = 10,
        pub right_neighbor_forward_lane_id: Vec<Id> = 11,
        pub lane_type: Option<LaneType> = 12 => "type",
        pub turn: Option<LaneTurn> = 13,
        pub left_neighbor_reverse_lane_id: Vec<Id> = 14,
        pub right_neighbor_reverse_lane_id: Vec<Id> = 15,
        pub junction_id: Option<Id> = 16,
        pub left_sample: Vec<LaneSampleAssociation> = 17,
        pub right_sample: Vec<LaneSampleAssociation> = 18,
        pub direction: Option<LaneDirection> = 19,
        pub left_road_sample: Vec<LaneSampleAssociation> = 20,
        pub right_road_sample: Vec<LaneSampleAssociation> = 21,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Overlaps
// ────────────────────────────────────────────────────────────────────────────

message! {
    pub struct LaneOverlapInfo [TypeDescriptor::NESTED] {
        pub start_s: Option<f64> = 1,
        pub end_s: Option<f64> = 2,
        pub is_merge: Option<bool> = 3,
    }
}

message! {
    pub struct SignalOverlapInfo [TypeDescriptor::NESTED] {}
}

message! {
    pub struct StopSignOverlapInfo [TypeDescriptor::NESTED] {}
}

message! {
    pub struct CrosswalkOverlapInfo [TypeDescriptor::NESTED] {}
}

message! {
    pub struct JunctionOverlapInfo [TypeDescriptor::NESTED] {}
}

message! {
    pub struct YieldOverlapInfo [TypeDescriptor::NESTED] {}
}

message! {
    pub struct ClearAreaOverlapInfo [TypeDescriptor::NESTED] {}
}

message! {
    pub struct SpeedBumpOverlapInfo [TypeDescriptor::NESTED] {}
}

message! {
    pub struct ParkingSpaceOverlapInfo [TypeDescriptor::NESTED] {}
}

one_of! {
    /// What kind of object takes part in an overlap.
    pub enum OverlapInfo {
        Lane(LaneOverlapInfo) = 3 => "lane_overlap_info",
        Signal(SignalOverlapInfo) = 4 => "signal_overlap_info",
        StopSign(StopSignOverlapInfo) = 5 => "stop_sign_overlap_info",
        Crosswalk(CrosswalkOverlapInfo) = 6 => "crosswalk_overlap_info",
        Junction(JunctionOverlapInfo) = 7 => "junction_overlap_info",
        YieldSign(YieldOverlapInfo) = 8 => "yield_sign_overlap_info",
        ClearArea(ClearAreaOverlapInfo) = 9 => "clear_area_overlap_info",
        SpeedBump(SpeedBumpOverlapInfo) = 10 => "speed_bump_overlap_info",
        ParkingSpace(ParkingSpaceOverlapInfo) = 11 => "parking_space_overlap_info",
    }
}

message! {
    pub struct ObjectOverlapInfo [TypeDescriptor::NESTED] {
        pub id: Option<Id> = 1,
        pub overlap_info: Option<OverlapInfo> = oneof,
    }
}

message! {
    /// Two or more map objects sharing a region.
    pub struct Overlap [TypeDescriptor::NESTED] {
        pub id: Option<Id> = 1,
        pub object: Vec<ObjectOverlapInfo> = 2,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Signals and signs
// ────────────────────────────────────────────────────────────────────────────

proto_enum! {
    pub enum SubsignalType {
        Unknown = 1 => "UNKNOWN",
        Circle = 2 => "CIRCLE",
        ArrowLeft = 3 => "ARROW_LEFT",
        ArrowForward = 4 => "ARROW_FORWARD",
        ArrowRight = 5 => "ARROW_RIGHT",
        ArrowLeftAndForward = 6 => "ARROW_LEFT_AND_FORWARD",
        ArrowRightAndForward = 7 => "ARROW_RIGHT_AND_FORWARD",
        ArrowUTurn = 8 => "ARROW_U_TURN",
    }
}

message! {
    /// One lamp of a traffic light.
    pub struct Subsignal [TypeDescriptor::NESTED] {
        pub id: Option<Id> = 1,
        pub subsignal_type: Option<SubsignalType> = 2 => "type",
        pub location: Option<PointENU> = 3,
    }
}

proto_enum! {
    pub enum SignalType {
        Unknown = 1 => "UNKNOWN",
        Mix2Horizontal = 2 => "MIX_2_HORIZONTAL",
        Mix2Vertical = 3 => "MIX_2_VERTICAL",
        Mix3Horizontal = 4 => "MIX_3_HORIZONTAL",
        Mix3Vertical = 5 => "MIX_3_VERTICAL",
        Single = 6 => "SINGLE",
    }
}

message! {
    /// Traffic light.
    pub struct Signal [TypeDescriptor::NESTED] {
        pub id: Option<Id> = 1,
        pub boundary: Option<Polygon> = 2,
        pub subsignal: Vec<Subsignal> = 3,
        pub overlap_id: Vec<Id> = 4,
        pub signal_type: Option<SignalType> = 5 => "type",
        pub stop_line: Vec<Curve> = 6,
    }
}

proto_enum! {
    pub enum StopType {
        Unknown = 0 => "UNKNOWN",
        OneWay = 1 => "ONE_WAY",
        TwoWay = 2 => "TWO_WAY",
        ThreeWay = 3 => "THREE_WAY",
        FourWay = 4 => "FOUR_WAY",
        AllWay = 5 => "ALL_WAY",
    }
}

message! {
    pub struct StopSign [TypeDescriptor::NESTED] {
        pub id: Option<Id> = 1,
        pub stop_line: Vec<Curve> = 2,
        pub overlap_id: Vec<Id> = 3,
        pub stop_type: Option<StopType> = 4 => "type",
    }
}

message! {
    pub struct YieldSign [TypeDescriptor::NESTED] {
        pub id: Option<Id> = 1,
        pub stop_line: Vec<Curve> = 2,
        pub overlap_id: Vec<Id> = 3,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Areas
// ────────────────────────────────────────────────────────────────────────────

message! {
    pub struct Crosswalk [TypeDescriptor::NESTED] {
        pub id: Option<Id> = 1,
        pub polygon: Option<Polygon> = 2,
        pub overlap_id: Vec<Id> = 3,
    }
}

message! {
    pub struct Junction [TypeDescriptor::NESTED] {
        pub id: Option<Id> = 1,
        pub polygon: Option<Polygon> = 2,
        pub overlap_id: Vec<Id> = 3,
    }
}

message! {
    /// Keep-clear zone.
    pub struct ClearArea [TypeDescriptor::NESTED] {
        pub id: Option<Id> = 1,
        pub overlap_id: Vec<Id> = 2,
        pub polygon: Option<Polygon> = 3,
    }
}

message! {
    pub struct SpeedBump [TypeDescriptor::NESTED] {
        pub id: Option<Id> = 1,
        pub overlap_id: Vec<Id> = 2,
        pub position: Vec<Curve> = 3,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Roads
// ────────────────────────────────────────────────────────────────────────────

proto_enum! {
    pub enum BoundaryEdgeType {
        Unknown = 0 => "UNKNOWN",
        Normal = 1 => "NORMAL",
        LeftBoundary = 2 => "LEFT_BOUNDARY",
        RightBoundary = 3 => "RIGHT_BOUNDARY",
    }
}

message! {
    pub struct BoundaryEdge [TypeDescriptor::NESTED] {
        pub curve: Option<Curve> = 1,
        pub edge_type: Option<BoundaryEdgeType> = 2 => "type",
    }
}

message! {
    pub struct BoundaryPolygon [TypeDescriptor::NESTED] {
        pub edge: Vec<BoundaryEdge> = 1,
    }
}

message! {
    pub struct RoadBoundary [TypeDescriptor::NESTED] {
        pub outer_polygon: Option<BoundaryPolygon> = 1,
        pub hole: Vec<BoundaryPolygon> = 2,
    }
}

message! {
    pub struct RoadSection [TypeDescriptor::NESTED] {
        pub id: Option<Id> = 1,
        pub lane_id: Vec<Id> = 2,
        pub boundary: Option<RoadBoundary> = 3,
    }
}

message! {
    pub struct Road [TypeDescriptor::NESTED] {
        pub id: Option<Id> = 1,
        pub section: Vec<RoadSection> = 2,
        pub junction_id: Option<Id> = 3,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Map
// ────────────────────────────────────────────────────────────────────────────

message! {
    pub struct Projection [TypeDescriptor::NESTED] {
        /// PROJ.4 definition, e.g. `+proj=utm +zone=10 +ellps=WGS84`.
        pub proj: Option<String> = 1,
    }
}

message! {
    pub struct Header [TypeDescriptor::NESTED] {
        pub version: Option<String> = 1,
        pub date: Option<String> = 2,
        pub projection: Option<Projection> = 3,
        pub district: Option<String> = 4,
        pub generation: Option<String> = 5,
        pub rev_major: Option<String> = 6,
        pub rev_minor: Option<String> = 7,
        pub left: Option<f64> = 8,
        pub top: Option<f64> = 9,
        pub right: Option<f64> = 10,
        pub bottom: Option<f64> = 11,
        pub vendor: Option<String> = 12,
    }
}

message! {
    pub struct Map [TypeDescriptor::cyber("apollo.hdmap.Map")] {
        pub header: Option<Header> = 1,
        pub crosswalk: Vec<Crosswalk> = 2,
        pub junction: Vec<Junction> = 3,
        pub lane: Vec<Lane> = 4,
        pub stop_sign: Vec<StopSign> = 5,
        pub signal: Vec<Signal> = 6,
        pub yield_sign: Vec<YieldSign> = 7 => "yield",
        pub overlap: Vec<Overlap> = 8,
        pub clear_area: Vec<ClearArea> = 9,
        pub speed_bump: Vec<SpeedBump> = 10,
        pub road: Vec<Road> = 11,
    }
}
