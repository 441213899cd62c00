//! Timestamps as they travel on the wire.
//!
//! Simulation time is Unix epoch seconds held in an `f64`.  ROS carries it
//! as a `(sec, nanosec)` pair, Apollo carries GPS-epoch seconds as a plain
//! double.  The GPS conversion is a fixed offset with no leap-second
//! correction, matching what Apollo's localization stack expects from the
//! simulator.

use chrono::{DateTime, Utc};

/// Unix timestamp of the GPS epoch, 1980-01-06T00:00:00Z.
pub const GPS_EPOCH_UNIX_SECONDS: f64 = 315_964_800.0;

/// Convert Unix epoch seconds to GPS epoch seconds.
pub fn unix_to_gps(unix_seconds: f64) -> f64 {
    unix_seconds - GPS_EPOCH_UNIX_SECONDS
}

/// Convert GPS epoch seconds back to Unix epoch seconds.
pub fn gps_to_unix(gps_seconds: f64) -> f64 {
    gps_seconds + GPS_EPOCH_UNIX_SECONDS
}

/// ROS time stamp.
///
/// Serialized as `{"secs", "nsecs"}` on ROS1 and `{"sec", "nanosec"}` on
/// ROS2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Time {
    pub sec: i32,
    pub nanosec: u32,
}

impl Time {
    pub const fn new(sec: i32, nanosec: u32) -> Self {
        Self { sec, nanosec }
    }

    /// Split fractional epoch seconds into whole seconds and nanoseconds.
    /// The fractional part is truncated, never rounded up into the next
    /// second.
    pub fn from_secs_f64(seconds: f64) -> Self {
        let whole = seconds.floor();
        let nanosec = ((seconds - whole) * 1e9) as u32;
        Self {
            sec: whole as i32,
            nanosec: nanosec.min(999_999_999),
        }
    }

    pub fn as_secs_f64(&self) -> f64 {
        f64::from(self.sec) + f64::from(self.nanosec) * 1e-9
    }

    pub fn from_datetime(at: &DateTime<Utc>) -> Self {
        Self {
            sec: at.timestamp() as i32,
            nanosec: at.timestamp_subsec_nanos().min(999_999_999),
        }
    }

    /// Wall-clock now.
    pub fn now() -> Self {
        Self::from_datetime(&Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn gps_epoch_matches_calendar_date() {
        let epoch = Utc.with_ymd_and_hms(1980, 1, 6, 0, 0, 0).unwrap();
        assert_eq!(epoch.timestamp() as f64, GPS_EPOCH_UNIX_SECONDS);
    }

    #[test]
    fn gps_conversion_is_a_plain_offset() {
        // 2019-01-01T00:00:00Z; no 18 s leap correction is applied.
        let unix = 1_546_300_800.0;
        assert_eq!(unix_to_gps(unix), 1_230_336_000.0);
        assert_eq!(gps_to_unix(unix_to_gps(unix)), unix);
        assert_eq!(unix_to_gps(GPS_EPOCH_UNIX_SECONDS), 0.0);
    }

    #[test]
    fn from_secs_splits_fraction() {
        let t = Time::from_secs_f64(12.25);
        assert_eq!(t, Time::new(12, 250_000_000));
        assert!((t.as_secs_f64() - 12.25).abs() < 1e-9);
    }

    #[test]
    fn from_secs_never_overflows_nanos() {
        let t = Time::from_secs_f64(3.999_999_999_99);
        assert_eq!(t.sec, 3);
        assert!(t.nanosec <= 999_999_999);
    }

    #[test]
    fn from_datetime_keeps_subsecond() {
        let at = Utc.timestamp_opt(1_600_000_000, 5_000).unwrap();
        assert_eq!(Time::from_datetime(&at), Time::new(1_600_000_000, 5_000));
    }
}
