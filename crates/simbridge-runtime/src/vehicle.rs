//! Minimal kinematic vehicle the reference components report on.
//!
//! Local coordinates are east/north metres from a geodetic origin; heading
//! is radians counter-clockwise from east.

use serde::{Deserialize, Serialize};

const WHEELBASE_M: f64 = 2.8;
/// Road-wheel angle at full steering lock, radians.
pub const MAX_STEER_RAD: f64 = 0.5;
const MAX_ACCEL_MPS2: f64 = 3.0;
const MAX_DECEL_MPS2: f64 = 8.0;
const DRAG_PER_S: f64 = 0.02;
const EARTH_RADIUS_M: f64 = 6_378_137.0;
const MAX_RPM: f64 = 6000.0;
const IDLE_RPM: f64 = 800.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gear {
    #[default]
    Drive,
    Reverse,
    Neutral,
    Park,
}

/// A control request decoded from whichever command message the stack
/// sends.  Values are normalised: pedals `0..=1`, steering `-1..=1`
/// (positive is left).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlInput {
    pub throttle: Option<f64>,
    pub brake: Option<f64>,
    pub steering: Option<f64>,
    pub gear: Option<Gear>,
}

/// Geodetic anchor of the local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoOrigin {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

impl Default for GeoOrigin {
    fn default() -> Self {
        // San Francisco
        Self {
            latitude: 37.7749,
            longitude: -122.4194,
            altitude: 10.0,
        }
    }
}

impl GeoOrigin {
    /// Equirectangular projection of local `(east, north)` to
    /// `(latitude, longitude)` degrees.
    pub fn to_geodetic(&self, east: f64, north: f64) -> (f64, f64) {
        let lat = self.latitude + (north / EARTH_RADIUS_M).to_degrees();
        let lon = self.longitude
            + (east / (EARTH_RADIUS_M * self.latitude.to_radians().cos())).to_degrees();
        (lat, lon)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleState {
    pub east: f64,
    pub north: f64,
    pub heading: f64,
    /// Always non-negative; the gear decides direction.
    pub speed: f64,
    pub throttle: f64,
    pub brake: f64,
    pub steering: f64,
    pub gear: Gear,
    pub engine_on: bool,
    pub odometer: f64,
    /// Simulation time as Unix seconds.
    pub time: f64,
}

impl VehicleState {
    pub fn new(start_time: f64) -> Self {
        Self {
            east: 0.0,
            north: 0.0,
            heading: 0.0,
            speed: 0.0,
            throttle: 0.0,
            brake: 0.0,
            steering: 0.0,
            gear: Gear::Drive,
            engine_on: true,
            odometer: 0.0,
            time: start_time,
        }
    }

    pub fn apply(&mut self, input: &ControlInput) {
        if let Some(throttle) = input.throttle {
            self.throttle = throttle.clamp(0.0, 1.0);
        }
        if let Some(brake) = input.brake {
            self.brake = brake.clamp(0.0, 1.0);
        }
        if let Some(steering) = input.steering {
            self.steering = steering.clamp(-1.0, 1.0);
        }
        if let Some(gear) = input.gear {
            self.gear = gear;
        }
    }

    /// Signed speed along the heading.
    pub fn velocity(&self) -> f64 {
        match self.gear {
            Gear::Reverse => -self.speed,
            _ => self.speed,
        }
    }

    pub fn engine_rpm(&self) -> f64 {
        if self.engine_on {
            IDLE_RPM + self.throttle * (MAX_RPM - IDLE_RPM)
        } else {
            0.0
        }
    }

    /// Advance by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        let drive = match self.gear {
            Gear::Drive | Gear::Reverse if self.engine_on => self.throttle * MAX_ACCEL_MPS2,
            _ => 0.0,
        };
        let stop = if self.gear == Gear::Park { 1.0 } else { self.brake };
        let accel = drive - stop * MAX_DECEL_MPS2 - self.speed * DRAG_PER_S;
        self.speed = (self.speed + accel * dt).max(0.0);

        let v = self.velocity();
        let yaw_rate = v * (self.steering * MAX_STEER_RAD).tan() / WHEELBASE_M;
        self.heading = (self.heading + yaw_rate * dt).rem_euclid(std::f64::consts::TAU);
        self.east += v * self.heading.cos() * dt;
        self.north += v * self.heading.sin() * dt;
        self.odometer += self.speed * dt;
        self.time += dt;
    }
}
