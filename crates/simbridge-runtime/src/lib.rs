//! `simbridge-runtime` – The host side
//!
//! Everything a process needs around a [`Bridge`][simbridge_middleware::Bridge]:
//! a fixed-rate tick loop, reference clients that report a simulated vehicle
//! to an autonomy stack and apply its control commands, and logging setup.
//!
//! # Modules
//!
//! - [`agent`] – [`Agent`][agent::Agent]: drives `Bridge::update`, the
//!   components and the vehicle once per tick, and counts connects and
//!   drops through a status observer.
//! - [`components`] – [`Component`][components::Component] and the
//!   chassis, GNSS, clock and control clients for the Apollo and LGSVL
//!   message families.
//! - [`vehicle`] – [`VehicleState`][vehicle::VehicleState]: a kinematic
//!   bicycle model with a geodetic origin.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   initialises the global `tracing` subscriber with an optional OTLP span
//!   exporter.  Set `OTEL_EXPORTER_OTLP_ENDPOINT` to enable trace export.

pub mod agent;
pub mod components;
pub mod telemetry;
pub mod vehicle;

pub use agent::{Agent, AgentConfig, LinkStats, TopicOverrides};
pub use components::{Component, Stack};
pub use vehicle::{ControlInput, Gear, GeoOrigin, VehicleState};
