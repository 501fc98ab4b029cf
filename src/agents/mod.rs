//! # Agents Module
//!
//! The simulated vehicle itself: state, speed control, curve stepping and
//! motion hand-off.
//!
//! ## Key Components
//!
//! - [`SimVehicle`] - per-vehicle dynamic state (curve parameter, speed,
//!   brake factor, world positions)
//! - [`update_vehicle`] - the per-tick dynamics step, the only place where
//!   lane-list membership changes
//! - [`brake_for_dist`] - the shared brake ramp used by all passes

pub mod vehicle;

pub use self::vehicle::*;
