//! # Trips Module
//!
//! The trip lifecycle: a [`VehicleTrip`] couples a person's vehicle to a
//! navigation plan from a start endpoint to a destination endpoint
//! (building, optionally a reserved parking spot).
//!
//! Trip start, finish and cancellation are orchestrated by
//! [`Session`](crate::simulation::Session); this module owns the trip data
//! and its teardown guarantees (no dangling references in lane lists, node
//! trackers or parking state).

pub mod trip;

pub use self::trip::*;
