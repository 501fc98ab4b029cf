//! # Traffic Lights Module
//!
//! Fixed-program signal phasing for intersections: a phase machine over
//! 64-bit masks of in-lane signal slots.
//!
//! ## Key Components
//!
//! - [`TrafficLight`] - the phase machine (green / yellow / all-red timing)
//! - [`TrafficLightMode`] - phase construction: exclusive-per-segment or
//!   2-phase opposing straights (default)
//! - [`Signal`] - the colour an in-lane slot currently shows
//! - [`lane_signal`] - look up the signal for a node in-lane

pub mod lights;
pub mod signals;

pub use self::{lights::*, signals::*};
