//! # Navigation Module
//!
//! Turns a routed segment path into the ordered motion sequence a vehicle
//! drives: `START, (SEGMENT, NODE)*, SEGMENT, END`.
//!
//! ## Key Components
//!
//! - [`Motion`] / [`MotionKind`] - one element of the sequence: curve,
//!   hand-off parameters, speed limits and lane references
//! - [`VehNav`] - the path plus both endpoints; [`step_motion`] produces
//!   motions on demand
//! - [`pick_lane`](planner) - forward/backward lane selection with an early
//!   lane-change chance
//! - [`repath`] - replan toward a new destination preserving the committed
//!   lane
//! - [`NavEndCurve`] / [`endpoint_curve`] - synthesized start/end blends
//!   (building front, lot parking, street parking)

pub mod end_curves;
pub mod motion;
pub mod planner;

pub use self::{end_curves::*, motion::*, planner::*};
