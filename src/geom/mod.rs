//! # Geometry Module
//!
//! Geometric primitives for the continuous-space traffic simulation.
//!
//! ## Key Components
//!
//! - [`Vec2`] / [`Vec3`] - single-precision vectors (metres)
//! - [`Bezier`] - cubic Bézier curves with curvature and arc-length helpers
//! - [`line_line_intersect`] / [`line_segment_intersect`] - planar
//!   intersection primitives used by node geometry and conflict detection
//! - [`Ray`], [`intersect_circle_ray`], [`intersect_rect_ray`] - hover
//!   picking tests
//!
//! Lane centerlines, intersection corner curves and trip start/end approaches
//! are all expressed as [`Bezier`] values; vehicles advance along them by
//! curve parameter (see the `agents` module).

mod bezier;
mod spatial;
mod vec;

pub use self::{bezier::*, spatial::*, vec::*};
