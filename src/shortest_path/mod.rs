//! # Shortest Path Module
//!
//! Travel-time Dijkstra over the road graph.
//!
//! ## Key Components
//!
//! - [`route`] - find the cheapest segment run between two endpoints
//! - [`RouteEndpoint`] - segment plus optional direction restriction
//! - [`RoutePath`] - ordered segments and the assigned cost
//! - [`RouteError`] - `Unreachable` is the only failure and is recovered
//!   locally by the trip layer (the person waits and retries)

pub mod path;
pub mod router;

pub use self::{path::*, router::*};
