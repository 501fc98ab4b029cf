//! # Simulation Module
//!
//! **Top-level orchestration module** - owns the world and drives the tick.
//!
//! ## Tick pipeline
//!
//! [`Session::advance`] executes a fixed phase order every tick:
//! ```text
//! 0. Reset per-vehicle brake factors
//! 1. Segment pass    - lane admission space, follower braking
//! 2. Node pass       - signals, tracking, yielding, priority swaps
//! 3. Person pass     - trip starts, vehicle dynamics, trip completion
//! 4. Metrics reduction
//! ```
//!
//! Phases 1 and 2 read vehicle state from before phase 3 of this tick;
//! phase 3 is the only mutator of lane-list membership. That ordering is
//! what makes the shared graph safe to update without locks.
//!
//! ## Components
//!
//! - [`Session`] - the world owner and tick driver
//! - [`SimSettings`] / [`IntersectionHeuristics`] - tunables
//! - [`Metrics`] - per-tick flow statistics
//! - [`snapshot`] / [`SessionSnapshot`] - tick-boundary state capture
//! - [`Heightmap`] - terrain interface queried at placement time

pub mod metrics;
pub mod segment_pass;
pub mod session;
pub mod settings;
pub mod states;

pub use self::{metrics::*, session::*, settings::*, states::*};
