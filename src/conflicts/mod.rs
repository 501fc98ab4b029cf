//! # Conflicts Module
//!
//! **Internal simulation module** - intersection conflict geometry and the
//! per-node controller pass.
//!
//! This module is step 2 of the tick pipeline and is driven by
//! [`Session::advance`](crate::simulation::Session::advance); it is not
//! meant to be called directly.
//!
//! ## Components
//!
//! - [`Conflict`] / [`ConflictKey`] - the curve-parameter windows where two
//!   thickened connection corridors overlap, cached per node under an
//!   order-normalized key
//! - [`check_conflict`] / [`query_conflict`] - computation and cache lookup
//! - [`NodeAgents`] / [`NodeAgent`] - the tracked-vehicle priority list
//! - [`update_node`] - the full node pass: admit, position update, signal
//!   and admission gating, yield resolution, priority swap, eviction

pub mod conflicts;
pub mod node_control;

pub use self::{conflicts::*, node_control::*};
