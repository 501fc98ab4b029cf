//! # Interaction Module
//!
//! The surface exposed to interaction tools: hover picking against world
//! entities and the bulldoze cascades. Tools stay outside the core and call
//! plain functions; selection is a tagged enum, not a trait object.
//!
//! ## Key Components
//!
//! - [`pick`] - nearest-entity raycast with a kind mask
//! - [`Selection`] / [`SelectionMask`] - selectable entity kinds
//! - [`remove_entity`] - bulldoze with full reference cleanup

pub mod edit;
pub mod picking;

pub use self::{edit::*, picking::*};
