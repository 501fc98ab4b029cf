//! # Entities Module
//!
//! World entities outside the road graph: buildings, persons and parking
//! spots. Persons own vehicles and trips; buildings anchor trip endpoints
//! and private parking; segments carry street parking.

pub mod building;
pub mod parking;
pub mod person;

pub use self::{building::*, parking::*, person::*};
