//! # Assets Module
//!
//! Static asset descriptions consumed by the simulation core: road layouts,
//! vehicle dimensions and building footprints.
//!
//! Assets are owned by an explicit [`AssetRegistry`] that is passed to the
//! session at construction; the core keeps no process-wide asset state.
//! Entities reference assets by id ([`NetworkAssetId`], [`VehicleAssetId`],
//! [`BuildingAssetId`]) and the hot simulation structures cache the handful
//! of fields they need (lane shifts, speed limits, vehicle lengths) when
//! graph geometry is rebuilt.

mod registry;

pub use self::registry::*;
