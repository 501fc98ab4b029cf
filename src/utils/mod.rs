//! # Utils Module
//!
//! Fixture builders for tests, benchmarks and scripted scenarios.
//!
//! ## Key Components
//!
//! - [`test_worlds::straight_corridor`] - one-way multi-lane strip
//! - [`test_worlds::four_way_cross`] - symmetric crossing, optionally
//!   signalized
//! - [`test_worlds::grid_world`] - n x n street grid for routing benchmarks
//! - [`test_worlds::spawn_scripted_trip`] - place a vehicle mid-path

pub mod test_worlds;
