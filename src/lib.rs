//! # continuous_traffic_sim_core
//!
//! Core library for microscopic traffic simulation over continuous-space
//! road networks: vehicles follow Bézier lane geometry through a mutable
//! road graph, negotiating lane admission, intersection priority,
//! traffic-light phasing and parking.
//!
//! ## Architecture
//!
//! Dependency order, leaves first:
//!
//! - [`geom`] - vectors, Bézier curves, intersection primitives
//! - [`assets`] - explicit registry of road/vehicle/building descriptions
//! - [`network`] - the road graph: nodes, segments, lanes, connections
//! - [`shortest_path`] - travel-time Dijkstra with turn gating
//! - [`traffic_lights`] - phase machines over in-lane signal slots
//! - [`navigation`] - path expansion into motion sequences, lane selection
//! - [`agents`] - per-vehicle dynamics
//! - [`conflicts`] - intersection conflict geometry and the node pass
//! - [`entities`] / [`trips`] - persons, buildings, parking, trip lifecycle
//! - [`simulation`] - the session and the fixed-order tick driver
//! - [`interact`] - hover picking and bulldozing
//!
//! ## Quick start
//!
//! ```rust
//! use continuous_traffic_sim_core::assets::{kmh, AssetRegistry, BuildingAsset,
//!     NetworkAsset, VehicleAsset};
//! use continuous_traffic_sim_core::geom::Vec3;
//! use continuous_traffic_sim_core::simulation::Session;
//!
//! let mut assets = AssetRegistry::new();
//! let road = assets.add_network_asset(
//!     NetworkAsset::new("street")
//!         .with_width(8.0)
//!         .with_two_way_lanes(1)
//!         .with_speed_limit(kmh(50.0))
//!         .build(),
//! );
//! let sedan = assets.add_vehicle_asset(VehicleAsset::new("sedan", 4.0));
//! let house = assets.add_building_asset(BuildingAsset::new("house"));
//!
//! let mut session = Session::with_seed(assets, 7);
//! let a = session.network.add_node(Vec3::new(0.0, 0.0, 0.0));
//! let b = session.network.add_node(Vec3::new(200.0, 0.0, 0.0));
//! let c = session.network.add_node(Vec3::new(400.0, 0.0, 0.0));
//! let s1 = session.network.add_segment(&session.assets, road, a, b).unwrap();
//! let s2 = session.network.add_segment(&session.assets, road, b, c).unwrap();
//!
//! let home = session.add_building(house, Vec3::new(50.0, -15.0, 0.0), s1);
//! let _work = session.add_building(house, Vec3::new(350.0, 15.0, 0.0), s2);
//! session.spawn_person(home, sedan);
//!
//! for _ in 0..600 {
//!     session.advance(1.0 / 60.0);
//! }
//! ```

pub mod agents;
pub mod assets;
pub mod conflicts;
pub mod entities;
pub mod geom;
pub mod interact;
pub mod navigation;
pub mod network;
pub mod shortest_path;
pub mod simulation;
pub mod traffic_lights;
pub mod trips;
pub mod utils;
pub mod verbose;
