//! The simulation session: owner of the world state and the fixed-order
//! tick driver.

use crate::agents::{update_vehicle, SimVehicle};
use crate::assets::{AssetRegistry, BuildingAssetId, VehicleAssetId};
use crate::conflicts::node_control;
use crate::entities::building::{Building, BuildingId};
use crate::entities::parking::{self, ParkingSpot};
use crate::entities::person::{Person, PersonId, VehicleState};
use crate::geom::Vec3;
use crate::navigation::{repath as nav_repath, step_motion, NavEndpoint, RepathError, VehNav};
use crate::network::{Network, NodeId, SegmentId};
use crate::shortest_path::{route, RouteEndpoint, RouteError, RoutePath};
use crate::simulation::metrics::Metrics;
use crate::simulation::segment_pass;
use crate::simulation::settings::SimSettings;
use crate::traffic_lights::TrafficLight;
use crate::trips::{TripId, VehicleTrip};
use crate::verbose::{
    EVENT_REPATH, EVENT_ROUTE_FAILED, EVENT_SIGNAL_TOGGLE, EVENT_TICK, EVENT_TRIP_CANCEL,
    EVENT_TRIP_FINISH, EVENT_TRIP_START,
};
use crate::{log_additional, log_detailed, log_main};
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use uuid::Uuid;

/// Terrain elevation provider, queried when placing objects. Never queried
/// during a tick.
pub trait Heightmap {
    fn sample_height(&self, x: f32, y: f32) -> f32;
}

/// Flat terrain for worlds that do not care about elevation.
pub struct FlatTerrain;

impl Heightmap for FlatTerrain {
    fn sample_height(&self, _x: f32, _y: f32) -> f32 {
        0.0
    }
}

/// A complete simulation world: the road network, entities, active trips
/// and the tick driver.
///
/// `advance` runs the mandatory phase order (segments, nodes, then
/// vehicles) so the per-lane and per-node bookkeeping each read a
/// consistent snapshot of the previous phase without locks.
pub struct Session {
    pub assets: AssetRegistry,
    pub network: Network,
    pub buildings: IndexMap<BuildingId, Building>,
    pub persons: IndexMap<PersonId, Person>,
    pub trips: HashMap<TripId, VehicleTrip>,
    pub settings: SimSettings,
    pub metrics: Metrics,
    /// Simulation speed multiplier applied to real time.
    pub sim_speed: f32,
    /// When paused, the tick still runs with `dt = 0` so bookkeeping stays
    /// consistent.
    pub paused: bool,
    id: Uuid,
    steps: u64,
    sim_time: f32,
    rng: StdRng,
    next_building: u32,
    next_person: u32,
    next_trip: TripId,
}

impl Session {
    pub fn new(assets: AssetRegistry) -> Self {
        Self::with_rng(assets, StdRng::from_os_rng())
    }

    /// Deterministic session for tests and reproductions.
    pub fn with_seed(assets: AssetRegistry, seed: u64) -> Self {
        Self::with_rng(assets, StdRng::seed_from_u64(seed))
    }

    fn with_rng(assets: AssetRegistry, rng: StdRng) -> Self {
        Session {
            assets,
            network: Network::new(),
            buildings: IndexMap::new(),
            persons: IndexMap::new(),
            trips: HashMap::new(),
            settings: SimSettings::default(),
            metrics: Metrics::default(),
            sim_speed: 1.0,
            paused: false,
            id: Uuid::new_v4(),
            steps: 0,
            sim_time: 0.0,
            rng,
            next_building: 0,
            next_person: 0,
            next_trip: 1,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn sim_time(&self) -> f32 {
        self.sim_time
    }

    /// Adds a node at terrain height.
    pub fn place_node(&mut self, x: f32, y: f32, terrain: &dyn Heightmap) -> NodeId {
        let z = terrain.sample_height(x, y);
        self.network.add_node(Vec3::new(x, y, z))
    }

    /// Adds a building next to a segment, laying out the lot parking its
    /// asset asks for.
    pub fn add_building(
        &mut self,
        asset: BuildingAssetId,
        pos: Vec3,
        connected_segment: SegmentId,
    ) -> BuildingId {
        let spots = self.assets.building_asset(asset).parking_spots;
        let building = Building::new(asset, pos, connected_segment).with_parking_row(spots);
        self.insert_building(building)
    }

    pub fn insert_building(&mut self, building: Building) -> BuildingId {
        let id = BuildingId(self.next_building);
        self.next_building += 1;
        self.buildings.insert(id, building);
        id
    }

    /// Lays out `count` curbside parking spots along a segment.
    pub fn add_street_parking(&mut self, sid: SegmentId, count: u16) {
        let (pos_a, length, forw, right, width) = {
            let seg = self.network.segment(sid);
            let (forw, right) = seg.dirs();
            (seg.pos_a, seg.length, forw, right, seg.width)
        };
        let side = width * 0.5 + 1.5;
        for i in 0..count {
            let t = (i as f32 + 0.5) / count as f32;
            let pos = pos_a + Vec3::from_xy(forw * (length * t) + right * side, 0.0);
            self.network
                .segment_mut(sid)
                .parking
                .push(ParkingSpot::new(pos, forw.angle()));
        }
    }

    /// Adds a freshly generated citizen living in `home`.
    pub fn spawn_person(&mut self, home: BuildingId, vehicle_asset: VehicleAssetId) -> PersonId {
        let person = Person::randomized(home, vehicle_asset, &mut self.rng);
        self.insert_person(person)
    }

    pub fn insert_person(&mut self, person: Person) -> PersonId {
        let id = PersonId(self.next_person);
        self.next_person += 1;
        self.persons.insert(id, person);
        id
    }

    /// Hands out a fresh trip id; used by scripted debug spawns that build
    /// their trip state by hand.
    pub fn alloc_trip_id(&mut self) -> TripId {
        let tid = self.next_trip;
        self.next_trip += 1;
        tid
    }

    /// Routing entry point; counts queries for the metrics panel.
    pub fn pathfind(
        &mut self,
        start_seg: SegmentId,
        dest_seg: SegmentId,
    ) -> Result<RoutePath, RouteError> {
        self.metrics.pathing_count += 1;
        route(
            &self.network,
            RouteEndpoint::new(start_seg),
            RouteEndpoint::new(dest_seg),
        )
    }

    /// Adds or removes the node's traffic light, rebuilding the phase
    /// program and the signalization-dependent lane defaults.
    pub fn toggle_traffic_light(&mut self, nid: NodeId) {
        if self.network.node(nid).traffic_light.is_some() {
            self.network.node_mut(nid).traffic_light = None;
            log_main!(EVENT_SIGNAL_TOGGLE, "traffic light removed", node = nid);
        } else {
            let light =
                TrafficLight::for_node_with_mode(&self.network, nid, self.settings.light_mode)
                    .map(|l| {
                        l.with_timings(
                            self.settings.light_green,
                            self.settings.light_yellow,
                            self.settings.light_all_red,
                        )
                    });
            if light.is_none() {
                log_main!(EVENT_SIGNAL_TOGGLE, "node does not support a light", node = nid);
            } else {
                log_main!(EVENT_SIGNAL_TOGGLE, "traffic light added", node = nid);
            }
            self.network.node_mut(nid).traffic_light = light;
        }
        self.network.assign_default_connections(nid);
    }

    /// Advances one tick. `dt_real` is wall-clock seconds; pausing keeps
    /// the tick running at `dt = 0`.
    pub fn advance(&mut self, dt_real: f32) {
        let dt = if self.paused { 0.0 } else { dt_real * self.sim_speed };
        log_detailed!(EVENT_TICK, "tick", step = self.steps, dt = dt);
        self.metrics.begin_tick();

        for trip in self.trips.values_mut() {
            trip.sim.brake = 1.0;
        }

        for sid in self.network.segment_ids() {
            segment_pass::update_segment(&mut self.network, &mut self.trips, &self.settings, sid);
        }

        for nid in self.network.node_ids() {
            node_control::update_node(&mut self.network, &mut self.trips, &self.settings, nid, dt);
        }

        let pids: Vec<PersonId> = self.persons.keys().copied().collect();
        for pid in pids {
            self.update_person(pid, dt);
        }

        self.metrics.finish_tick();
        self.steps += 1;
        self.sim_time += dt;
    }

    fn update_person(&mut self, pid: PersonId, dt: f32) {
        let (vstate, in_building) = {
            let Some(person) = self.persons.get(&pid) else {
                return;
            };
            (person.vehicle_state, person.cur_building.is_some())
        };

        if let VehicleState::Trip(tid) = vstate {
            if self.step_trip(tid, dt) {
                self.finish_trip(tid);
            }
            return;
        }

        if !in_building {
            return;
        }
        let person = self.persons.get_mut(&pid).expect("checked above");
        person.stay_timer -= dt;
        if person.stay_timer > 0.0 {
            return;
        }

        match self.start_trip(pid) {
            Some(tid) => {
                // zero-dt step settles curve speed and positions
                self.step_trip(tid, 0.0);
            }
            None => {
                self.persons.get_mut(&pid).expect("person is live").stay_timer = 1.0;
            }
        }
    }

    fn step_trip(&mut self, tid: TripId, dt: f32) -> bool {
        let mut trip = self.trips.remove(&tid).expect("stepping a live trip");
        let done = update_vehicle(
            &mut self.network,
            &mut self.buildings,
            &mut self.trips,
            &self.settings,
            &mut self.metrics,
            &mut trip,
            tid,
            dt,
        );
        self.trips.insert(tid, trip);
        done
    }

    /// Starts a trip to a random destination building. Routing failure is
    /// silent: the person stays put and retries shortly.
    pub fn start_trip(&mut self, pid: PersonId) -> Option<TripId> {
        let (cur_building, vehicle_asset, aggress, tint, vstate) = {
            let p = self.persons.get(&pid)?;
            (
                p.cur_building?,
                p.vehicle_asset,
                p.topspeed_accel_mul(),
                p.tint,
                p.vehicle_state,
            )
        };
        if self.buildings.is_empty() {
            return None;
        }

        let dest_idx = self.rng.random_range(0..self.buildings.len());
        let dest_building = *self.buildings.get_index(dest_idx)?.0;
        let start_seg = self.buildings.get(&cur_building)?.connected_segment?;
        let dest_seg = self.buildings.get(&dest_building)?.connected_segment?;

        self.metrics.pathing_count += 1;
        let path = match route(
            &self.network,
            RouteEndpoint::new(start_seg),
            RouteEndpoint::new(dest_seg),
        ) {
            Ok(p) => p,
            Err(RouteError::Unreachable { .. }) => {
                log_additional!(EVENT_ROUTE_FAILED, "trip start failed", person = pid);
                return None;
            }
        };

        let tid = self.next_trip;
        self.next_trip += 1;

        let start = match vstate {
            VehicleState::Parked(pref) => NavEndpoint::with_parking(cur_building, pref),
            _ => NavEndpoint::new(cur_building),
        };
        let dest = NavEndpoint::new(dest_building);

        let length = self.assets.vehicle_asset(vehicle_asset).length;
        let mut sim = SimVehicle::new(vehicle_asset, length, tint, aggress);
        let mut nav = VehNav::new(path.into_segments(), start, dest);
        sim.mot = step_motion(
            &mut self.network,
            &mut self.buildings,
            &self.settings,
            &mut nav,
            tid,
            pid,
            0,
            None,
        );

        if let Some(pref) = nav.start.parking {
            let spot = parking::resolve_mut(&mut self.network, &mut self.buildings, pref);
            spot.unpark(pid);
            // the spot frees as the vehicle pulls out
            spot.unreserve(pid);
            let spot_snapshot = spot.clone();
            sim.init_pos_parked(&spot_snapshot);
        } else {
            let bez = sim.mot.bezier;
            sim.init_pos(&bez);
        }

        let person = self.persons.get_mut(&pid).expect("person is live");
        person.cur_building = None;
        person.vehicle_state = VehicleState::Trip(tid);

        self.trips.insert(tid, VehicleTrip::new(pid, sim, nav));
        log_main!(EVENT_TRIP_START, "trip started", person = pid, trip = tid);
        Some(tid)
    }

    /// Completes a trip: the person enters the destination building and the
    /// vehicle parks in its reserved spot or pockets.
    pub fn finish_trip(&mut self, tid: TripId) {
        let mut trip = self.trips.remove(&tid).expect("finishing a live trip");
        let pid = trip.person;

        trip.remove_from_lane(&mut self.network, tid);
        trip.clear_node_tracking(&mut self.network, tid);

        let dest_building = trip.nav.dest.building;
        let vehicle_state = match trip.nav.dest.parking {
            Some(pref) => {
                let spot = parking::resolve_mut(&mut self.network, &mut self.buildings, pref);
                assert!(
                    spot.reserved_by(pid),
                    "finishing a trip whose reservation was lost"
                );
                spot.park(pid);
                VehicleState::Parked(pref)
            }
            None => VehicleState::Pocket,
        };

        let person = self.persons.get_mut(&pid).expect("trip owner exists");
        person.cur_building = Some(dest_building);
        person.stay_timer = self.settings.stay_time;
        person.vehicle_state = vehicle_state;

        log_main!(EVENT_TRIP_FINISH, "trip finished", person = pid, trip = tid);
    }

    /// Aborts a trip: the person returns to the start building and the
    /// vehicle becomes a pocket car. All world references are cleared.
    pub fn cancel_trip(&mut self, tid: TripId) {
        let Some(mut trip) = self.trips.remove(&tid) else {
            return;
        };
        trip.detach_from_world(&mut self.network, &mut self.buildings, tid);

        let person = self.persons.get_mut(&trip.person).expect("trip owner exists");
        person.cur_building = Some(trip.nav.start.building);
        person.vehicle_state = VehicleState::Pocket;
        person.stay_timer = 1.0;

        log_main!(EVENT_TRIP_CANCEL, "trip cancelled", trip = tid);
    }

    /// Redirects an active trip toward a new destination building,
    /// preserving the committed lane. The old parking reservation is
    /// released either way; a fresh one is acquired on final approach.
    pub fn repath(&mut self, tid: TripId, new_dest: BuildingId) -> Result<(), RepathError> {
        let dest_seg = self
            .buildings
            .get(&new_dest)
            .and_then(|b| b.connected_segment)
            .ok_or(RepathError::NoRoute)?;

        let mut trip = self.trips.remove(&tid).expect("repathing a live trip");
        let old_building = trip.nav.dest.building;
        trip.release_dest_parking(&mut self.network, &mut self.buildings);
        trip.nav.dest = NavEndpoint::new(new_dest);

        let res = nav_repath(
            &mut self.network,
            &mut self.buildings,
            &self.settings,
            &mut trip.nav,
            &mut trip.sim.mot,
            tid,
            trip.person,
            RouteEndpoint::new(dest_seg),
        );
        if res.is_err() {
            trip.nav.dest = NavEndpoint::new(old_building);
        }
        self.trips.insert(tid, trip);

        log_main!(EVENT_REPATH, "repath", trip = tid, ok = res.is_ok());
        res
    }
}
