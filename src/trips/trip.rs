//! Active trips: a vehicle driving a planned path between two endpoints.

use crate::agents::SimVehicle;
use crate::entities::building::{Building, BuildingId};
use crate::entities::parking;
use crate::entities::person::PersonId;
use crate::navigation::VehNav;
use crate::network::Network;
use indexmap::IndexMap;

/// Identifier of an active trip.
pub type TripId = u64;

/// A person's journey from building to building: owns the vehicle state and
/// the navigation plan. Created by `start_trip`, destroyed by `finish_trip`
/// or `cancel_trip`.
#[derive(Debug)]
pub struct VehicleTrip {
    pub person: PersonId,
    pub sim: SimVehicle,
    pub nav: VehNav,
}

impl VehicleTrip {
    pub fn new(person: PersonId, sim: SimVehicle, nav: VehNav) -> Self {
        VehicleTrip { person, sim, nav }
    }

    /// Drops this trip's vehicle from every node tracker along the path.
    pub fn clear_node_tracking(&self, net: &mut Network, tid: TripId) {
        for pair in self.nav.path.windows(2) {
            if let Some(nid) = net.between(pair[0], pair[1]) {
                net.node_mut(nid).agents.try_remove(tid);
            }
        }
    }

    /// Drops this trip's vehicle from its lane list, if it is in one.
    pub fn remove_from_lane(&self, net: &mut Network, tid: TripId) {
        if self.sim.mot.has_lane_membership() {
            if let Some(lane) = self.sim.mot.cur_lane {
                lane.vehicles_mut(net).try_remove(tid);
            }
        }
    }

    /// Releases the destination parking reservation, if this trip holds one.
    pub fn release_dest_parking(
        &mut self,
        net: &mut Network,
        buildings: &mut IndexMap<BuildingId, Building>,
    ) {
        if let Some(pref) = self.nav.dest.parking.take() {
            let spot = parking::resolve_mut(net, buildings, pref);
            if spot.reserved_by(self.person) {
                spot.unreserve(self.person);
            }
        }
    }

    /// Full teardown used by cancellation and bulldozing: no reference to
    /// this trip may survive in any node tracker or lane list.
    pub fn detach_from_world(
        &mut self,
        net: &mut Network,
        buildings: &mut IndexMap<BuildingId, Building>,
        tid: TripId,
    ) {
        self.remove_from_lane(net, tid);
        self.clear_node_tracking(net, tid);
        self.release_dest_parking(net, buildings);
    }
}
