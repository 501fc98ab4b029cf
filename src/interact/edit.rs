//! Bulldozing and the cascades that keep the world reference-free.

use crate::entities::parking::{ParkingRef, ParkingState};
use crate::entities::person::{PersonId, VehicleState};
use crate::interact::picking::Selection;
use crate::network::SegmentId;
use crate::simulation::Session;
use crate::trips::TripId;
use crate::verbose::EVENT_BULLDOZE;
use crate::log_main;

/// Removes an entity and everything that references it. Removing a segment
/// cancels all trips touching it; removing a node removes its segments
/// first.
pub fn remove_entity(session: &mut Session, target: Selection) {
    log_main!(EVENT_BULLDOZE, "remove entity", target = target);
    match target {
        Selection::Vehicle(tid) => session.cancel_trip(tid),
        Selection::Person(pid) => remove_person(session, pid),
        Selection::Building(bid) => remove_building(session, bid),
        Selection::Segment(sid) => remove_segment(session, sid),
        Selection::Node(nid) => {
            let segs = session.network.node(nid).segments.clone();
            for sid in segs {
                remove_segment(session, sid);
            }
            session
                .network
                .remove_node(nid)
                .expect("node removal after detaching all segments");
        }
        Selection::ParkingSpot(pref) => remove_parking_spot(session, pref),
    }
}

fn remove_person(session: &mut Session, pid: PersonId) {
    let vstate = session.persons.get(&pid).map(|p| p.vehicle_state);
    match vstate {
        Some(VehicleState::Trip(tid)) => session.cancel_trip(tid),
        Some(VehicleState::Parked(pref)) => {
            let spot = crate::entities::parking::resolve_mut(
                &mut session.network,
                &mut session.buildings,
                pref,
            );
            if spot.occupied_by(pid) {
                spot.unpark(pid);
                spot.unreserve(pid);
            }
        }
        _ => {}
    }
    session.persons.shift_remove(&pid);
}

fn trips_touching_segment(session: &Session, sid: SegmentId) -> Vec<TripId> {
    session
        .trips
        .iter()
        .filter(|(_, trip)| {
            trip.nav.path.contains(&sid)
                || session.buildings[&trip.nav.start.building].connected_segment == Some(sid)
                || session.buildings[&trip.nav.dest.building].connected_segment == Some(sid)
        })
        .map(|(&tid, _)| tid)
        .collect()
}

fn remove_segment(session: &mut Session, sid: SegmentId) {
    // trips first, so no lane list or node tracker keeps a reference
    for tid in trips_touching_segment(session, sid) {
        session.cancel_trip(tid);
    }

    // street parking goes with the segment
    let spot_count = session.network.segment(sid).parking.len();
    for i in (0..spot_count).rev() {
        remove_parking_spot(session, ParkingRef::Street(sid, i as u16));
    }

    // buildings lose their road access but stay
    for building in session.buildings.values_mut() {
        if building.connected_segment == Some(sid) {
            building.connected_segment = None;
        }
    }

    session
        .network
        .remove_segment(sid)
        .expect("removing a live segment");
}

fn remove_building(session: &mut Session, bid: crate::entities::building::BuildingId) {
    // cancel trips that start or end here
    let touching: Vec<TripId> = session
        .trips
        .iter()
        .filter(|(_, trip)| {
            trip.nav.start.building == bid || trip.nav.dest.building == bid
        })
        .map(|(&tid, _)| tid)
        .collect();
    for tid in touching {
        session.cancel_trip(tid);
    }

    // occupants lose their building and wait nowhere; they are removed with
    // it along with their parked cars on the lot
    let occupants: Vec<PersonId> = session
        .persons
        .iter()
        .filter(|(_, p)| p.cur_building == Some(bid) || p.home_building == bid)
        .map(|(&pid, _)| pid)
        .collect();
    for pid in occupants {
        remove_person(session, pid);
    }

    session.buildings.shift_remove(&bid);
}

/// Removes one parking spot, fixing up every reference into the shifted
/// spot list.
fn remove_parking_spot(session: &mut Session, pref: ParkingRef) {
    let state = *match pref {
        ParkingRef::Building(bid, idx) => {
            let Some(b) = session.buildings.get(&bid) else { return };
            let Some(s) = b.parking.get(idx as usize) else { return };
            &s.state
        }
        ParkingRef::Street(sid, idx) => {
            let Some(s) = session.network.get_segment(sid) else { return };
            let Some(s) = s.parking.get(idx as usize) else { return };
            &s.state
        }
    };

    // release whoever holds the spot
    match state {
        ParkingState::Occupied(pid) => {
            if let Some(person) = session.persons.get_mut(&pid) {
                person.vehicle_state = VehicleState::Pocket;
            }
        }
        ParkingState::Reserved(_) => {
            let holder: Option<TripId> = session
                .trips
                .iter()
                .find(|(_, t)| t.nav.dest.parking == Some(pref))
                .map(|(&tid, _)| tid);
            if let Some(tid) = holder {
                let trip = session.trips.get_mut(&tid).expect("just found");
                // the trip drives on and parks elsewhere or at the door
                trip.nav.dest.parking = None;
            }
        }
        ParkingState::Free => {}
    }

    let (container_idx, removed_idx) = match pref {
        ParkingRef::Building(bid, idx) => {
            session
                .buildings
                .get_mut(&bid)
                .expect("checked above")
                .parking
                .remove(idx as usize);
            (ParkingRef::Building(bid, 0), idx)
        }
        ParkingRef::Street(sid, idx) => {
            session
                .network
                .segment_mut(sid)
                .parking
                .remove(idx as usize);
            (ParkingRef::Street(sid, 0), idx)
        }
    };

    // shift references pointing past the removed index
    let fix = |r: &mut ParkingRef| match (container_idx, r) {
        (ParkingRef::Building(cb, _), ParkingRef::Building(rb, ri)) => {
            if cb == *rb && *ri > removed_idx {
                *ri -= 1;
            }
        }
        (ParkingRef::Street(cs, _), ParkingRef::Street(rs, ri)) => {
            if cs == *rs && *ri > removed_idx {
                *ri -= 1;
            }
        }
        _ => {}
    };

    for person in session.persons.values_mut() {
        if let VehicleState::Parked(ref mut r) = person.vehicle_state {
            fix(r);
        }
    }
    for trip in session.trips.values_mut() {
        if let Some(ref mut r) = trip.nav.start.parking {
            fix(r);
        }
        if let Some(ref mut r) = trip.nav.dest.parking {
            fix(r);
        }
    }
}
