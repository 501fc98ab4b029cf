//! Synthesized curves joining the road network to trip endpoints.
//!
//! A trip starts and ends off the network (building front, building lot or
//! street parking). These helpers build the cubic that blends between the
//! off-network point and a position on the first/last lane, and report the
//! lane parameter where driving on the lane proper begins or ends.

use crate::entities::building::{Building, BuildingId};
use crate::entities::parking::{ParkingRef, ParkingSpot};
use crate::geom::{lerp3, Bezier, Vec3};
use crate::network::{Network, SegLane, SegmentId};
use indexmap::IndexMap;

/// One end of a trip: a building, plus the parking spot once one is
/// reserved.
#[derive(Debug, Clone, Copy)]
pub struct NavEndpoint {
    pub building: BuildingId,
    pub parking: Option<ParkingRef>,
}

impl NavEndpoint {
    pub fn new(building: BuildingId) -> Self {
        NavEndpoint {
            building,
            parking: None,
        }
    }

    pub fn with_parking(building: BuildingId, parking: ParkingRef) -> Self {
        NavEndpoint {
            building,
            parking: Some(parking),
        }
    }
}

/// An endpoint curve: the blend bezier plus the lane parameter where it
/// meets the lane.
#[derive(Debug, Clone, Copy)]
pub struct NavEndCurve {
    pub bez: Bezier,
    pub lane_t: f32,
}

/// The lane an endpoint curve attaches to, and on which side of the trip it
/// sits: `leaving == false` builds a curve landing on the lane (trip start),
/// `leaving == true` a curve departing from it (trip end).
#[derive(Debug, Clone, Copy)]
pub struct EndLane {
    pub lane: SegLane,
    pub leaving: bool,
}

/// Builds the blend between an off-network position and the lane.
///
/// The lane-side control point sits roughly 3 m from the touch point so the
/// blend stays tangent to the lane.
pub fn calc_end_bezier(
    net: &Network,
    lane: EndLane,
    pos: Vec3,
    ctrl: Vec3,
    seg_t: f32,
) -> NavEndCurve {
    let lane_bez = lane.lane.bezier(net);
    let len = lane_bez.approx_len(4).max(0.5);
    let ctrl_t = (3.0 / len).min(0.5);

    let lt = lane.lane.lane_t(net, seg_t);
    if !lane.leaving {
        let t1 = lt.clamp(0.01, 0.99 - ctrl_t);
        let t0 = t1 + ctrl_t;
        let lane_ctrl = lane_bez.eval(t1).pos;
        let lane_pos = lane_bez.eval(t0).pos;
        NavEndCurve {
            bez: Bezier::new(pos, ctrl, lane_ctrl, lane_pos),
            lane_t: t0,
        }
    } else {
        let t1 = lt.clamp(0.01 + ctrl_t, 0.99);
        let t0 = t1 - ctrl_t;
        let lane_ctrl = lane_bez.eval(t1).pos;
        let lane_pos = lane_bez.eval(t0).pos;
        NavEndCurve {
            bez: Bezier::new(lane_pos, lane_ctrl, ctrl, pos),
            lane_t: t0,
        }
    }
}

/// Curve between the lane and the sidewalk point nearest to the building
/// front. Used for pocket-car spawns and despawns.
pub fn building_front_curve(net: &Network, lane: EndLane, building: &Building) -> NavEndCurve {
    let seg_id = building
        .connected_segment
        .expect("building endpoint requires a connected segment");
    let seg = net.segment(seg_id);

    let t = seg.closest_t(building.pos.xy());
    let center = lerp3(seg.pos_a, seg.pos_b, t);
    let (_, right) = seg.dirs();

    let right_dist = right.dot(building.pos.xy() - center.xy());
    let (offset1, offset2) = if right_dist > 0.0 {
        (seg.sidewalk_r, seg.sidewalk_r + 1.0)
    } else {
        (seg.sidewalk_l, seg.sidewalk_l - 1.0)
    };

    let end_pos = center + Vec3::from_xy(right * offset2, 0.0);
    let ctrl = center + Vec3::from_xy(right * offset1, 0.0);
    calc_end_bezier(net, lane, end_pos, ctrl, t)
}

/// Curve between the lane and a nose-in spot on a building lot.
pub fn building_parking_curve(
    net: &Network,
    lane: EndLane,
    building: &Building,
    spot: &ParkingSpot,
) -> NavEndCurve {
    let seg_id = building
        .connected_segment
        .expect("building endpoint requires a connected segment");
    let pos = spot.vehicle_front_pos();
    let ctrl = spot.front_enter_ctrl();
    let t = net.segment(seg_id).closest_t(ctrl.xy());
    calc_end_bezier(net, lane, pos, ctrl, t)
}

/// Curve between the lane and a curbside street spot.
pub fn street_parking_curve(
    net: &Network,
    lane: EndLane,
    seg_id: SegmentId,
    spot: &ParkingSpot,
) -> NavEndCurve {
    let pos = spot.vehicle_front_pos();
    let ctrl = if lane.leaving {
        spot.side_enter_ctrl()
    } else {
        spot.side_exit_ctrl()
    };
    let t = net.segment(seg_id).closest_t(ctrl.xy());
    calc_end_bezier(net, lane, pos, ctrl, t)
}

/// Builds the endpoint curve for whatever the endpoint resolved to.
pub fn endpoint_curve(
    net: &Network,
    buildings: &IndexMap<BuildingId, Building>,
    endpoint: &NavEndpoint,
    lane: EndLane,
) -> NavEndCurve {
    let building = buildings
        .get(&endpoint.building)
        .expect("endpoint references a live building");
    match endpoint.parking {
        Some(ParkingRef::Building(bid, idx)) => {
            let owner = buildings.get(&bid).expect("parking ref building exists");
            building_parking_curve(net, lane, owner, &owner.parking[idx as usize])
        }
        Some(ParkingRef::Street(sid, idx)) => {
            let spot = &net.segment(sid).parking[idx as usize];
            street_parking_curve(net, lane, sid, spot)
        }
        None => building_front_curve(net, lane, building),
    }
}

/// Scans for a free spot: the destination building's own lot first, then
/// street parking on its connected segment.
pub fn find_parking_near(
    net: &Network,
    buildings: &IndexMap<BuildingId, Building>,
    dest: BuildingId,
) -> Option<ParkingRef> {
    let building = buildings.get(&dest)?;
    for (i, spot) in building.parking.iter().enumerate() {
        if spot.is_free() {
            return Some(ParkingRef::Building(dest, i as u16));
        }
    }
    let seg_id = building.connected_segment?;
    for (i, spot) in net.segment(seg_id).parking.iter().enumerate() {
        if spot.is_free() {
            return Some(ParkingRef::Street(seg_id, i as u16));
        }
    }
    None
}
