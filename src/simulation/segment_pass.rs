//! The per-segment tick pass: admission-space accounting and same-lane
//! follower braking.

use crate::agents::brake_for_dist;
use crate::navigation::MotionKind;
use crate::network::{Network, SegLane, SegmentId};
use crate::simulation::settings::{SimSettings, SAFETY_DIST};
use crate::trips::{TripId, VehicleTrip};
use std::collections::HashMap;

/// Recomputes every lane's `avail_space` and brakes followers behind their
/// leaders.
///
/// Space starts from the lane length minus the deepest rear intrusion of a
/// vehicle that already crossed into the downstream node but whose tail is
/// still on this lane (its `rear_k` is negative there); every listed
/// vehicle then subtracts its own footprint.
pub fn update_segment(
    net: &mut Network,
    trips: &mut HashMap<TripId, VehicleTrip>,
    settings: &SimSettings,
    sid: SegmentId,
) {
    let lane_count = net.segment(sid).lanes.len();
    for lane_idx in 0..lane_count {
        let sl = SegLane {
            seg: sid,
            lane: lane_idx as u16,
        };

        let dest_node = sl.dest_node(net);
        let mut space_taken = 0.0f32;
        for agent in &net.node(dest_node).agents.tracked {
            let Some(trip) = trips.get(&agent.trip) else {
                continue;
            };
            if trip.sim.mot.kind == MotionKind::Node && agent.conn.conn.a == sl {
                space_taken = space_taken.max(-agent.rear_k);
            }
        }

        let length = net.segment(sid).length;
        let mut avail = length - (space_taken + SAFETY_DIST * 1.25);

        let list = sl.vehicles(net).list.clone();
        for tid in &list {
            let len = trips.get(tid).expect("lane lists hold live trips").sim.length;
            avail -= len + SAFETY_DIST * 1.25;
        }
        sl.vehicles_mut(net).avail_space = avail;

        // brake each follower for its leader, approximating separation with
        // the follower's curve-space speed
        for pair in list.windows(2) {
            let (ahead, behind) = (pair[0], pair[1]);
            let (a_t, a_len) = {
                let s = &trips.get(&ahead).expect("lane lists hold live trips").sim;
                (s.bez_t, s.length)
            };
            let b = trips.get_mut(&behind).expect("lane lists hold live trips");
            let dist = (a_t - b.sim.bez_t) * b.sim.bez_speed - (a_len + 1.0);
            brake_for_dist(&mut b.sim, dist, settings.brake_ramp_dist);
        }
    }
}
