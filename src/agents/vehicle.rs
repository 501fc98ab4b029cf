//! Per-vehicle simulation state and the per-tick dynamics step.

use crate::entities::building::{Building, BuildingId};
use crate::entities::parking::ParkingSpot;
use crate::geom::{lerp, map, BezierPoint, Vec3};
use crate::navigation::{step_motion, Motion, MotionKind};
use crate::network::Network;
use crate::simulation::metrics::Metrics;
use crate::simulation::settings::{SimSettings, SAFETY_DIST};
use crate::trips::{TripId, VehicleTrip};
use indexmap::IndexMap;
use std::collections::HashMap;

/// The simulated state of one vehicle on the road.
///
/// `bez_t` is the parameter on the current motion's curve; `bez_speed` is
/// the curve-space velocity magnitude from the last evaluation, used to
/// convert world-space distances to parameter steps. It starts at infinity
/// so the very first tick takes a zero-length step instead of dividing by
/// zero.
#[derive(Debug)]
pub struct SimVehicle {
    pub asset: crate::assets::VehicleAssetId,
    /// Bumper-to-bumper length, cached from the asset.
    pub length: f32,
    pub tint: [f32; 3],
    /// Top-speed/acceleration multiplier from the driver's aggressiveness.
    pub aggress_mul: f32,
    pub mot: Motion,
    pub bez_t: f32,
    /// Brake factor in [0, 1] set by the segment and node passes; 1 = free.
    pub brake: f32,
    /// World-space speed, m/s.
    pub speed: f32,
    pub bez_speed: f32,
    pub front_pos: Vec3,
    pub rear_pos: Vec3,
}

impl SimVehicle {
    pub fn new(asset: crate::assets::VehicleAssetId, length: f32, tint: [f32; 3], aggress_mul: f32) -> Self {
        SimVehicle {
            asset,
            length,
            tint,
            aggress_mul,
            mot: Motion::default(),
            bez_t: 0.0,
            brake: 1.0,
            speed: 0.0,
            bez_speed: f32::INFINITY,
            front_pos: Vec3::ZERO,
            rear_pos: Vec3::ZERO,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.front_pos + self.rear_pos) * 0.5
    }

    fn init_pos_dir(&mut self, pos: Vec3, forw: Vec3) {
        self.front_pos = pos;
        self.rear_pos = pos - forw * self.length;
    }

    /// Places the vehicle at the start of a curve.
    pub fn init_pos(&mut self, bez: &crate::geom::Bezier) {
        let pos = bez.eval(0.0).pos;
        let forw = (bez.eval(0.001).pos - pos).normalize_safe();
        self.init_pos_dir(pos, forw);
    }

    /// Places the vehicle in a parking spot.
    pub fn init_pos_parked(&mut self, spot: &ParkingSpot) {
        let forw = Vec3::from_xy(spot.forward(), 0.0);
        self.init_pos_dir(spot.vehicle_front_pos(), forw);
    }
}

/// Lowers a vehicle's brake factor to stop within `dist` metres, ramping
/// linearly over the configured ramp distance.
pub fn brake_for_dist(sim: &mut SimVehicle, dist: f32, ramp_dist: f32) {
    let brake = (dist / ramp_dist).clamp(0.0, 1.0);
    sim.brake = sim.brake.min(brake);
}

/// A vehicle still on its START curve negotiates its merge into the first
/// lane: it waits for admission space, brakes for the vehicle it would slot
/// behind, and asks the vehicle that would end up behind it to hold back.
/// Space is reserved last so spawning cannot grid-lock a lane.
fn yield_enter_segment(
    net: &mut Network,
    others: &mut HashMap<TripId, VehicleTrip>,
    settings: &SimSettings,
    sim: &mut SimVehicle,
) {
    if sim.mot.kind != MotionKind::Start {
        return;
    }
    let merge_lane = sim.mot.next_lane.expect("start motion has a target lane");
    let merge_t = sim.mot.next_start_t;
    let dist_to_merge = (1.0 - sim.bez_t) * sim.bez_speed;
    let dist_to_wait = (0.3 - sim.bez_t) * sim.bez_speed;

    if merge_lane.vehicles(net).avail_space < sim.length {
        brake_for_dist(sim, dist_to_wait, settings.brake_ramp_dist);
        return;
    }

    let spot = merge_lane.vehicles(net).find_lane_spot(others, merge_t);

    if let Some(lead) = spot.leading {
        let o = &others.get(&lead).expect("lane lists hold live trips").sim;
        let mut other_rear = (o.bez_t - merge_t) * o.bez_speed;
        other_rear -= o.length + SAFETY_DIST;
        brake_for_dist(sim, other_rear + dist_to_merge, settings.brake_ramp_dist);
    }
    if let Some(trail) = spot.trailing {
        let us_space = dist_to_merge - sim.length - SAFETY_DIST;
        let o = &mut others.get_mut(&trail).expect("lane lists hold live trips").sim;
        let other_dist_to_merge = (merge_t - o.bez_t) * o.bez_speed;
        brake_for_dist(o, other_dist_to_merge + us_space, settings.brake_ramp_dist);
    }

    merge_lane.vehicles_mut(net).avail_space -= sim.length + SAFETY_DIST * 1.25;
}

/// Speed control: ramp toward the next motion's limit near the hand-off,
/// scale by aggressiveness and the brake factor, then accelerate against
/// drag or decelerate.
fn update_speed(sim: &mut SimVehicle, settings: &SimSettings, metrics: &mut Metrics, dt: f32) {
    let mut speed_limit = sim.mot.cur_speedlim;
    let remain = ((sim.mot.end_t - sim.bez_t) * sim.bez_speed).max(0.0);
    if remain <= 5.0 {
        speed_limit = lerp(sim.mot.cur_speedlim, sim.mot.next_speedlim, map(remain, 5.0, 0.0));
    }
    speed_limit *= sim.aggress_mul;
    speed_limit = speed_limit.max(1.0);

    let mut target = speed_limit * sim.brake;
    if target < 0.33 {
        target = 0.0;
    }

    let drag = settings.drag_factor * sim.speed * sim.speed;
    if target > sim.speed {
        let accel = sim.aggress_mul * (settings.car_accel - drag);
        sim.speed = (sim.speed + accel * dt).min(target);
    } else {
        let decel = sim.aggress_mul * (settings.car_decel + drag);
        sim.speed = (sim.speed - decel * dt).max(target);
    }

    metrics.record_flow(sim.speed, speed_limit);
}

/// Moves the rear with a trailer model: the rear chases a reference point
/// slightly ahead of the old rear, which keeps it from swinging wide.
fn update_positions(sim: &mut SimVehicle, bez_res: &BezierPoint, settings: &SimSettings) {
    let new_front = bez_res.pos;
    let old_rear = sim.rear_pos;
    let forw = (sim.front_pos - old_rear).normalize_safe();

    let ref_point = old_rear + forw * (sim.length * settings.rear_drag_ratio);
    let new_rear = new_front - (new_front - ref_point).normalize_safe() * sim.length;

    sim.front_pos = new_front;
    sim.rear_pos = new_rear;
}

/// Advances one trip's vehicle by `dt`. Returns `true` when the trip is
/// complete (END curve fully driven).
///
/// The caller has removed `trip` from the trip map, so `others` holds every
/// other active trip; lane-list membership changes happen only here.
pub fn update_vehicle(
    net: &mut Network,
    buildings: &mut IndexMap<BuildingId, Building>,
    others: &mut HashMap<TripId, VehicleTrip>,
    settings: &SimSettings,
    metrics: &mut Metrics,
    trip: &mut VehicleTrip,
    tid: TripId,
    dt: f32,
) -> bool {
    if trip.sim.mot.kind == MotionKind::End && trip.sim.bez_t >= trip.sim.mot.end_t {
        return true;
    }

    yield_enter_segment(net, others, settings, &mut trip.sim);

    debug_assert!(trip.sim.bez_t <= 1.0);
    update_speed(&mut trip.sim, settings, metrics, dt);

    let delta_dist = trip.sim.speed * dt;
    trip.sim.bez_t += delta_dist / trip.sim.bez_speed;

    if trip.sim.bez_t >= trip.sim.mot.end_t {
        if trip.sim.mot.has_lane_membership() {
            let lane = trip.sim.mot.cur_lane.expect("segment motion carries its lane");
            lane.vehicles_mut(net).remove(tid);
        }

        if trip.sim.mot.kind == MotionKind::End {
            // signal completion on the next call
            trip.sim.bez_t = trip.sim.mot.end_t;
        } else {
            let additional_dist = (trip.sim.bez_t - trip.sim.mot.end_t) * trip.sim.bez_speed;
            trip.sim.bez_t = trip.sim.mot.next_start_t;
            debug_assert!(trip.sim.bez_t >= 0.0 && trip.sim.bez_t < 1.0);

            let prev = trip.sim.mot;
            trip.sim.mot = step_motion(
                net,
                buildings,
                settings,
                &mut trip.nav,
                tid,
                trip.person,
                prev.idx + 1,
                Some(&prev),
            );

            if trip.sim.mot.has_lane_membership() {
                let lane = trip.sim.mot.cur_lane.expect("segment motion carries its lane");
                let bez_t = trip.sim.bez_t;
                lane.vehicles_mut(net).insert_at_spot(others, tid, bez_t);
            }

            // extrapolate the leftover arc onto the new curve so the join
            // stays jerk-free
            let start_speed = trip.sim.mot.bezier.eval(trip.sim.bez_t).vel.length().max(1e-3);
            let additional_t = additional_dist.max(0.0) / start_speed;
            trip.sim.bez_t = (trip.sim.bez_t + additional_t).min(trip.sim.mot.end_t);
        }
    }

    let bez_res = trip.sim.mot.bezier.eval_with_curv(trip.sim.bez_t);
    // some curves have near-zero-velocity points which would explode the
    // parameter step; clamp to an arbitrary floor
    trip.sim.bez_speed = bez_res.vel.length().max(1.0);

    update_positions(&mut trip.sim, &bez_res, settings);

    false
}
