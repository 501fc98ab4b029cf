//! Tunable simulation parameters.

use crate::assets::kmh;
use crate::traffic_lights::{DEFAULT_ALL_RED, DEFAULT_GREEN, DEFAULT_YELLOW, TrafficLightMode};

/// Minimum longitudinal clearance kept between vehicles, in metres.
pub const SAFETY_DIST: f32 = 1.0;

/// Weights of the intersection priority-swap heuristic. Penalties rank a
/// vehicle later; boosts rank it earlier.
#[derive(Debug, Clone)]
pub struct IntersectionHeuristics {
    /// Scaled by how far the vehicle is (in time) from its conflict window.
    pub conflict_eta_penalty: f32,
    /// Flat penalty for the vehicle on the left at equal-priority approaches.
    pub right_before_left_penalty: f32,
    /// Flat penalty for arriving from a yield-marked lane.
    pub yield_lane_penalty: f32,
    /// Scaled by time to clear the intersection.
    pub exit_eta_penalty: f32,
    /// Bonus proportional to progress past the entry line.
    pub progress_boost: f32,
    /// Bonus per second of waiting; unbounded, so nobody starves.
    pub wait_boost: f32,
    /// Minimum penalty difference before an adjacent swap happens.
    pub swap_threshold: f32,
    /// Hold vehicles at the stop line instead of inside the box when the
    /// wait will be long.
    pub avoid_blocking_intersection: bool,
}

impl Default for IntersectionHeuristics {
    fn default() -> Self {
        IntersectionHeuristics {
            conflict_eta_penalty: 4.0,
            right_before_left_penalty: 10.0,
            yield_lane_penalty: 15.0,
            exit_eta_penalty: 2.0,
            progress_boost: 20.0,
            wait_boost: 0.5,
            swap_threshold: 2.0,
            avoid_blocking_intersection: true,
        }
    }
}

/// All tunables of the simulation core.
#[derive(Debug, Clone)]
pub struct SimSettings {
    /// Base acceleration, m/s^2.
    pub car_accel: f32,
    /// Base braking deceleration, m/s^2.
    pub car_decel: f32,
    /// Quadratic drag coefficient; 0.0014 tops out around 220 km/h.
    pub drag_factor: f32,
    /// How far (as a fraction of vehicle length) the rear-axle reference
    /// leads the old rear; tames rear swing in the trailer model.
    pub rear_drag_ratio: f32,
    /// Chance to take the backward-predicted lane early instead of staying
    /// in lane until the forced switch.
    pub lane_switch_chance: f32,
    /// Seconds a person stays in a building after finishing a trip.
    pub stay_time: f32,
    /// Speed limit on start and end curves.
    pub endpoint_speed: f32,
    /// Maximum tolerated lateral acceleration for curve speed caps, m/s^2.
    pub curve_max_accel: f32,
    /// Floor for curvature-derived speed caps.
    pub min_curve_speed: f32,
    /// Distance from the entry line at which a node starts tracking a
    /// vehicle, metres.
    pub node_admission_range: f32,
    /// Distance over which the brake factor ramps from 0 to 1, metres.
    pub brake_ramp_dist: f32,
    pub heuristics: IntersectionHeuristics,
    pub light_mode: TrafficLightMode,
    pub light_green: f32,
    pub light_yellow: f32,
    pub light_all_red: f32,
}

impl Default for SimSettings {
    fn default() -> Self {
        SimSettings {
            car_accel: 5.0,
            car_decel: 10.0,
            drag_factor: 0.0014,
            rear_drag_ratio: 0.4,
            lane_switch_chance: 0.15,
            stay_time: 20.0,
            endpoint_speed: kmh(20.0),
            curve_max_accel: 6.0,
            min_curve_speed: kmh(5.0),
            node_admission_range: 10.0,
            brake_ramp_dist: 8.0,
            heuristics: IntersectionHeuristics::default(),
            light_mode: TrafficLightMode::default(),
            light_green: DEFAULT_GREEN,
            light_yellow: DEFAULT_YELLOW,
            light_all_red: DEFAULT_ALL_RED,
        }
    }
}
