//! The per-node controller pass: tracking, yielding and priority ordering
//! of vehicles approaching or crossing an intersection.
//!
//! Tracked vehicles form a priority list. Each tick the pass admits nearby
//! vehicles, refreshes their signed arc positions (`front_k`/`rear_k`, zero
//! at the entry line), applies signal and exit-lane admission control,
//! brakes lower-priority vehicles out of conflicts with higher-priority
//! ones, and finally lets adjacent entries swap priority when a penalty
//! heuristic says the order is unfair.

use crate::agents::vehicle::brake_for_dist;
use crate::conflicts::conflicts::{
    query_conflict, CachedConnection, Conflict, ConflictKey,
};
use crate::geom::{lerp, map};
use crate::navigation::MotionKind;
use crate::network::{classify_turn, Connection, Network, NodeId, Turns};
use crate::simulation::settings::{SimSettings, SAFETY_DIST};
use crate::traffic_lights::{lane_signal, Signal};
use crate::trips::{TripId, VehicleTrip};
use indexmap::IndexMap;
use std::collections::HashMap;

/// A vehicle tracked by a node: within admission range of the entry line,
/// crossing, or not yet fully clear of the exit.
#[derive(Debug, Clone, Copy)]
pub struct NodeAgent {
    pub trip: TripId,
    pub conn: CachedConnection,
    /// Signed arc position of the vehicle front: negative approaching the
    /// entry line, `0..conn.length` inside, beyond that past the exit line.
    pub front_k: f32,
    pub rear_k: f32,
    pub blocked: bool,
    pub wait_time: f32,
}

impl NodeAgent {
    pub fn new(net: &Network, trip: TripId, conn: Connection) -> Self {
        NodeAgent {
            trip,
            conn: CachedConnection::new(net, conn),
            front_k: 0.0,
            rear_k: 0.0,
            blocked: false,
            wait_time: 0.0,
        }
    }
}

/// Tracked-vehicle list (in priority order) plus the node's conflict cache.
/// The cache is append-only within a tick and cleared in bulk when the
/// node's geometry changes.
#[derive(Debug, Default)]
pub struct NodeAgents {
    pub tracked: Vec<NodeAgent>,
    pub conflict_cache: IndexMap<ConflictKey, Conflict>,
}

impl NodeAgents {
    pub fn contains(&self, trip: TripId) -> bool {
        self.tracked.iter().any(|a| a.trip == trip)
    }

    pub fn try_remove(&mut self, trip: TripId) {
        self.tracked.retain(|a| a.trip != trip);
    }
}

/// Per-tick scratch per tracked vehicle, captured once so the yield and
/// swap passes see one consistent snapshot.
#[derive(Debug, Clone, Copy)]
struct AgentScratch {
    /// Whether the vehicle's current motion still targets this node.
    on_node: bool,
    /// Whether the vehicle is still on its incoming lane.
    incoming: bool,
    speed: f32,
    length: f32,
}

/// Runs the full node pass.
pub fn update_node(
    net: &mut Network,
    trips: &mut HashMap<TripId, VehicleTrip>,
    settings: &SimSettings,
    nid: NodeId,
    dt: f32,
) {
    if let Some(light) = net.node_mut(nid).traffic_light.as_mut() {
        light.update(dt);
    }

    // Take the tracker out of the node so the graph and the trip map stay
    // freely borrowable while we work on it.
    let mut agents = std::mem::take(&mut net.node_mut(nid).agents);

    // entries can go stale when a trip ends or repaths away from this node
    agents.tracked.retain(|a| trips.contains_key(&a.trip));

    admit_vehicles(net, trips, settings, nid, &mut agents);
    let mut scratch = update_tracked(net, trips, settings, nid, &mut agents, dt);
    resolve_conflicts(net, trips, settings, &mut agents, &mut scratch);
    priority_swap_pass(net, settings, nid, &mut agents, &mut scratch, dt);

    // evict everything fully past the exit line; dangling entries go too
    agents.tracked.retain(|a| match trips.get(&a.trip) {
        Some(t) => a.front_k - a.conn.length <= t.sim.length,
        None => false,
    });

    net.node_mut(nid).agents = agents;
}

/// Admits vehicles on the incoming lanes that are within admission range of
/// the entry line (or leading their lane) and whose motion targets this
/// node.
fn admit_vehicles(
    net: &Network,
    trips: &HashMap<TripId, VehicleTrip>,
    settings: &SimSettings,
    nid: NodeId,
    agents: &mut NodeAgents,
) {
    let seg_ids = net.node(nid).segments.clone();
    for sid in seg_ids {
        for in_lane in net.node(nid).in_lanes_of(sid) {
            let list = &in_lane.vehicles(net).list;
            for (pos, &tid) in list.iter().enumerate() {
                if agents.contains(tid) {
                    continue;
                }
                let sim = &trips.get(&tid).expect("lane lists hold live trips").sim;
                let dist = (1.0 - sim.bez_t) * sim.bez_speed;
                if dist < settings.node_admission_range || pos == 0 {
                    if sim.mot.cur_node(net) == Some(nid) {
                        let conn = Connection {
                            a: sim.mot.cur_lane.expect("segment motion carries its lane"),
                            b: sim.mot.next_lane.expect("tracked vehicle has a chosen exit"),
                        };
                        agents.tracked.push(NodeAgent::new(net, tid, conn));
                    }
                } else {
                    break;
                }
            }
        }
    }
}

/// Refreshes `front_k`/`rear_k`, resets per-tick flags and applies signal
/// gating and exit-lane admission in priority order.
fn update_tracked(
    net: &mut Network,
    trips: &mut HashMap<TripId, VehicleTrip>,
    settings: &SimSettings,
    nid: NodeId,
    agents: &mut NodeAgents,
    dt: f32,
) -> Vec<AgentScratch> {
    let mut scratch = Vec::with_capacity(agents.tracked.len());

    for a in agents.tracked.iter_mut() {
        let sim = &trips.get(&a.trip).expect("tracked trips are live").sim;
        let on_node = sim.mot.cur_node(net) == Some(nid);
        let incoming = sim.mot.kind == MotionKind::Segment;

        if on_node {
            if incoming {
                // extrapolate distance to the entry line as negative k
                a.front_k = (sim.bez_t - 1.0) * sim.bez_speed;
            } else {
                // linear parameter mapping; knowingly inexact near apices
                a.front_k = sim.bez_t * a.conn.length;
            }
        } else {
            // already on the outgoing lane
            a.front_k = sim.bez_t * sim.bez_speed + a.conn.length;
        }
        a.rear_k = a.front_k - sim.length;
        a.blocked = false;
        a.wait_time += dt;

        scratch.push(AgentScratch {
            on_node,
            incoming,
            speed: sim.speed,
            length: sim.length,
        });
    }

    for i in 0..agents.tracked.len() {
        let s = scratch[i];
        if !s.on_node {
            // outgoing-lane space is accounted by the segment pass
            continue;
        }
        let (tid, front_k, in_lane, out_lane) = {
            let a = &agents.tracked[i];
            (a.trip, a.front_k, a.conn.conn.a, a.conn.conn.b)
        };

        let mut blocked = false;
        if s.incoming {
            if lane_signal(net, nid, in_lane) == Some(Signal::Red) {
                let sim = &mut trips.get_mut(&tid).expect("tracked trips are live").sim;
                brake_for_dist(sim, -front_k, settings.brake_ramp_dist);
                blocked = true;
            }
        }

        let can_alloc = out_lane.vehicles(net).avail_space >= s.length;
        if !s.incoming || (can_alloc && !blocked) {
            // vehicles already inside reserve even when space ran out
            out_lane.vehicles_mut(net).avail_space -= s.length + SAFETY_DIST * 1.25;
        } else {
            let sim = &mut trips.get_mut(&tid).expect("tracked trips are live").sim;
            brake_for_dist(sim, -front_k, settings.brake_ramp_dist);
            blocked = true;
        }
        agents.tracked[i].blocked = blocked;
    }

    scratch
}

/// Brakes each tracked vehicle out of conflicts with every higher-priority
/// vehicle, and for the tail vehicle of its destination lane.
fn resolve_conflicts(
    net: &Network,
    trips: &mut HashMap<TripId, VehicleTrip>,
    settings: &SimSettings,
    agents: &mut NodeAgents,
    scratch: &mut [AgentScratch],
) {
    let count = agents.tracked.len();
    let NodeAgents {
        tracked,
        conflict_cache,
    } = agents;

    for i in 0..count {
        if !scratch[i].on_node {
            // yielding while already on the outgoing lane causes phantom
            // braking against vehicles long gone
            continue;
        }

        for j in 0..i {
            let a = tracked[i];
            let b = tracked[j];

            // Same-lane failsafe: when node order contradicts lane order the
            // pair deadlocks; swap priorities and let the segment follower
            // logic handle the gap.
            if scratch[i].incoming
                && scratch[j].incoming
                && scratch[j].on_node
                && a.conn.conn.a == b.conn.conn.a
            {
                let list = &a.conn.conn.a.vehicles(net).list;
                let a_idx = list.iter().position(|&t| t == a.trip);
                let b_idx = list.iter().position(|&t| t == b.trip);
                if let (Some(ai), Some(bi)) = (a_idx, b_idx) {
                    if ai < bi {
                        tracked.swap(i, j);
                        scratch.swap(i, j);
                        continue;
                    }
                }
            }

            let conf = query_conflict(conflict_cache, &a.conn, &b.conn);
            if !conf.exists() {
                continue;
            }

            let a_k0 = conf.a_t0 * a.conn.length;
            let a_k1 = conf.a_t1 * a.conn.length;
            let b_k0 = conf.b_t0 * b.conn.length;
            let b_k1 = conf.b_t1 * b.conn.length;

            let a_exited = a.rear_k >= a_k1;
            let b_exited = b.rear_k >= b_k1;
            let b_rear_entered = b.rear_k >= b_k0;

            let diverge = a.conn.conn.a == b.conn.conn.a;
            let merge = a.conn.conn.b == b.conn.conn.b;
            let same = merge && diverge;

            // an exited merge partner is followed via the destination-lane
            // check below instead
            if a_exited || b_exited {
                continue;
            }

            let stop_k = if same || diverge || (merge && b_rear_entered) {
                // follow: project b's rear from its window into a's
                lerp(a_k0, a_k1, map(b.rear_k, b_k0, b_k1)) - SAFETY_DIST
            } else {
                let a_eta = (a_k0 - a.front_k) / (scratch[i].speed + 1.0);
                let b_eta = (b_k0 - b.front_k) / (scratch[j].speed + 1.0);
                let behind_stop_line =
                    settings.heuristics.avoid_blocking_intersection && a.front_k < 0.5;
                // wait at the line when the yielded-for vehicle arrives much
                // later than us, or we are far out ourselves
                let need_wait = b_eta / a_eta > 3.0 || a_eta > 10.0;
                if behind_stop_line && need_wait {
                    -0.1
                } else {
                    a_k0 - SAFETY_DIST
                }
            };

            let dist = stop_k - a.front_k;
            brake_for_dist(
                &mut trips.get_mut(&a.trip).expect("tracked trips are live").sim,
                dist,
                settings.brake_ramp_dist,
            );

            // Chains behind a blocked car must read as blocked too, or the
            // intersection deadlocks; blocking every crossing path instead
            // would deadlock the other way.
            if b.blocked && (same || diverge) && !a_exited {
                tracked[i].blocked = true;
            }
        }

        // brake for the tail vehicle of the destination lane
        let a = tracked[i];
        if let Some(&last) = a.conn.conn.b.vehicles(net).list.last() {
            if last != a.trip {
                let (b_t, b_speed, b_len) = {
                    let s = &trips.get(&last).expect("lane lists hold live trips").sim;
                    (s.bez_t, s.bez_speed, s.length)
                };
                let a_front_rel = a.front_k - a.conn.length;
                let b_rear_k = b_t * b_speed - b_len;
                let dist = b_rear_k - a_front_rel - SAFETY_DIST;
                brake_for_dist(
                    &mut trips.get_mut(&a.trip).expect("tracked trips are live").sim,
                    dist,
                    settings.brake_ramp_dist,
                );
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    A,
    B,
}

/// Which of two conflicting vehicles counts as "left" for right-before-left
/// priority. Between perpendicular arms the arm position decides; between
/// opposing arms the left-turner yields to the straight.
fn left_vehicle(net: &Network, nid: NodeId, a: &NodeAgent, b: &NodeAgent) -> Option<Side> {
    let b_to_a = classify_turn(net, nid, a.conn.conn.a.seg, b.conn.conn.a.seg);
    if b_to_a == Turns::RIGHT {
        return Some(Side::A);
    }
    if b_to_a == Turns::LEFT {
        return Some(Side::B);
    }
    let a_turn = classify_turn(net, nid, a.conn.conn.a.seg, a.conn.conn.b.seg);
    let b_turn = classify_turn(net, nid, b.conn.conn.a.seg, b.conn.conn.b.seg);
    if a_turn == Turns::LEFT && b_turn != Turns::LEFT {
        return Some(Side::A);
    }
    if b_turn == Turns::LEFT && a_turn != Turns::LEFT {
        return Some(Side::B);
    }
    None
}

/// Single bubble pass: each adjacent pair may swap priority when it is safe
/// and the penalty heuristic favours it. Convergence to a fully ordered
/// list may take several ticks; adjacent swaps keep the order stable.
fn priority_swap_pass(
    net: &Network,
    settings: &SimSettings,
    nid: NodeId,
    agents: &mut NodeAgents,
    scratch: &mut [AgentScratch],
    dt: f32,
) {
    let count = agents.tracked.len();
    if count < 2 {
        return;
    }
    let NodeAgents {
        tracked,
        conflict_cache,
    } = agents;

    for idx in 1..count {
        let a = tracked[idx - 1];
        let b = tracked[idx];
        let swap = should_swap(
            net,
            conflict_cache,
            settings,
            nid,
            &a,
            &b,
            scratch[idx - 1].speed,
            scratch[idx].speed,
        );
        if swap && dt > 0.0 {
            tracked.swap(idx - 1, idx);
            scratch.swap(idx - 1, idx);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn should_swap(
    net: &Network,
    cache: &mut IndexMap<ConflictKey, Conflict>,
    settings: &SimSettings,
    nid: NodeId,
    a: &NodeAgent,
    b: &NodeAgent,
    a_speed: f32,
    b_speed: f32,
) -> bool {
    assert!(a.trip != b.trip, "duplicate tracked vehicle");

    let conf = query_conflict(cache, &a.conn, &b.conn);
    let mut swap_valid = true;
    let mut left = None;

    if conf.exists() {
        let a_k0 = conf.a_t0 * a.conn.length;
        let a_k1 = conf.a_t1 * a.conn.length;
        let b_k1 = conf.b_t1 * b.conn.length;

        let a_entered = a.front_k >= a_k0;
        let a_exited = a.rear_k >= a_k1;
        let b_exited = b.rear_k >= b_k1;
        let diverge = a.conn.conn.a == b.conn.conn.a;
        let merge = a.conn.conn.b == b.conn.conn.b;
        let same = merge && diverge;

        // After a swap a yields for b; if a already entered the window, b
        // would clip through a. A diverging pair cannot swap either, unless
        // one side already left the window.
        swap_valid = if a_exited || b_exited {
            true
        } else {
            !(a_entered || diverge)
        };

        let can_yield_rbl = !same && !diverge && !a_entered;
        let same_yield_level =
            a.conn.conn.a.lane_data(net).yields == b.conn.conn.a.lane_data(net).yields;
        if same_yield_level && can_yield_rbl {
            left = left_vehicle(net, nid, a, b);
        }
    }

    if !swap_valid {
        return false;
    }
    if a.blocked != b.blocked {
        // blocked sorts last, stable against the penalty noise
        return a.blocked;
    }

    let h = &settings.heuristics;
    let penalty = |v: &NodeAgent, speed: f32, is_left: bool, conf_t0: f32| -> f32 {
        let mut p = 0.0;
        if conf.exists() {
            let k0 = conf_t0 * v.conn.length;
            let conf_eta = (k0 - v.front_k) / (speed + 1.0);
            p += map(conf_eta, 1.0, 6.0).clamp(0.0, 1.0) * h.conflict_eta_penalty;
        }
        if is_left {
            p += h.right_before_left_penalty;
        }
        if v.conn.conn.a.lane_data(net).yields {
            p += h.yield_lane_penalty;
        }
        let exit_eta = (v.conn.length - v.front_k) / (speed + 1.0);
        p += map(exit_eta, 1.0, 6.0).clamp(0.0, 1.0) * h.exit_eta_penalty;
        // progress through the node eases vehicles out, without making
        // plain distance a penalty
        if v.front_k > 0.0 {
            p -= (v.front_k / v.conn.length) * h.progress_boost;
        }
        // unbounded wait priority, waiting cars eventually win
        p - v.wait_time * h.wait_boost
    };

    let a_penalty = penalty(a, a_speed, left == Some(Side::A), conf.a_t0);
    let b_penalty = penalty(b, b_speed, left == Some(Side::B), conf.b_t0);
    a_penalty - b_penalty > h.swap_threshold
}
