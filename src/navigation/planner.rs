//! The navigation planner: expands a routed segment path into the motion
//! sequence a vehicle follows, picking lanes as it goes.

use crate::entities::building::{Building, BuildingId};
use crate::entities::person::PersonId;
use crate::geom::Bezier;
use crate::navigation::end_curves::{
    endpoint_curve, find_parking_near, EndLane, NavEndCurve, NavEndpoint,
};
use crate::navigation::motion::{Motion, MotionKind};
use crate::network::{Network, SegLane, SegmentId};
use crate::shortest_path::{route, RouteEndpoint, RouteError};
use crate::simulation::settings::SimSettings;
use crate::trips::TripId;
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

/// Failure modes of a repath request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepathError {
    /// The current motion is terminal (END or final segment); the caller may
    /// retry next tick.
    Refused,
    /// No route exists toward the new destination; the old plan is kept.
    NoRoute,
}

impl fmt::Display for RepathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepathError::Refused => write!(f, "repath refused on terminal motion"),
            RepathError::NoRoute => write!(f, "no route to new destination"),
        }
    }
}

impl std::error::Error for RepathError {}

/// The planned path of one trip: the routed segments plus both endpoints.
/// Motions are produced on demand by [`step_motion`].
#[derive(Debug)]
pub struct VehNav {
    pub path: Vec<SegmentId>,
    pub start: NavEndpoint,
    pub dest: NavEndpoint,
}

impl VehNav {
    pub fn new(path: Vec<SegmentId>, start: NavEndpoint, dest: NavEndpoint) -> Self {
        VehNav { path, start, dest }
    }

    /// Total motion count: `START + n segments + (n-1) nodes + END`.
    pub fn num_motions(&self) -> i32 {
        let n = self.path.len() as i32;
        2 * n + 1
    }
}

/// Speed limit applied while on a start or end curve.
pub fn endpoint_speed(settings: &SimSettings) -> f32 {
    settings.endpoint_speed
}

/// Caps speed so lateral acceleration through a bend stays tolerable.
pub fn curvature_speed_limit(settings: &SimSettings, curv: f32) -> f32 {
    // a = v^2 * curv  =>  v = sqrt(a / curv)
    let max_speed = (settings.curve_max_accel / (curv + 0.001)).sqrt();
    max_speed.max(settings.min_curve_speed)
}

/// Speed limit for a node curve: the stricter of the adjacent segment
/// limits and the curvature cap, sampled at three points so S-curves slow
/// down as well.
pub fn curve_speed_limit(
    net: &Network,
    settings: &SimSettings,
    bez: &Bezier,
    cur_lane: SegLane,
    next_lane: SegLane,
) -> f32 {
    let seg_limit = cur_lane
        .speed_limit(net)
        .min(next_lane.speed_limit(net));

    let mut curv = bez.eval_with_curv(0.25).curv.abs();
    curv = curv.max(bez.eval_with_curv(0.5).curv.abs());
    curv = curv.max(bez.eval_with_curv(0.75).curv.abs());

    seg_limit.min(curvature_speed_limit(settings, curv))
}

fn pick_seed(trip_id: TripId, idx: i32) -> u64 {
    let mut hasher = DefaultHasher::new();
    (trip_id, idx).hash(&mut hasher);
    hasher.finish()
}

/// First connection of `cur_lane` that continues onto `next_seg`, if any.
fn pick_stay_in_lane(net: &Network, cur_lane: SegLane, next_seg: SegmentId) -> Option<SegLane> {
    cur_lane
        .lane_data(net)
        .connections
        .iter()
        .copied()
        .find(|conn| conn.seg == next_seg)
}

/// Random lane out of `avail` with a connection onto `target_seg`; falls
/// back to `default` when none qualifies.
fn pick_random_lane(
    net: &Network,
    rng: &mut StdRng,
    avail: &[SegLane],
    target_seg: SegmentId,
    default: SegLane,
) -> SegLane {
    let choices: Vec<SegLane> = avail
        .iter()
        .copied()
        .filter(|sl| {
            sl.lane_data(net)
                .connections
                .iter()
                .any(|conn| conn.seg == target_seg)
        })
        .collect();
    if choices.is_empty() {
        return default;
    }
    choices[rng.random_range(0..choices.len())]
}

/// In-lane of `prev_seg` that connects to `cur` exactly; otherwise the lane
/// whose connection onto `cur`'s segment has the nearest lane index.
fn follow_connection_backwards(
    net: &Network,
    prev_seg: SegmentId,
    cur: SegLane,
) -> Option<SegLane> {
    let node = net.between(prev_seg, cur.seg)?;
    let lanes = net.node(node).in_lanes_of(prev_seg);

    let mut best_lane = None;
    let mut best_diff = i32::MAX;
    for lane in lanes {
        for conn in &lane.lane_data(net).connections {
            if *conn == cur {
                return Some(lane);
            }
            if conn.seg == cur.seg {
                let diff = (conn.lane as i32 - cur.lane as i32).abs();
                if diff < best_diff {
                    best_lane = Some(lane);
                    best_diff = diff;
                }
            }
        }
    }
    best_lane
}

/// Picks the lane for path segment `seg_i`.
///
/// Forward scan: stay in the connected lane as long as it keeps connecting
/// toward the following segments; where it cannot, pick a random connecting
/// lane. Backward scan: from that forced switch, walk connections backwards
/// to predict which lane would avoid the late switch. With a small chance
/// the predicted lane wins, modelling an early lane change.
pub(crate) fn pick_lane(
    net: &Network,
    settings: &SimSettings,
    path: &[SegmentId],
    rng: &mut StdRng,
    seg_i: usize,
    prev_lane: Option<SegLane>,
) -> SegLane {
    let num_seg = path.len();
    assert!(seg_i < num_seg);

    let mut stay_lanes: Vec<SegLane> = Vec::new();
    let mut end_seg = seg_i;
    let mut prev = prev_lane;

    for i in seg_i..num_seg {
        end_seg = i;
        let cur_seg = path[i];
        let next_seg = path.get(i + 1).copied();

        let Some(next_seg) = next_seg else {
            // end of path, default to the outer outgoing lane
            let lane = match prev {
                Some(p) => {
                    let node = net
                        .between(p.seg, cur_seg)
                        .expect("consecutive path segments share a node");
                    *net.node(node)
                        .out_lanes_of(cur_seg)
                        .last()
                        .expect("path segment has outgoing lanes")
                }
                None => SegLane { seg: cur_seg, lane: 0 },
            };
            stay_lanes.push(lane);
            break;
        };

        let node = net
            .between(cur_seg, next_seg)
            .expect("consecutive path segments share a node");
        let cur_lanes = net.node(node).in_lanes_of(cur_seg);
        assert!(!cur_lanes.is_empty(), "path segment has no approach lanes");
        let outer = *cur_lanes.last().expect("non-empty");

        let lane = match prev {
            Some(p) => pick_stay_in_lane(net, p, cur_seg),
            None => Some(outer),
        };

        if let Some(lane) = lane {
            // does this lane also let us stay in lane for the next hop?
            if pick_stay_in_lane(net, lane, next_seg).is_some() {
                prev = Some(lane);
                stay_lanes.push(lane);
                continue;
            }
        }

        // forced switch: pick any lane connecting onward
        let lane = pick_random_lane(net, rng, &cur_lanes, next_seg, outer);
        stay_lanes.push(lane);
        break;
    }

    // walk backwards from the lane we were forced onto
    let mut predicted: Vec<Option<SegLane>> = vec![None; stay_lanes.len()];
    *predicted.last_mut().expect("non-empty") = stay_lanes.last().copied();

    for i in ((seg_i + 1)..=end_seg).rev() {
        let cur_lane = predicted[i - seg_i].expect("filled from the back");
        match follow_connection_backwards(net, path[i - 1], cur_lane) {
            Some(lane) => predicted[i - 1 - seg_i] = Some(lane),
            None => break,
        }
    }

    let stay_lane = stay_lanes[0];
    debug_assert_eq!(stay_lane.seg, path[seg_i]);

    if let Some(predicted_lane) = predicted[0] {
        if rng.random_bool(settings.lane_switch_chance as f64) {
            return predicted_lane;
        }
    }
    stay_lane
}

fn start_curve(
    net: &Network,
    buildings: &IndexMap<BuildingId, Building>,
    nav: &VehNav,
    lane: SegLane,
) -> NavEndCurve {
    endpoint_curve(net, buildings, &nav.start, EndLane { lane, leaving: false })
}

/// Destination curve; reserves a parking spot on first use (building lot
/// first, then street, else the trip finishes at the building front).
fn dest_curve(
    net: &mut Network,
    buildings: &mut IndexMap<BuildingId, Building>,
    nav: &mut VehNav,
    owner: PersonId,
    lane: SegLane,
) -> NavEndCurve {
    if nav.dest.parking.is_none() {
        if let Some(pref) = find_parking_near(net, buildings, nav.dest.building) {
            crate::entities::parking::resolve_mut(net, buildings, pref).reserve(owner);
            nav.dest.parking = Some(pref);
        }
    }
    endpoint_curve(net, buildings, &nav.dest, EndLane { lane, leaving: true })
}

/// Produces motion `idx` of the sequence. Lane selection is deterministic
/// for a given `(trip, idx)` pair so replanning and visualization agree.
pub fn step_motion(
    net: &mut Network,
    buildings: &mut IndexMap<BuildingId, Building>,
    settings: &SimSettings,
    nav: &mut VehNav,
    trip_id: TripId,
    owner: PersonId,
    idx: i32,
    prev: Option<&Motion>,
) -> Motion {
    let num_seg = nav.path.len() as i32;
    let num_moves = nav.num_motions();
    assert!(num_seg >= 1, "navigation requires a routed path");
    assert!(idx >= 0 && idx < num_moves, "motion index out of sequence");

    let mut rng = StdRng::seed_from_u64(pick_seed(trip_id, idx));
    let mut m = Motion {
        idx,
        ..Motion::default()
    };

    if idx == 0 {
        m.kind = MotionKind::Start;
        let lane = pick_lane(net, settings, &nav.path, &mut rng, 0, None);
        m.next_lane = Some(lane);

        let curve = start_curve(net, buildings, nav, lane);
        m.bezier = curve.bez;
        m.next_start_t = curve.lane_t;

        m.cur_speedlim = endpoint_speed(settings);
        m.next_speedlim = lane.speed_limit(net);
    } else if idx == num_moves - 1 {
        m.kind = MotionKind::End;
        let prev_lane = prev
            .and_then(|p| p.cur_lane)
            .expect("end curve follows a segment motion");

        m.bezier = dest_curve(net, buildings, nav, owner, prev_lane).bez;
        m.cur_speedlim = endpoint_speed(settings);
        // roll to a stop at the curve end
        m.next_speedlim = 1.0;
    } else {
        let i = ((idx - 1) / 2) as usize;
        if (idx - 1) % 2 == 0 {
            m.kind = MotionKind::Segment;
            let cur = prev
                .and_then(|p| p.next_lane)
                .expect("segment motion lane was chosen by the previous step");
            m.cur_lane = Some(cur);

            if idx + 1 == num_moves - 1 {
                // final segment: leave the lane where the end curve departs
                m.end_t = dest_curve(net, buildings, nav, owner, cur).lane_t;
            } else {
                let next = pick_lane(net, settings, &nav.path, &mut rng, i + 1, Some(cur));
                m.next_lane = Some(next);
            }

            m.bezier = cur.bezier(net);
            m.cur_speedlim = cur.speed_limit(net);
            m.next_speedlim = match m.next_lane {
                Some(next) => {
                    let curve = net.connection_curve(cur, next);
                    curve_speed_limit(net, settings, &curve, cur, next)
                }
                None => endpoint_speed(settings),
            };
        } else {
            m.kind = MotionKind::Node;
            let cur = prev
                .and_then(|p| p.cur_lane)
                .expect("node motion inherits the incoming lane");
            let next = prev
                .and_then(|p| p.next_lane)
                .expect("node motion inherits the outgoing lane");
            m.cur_lane = Some(cur);
            m.next_lane = Some(next);

            m.bezier = net.connection_curve(cur, next);
            m.cur_speedlim = curve_speed_limit(net, settings, &m.bezier, cur, next);
            m.next_speedlim = next.speed_limit(net);
        }
    }

    m
}

/// Replans toward a new destination while preserving continuity with the
/// vehicle's committed lane. Refused on terminal motions.
#[allow(clippy::too_many_arguments)]
pub fn repath(
    net: &mut Network,
    buildings: &mut IndexMap<BuildingId, Building>,
    settings: &SimSettings,
    nav: &mut VehNav,
    mot: &mut Motion,
    trip_id: TripId,
    owner: PersonId,
    new_dest: RouteEndpoint,
) -> Result<(), RepathError> {
    if mot.kind == MotionKind::End {
        return Err(RepathError::Refused);
    }

    let num_seg = nav.path.len();
    let i = ((mot.idx - 1) / 2).max(0) as usize;

    let mut prefix: Vec<SegmentId> = Vec::new();
    let path_start;
    let new_idx;
    let mut dummy = Motion::default();
    let use_dummy;

    if mot.kind == MotionKind::Start {
        assert!(mot.next_lane.is_some());
        assert!(num_seg >= 2);
        let node = net
            .between(nav.path[0], nav.path[1])
            .expect("path segments share a node");
        // keep the start curve direction: the first lane must flow the same
        // way, though a different lane of it may still get picked
        let forward = net.segment(nav.path[0]).node_b == node;
        path_start = RouteEndpoint::directed(nav.path[0], forward);
        new_idx = 0;
        use_dummy = false;
    } else {
        // no next segment means we are on the destination segment already
        if i + 1 >= num_seg {
            return Err(RepathError::Refused);
        }
        let node = net
            .between(nav.path[i], nav.path[i + 1])
            .expect("path segments share a node");
        let forward = net.segment(nav.path[i + 1]).node_a == node;
        prefix.push(nav.path[i]);
        path_start = RouteEndpoint::directed(nav.path[i + 1], forward);
        use_dummy = true;

        if mot.kind == MotionKind::Segment {
            // keeps the committed lane
            dummy.next_lane = mot.cur_lane;
            new_idx = 1;
        } else {
            debug_assert_eq!(mot.kind, MotionKind::Node);
            dummy.cur_lane = mot.cur_lane;
            dummy.next_lane = mot.next_lane;
            new_idx = 2;
        }
    }

    let routed = match route(net, path_start, new_dest) {
        Ok(p) => p,
        Err(RouteError::Unreachable { .. }) => return Err(RepathError::NoRoute),
    };

    prefix.extend(routed.into_segments());
    nav.path = prefix;
    *mot = step_motion(
        net,
        buildings,
        settings,
        nav,
        trip_id,
        owner,
        new_idx,
        if use_dummy { Some(&dummy) } else { None },
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{kmh, AssetRegistry, NetworkAsset};
    use crate::geom::Vec3;
    use crate::network::NodeId;

    fn corridor(n: usize, lanes: u16) -> (Network, Vec<SegmentId>) {
        let mut assets = AssetRegistry::new();
        let asset = assets.add_network_asset(
            NetworkAsset::new("road")
                .with_width(4.0 + 6.0 * lanes as f32)
                .with_two_way_lanes(lanes)
                .with_speed_limit(kmh(50.0))
                .build(),
        );
        let mut net = Network::new();
        let nodes: Vec<NodeId> = (0..=n)
            .map(|i| net.add_node(Vec3::new(i as f32 * 100.0, 0.0, 0.0)))
            .collect();
        let segs = (0..n)
            .map(|i| net.add_segment(&assets, asset, nodes[i], nodes[i + 1]).unwrap())
            .collect();
        (net, segs)
    }

    #[test]
    fn test_pick_lane_stays_in_lane_on_corridor() {
        let (net, segs) = corridor(4, 2);
        let settings = SimSettings::default();
        let mut rng = StdRng::seed_from_u64(1);

        let first = pick_lane(&net, &settings, &segs, &mut rng, 0, None);
        assert_eq!(first.seg, segs[0]);

        let second = pick_lane(&net, &settings, &segs, &mut rng, 1, Some(first));
        assert_eq!(second.seg, segs[1]);
        // on a straight corridor the connected continuation keeps the lane
        assert!(
            pick_stay_in_lane(&net, first, segs[1]).is_some(),
            "corridor lanes must connect straight through"
        );
    }

    #[test]
    fn test_pick_lane_deterministic_per_seed() {
        let (net, segs) = corridor(4, 2);
        let settings = SimSettings::default();
        let a = pick_lane(
            &net,
            &settings,
            &segs,
            &mut StdRng::seed_from_u64(pick_seed(7, 3)),
            0,
            None,
        );
        let b = pick_lane(
            &net,
            &settings,
            &segs,
            &mut StdRng::seed_from_u64(pick_seed(7, 3)),
            0,
            None,
        );
        assert_eq!(a, b, "same (trip, idx) seed must pick the same lane");
    }

    #[test]
    fn test_curvature_speed_limit_bounds() {
        let settings = SimSettings::default();
        let tight = curvature_speed_limit(&settings, 1.0);
        let gentle = curvature_speed_limit(&settings, 0.01);
        assert!(
            tight < gentle,
            "tighter curvature must cap speed harder ({} vs {})",
            tight,
            gentle
        );
        assert!(
            tight >= settings.min_curve_speed,
            "cap never drops below the minimum curve speed"
        );
    }
}
