//! Intersections: cached geometry, lane sets and default connectivity.

use crate::conflicts::NodeAgents;
use crate::geom::{line_line_intersect, Vec2, Vec3};
use crate::network::graph::Network;
use crate::network::segment::{SegLane, SegmentId};
use crate::network::turns::{classify_turn, Turns};
use crate::traffic_lights::TrafficLight;
use std::fmt;

/// Stable identifier of a node in the network arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node:{}", self.0)
    }
}

/// An intersection (or dead end, with one incident segment).
#[derive(Debug)]
pub struct Node {
    pub pos: Vec3,
    /// Distance from the center to the farthest shifted segment endpoint.
    pub radius: f32,
    /// Incident segments, sorted CCW by outgoing bearing. Slot indices into
    /// this list (and the derived lane sets) are stable within a tick.
    pub segments: Vec<SegmentId>,
    /// Lanes flowing into this node, grouped by `segments` order.
    pub in_lanes: Vec<SegLane>,
    /// Lanes flowing out of this node, grouped by `segments` order.
    pub out_lanes: Vec<SegLane>,
    pub traffic_light: Option<TrafficLight>,
    /// Tracked-vehicle state and the conflict cache.
    pub agents: NodeAgents,
}

impl Node {
    pub fn new(pos: Vec3) -> Self {
        Node {
            pos,
            radius: 1.0,
            segments: Vec::new(),
            in_lanes: Vec::new(),
            out_lanes: Vec::new(),
            traffic_light: None,
            agents: NodeAgents::default(),
        }
    }

    /// In-lanes belonging to one incident segment, in the asset's
    /// inner-to-outer order.
    pub fn in_lanes_of(&self, seg: SegmentId) -> Vec<SegLane> {
        self.in_lanes.iter().copied().filter(|sl| sl.seg == seg).collect()
    }

    pub fn out_lanes_of(&self, seg: SegmentId) -> Vec<SegLane> {
        self.out_lanes.iter().copied().filter(|sl| sl.seg == seg).collect()
    }

    /// Stable signal-slot index of an in-lane, if it belongs to this node.
    pub fn signal_slot(&self, lane: SegLane) -> Option<u8> {
        self.in_lanes
            .iter()
            .position(|&sl| sl == lane)
            .map(|idx| idx as u8)
    }
}

impl Network {
    /// Rebuilds a node's cached geometry: segment order, shifted segment
    /// endpoints, radius and the in/out lane sets. Invalidates the conflict
    /// cache.
    pub(crate) fn refresh_node(&mut self, nid: NodeId) {
        self.sort_node_segments(nid);
        self.place_segment_endpoints(nid);

        let node_pos = self.node(nid).pos;
        let seg_ids = self.node(nid).segments.clone();

        let mut radius = 1.0f32;
        let mut in_lanes = Vec::new();
        let mut out_lanes = Vec::new();
        for &sid in &seg_ids {
            let seg = self.segment(sid);
            let end_pos = if seg.node_a == nid { seg.pos_a } else { seg.pos_b };
            radius = radius.max(node_pos.distance_to(end_pos));

            let seg_points_away = seg.node_a == nid;
            for (i, lane) in seg.lanes.iter().enumerate() {
                let sl = SegLane { seg: sid, lane: i as u16 };
                let flows_out = lane.dir.is_forward() == seg_points_away;
                if flows_out {
                    out_lanes.push(sl);
                } else {
                    in_lanes.push(sl);
                }
            }
        }

        let node = self.node_mut(nid);
        node.radius = radius;
        node.in_lanes = in_lanes;
        node.out_lanes = out_lanes;
        node.agents.conflict_cache.clear();
    }

    fn sort_node_segments(&mut self, nid: NodeId) {
        let node_pos = self.node(nid).pos.xy();
        let mut segs = self.node(nid).segments.clone();
        let bearing = |net: &Network, sid: SegmentId| -> f32 {
            let seg = net.segment(sid);
            let other = seg.other_node(nid);
            (net.node(other).pos.xy() - node_pos).angle()
        };
        segs.sort_by(|&l, &r| {
            bearing(self, l)
                .partial_cmp(&bearing(self, r))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        self.node_mut(nid).segments = segs;
    }

    /// Moves each incident segment's endpoint away from the node center to
    /// where its road edges stop overlapping the neighbouring segments'
    /// edges.
    fn place_segment_endpoints(&mut self, nid: NodeId) {
        let node_pos = self.node(nid).pos;
        let seg_ids = self.node(nid).segments.clone();
        let count = seg_ids.len();
        if count == 0 {
            return;
        }

        struct EdgeRays {
            dir: Vec2,
            pos_l: Vec2,
            pos_r: Vec2,
        }
        let rays: Vec<EdgeRays> = seg_ids
            .iter()
            .map(|&sid| {
                let seg = self.segment(sid);
                let other = seg.other_node(nid);
                let dir = (self.node(other).pos.xy() - node_pos.xy()).normalize_safe();
                let right = dir.right();
                let half = seg.width * 0.5;
                EdgeRays {
                    dir,
                    pos_l: right * -half,
                    pos_r: right * half,
                }
            })
            .collect();

        for i in 0..count {
            let l = &rays[(i + count - 1) % count];
            let s = &rays[i];
            let r = &rays[(i + 1) % count];

            let mut dist = 1.0f32;
            if let Some(p) = line_line_intersect(s.pos_l, s.dir, l.pos_r, l.dir) {
                dist = dist.max(p.dot(s.dir));
            }
            if let Some(p) = line_line_intersect(s.pos_r, s.dir, r.pos_l, r.dir) {
                dist = dist.max(p.dot(s.dir));
            }

            let end = Vec3::from_xy(node_pos.xy() + s.dir * dist, node_pos.z);
            let sid = seg_ids[i];
            let seg = self.segment_mut(sid);
            if seg.node_a == nid {
                seg.pos_a = end;
            } else {
                seg.pos_b = end;
            }
        }
    }

    /// Regenerates default per-lane turn flags for all lanes entering `nid`:
    /// a single lane allows every turn, two lanes split into inner
    /// left+straight and outer straight+right, more lanes allow everything.
    pub(crate) fn assign_default_turns(&mut self, nid: NodeId) {
        let seg_ids = self.node(nid).segments.clone();
        for sid in seg_ids {
            let lanes = self.node(nid).in_lanes_of(sid);
            let count = lanes.len();
            for (idx, sl) in lanes.into_iter().enumerate() {
                let turns = match count {
                    1 => Turns::ALL,
                    2 => {
                        if idx == 0 {
                            Turns::LS
                        } else {
                            Turns::SR
                        }
                    }
                    _ => Turns::ALL,
                };
                sl.lane_data_mut(self).allowed_turns = turns;
            }
        }
    }

    /// Regenerates default lane connections at `nid`: straights matched
    /// outer-to-outer, right turns handed to the outermost lanes, left turns
    /// to the innermost. A lane that already carries another turn only picks
    /// up lefts when the node is unsignalized; mixed rights are always
    /// allowed. Also derives yield flags from road class.
    pub(crate) fn assign_default_connections(&mut self, nid: NodeId) {
        let seg_ids = self.node(nid).segments.clone();
        let allow_mixed_lefts = self.node(nid).traffic_light.is_none();

        let node_class = seg_ids
            .iter()
            .map(|&sid| self.segment(sid).road_class)
            .max()
            .unwrap_or(0);

        // reset before reassignment
        for &sid in &seg_ids {
            for sl in self.node(nid).in_lanes_of(sid) {
                sl.lane_data_mut(self).connections.clear();
            }
        }

        for &sid in &seg_ids {
            let in_lanes = self.node(nid).in_lanes_of(sid);
            if in_lanes.is_empty() {
                continue;
            }
            let avail = in_lanes.len();

            let mut out_left = Vec::new();
            let mut out_straight = Vec::new();
            let mut out_right = Vec::new();
            for &out_sid in &seg_ids {
                let turn = classify_turn(self, nid, sid, out_sid);
                let lanes = self.node(nid).out_lanes_of(out_sid);
                if turn == Turns::LEFT {
                    out_left.extend(lanes);
                } else if turn == Turns::STRAIGHT {
                    out_straight.extend(lanes);
                } else {
                    out_right.extend(lanes);
                }
            }

            let outer = |i: usize| in_lanes[avail - 1 - i];
            let inner = |i: usize| in_lanes[i];

            let req_s = out_straight.len();
            for i in 0..req_s.min(avail) {
                let sl = outer(i);
                sl.lane_data_mut(self).connections.push(out_straight[req_s - 1 - i]);
            }

            let req_r = out_right.len();
            for i in 0..req_r.min(avail) {
                let sl = outer(i);
                let mixed = !sl.lane_data(self).connections.is_empty();
                sl.lane_data_mut(self).connections.push(out_right[req_r - 1 - i]);
                if mixed {
                    break;
                }
            }

            let req_l = out_left.len();
            for i in 0..req_l.min(avail) {
                let sl = inner(i);
                let mixed = !sl.lane_data(self).connections.is_empty();
                if !mixed || allow_mixed_lefts {
                    sl.lane_data_mut(self).connections.push(out_left[i]);
                }
                if mixed {
                    break;
                }
            }

            let seg_class = self.segment(sid).road_class;
            let yields = seg_class < node_class;
            for &sl in &in_lanes {
                sl.lane_data_mut(self).yields = yields;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetRegistry, NetworkAsset};

    #[test]
    fn test_cross_node_caches() {
        let mut assets = AssetRegistry::new();
        let asset = assets.add_network_asset(
            NetworkAsset::new("road").with_width(8.0).with_two_way_lanes(1).build(),
        );
        let mut net = Network::new();
        let c = net.add_node(Vec3::ZERO);
        for (x, y) in [(100.0, 0.0), (0.0, 100.0), (-100.0, 0.0), (0.0, -100.0)] {
            let n = net.add_node(Vec3::new(x, y, 0.0));
            net.add_segment(&assets, asset, c, n).unwrap();
        }

        let node = net.node(c);
        assert_eq!(node.segments.len(), 4);
        assert_eq!(node.in_lanes.len(), 4, "one in-lane per arm");
        assert_eq!(node.out_lanes.len(), 4, "one out-lane per arm");
        assert!(
            node.radius >= 4.0,
            "radius must clear the crossing road half width, got {}",
            node.radius
        );

        // CCW order by bearing: east (0), north (pi/2), west (pi), south (-pi/2 sorts first)
        let bearings: Vec<f32> = node
            .segments
            .iter()
            .map(|&sid| {
                let seg = net.segment(sid);
                let other = seg.other_node(c);
                (net.node(other).pos.xy() - node.pos.xy()).angle()
            })
            .collect();
        for pair in bearings.windows(2) {
            assert!(pair[0] <= pair[1], "segments must be sorted by bearing");
        }
    }

    #[test]
    fn test_default_turns_two_lanes() {
        let mut assets = AssetRegistry::new();
        let asset = assets.add_network_asset(
            NetworkAsset::new("road4").with_width(14.0).with_two_way_lanes(2).build(),
        );
        let mut net = Network::new();
        let c = net.add_node(Vec3::ZERO);
        for (x, y) in [(100.0, 0.0), (0.0, 100.0), (-100.0, 0.0), (0.0, -100.0)] {
            let n = net.add_node(Vec3::new(x, y, 0.0));
            net.add_segment(&assets, asset, c, n).unwrap();
        }

        let seg = net.node(c).segments[0];
        let lanes = net.node(c).in_lanes_of(seg);
        assert_eq!(lanes.len(), 2);
        assert_eq!(
            lanes[0].lane_data(&net).allowed_turns,
            Turns::LS,
            "inner lane of a two-lane approach defaults to left+straight"
        );
        assert_eq!(
            lanes[1].lane_data(&net).allowed_turns,
            Turns::SR,
            "outer lane of a two-lane approach defaults to straight+right"
        );
    }

    #[test]
    fn test_default_connections_cover_straight_and_right() {
        let mut assets = AssetRegistry::new();
        let asset = assets.add_network_asset(
            NetworkAsset::new("road").with_width(8.0).with_two_way_lanes(1).build(),
        );
        let mut net = Network::new();
        let c = net.add_node(Vec3::ZERO);
        let mut segs = Vec::new();
        for (x, y) in [(100.0, 0.0), (0.0, 100.0), (-100.0, 0.0), (0.0, -100.0)] {
            let n = net.add_node(Vec3::new(x, y, 0.0));
            segs.push(net.add_segment(&assets, asset, c, n).unwrap());
        }

        // arriving via the east arm: west is straight, south is the right turn
        assert_eq!(classify_turn(&net, c, segs[0], segs[2]), Turns::STRAIGHT);
        assert_eq!(classify_turn(&net, c, segs[0], segs[3]), Turns::RIGHT);

        let in_lane = net.node(c).in_lanes_of(segs[0])[0];
        let conns = &in_lane.lane_data(&net).connections;
        assert!(
            conns.iter().any(|sl| sl.seg == segs[2]),
            "approach lane must connect to the straight arm"
        );
        assert!(
            conns.iter().any(|sl| sl.seg == segs[3]),
            "approach lane must connect to the right-turn arm"
        );
    }

    #[test]
    fn test_default_connections_turn_sides() {
        // two lanes per approach: right turns wire to the outermost lane,
        // left turns to the innermost, straights to both
        let mut assets = AssetRegistry::new();
        let asset = assets.add_network_asset(
            NetworkAsset::new("road4").with_width(14.0).with_two_way_lanes(2).build(),
        );
        let mut net = Network::new();
        let c = net.add_node(Vec3::ZERO);
        let mut segs = Vec::new();
        for (x, y) in [(100.0, 0.0), (0.0, 100.0), (-100.0, 0.0), (0.0, -100.0)] {
            let n = net.add_node(Vec3::new(x, y, 0.0));
            segs.push(net.add_segment(&assets, asset, c, n).unwrap());
        }

        let east = segs[0];
        let in_lanes = net.node(c).in_lanes_of(east);
        assert_eq!(in_lanes.len(), 2);
        let (inner, outer) = (in_lanes[0], in_lanes[1]);

        let turns_of = |lane: SegLane| -> Vec<Turns> {
            lane.lane_data(&net)
                .connections
                .iter()
                .map(|conn| classify_turn(&net, c, east, conn.seg))
                .collect()
        };

        let outer_turns = turns_of(outer);
        assert!(
            outer_turns.iter().all(|&t| t != Turns::LEFT),
            "outer lane must not carry left turns, got {:?}",
            outer_turns
        );
        assert!(
            outer_turns.contains(&Turns::RIGHT),
            "outer lane carries the right turn, got {:?}",
            outer_turns
        );
        assert!(outer_turns.contains(&Turns::STRAIGHT));

        let inner_turns = turns_of(inner);
        assert!(
            inner_turns.iter().all(|&t| t != Turns::RIGHT),
            "inner lane must not carry right turns, got {:?}",
            inner_turns
        );
        assert!(
            inner_turns.contains(&Turns::LEFT),
            "inner lane carries a left turn, got {:?}",
            inner_turns
        );
        assert!(inner_turns.contains(&Turns::STRAIGHT));
    }
}
