//! Segments, lanes and the per-lane vehicle tracker.

use crate::assets::LaneDir;
use crate::entities::parking::ParkingSpot;
use crate::geom::{Bezier, Vec2, Vec3};
use crate::network::graph::Network;
use crate::network::turns::Turns;
use crate::network::NodeId;
use crate::trips::{TripId, VehicleTrip};
use std::collections::HashMap;
use std::fmt;

/// Stable identifier of a segment in the network arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(pub u32);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seg:{}", self.0)
    }
}

/// A stable `(segment, lane index)` reference; equality is structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegLane {
    pub seg: SegmentId,
    pub lane: u16,
}

impl fmt::Display for SegLane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.seg, self.lane)
    }
}

/// An ordered pair of lanes describing a legal traversal of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Connection {
    pub a: SegLane,
    pub b: SegLane,
}

/// Ordered vehicle list of one lane plus the admission-space accounting.
///
/// `list` is kept sorted from nearest-to-exit (highest `bez_t`) to
/// farthest-from-exit; membership means the trip's current motion runs on
/// this lane.
#[derive(Debug, Default)]
pub struct LaneVehicles {
    pub list: Vec<TripId>,
    /// Signed arc length still available for admitting vehicles, recomputed
    /// each tick by the segment pass.
    pub avail_space: f32,
}

/// Result of locating a gap in a lane at a given curve parameter.
#[derive(Debug, Default)]
pub struct LaneSpot {
    /// Vehicle ahead of the probed position, if any.
    pub leading: Option<TripId>,
    /// First vehicle behind the probed position, if any.
    pub trailing: Option<TripId>,
    /// List index where a vehicle at the probed position belongs.
    pub idx: usize,
}

impl LaneVehicles {
    /// Finds the insert position for a vehicle at `bez_t`, together with its
    /// would-be neighbours.
    pub fn find_lane_spot(&self, trips: &HashMap<TripId, VehicleTrip>, bez_t: f32) -> LaneSpot {
        let mut res = LaneSpot::default();
        let mut i = 0;
        while i < self.list.len() {
            let tid = self.list[i];
            let sim = &trips.get(&tid).expect("lane list holds live trip").sim;
            let rear_t = sim.bez_t - sim.length / sim.bez_speed;
            if rear_t <= bez_t {
                res.trailing = Some(tid);
                break;
            }
            res.leading = Some(tid);
            i += 1;
        }
        res.idx = i;
        res
    }

    pub fn insert_at_spot(&mut self, trips: &HashMap<TripId, VehicleTrip>, tid: TripId, bez_t: f32) {
        debug_assert!(!self.list.contains(&tid), "vehicle already in lane list");
        let spot = self.find_lane_spot(trips, bez_t);
        self.list.insert(spot.idx, tid);
    }

    pub fn remove(&mut self, tid: TripId) {
        let idx = self
            .list
            .iter()
            .position(|&t| t == tid)
            .expect("vehicle not in lane list");
        self.list.remove(idx);
    }

    pub fn try_remove(&mut self, tid: TripId) {
        if let Some(idx) = self.list.iter().position(|&t| t == tid) {
            self.list.remove(idx);
        }
    }
}

/// Per-segment lane state: cached layout, turn flags and connectivity.
#[derive(Debug, Default)]
pub struct Lane {
    pub dir: LaneDir,
    pub shift: f32,
    pub allowed_turns: Turns,
    /// Whether traffic on this lane must yield at its far node.
    pub yields: bool,
    /// Outgoing connections at the node this lane flows into.
    pub connections: Vec<SegLane>,
    pub vehicles: LaneVehicles,
}

/// A stretch of road between exactly two distinct nodes, oriented `a -> b`.
///
/// Road-layout fields are cached from the asset when geometry is rebuilt so
/// the hot simulation path never consults the registry.
#[derive(Debug)]
pub struct Segment {
    pub asset: crate::assets::NetworkAssetId,
    pub node_a: NodeId,
    pub node_b: NodeId,
    /// Endpoint positions shifted inward from the node centers.
    pub pos_a: Vec3,
    pub pos_b: Vec3,
    /// Drivable length between the shifted endpoints.
    pub length: f32,
    pub speed_limit: f32,
    pub width: f32,
    pub sidewalk_l: f32,
    pub sidewalk_r: f32,
    pub road_class: i32,
    pub lanes: Vec<Lane>,
    /// Street parking along this segment.
    pub parking: Vec<ParkingSpot>,
}

impl Segment {
    pub fn other_node(&self, node: NodeId) -> NodeId {
        if self.node_a == node {
            self.node_b
        } else {
            self.node_a
        }
    }

    /// Forward and right direction vectors of the `a -> b` orientation.
    pub fn dirs(&self) -> (Vec2, Vec2) {
        let forw = (self.pos_b.xy() - self.pos_a.xy()).normalize_safe();
        (forw, forw.right())
    }

    /// Projects a point onto the segment centerline, returning the clamped
    /// `a -> b` parameter.
    pub fn closest_t(&self, point: Vec2) -> f32 {
        let ab = self.pos_b.xy() - self.pos_a.xy();
        let len_sqr = ab.length_sqr();
        if len_sqr <= f32::EPSILON {
            return 0.0;
        }
        ((point - self.pos_a.xy()).dot(ab) / len_sqr).clamp(0.0, 1.0)
    }
}

impl SegLane {
    pub fn lane_data<'a>(&self, net: &'a Network) -> &'a Lane {
        &net.segment(self.seg).lanes[self.lane as usize]
    }

    pub fn lane_data_mut<'a>(&self, net: &'a mut Network) -> &'a mut Lane {
        &mut net.segment_mut(self.seg).lanes[self.lane as usize]
    }

    pub fn vehicles<'a>(&self, net: &'a Network) -> &'a LaneVehicles {
        &self.lane_data(net).vehicles
    }

    pub fn vehicles_mut<'a>(&self, net: &'a mut Network) -> &'a mut LaneVehicles {
        &mut self.lane_data_mut(net).vehicles
    }

    pub fn speed_limit(&self, net: &Network) -> f32 {
        net.segment(self.seg).speed_limit
    }

    /// The node this lane flows into.
    pub fn dest_node(&self, net: &Network) -> NodeId {
        let seg = net.segment(self.seg);
        if self.lane_data(net).dir.is_forward() {
            seg.node_b
        } else {
            seg.node_a
        }
    }

    /// The node this lane flows out of.
    pub fn src_node(&self, net: &Network) -> NodeId {
        let seg = net.segment(self.seg);
        if self.lane_data(net).dir.is_forward() {
            seg.node_a
        } else {
            seg.node_b
        }
    }

    /// Endpoints of the lane centerline, oriented along the travel
    /// direction.
    pub fn line(&self, net: &Network) -> (Vec3, Vec3) {
        let seg = net.segment(self.seg);
        let lane = &seg.lanes[self.lane as usize];
        let (_, right) = seg.dirs();
        let off = Vec3::from_xy(right * lane.shift, 0.0);
        let a = seg.pos_a + off;
        let b = seg.pos_b + off;
        if lane.dir.is_forward() {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Lane centerline as a curve, oriented along the travel direction.
    pub fn bezier(&self, net: &Network) -> Bezier {
        let (a, b) = self.line(net);
        Bezier::from_line(a, b)
    }

    /// Converts a segment-space (`a -> b`) parameter to this lane's travel
    /// parameter.
    pub fn lane_t(&self, net: &Network, seg_t: f32) -> f32 {
        if self.lane_data(net).dir.is_forward() {
            seg_t
        } else {
            1.0 - seg_t
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetRegistry, NetworkAsset};

    fn straight_net() -> (Network, SegmentId) {
        let mut assets = AssetRegistry::new();
        let asset = assets.add_network_asset(NetworkAsset::new("r").with_two_way_lanes(1).build());
        let mut net = Network::new();
        let a = net.add_node(Vec3::ZERO);
        let b = net.add_node(Vec3::new(100.0, 0.0, 0.0));
        let s = net.add_segment(&assets, asset, a, b).unwrap();
        (net, s)
    }

    #[test]
    fn test_lane_line_orientation() {
        let (net, s) = straight_net();
        let forward = SegLane { seg: s, lane: 0 };
        let backward = SegLane { seg: s, lane: 1 };

        let (fa, fb) = forward.line(&net);
        assert!(fb.x > fa.x, "forward lane must run a -> b");
        assert!(fa.y < 0.0, "forward lane sits right of center (negative y)");

        let (ba, bb) = backward.line(&net);
        assert!(bb.x < ba.x, "backward lane must run b -> a");
        assert!(ba.y > 0.0, "backward lane sits on the other side");
    }

    #[test]
    fn test_closest_t_clamps() {
        let (net, s) = straight_net();
        let seg = net.segment(s);
        assert_eq!(seg.closest_t(Vec2::new(-50.0, 3.0)), 0.0);
        assert_eq!(seg.closest_t(Vec2::new(500.0, -2.0)), 1.0);
        let mid = seg.closest_t(Vec2::new(50.0, 10.0));
        assert!(
            (mid - 0.5).abs() < 0.02,
            "midpoint projection should be ~0.5, got {}",
            mid
        );
    }
}
