//! The road-network arena: nodes and segments behind stable indices.

use crate::assets::{AssetRegistry, NetworkAssetId};
use crate::geom::{lerp3, line_line_intersect, Bezier, Vec3};
use crate::network::node::{Node, NodeId};
use crate::network::segment::{Lane, SegLane, Segment, SegmentId};
use crate::shortest_path::{route, RouteEndpoint, RouteError, RoutePath};
use indexmap::IndexMap;
use std::fmt;

/// Topology violations. These are caught when the graph is mutated; during a
/// tick the topology is immutable and violations are fatal assertions.
#[derive(Debug, Clone)]
pub enum GraphError {
    UnknownNode(NodeId),
    UnknownSegment(SegmentId),
    /// A segment must join two distinct nodes.
    SelfLoop(NodeId),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::UnknownNode(id) => write!(f, "unknown node '{}'", id),
            GraphError::UnknownSegment(id) => write!(f, "unknown segment '{}'", id),
            GraphError::SelfLoop(id) => {
                write!(f, "segment would loop node '{}' onto itself", id)
            }
        }
    }
}

impl std::error::Error for GraphError {}

/// The road graph. All cross references between entities are stable ids;
/// borrowing is confined to single-tick stack frames.
#[derive(Debug, Default)]
pub struct Network {
    nodes: IndexMap<NodeId, Node>,
    segments: IndexMap<SegmentId, Segment>,
    next_node: u32,
    next_segment: u32,
}

impl Network {
    pub fn new() -> Self {
        Network::default()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.nodes.get(&id).expect("node id not in network")
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes.get_mut(&id).expect("node id not in network")
    }

    pub fn segment(&self, id: SegmentId) -> &Segment {
        self.segments.get(&id).expect("segment id not in network")
    }

    pub fn segment_mut(&mut self, id: SegmentId) -> &mut Segment {
        self.segments.get_mut(&id).expect("segment id not in network")
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(&id)
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    pub fn segment_ids(&self) -> Vec<SegmentId> {
        self.segments.keys().copied().collect()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    pub fn add_node(&mut self, pos: Vec3) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(id, Node::new(pos));
        id
    }

    /// Adds a segment between two distinct existing nodes and rebuilds the
    /// cached geometry and default lane options around both.
    pub fn add_segment(
        &mut self,
        assets: &AssetRegistry,
        asset: NetworkAssetId,
        node_a: NodeId,
        node_b: NodeId,
    ) -> Result<SegmentId, GraphError> {
        if !self.nodes.contains_key(&node_a) {
            return Err(GraphError::UnknownNode(node_a));
        }
        if !self.nodes.contains_key(&node_b) {
            return Err(GraphError::UnknownNode(node_b));
        }
        if node_a == node_b {
            return Err(GraphError::SelfLoop(node_a));
        }

        let id = SegmentId(self.next_segment);
        self.next_segment += 1;

        let pos_a = self.node(node_a).pos;
        let pos_b = self.node(node_b).pos;
        let layout = assets.network_asset(asset);
        let lanes = layout
            .lanes
            .iter()
            .map(|l| Lane {
                dir: l.dir,
                shift: l.shift,
                ..Lane::default()
            })
            .collect();

        self.segments.insert(
            id,
            Segment {
                asset,
                node_a,
                node_b,
                pos_a,
                pos_b,
                length: pos_a.distance_to(pos_b),
                speed_limit: layout.speed_limit,
                width: layout.width,
                sidewalk_l: layout.sidewalk_l,
                sidewalk_r: layout.sidewalk_r,
                road_class: layout.road_class,
                lanes,
                parking: Vec::new(),
            },
        );

        self.node_mut(node_a).segments.push(id);
        self.node_mut(node_b).segments.push(id);
        self.rebuild_around(node_a);
        self.rebuild_around(node_b);
        Ok(id)
    }

    /// Detaches and drops a segment, rebuilding the two endpoint nodes.
    /// The caller is responsible for cancelling trips that touch it first.
    pub fn remove_segment(&mut self, id: SegmentId) -> Result<(), GraphError> {
        let (node_a, node_b) = {
            let seg = self
                .segments
                .get(&id)
                .ok_or(GraphError::UnknownSegment(id))?;
            (seg.node_a, seg.node_b)
        };
        self.segments.shift_remove(&id);
        for nid in [node_a, node_b] {
            let node = self.node_mut(nid);
            node.segments.retain(|&sid| sid != id);
            self.rebuild_around(nid);
        }
        Ok(())
    }

    /// Drops a node. Only valid once all incident segments are gone.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        let node = self.nodes.get(&id).ok_or(GraphError::UnknownNode(id))?;
        assert!(
            node.segments.is_empty(),
            "removing a node that still has incident segments"
        );
        self.nodes.shift_remove(&id);
        Ok(())
    }

    /// Rebuilds cached geometry, default lane options and the traffic light
    /// around one node after a topology change.
    pub(crate) fn rebuild_around(&mut self, nid: NodeId) {
        self.refresh_node(nid);

        // endpoints moved, refresh incident segment lengths
        let seg_ids = self.node(nid).segments.clone();
        for sid in seg_ids {
            let seg = self.segment_mut(sid);
            seg.length = seg.pos_a.distance_to(seg.pos_b);
        }

        self.assign_default_turns(nid);
        self.assign_default_connections(nid);

        // lane slots may have been invalidated
        if self.node(nid).traffic_light.is_some() {
            let light = crate::traffic_lights::TrafficLight::for_node(self, nid);
            self.node_mut(nid).traffic_light = light;
        }
    }

    /// Shortest-travel-time path between two segments.
    pub fn pathfind(
        &self,
        start_seg: SegmentId,
        dest_seg: SegmentId,
    ) -> Result<RoutePath, RouteError> {
        route(
            self,
            RouteEndpoint::new(start_seg),
            RouteEndpoint::new(dest_seg),
        )
    }

    /// The node shared by two segments, if any.
    pub fn between(&self, seg_a: SegmentId, seg_b: SegmentId) -> Option<NodeId> {
        let a = self.segment(seg_a);
        let b = self.segment(seg_b);
        if a.node_a == b.node_a || a.node_a == b.node_b {
            Some(a.node_a)
        } else if a.node_b == b.node_a || a.node_b == b.node_b {
            Some(a.node_b)
        } else {
            None
        }
    }

    /// Builds the corner curve a vehicle follows through a node from lane
    /// `a` onto lane `b`.
    ///
    /// Control points sit where the lane tangents intersect; for parallel
    /// tangents they are placed at equal distances along each tangent. The
    /// sharpness constant pulls the inner control points toward the apex.
    pub fn connection_curve(&self, a: SegLane, b: SegLane) -> Bezier {
        // quarter-circle turns would want 0.5539; sharper apexes read as
        // more deliberate steering
        const CORNER_SHARPNESS: f32 = 0.6667;

        let (a_start, a_end) = a.line(self);
        let (b_start, b_end) = b.line(self);
        let a_dir = (a_end - a_start).normalize_safe().xy();
        let b_dir = (b_end - b_start).normalize_safe().xy();

        let (ctrl_in, ctrl_out) =
            match line_line_intersect(a_end.xy(), a_dir, b_start.xy(), b_dir) {
                Some(p) => (Vec3::from_xy(p, a_end.z), Vec3::from_xy(p, b_start.z)),
                None => {
                    let dist = a_end.distance_to(b_start) * 0.5;
                    (
                        a_end + Vec3::from_xy(a_dir, 0.0) * dist,
                        b_start + Vec3::from_xy(b_dir, 0.0) * dist,
                    )
                }
            };

        Bezier::new(
            a_end,
            lerp3(a_end, ctrl_in, CORNER_SHARPNESS),
            lerp3(b_start, ctrl_out, CORNER_SHARPNESS),
            b_start,
        )
    }
}
