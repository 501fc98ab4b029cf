//! One element of a vehicle's planned trajectory.

use crate::geom::Bezier;
use crate::network::{Network, NodeId, SegLane};
use std::fmt;

/// What kind of curve a motion follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionKind {
    /// Synthesized curve from the start building onto the first lane.
    #[default]
    Start,
    /// A lane centerline between two nodes.
    Segment,
    /// An intersection curve between two lanes.
    Node,
    /// Synthesized curve from the last lane to the destination.
    End,
}

impl fmt::Display for MotionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MotionKind::Start => "start",
            MotionKind::Segment => "segment",
            MotionKind::Node => "node",
            MotionKind::End => "end",
        };
        write!(f, "{}", s)
    }
}

/// A single motion: the curve, where it hands off, and the lane references
/// that tie the vehicle to segment and node bookkeeping.
///
/// Motion indices run `START(0), SEGMENT(1), NODE(2), SEGMENT(3), ...,
/// SEGMENT(2n-1), END(2n)` for an `n`-segment path.
#[derive(Debug, Clone, Copy)]
pub struct Motion {
    pub idx: i32,
    pub kind: MotionKind,
    pub bezier: Bezier,
    /// Curve parameter where the vehicle hands off to the next motion.
    pub end_t: f32,
    /// Parameter on the next curve where the vehicle resumes, preserving
    /// continuous arc-length motion across the join.
    pub next_start_t: f32,
    /// Speed limit on the current curve.
    pub cur_speedlim: f32,
    /// Speed limit the vehicle ramps toward near the hand-off.
    pub next_speedlim: f32,
    /// On a segment motion: the lane being driven. On a node motion: the
    /// incoming lane.
    pub cur_lane: Option<SegLane>,
    /// On a segment motion: the chosen lane after the next node (absent on
    /// the final segment). On a node motion: the outgoing lane.
    pub next_lane: Option<SegLane>,
}

impl Default for Motion {
    fn default() -> Self {
        Motion {
            idx: -1,
            kind: MotionKind::Start,
            bezier: Bezier::default(),
            end_t: 1.0,
            next_start_t: 0.0,
            cur_speedlim: 0.0,
            next_speedlim: 0.0,
            cur_lane: None,
            next_lane: None,
        }
    }
}

impl Motion {
    /// The node this motion is approaching or crossing, when both lane
    /// references are present.
    pub fn cur_node(&self, net: &Network) -> Option<NodeId> {
        let cur = self.cur_lane?;
        let next = self.next_lane?;
        net.between(cur.seg, next.seg)
    }

    /// Whether the vehicle is listed in a lane's vehicle list during this
    /// motion.
    pub fn has_lane_membership(&self) -> bool {
        self.kind == MotionKind::Segment
    }
}
