//! Turn classification and the allowed-turn bitflags carried per lane.

use crate::geom::Vec2;
use crate::network::graph::Network;
use crate::network::{NodeId, SegmentId};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Bitflag set of turn kinds a lane permits at its far node.
///
/// U-turns classify as [`Turns::LEFT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Turns(pub u8);

impl Turns {
    pub const NONE: Turns = Turns(0);
    pub const LEFT: Turns = Turns(0b001);
    pub const STRAIGHT: Turns = Turns(0b010);
    pub const RIGHT: Turns = Turns(0b100);
    pub const LS: Turns = Turns(0b011);
    pub const SR: Turns = Turns(0b110);
    pub const ALL: Turns = Turns(0b111);

    pub fn contains(self, other: Turns) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Turns {
    type Output = Turns;
    fn bitor(self, rhs: Turns) -> Turns {
        Turns(self.0 | rhs.0)
    }
}

impl BitOrAssign for Turns {
    fn bitor_assign(&mut self, rhs: Turns) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Turns {
    type Output = Turns;
    fn bitand(self, rhs: Turns) -> Turns {
        Turns(self.0 & rhs.0)
    }
}

impl fmt::Display for Turns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = String::new();
        if self.contains(Turns::LEFT) {
            s.push('L');
        }
        if self.contains(Turns::STRAIGHT) {
            s.push('S');
        }
        if self.contains(Turns::RIGHT) {
            s.push('R');
        }
        if s.is_empty() {
            s.push('-');
        }
        write!(f, "{}", s)
    }
}

/// Classifies the turn taken when travelling through `node` from `in_seg`
/// onto `out_seg`.
///
/// With the incoming travel direction `in` and the outgoing direction `out`
/// at the node, `d_forward = dot(out, in)` and
/// `d_right = dot(out, rot90(-in))`. The turn is `STRAIGHT` iff
/// `d_forward > |d_right|`, else `RIGHT` iff `d_right < 0` under the
/// driving convention, else `LEFT`.
pub fn classify_turn(net: &Network, node: NodeId, in_seg: SegmentId, out_seg: SegmentId) -> Turns {
    let in_dir = seg_dir_at_node(net, node, in_seg, true);
    let out_dir = seg_dir_at_node(net, node, out_seg, false);

    let d_forward = out_dir.dot(in_dir);
    let d_right = out_dir.dot((-in_dir).rotate90());

    if d_forward > d_right.abs() {
        Turns::STRAIGHT
    } else if d_right < 0.0 {
        Turns::RIGHT
    } else {
        Turns::LEFT
    }
}

/// Checks whether a lane's turn flags permit the `in_seg -> out_seg` turn.
pub fn is_turn_allowed(
    net: &Network,
    node: NodeId,
    in_seg: SegmentId,
    out_seg: SegmentId,
    allowed: Turns,
) -> bool {
    allowed.contains(classify_turn(net, node, in_seg, out_seg))
}

/// Travel direction of a segment at a node: pointing into the node when
/// `incoming`, away from it otherwise.
fn seg_dir_at_node(net: &Network, node: NodeId, seg_id: SegmentId, incoming: bool) -> Vec2 {
    let seg = net.segment(seg_id);
    let a = net.node(seg.node_a).pos.xy();
    let b = net.node(seg.node_b).pos.xy();
    let mut dir = (b - a).normalize_safe();
    let toward_node = seg.node_b == node;
    if toward_node != incoming {
        dir = -dir;
    }
    dir
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{kmh, AssetRegistry, NetworkAsset};
    use crate::geom::Vec3;

    fn cross_network() -> (Network, NodeId, [SegmentId; 4]) {
        let mut assets = AssetRegistry::new();
        let asset = assets.add_network_asset(
            NetworkAsset::new("road")
                .with_two_way_lanes(1)
                .with_speed_limit(kmh(50.0))
                .build(),
        );
        let mut net = Network::new();
        let center = net.add_node(Vec3::ZERO);
        let east = net.add_node(Vec3::new(100.0, 0.0, 0.0));
        let north = net.add_node(Vec3::new(0.0, 100.0, 0.0));
        let west = net.add_node(Vec3::new(-100.0, 0.0, 0.0));
        let south = net.add_node(Vec3::new(0.0, -100.0, 0.0));
        let se = net.add_segment(&assets, asset, center, east).unwrap();
        let sn = net.add_segment(&assets, asset, center, north).unwrap();
        let sw = net.add_segment(&assets, asset, center, west).unwrap();
        let ss = net.add_segment(&assets, asset, center, south).unwrap();
        (net, center, [se, sn, sw, ss])
    }

    #[test]
    fn test_classify_cross() {
        let (net, center, [se, sn, sw, ss]) = cross_network();
        assert_eq!(
            classify_turn(&net, center, se, sw),
            Turns::STRAIGHT,
            "east -> west through the center is straight"
        );
        assert_eq!(
            classify_turn(&net, center, se, sn),
            Turns::LEFT,
            "arriving via the east arm, the north arm is the left turn"
        );
        assert_eq!(
            classify_turn(&net, center, se, ss),
            Turns::RIGHT,
            "arriving via the east arm, the south arm is the right turn"
        );
        assert_eq!(
            classify_turn(&net, center, se, se),
            Turns::LEFT,
            "U-turns classify as left"
        );
    }

    #[test]
    fn test_classify_left_right_mirror() {
        // swapping the approach across the node mirrors left and right
        let (net, center, [se, sn, sw, _ss]) = cross_network();
        assert_eq!(classify_turn(&net, center, se, sn), Turns::LEFT);
        assert_eq!(
            classify_turn(&net, center, sw, sn),
            Turns::RIGHT,
            "the same exit arm flips sides for the opposite approach"
        );
    }

    #[test]
    fn test_straight_is_symmetric() {
        let (net, center, [se, _, sw, _]) = cross_network();
        let ab = classify_turn(&net, center, se, sw) == Turns::STRAIGHT;
        let ba = classify_turn(&net, center, sw, se) == Turns::STRAIGHT;
        assert_eq!(ab, ba, "straight classification must be symmetric on a cross");
    }
}
