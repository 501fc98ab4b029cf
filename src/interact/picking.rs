//! Hover picking: ray tests against world entities.

use crate::entities::building::BuildingId;
use crate::entities::parking::ParkingRef;
use crate::entities::person::PersonId;
use crate::geom::{intersect_circle_ray, intersect_rect_ray, Ray, Vec3};
use crate::network::{NodeId, SegmentId};
use crate::simulation::Session;
use crate::trips::TripId;
use std::ops::{BitOr, BitOrAssign};

/// A selectable world entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Person(PersonId),
    Vehicle(TripId),
    Building(BuildingId),
    Node(NodeId),
    Segment(SegmentId),
    ParkingSpot(ParkingRef),
}

/// Which entity kinds a pick should consider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionMask(pub u8);

impl SelectionMask {
    pub const PERSON: SelectionMask = SelectionMask(0b000001);
    pub const VEHICLE: SelectionMask = SelectionMask(0b000010);
    pub const BUILDING: SelectionMask = SelectionMask(0b000100);
    pub const NODE: SelectionMask = SelectionMask(0b001000);
    pub const SEGMENT: SelectionMask = SelectionMask(0b010000);
    pub const PARKING: SelectionMask = SelectionMask(0b100000);
    pub const ALL: SelectionMask = SelectionMask(0b111111);
    /// Network-only picking, used by road edit tools.
    pub const NETWORK: SelectionMask = SelectionMask(0b011000);

    pub fn contains(self, other: SelectionMask) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for SelectionMask {
    type Output = SelectionMask;
    fn bitor(self, rhs: SelectionMask) -> SelectionMask {
        SelectionMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for SelectionMask {
    fn bitor_assign(&mut self, rhs: SelectionMask) {
        self.0 |= rhs.0;
    }
}

/// Casts a cursor ray against the world and returns the nearest entity of
/// the masked kinds. Persons are selectable through their vehicle while
/// driving.
pub fn pick(session: &Session, ray: &Ray, mask: SelectionMask) -> Option<Selection> {
    let mut best: Option<(f32, Selection)> = None;
    let mut consider = |dist: f32, sel: Selection| {
        if best.map(|(d, _)| dist < d).unwrap_or(true) {
            best = Some((dist, sel));
        }
    };

    if mask.contains(SelectionMask::VEHICLE) || mask.contains(SelectionMask::PERSON) {
        for (&tid, trip) in &session.trips {
            let r = trip.sim.length * 0.5;
            if let Some(dist) = intersect_circle_ray(trip.sim.center(), r, ray) {
                if mask.contains(SelectionMask::VEHICLE) {
                    consider(dist, Selection::Vehicle(tid));
                } else {
                    consider(dist, Selection::Person(trip.person));
                }
            }
        }
    }

    if mask.contains(SelectionMask::BUILDING) {
        for (&bid, building) in &session.buildings {
            let r = session.assets.building_asset(building.asset).radius;
            if let Some(dist) = intersect_circle_ray(building.pos, r, ray) {
                consider(dist, Selection::Building(bid));
            }
        }
    }

    if mask.contains(SelectionMask::PARKING) {
        for (&bid, building) in &session.buildings {
            for (i, spot) in building.parking.iter().enumerate() {
                if let Some(dist) = intersect_circle_ray(spot.pos, 1.5, ray) {
                    consider(dist, Selection::ParkingSpot(ParkingRef::Building(bid, i as u16)));
                }
            }
        }
        for sid in session.network.segment_ids() {
            for (i, spot) in session.network.segment(sid).parking.iter().enumerate() {
                if let Some(dist) = intersect_circle_ray(spot.pos, 1.5, ray) {
                    consider(dist, Selection::ParkingSpot(ParkingRef::Street(sid, i as u16)));
                }
            }
        }
    }

    if mask.contains(SelectionMask::NODE) {
        for nid in session.network.node_ids() {
            let node = session.network.node(nid);
            if let Some(dist) = intersect_circle_ray(node.pos, node.radius, ray) {
                consider(dist, Selection::Node(nid));
            }
        }
    }

    if mask.contains(SelectionMask::SEGMENT) {
        for sid in session.network.segment_ids() {
            let seg = session.network.segment(sid);
            let (_, right2) = seg.dirs();
            let half = seg.width * 0.5;
            let corner = seg.pos_a - Vec3::from_xy(right2 * half, 0.0);
            let forw = seg.pos_b - seg.pos_a;
            let right = Vec3::from_xy(right2 * seg.width, 0.0);
            if let Some(dist) = intersect_rect_ray(corner, forw, right, ray) {
                consider(dist, Selection::Segment(sid));
            }
        }
    }

    best.map(|(_, sel)| sel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetRegistry, NetworkAsset};
    use crate::geom::Vec3;

    fn down_ray(x: f32, y: f32) -> Ray {
        Ray {
            pos: Vec3::new(x, y, 50.0),
            dir: Vec3::new(0.0, 0.0, -1.0),
        }
    }

    #[test]
    fn test_pick_node_and_segment() {
        let mut assets = AssetRegistry::new();
        let road = assets.add_network_asset(NetworkAsset::new("r").with_two_way_lanes(1).build());
        let mut session = Session::with_seed(assets, 1);
        let a = session.network.add_node(Vec3::ZERO);
        let b = session.network.add_node(Vec3::new(100.0, 0.0, 0.0));
        let road = session.network.add_segment(&session.assets, road, a, b).unwrap();

        let hit = pick(&session, &down_ray(0.0, 0.0), SelectionMask::NODE);
        assert_eq!(hit, Some(Selection::Node(a)), "cursor over the node picks it");

        let hit = pick(&session, &down_ray(50.0, 0.5), SelectionMask::SEGMENT);
        assert_eq!(hit, Some(Selection::Segment(road)), "mid-road pick");

        let hit = pick(&session, &down_ray(50.0, 30.0), SelectionMask::ALL);
        assert_eq!(hit, None, "empty grass picks nothing");
    }
}
