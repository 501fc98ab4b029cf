//! Parking spots and their reservation state machine.

use crate::entities::person::PersonId;
use crate::geom::{Vec2, Vec3};
use crate::network::SegmentId;
use std::fmt;

/// Where a parking spot lives: on a building lot or along a segment curb.
/// The index is the position inside the owner's spot list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParkingRef {
    Building(crate::entities::building::BuildingId, u16),
    Street(SegmentId, u16),
}

impl fmt::Display for ParkingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParkingRef::Building(b, i) => write!(f, "parking:{}/{}", b, i),
            ParkingRef::Street(s, i) => write!(f, "parking:{}/{}", s, i),
        }
    }
}

/// Occupancy state of a spot. A vehicle is identified by its owning person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParkingState {
    #[default]
    Free,
    Reserved(PersonId),
    Occupied(PersonId),
}

/// A single parking spot: position, heading of a parked vehicle and state.
///
/// State transitions assert their preconditions; a violated reservation is a
/// simulation bug and must abort the tick rather than be papered over.
#[derive(Debug, Clone)]
pub struct ParkingSpot {
    pub pos: Vec3,
    /// Heading of a parked vehicle in radians, CCW from +X.
    pub ang: f32,
    pub state: ParkingState,
}

impl ParkingSpot {
    pub fn new(pos: Vec3, ang: f32) -> Self {
        ParkingSpot {
            pos,
            ang,
            state: ParkingState::Free,
        }
    }

    pub fn forward(&self) -> Vec2 {
        Vec2::new(self.ang.cos(), self.ang.sin())
    }

    pub fn is_free(&self) -> bool {
        matches!(self.state, ParkingState::Free)
    }

    pub fn reserved_by(&self, v: PersonId) -> bool {
        self.state == ParkingState::Reserved(v)
    }

    pub fn occupied_by(&self, v: PersonId) -> bool {
        self.state == ParkingState::Occupied(v)
    }

    /// World position of the front bumper of a vehicle using this spot.
    pub fn vehicle_front_pos(&self) -> Vec3 {
        self.pos
    }

    /// Control point for a nose-in approach from the street.
    pub fn front_enter_ctrl(&self) -> Vec3 {
        self.pos - Vec3::from_xy(self.forward(), 0.0) * 4.0
    }

    /// Control point for entering a curbside spot.
    pub fn side_enter_ctrl(&self) -> Vec3 {
        self.pos - Vec3::from_xy(self.forward(), 0.0) * 3.0
    }

    /// Control point for leaving a curbside spot.
    pub fn side_exit_ctrl(&self) -> Vec3 {
        self.pos + Vec3::from_xy(self.forward(), 0.0) * 2.0
    }

    pub fn reserve(&mut self, v: PersonId) {
        assert!(
            self.is_free(),
            "reserving a spot that is not free: {:?}",
            self.state
        );
        self.state = ParkingState::Reserved(v);
    }

    pub fn unreserve(&mut self, v: PersonId) {
        assert!(
            self.reserved_by(v),
            "unreserving a spot not reserved by {}: {:?}",
            v,
            self.state
        );
        self.state = ParkingState::Free;
    }

    pub fn park(&mut self, v: PersonId) {
        assert!(
            self.reserved_by(v),
            "parking without a reservation by {}: {:?}",
            v,
            self.state
        );
        self.state = ParkingState::Occupied(v);
    }

    /// Leaves the spot in the reserved state until the departing trip clears
    /// it, mirroring `reserve`/`park` exactly.
    pub fn unpark(&mut self, v: PersonId) {
        assert!(
            self.occupied_by(v),
            "unparking a vehicle that is not here: {:?}",
            self.state
        );
        self.state = ParkingState::Reserved(v);
    }
}

/// Resolves a parking reference against its owning container.
///
/// # Panics
/// Panics when the reference is dangling; parking references are kept valid
/// by the bulldoze cascades.
pub fn resolve<'a>(
    net: &'a crate::network::Network,
    buildings: &'a indexmap::IndexMap<crate::entities::building::BuildingId, crate::entities::building::Building>,
    pref: ParkingRef,
) -> &'a ParkingSpot {
    match pref {
        ParkingRef::Building(bid, idx) => &buildings
            .get(&bid)
            .expect("parking ref building exists")
            .parking[idx as usize],
        ParkingRef::Street(sid, idx) => &net.segment(sid).parking[idx as usize],
    }
}

pub fn resolve_mut<'a>(
    net: &'a mut crate::network::Network,
    buildings: &'a mut indexmap::IndexMap<crate::entities::building::BuildingId, crate::entities::building::Building>,
    pref: ParkingRef,
) -> &'a mut ParkingSpot {
    match pref {
        ParkingRef::Building(bid, idx) => &mut buildings
            .get_mut(&bid)
            .expect("parking ref building exists")
            .parking[idx as usize],
        ParkingRef::Street(sid, idx) => &mut net.segment_mut(sid).parking[idx as usize],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_roundtrip() {
        let v = PersonId(7);
        let mut spot = ParkingSpot::new(Vec3::ZERO, 0.0);
        spot.reserve(v);
        assert!(spot.reserved_by(v));
        spot.unreserve(v);
        assert!(spot.is_free(), "reserve then unreserve must leave the spot free");
    }

    #[test]
    fn test_park_unpark_roundtrip() {
        let v = PersonId(3);
        let mut spot = ParkingSpot::new(Vec3::ZERO, 0.0);
        spot.reserve(v);
        spot.park(v);
        assert!(spot.occupied_by(v));
        spot.unpark(v);
        assert!(
            spot.reserved_by(v),
            "unpark must restore the reservation, got {:?}",
            spot.state
        );
    }

    #[test]
    #[should_panic(expected = "reserving a spot that is not free")]
    fn test_double_reserve_asserts() {
        let mut spot = ParkingSpot::new(Vec3::ZERO, 0.0);
        spot.reserve(PersonId(1));
        spot.reserve(PersonId(2));
    }
}
