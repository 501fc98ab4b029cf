//! Buildings: trip endpoints with private parking.

use crate::assets::BuildingAssetId;
use crate::entities::parking::ParkingSpot;
use crate::geom::Vec3;
use crate::network::SegmentId;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BuildingId(pub u32);

impl fmt::Display for BuildingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bld:{}", self.0)
    }
}

/// A building placed next to a road. Trips start and end here; the connected
/// segment anchors routing and the approach curves.
#[derive(Debug)]
pub struct Building {
    pub asset: BuildingAssetId,
    pub pos: Vec3,
    /// Orientation in radians, CCW from +X.
    pub rot: f32,
    pub connected_segment: Option<SegmentId>,
    /// Private parking spots on the lot.
    pub parking: Vec<ParkingSpot>,
}

impl Building {
    pub fn new(asset: BuildingAssetId, pos: Vec3, connected_segment: SegmentId) -> Self {
        Building {
            asset,
            pos,
            rot: 0.0,
            connected_segment: Some(connected_segment),
            parking: Vec::new(),
        }
    }

    pub fn with_rot(mut self, rot: f32) -> Self {
        self.rot = rot;
        self
    }

    /// Lays out `count` parking spots in a row beside the building,
    /// facing the building.
    pub fn with_parking_row(mut self, count: u16) -> Self {
        let forward = crate::geom::Vec2::new(self.rot.cos(), self.rot.sin());
        let right = forward.right();
        for i in 0..count {
            let offset = right * (3.0 * i as f32) + forward * 6.0;
            self.parking.push(ParkingSpot::new(
                self.pos + Vec3::from_xy(offset, 0.0),
                self.rot + std::f32::consts::PI,
            ));
        }
        self
    }
}
