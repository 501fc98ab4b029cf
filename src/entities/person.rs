//! Persons: the lifecycle owners of vehicles and trips.

use crate::assets::VehicleAssetId;
use crate::entities::building::BuildingId;
use crate::entities::parking::ParkingRef;
use crate::trips::TripId;
use rand::Rng;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PersonId(pub u32);

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "person:{}", self.0)
    }
}

/// Where a person's vehicle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VehicleState {
    /// No physical world state: the vehicle exists only as a "pocket car"
    /// while its owner is inside a building.
    #[default]
    Pocket,
    /// Parked in a reservable spot.
    Parked(ParkingRef),
    /// Driving as part of an active trip.
    Trip(TripId),
}

/// A person with an indefinite lifetime that oscillates between waiting in a
/// building and driving a trip. Each person owns exactly one vehicle, so the
/// person id doubles as the vehicle handle for parking state.
#[derive(Debug)]
pub struct Person {
    pub home_building: BuildingId,
    /// Building the person is currently inside, `None` while driving.
    pub cur_building: Option<BuildingId>,
    /// Seconds until the next trip attempt while inside a building.
    pub stay_timer: f32,
    pub vehicle_asset: VehicleAssetId,
    pub vehicle_state: VehicleState,
    /// Linear color of the owned vehicle.
    pub tint: [f32; 3],
    /// Deviation from neutral driving style; see
    /// [`Person::topspeed_accel_mul`].
    pub aggressiveness: f32,
}

const STD_COLORS: [[f32; 3]; 6] = [
    [0.0, 0.0, 0.0],
    [0.0, 0.0, 0.0],
    [0.1, 0.1, 0.1],
    [0.5, 0.5, 0.55],
    [1.0, 1.0, 1.0],
    [0.95, 0.1, 0.1],
];

impl Person {
    pub fn new(home: BuildingId, vehicle_asset: VehicleAssetId) -> PersonBuilder {
        PersonBuilder {
            person: Person {
                home_building: home,
                cur_building: Some(home),
                stay_timer: 0.0,
                vehicle_asset,
                vehicle_state: VehicleState::Pocket,
                tint: [0.5, 0.5, 0.5],
                aggressiveness: 0.0,
            },
        }
    }

    /// Randomizes tint, aggressiveness and the initial stay timer the way a
    /// freshly generated citizen gets them.
    pub fn randomized(
        home: BuildingId,
        vehicle_asset: VehicleAssetId,
        rng: &mut impl Rng,
    ) -> Person {
        let tint = if rng.random_bool(0.5) {
            STD_COLORS[rng.random_range(0..STD_COLORS.len())]
        } else {
            hsv_to_rgb(rng.random::<f32>(), 1.0, 0.8)
        };

        let aggressiveness = normal_sample(rng) * 0.15;

        Person::new(home, vehicle_asset)
            .with_tint(tint)
            .with_aggressiveness(aggressiveness)
            .with_stay_timer(rng.random::<f32>())
            .build()
    }

    /// Multiplier applied to both top speed and acceleration.
    pub fn topspeed_accel_mul(&self) -> f32 {
        (1.1 + self.aggressiveness).clamp(0.7, 1.5)
    }

    pub fn trip(&self) -> Option<TripId> {
        match self.vehicle_state {
            VehicleState::Trip(tid) => Some(tid),
            _ => None,
        }
    }
}

/// Builder for [`Person`], used by tests and scripted scenarios where the
/// randomized fields must be pinned.
pub struct PersonBuilder {
    person: Person,
}

impl PersonBuilder {
    pub fn with_tint(mut self, tint: [f32; 3]) -> Self {
        self.person.tint = tint;
        self
    }

    pub fn with_aggressiveness(mut self, aggressiveness: f32) -> Self {
        self.person.aggressiveness = aggressiveness;
        self
    }

    pub fn with_stay_timer(mut self, stay_timer: f32) -> Self {
        self.person.stay_timer = stay_timer;
        self
    }

    pub fn with_parked_vehicle(mut self, spot: ParkingRef) -> Self {
        self.person.vehicle_state = VehicleState::Parked(spot);
        self
    }

    pub fn build(self) -> Person {
        self.person
    }
}

/// Standard normal draw via Box-Muller from two uniform samples.
fn normal_sample(rng: &mut impl Rng) -> f32 {
    // keep u1 in (0, 1] so the log stays finite
    let u1 = 1.0 - rng.random::<f32>();
    let u2 = rng.random::<f32>();
    (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos()
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [f32; 3] {
    let h = (h.fract() + 1.0).fract() * 6.0;
    let i = h.floor();
    let f = h - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match i as i32 {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_randomized_aggressiveness_distribution() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 2000;
        let samples: Vec<f32> = (0..n)
            .map(|_| {
                Person::randomized(BuildingId(0), VehicleAssetId(0), &mut rng).aggressiveness
            })
            .collect();

        let mean = samples.iter().sum::<f32>() / n as f32;
        let var = samples.iter().map(|s| (s - mean) * (s - mean)).sum::<f32>() / n as f32;
        let std_dev = var.sqrt();

        assert!(
            mean.abs() < 0.02,
            "aggressiveness should center on zero, got mean {}",
            mean
        );
        assert!(
            (std_dev - 0.15).abs() < 0.02,
            "aggressiveness spread should be sigma=0.15, got {}",
            std_dev
        );
        assert!(
            samples.iter().any(|s| s.abs() > 0.2),
            "a gaussian tail should produce deviations beyond 0.2"
        );
    }

    #[test]
    fn test_aggressiveness_clamped() {
        let p = Person::new(BuildingId(0), VehicleAssetId(0))
            .with_aggressiveness(5.0)
            .build();
        assert_eq!(p.topspeed_accel_mul(), 1.5, "multiplier must clamp to 1.5");

        let q = Person::new(BuildingId(0), VehicleAssetId(0))
            .with_aggressiveness(-5.0)
            .build();
        assert_eq!(q.topspeed_accel_mul(), 0.7, "multiplier must clamp to 0.7");
    }

    #[test]
    fn test_default_state_is_pocket() {
        let p = Person::new(BuildingId(1), VehicleAssetId(0)).build();
        assert_eq!(p.vehicle_state, VehicleState::Pocket);
        assert_eq!(p.trip(), None);
    }
}
