use indexmap::IndexMap;
use std::fmt;

/// Identifier of a road layout asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetworkAssetId(pub u32);

/// Identifier of a vehicle asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleAssetId(pub u32);

/// Identifier of a building asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BuildingAssetId(pub u32);

impl fmt::Display for NetworkAssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "net_asset:{}", self.0)
    }
}
impl fmt::Display for VehicleAssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "veh_asset:{}", self.0)
    }
}
impl fmt::Display for BuildingAssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bld_asset:{}", self.0)
    }
}

/// Converts a speed from km/h to the m/s used internally.
pub fn kmh(value: f32) -> f32 {
    value / 3.6
}

/// Travel direction of a lane relative to its segment's `a -> b` orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaneDir {
    #[default]
    Forward,
    Backward,
}

impl LaneDir {
    pub fn is_forward(self) -> bool {
        matches!(self, LaneDir::Forward)
    }
}

/// One lane of a road layout.
///
/// `shift` is the signed lateral offset of the lane centerline from the
/// segment centerline, positive to the right of the `a -> b` direction.
/// Within each direction, lanes must be listed inner (closest to the road
/// center) to outer (curbside); default turn assignment and lane selection
/// rely on this order.
#[derive(Debug, Clone, Copy)]
pub struct LaneLayout {
    pub dir: LaneDir,
    pub shift: f32,
}

/// A road layout: lane table, width and speed limit.
#[derive(Debug, Clone)]
pub struct NetworkAsset {
    pub name: String,
    /// Full paved width in metres; segment endpoints at nodes are placed by
    /// intersecting neighbouring road edges at this width.
    pub width: f32,
    pub lanes: Vec<LaneLayout>,
    /// Speed limit in m/s. A zero speed limit makes the road unusable for
    /// routing.
    pub speed_limit: f32,
    /// Sidewalk edge offsets from the centerline (left is negative).
    pub sidewalk_l: f32,
    pub sidewalk_r: f32,
    /// Importance class; minor roads yield to major roads at shared nodes.
    pub road_class: i32,
}

impl NetworkAsset {
    pub fn new(name: impl Into<String>) -> NetworkAssetBuilder {
        NetworkAssetBuilder {
            asset: NetworkAsset {
                name: name.into(),
                width: 8.0,
                lanes: Vec::new(),
                speed_limit: kmh(50.0),
                sidewalk_l: -4.0,
                sidewalk_r: 4.0,
                road_class: 0,
            },
        }
    }

    /// Number of lanes running in the given direction.
    pub fn lanes_in_dir(&self, dir: LaneDir) -> usize {
        self.lanes.iter().filter(|l| l.dir == dir).count()
    }
}

/// Builder for [`NetworkAsset`].
pub struct NetworkAssetBuilder {
    asset: NetworkAsset,
}

impl NetworkAssetBuilder {
    pub fn with_width(mut self, width: f32) -> Self {
        self.asset.width = width;
        self.asset.sidewalk_l = -width * 0.5 - 2.0;
        self.asset.sidewalk_r = width * 0.5 + 2.0;
        self
    }

    pub fn with_lane(mut self, dir: LaneDir, shift: f32) -> Self {
        self.asset.lanes.push(LaneLayout { dir, shift });
        self
    }

    /// Symmetric two-way layout: `per_dir` lanes each way, 3 m apart.
    pub fn with_two_way_lanes(mut self, per_dir: u16) -> Self {
        for i in 0..per_dir {
            // forward lanes sit right of center, inner first
            self.asset.lanes.push(LaneLayout {
                dir: LaneDir::Forward,
                shift: 1.5 + 3.0 * i as f32,
            });
        }
        for i in 0..per_dir {
            self.asset.lanes.push(LaneLayout {
                dir: LaneDir::Backward,
                shift: -1.5 - 3.0 * i as f32,
            });
        }
        self
    }

    /// One-way layout with `count` forward lanes, inner first.
    pub fn with_one_way_lanes(mut self, count: u16) -> Self {
        for i in 0..count {
            self.asset.lanes.push(LaneLayout {
                dir: LaneDir::Forward,
                shift: -(count as f32 - 1.0) * 1.5 + 3.0 * i as f32,
            });
        }
        self
    }

    pub fn with_speed_limit(mut self, speed_limit: f32) -> Self {
        self.asset.speed_limit = speed_limit;
        self
    }

    pub fn with_road_class(mut self, road_class: i32) -> Self {
        self.asset.road_class = road_class;
        self
    }

    pub fn build(self) -> NetworkAsset {
        self.asset
    }
}

/// A vehicle model: the dimensions the simulation needs.
#[derive(Debug, Clone)]
pub struct VehicleAsset {
    pub name: String,
    /// Bumper-to-bumper length in metres.
    pub length: f32,
    pub wheel_base: f32,
}

impl VehicleAsset {
    pub fn new(name: impl Into<String>, length: f32) -> Self {
        VehicleAsset {
            name: name.into(),
            length,
            wheel_base: length * 0.6,
        }
    }
}

/// A building model.
#[derive(Debug, Clone)]
pub struct BuildingAsset {
    pub name: String,
    /// Selection radius for hover picking.
    pub radius: f32,
    /// Number of private parking spots the building provides.
    pub parking_spots: u16,
}

impl BuildingAsset {
    pub fn new(name: impl Into<String>) -> Self {
        BuildingAsset {
            name: name.into(),
            radius: 6.0,
            parking_spots: 0,
        }
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_parking_spots(mut self, spots: u16) -> Self {
        self.parking_spots = spots;
        self
    }
}

/// Registry of all assets known to a session. Passed explicitly to the
/// session; there are no asset globals in the core.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    network_assets: IndexMap<NetworkAssetId, NetworkAsset>,
    vehicle_assets: IndexMap<VehicleAssetId, VehicleAsset>,
    building_assets: IndexMap<BuildingAssetId, BuildingAsset>,
    next_network: u32,
    next_vehicle: u32,
    next_building: u32,
}

impl AssetRegistry {
    pub fn new() -> Self {
        AssetRegistry::default()
    }

    pub fn add_network_asset(&mut self, asset: NetworkAsset) -> NetworkAssetId {
        let id = NetworkAssetId(self.next_network);
        self.next_network += 1;
        self.network_assets.insert(id, asset);
        id
    }

    pub fn add_vehicle_asset(&mut self, asset: VehicleAsset) -> VehicleAssetId {
        let id = VehicleAssetId(self.next_vehicle);
        self.next_vehicle += 1;
        self.vehicle_assets.insert(id, asset);
        id
    }

    pub fn add_building_asset(&mut self, asset: BuildingAsset) -> BuildingAssetId {
        let id = BuildingAssetId(self.next_building);
        self.next_building += 1;
        self.building_assets.insert(id, asset);
        id
    }

    /// Panics on an unknown id; dangling asset references are a topology
    /// bug caught at mutation time, never mid-tick.
    pub fn network_asset(&self, id: NetworkAssetId) -> &NetworkAsset {
        self.network_assets
            .get(&id)
            .expect("network asset id not registered")
    }

    pub fn vehicle_asset(&self, id: VehicleAssetId) -> &VehicleAsset {
        self.vehicle_assets
            .get(&id)
            .expect("vehicle asset id not registered")
    }

    pub fn building_asset(&self, id: BuildingAssetId) -> &BuildingAsset {
        self.building_assets
            .get(&id)
            .expect("building asset id not registered")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_way_layout_order() {
        let asset = NetworkAsset::new("avenue").with_two_way_lanes(2).build();
        assert_eq!(asset.lanes.len(), 4);
        assert_eq!(asset.lanes_in_dir(LaneDir::Forward), 2);
        // inner-before-outer within each direction
        assert!(
            asset.lanes[0].shift.abs() < asset.lanes[1].shift.abs(),
            "Forward lanes should be listed inner to outer"
        );
        assert!(
            asset.lanes[2].shift.abs() < asset.lanes[3].shift.abs(),
            "Backward lanes should be listed inner to outer"
        );
    }

    #[test]
    fn test_registry_ids_are_stable() {
        let mut reg = AssetRegistry::new();
        let a = reg.add_vehicle_asset(VehicleAsset::new("sedan", 4.0));
        let b = reg.add_vehicle_asset(VehicleAsset::new("van", 5.2));
        assert_ne!(a, b);
        assert_eq!(reg.vehicle_asset(a).name, "sedan");
        assert_eq!(reg.vehicle_asset(b).name, "van");
    }
}
