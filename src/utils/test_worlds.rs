//! Deterministic fixture worlds for tests, benchmarks and scripted
//! scenarios.

use crate::assets::{
    kmh, AssetRegistry, BuildingAsset, NetworkAsset, VehicleAsset, VehicleAssetId,
};
use crate::agents::SimVehicle;
use crate::entities::building::BuildingId;
use crate::entities::person::{Person, VehicleState};
use crate::geom::Vec3;
use crate::navigation::{curve_speed_limit, Motion, MotionKind, NavEndpoint, VehNav};
use crate::network::{NodeId, SegLane, SegmentId};
use crate::simulation::{FlatTerrain, Session};
use crate::trips::{TripId, VehicleTrip};

/// A fixture world plus the handles tests need.
pub struct TestWorld {
    pub session: Session,
    pub segments: Vec<SegmentId>,
    pub buildings: Vec<BuildingId>,
    pub vehicle_asset: VehicleAssetId,
}

/// A straight one-way corridor of `n` segments with `lanes` forward lanes,
/// 100 m node spacing and a building near each end.
pub fn straight_corridor(n: usize, lanes: u16) -> TestWorld {
    assert!(n >= 2, "corridor fixtures need at least two segments");
    let mut assets = AssetRegistry::new();
    let road = assets.add_network_asset(
        NetworkAsset::new("oneway")
            .with_width(4.0 + 3.0 * lanes as f32)
            .with_one_way_lanes(lanes)
            .with_speed_limit(kmh(50.0))
            .build(),
    );
    let sedan = assets.add_vehicle_asset(VehicleAsset::new("sedan", 4.0));
    let house = assets.add_building_asset(BuildingAsset::new("house"));

    let mut session = Session::with_seed(assets, 42);
    let nodes: Vec<NodeId> = (0..=n)
        .map(|i| session.network.add_node(Vec3::new(i as f32 * 100.0, 0.0, 0.0)))
        .collect();
    let segments: Vec<SegmentId> = (0..n)
        .map(|i| {
            session
                .network
                .add_segment(&session.assets, road, nodes[i], nodes[i + 1])
                .expect("corridor segments are valid")
        })
        .collect();

    let b0 = session.add_building(house, Vec3::new(30.0, -15.0, 0.0), segments[0]);
    let b1 = session.add_building(
        house,
        Vec3::new((n as f32 - 1.0) * 100.0 + 70.0, -15.0, 0.0),
        segments[n - 1],
    );

    TestWorld {
        session,
        segments,
        buildings: vec![b0, b1],
        vehicle_asset: sedan,
    }
}

/// A symmetric 4-way crossing. `arms` and `buildings` are ordered east,
/// north, west, south; each arm runs from the center node outward.
pub struct CrossWorld {
    pub session: Session,
    pub center: NodeId,
    pub arms: [SegmentId; 4],
    pub buildings: [BuildingId; 4],
    pub vehicle_asset: VehicleAssetId,
}

pub fn four_way_cross(signalized: bool) -> CrossWorld {
    let mut assets = AssetRegistry::new();
    let road = assets.add_network_asset(
        NetworkAsset::new("street")
            .with_width(8.0)
            .with_two_way_lanes(1)
            .with_speed_limit(kmh(50.0))
            .build(),
    );
    let sedan = assets.add_vehicle_asset(VehicleAsset::new("sedan", 4.0));
    let house = assets.add_building_asset(BuildingAsset::new("house"));

    let mut session = Session::with_seed(assets, 42);
    let center = session.network.add_node(Vec3::ZERO);

    let ends = [
        Vec3::new(100.0, 0.0, 0.0),
        Vec3::new(0.0, 100.0, 0.0),
        Vec3::new(-100.0, 0.0, 0.0),
        Vec3::new(0.0, -100.0, 0.0),
    ];
    let mut arms = [SegmentId(0); 4];
    for (i, end) in ends.iter().enumerate() {
        let node = session.network.add_node(*end);
        arms[i] = session
            .network
            .add_segment(&session.assets, road, center, node)
            .expect("cross arms are valid");
    }

    let building_spots = [
        Vec3::new(70.0, -14.0, 0.0),
        Vec3::new(14.0, 70.0, 0.0),
        Vec3::new(-70.0, 14.0, 0.0),
        Vec3::new(-14.0, -70.0, 0.0),
    ];
    let mut buildings = [BuildingId(0); 4];
    for (i, pos) in building_spots.iter().enumerate() {
        buildings[i] = session.add_building(house, *pos, arms[i]);
    }

    if signalized {
        session.toggle_traffic_light(center);
    }

    CrossWorld {
        session,
        center,
        arms,
        buildings,
        vehicle_asset: sedan,
    }
}

/// An `n x n` grid of two-way streets, 100 m spacing. Used by routing
/// benchmarks.
pub fn grid_world(n: usize) -> TestWorld {
    let mut assets = AssetRegistry::new();
    let road = assets.add_network_asset(
        NetworkAsset::new("street")
            .with_width(8.0)
            .with_two_way_lanes(1)
            .with_speed_limit(kmh(50.0))
            .build(),
    );
    let sedan = assets.add_vehicle_asset(VehicleAsset::new("sedan", 4.0));
    let _ = assets.add_building_asset(BuildingAsset::new("house"));

    let mut session = Session::with_seed(assets, 42);
    let mut nodes = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            nodes.push(session.place_node(x as f32 * 100.0, y as f32 * 100.0, &FlatTerrain));
        }
    }
    let mut segments = Vec::new();
    for y in 0..n {
        for x in 0..n {
            if x + 1 < n {
                segments.push(
                    session
                        .network
                        .add_segment(&session.assets, road, nodes[y * n + x], nodes[y * n + x + 1])
                        .expect("grid segment"),
                );
            }
            if y + 1 < n {
                segments.push(
                    session
                        .network
                        .add_segment(&session.assets, road, nodes[y * n + x], nodes[(y + 1) * n + x])
                        .expect("grid segment"),
                );
            }
        }
    }

    TestWorld {
        session,
        segments,
        buildings: Vec::new(),
        vehicle_asset: sedan,
    }
}

/// Places a scripted trip mid-path: the vehicle materializes on
/// `path[seg_index]` at `bez_t` in the given lane, already driving, with
/// `building` as both its origin and destination endpoint.
///
/// This is the debug-spawn analogue used by scenario tests; regular trips
/// go through `Session::start_trip`.
#[allow(clippy::too_many_arguments)]
pub fn spawn_scripted_trip(
    session: &mut Session,
    vehicle_asset: VehicleAssetId,
    path: Vec<SegmentId>,
    seg_index: usize,
    lane: u16,
    bez_t: f32,
    building: BuildingId,
    aggressiveness: f32,
) -> TripId {
    assert!(seg_index < path.len());

    let home = building;
    let pid = session.insert_person(
        Person::new(home, vehicle_asset)
            .with_aggressiveness(aggressiveness)
            .build(),
    );
    let tid = session.alloc_trip_id();

    let length = session.assets.vehicle_asset(vehicle_asset).length;
    let aggress_mul = (1.1 + aggressiveness).clamp(0.7, 1.5);
    let mut sim = SimVehicle::new(vehicle_asset, length, [0.8, 0.8, 0.8], aggress_mul);

    let sl = SegLane {
        seg: path[seg_index],
        lane,
    };
    let net = &session.network;
    let mut mot = Motion {
        idx: (2 * seg_index + 1) as i32,
        kind: MotionKind::Segment,
        bezier: sl.bezier(net),
        cur_speedlim: sl.speed_limit(net),
        next_speedlim: session.settings.endpoint_speed,
        cur_lane: Some(sl),
        ..Motion::default()
    };

    if seg_index + 1 < path.len() {
        let next_seg = path[seg_index + 1];
        let next = sl
            .lane_data(net)
            .connections
            .iter()
            .copied()
            .find(|c| c.seg == next_seg)
            .or_else(|| {
                let node = net.between(sl.seg, next_seg)?;
                net.node(node).out_lanes_of(next_seg).first().copied()
            });
        mot.next_lane = next;
        if let Some(nl) = next {
            let curve = net.connection_curve(sl, nl);
            mot.next_speedlim = curve_speed_limit(net, &session.settings, &curve, sl, nl);
        }
    }

    sim.mot = mot;
    sim.bez_t = bez_t;
    let res = sim.mot.bezier.eval_with_curv(bez_t);
    sim.bez_speed = res.vel.length().max(1.0);
    sim.front_pos = res.pos;
    sim.rear_pos = res.pos - res.vel.normalize_safe() * length;

    sl.vehicles_mut(&mut session.network)
        .insert_at_spot(&session.trips, tid, bez_t);

    let nav = VehNav::new(path, NavEndpoint::new(home), NavEndpoint::new(building));
    session.trips.insert(tid, VehicleTrip::new(pid, sim, nav));

    let person = session.persons.get_mut(&pid).expect("just inserted");
    person.cur_building = None;
    person.vehicle_state = VehicleState::Trip(tid);

    tid
}
