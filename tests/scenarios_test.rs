//! End-to-end scenarios: car following, intersection right-of-way, signal
//! compliance, parking, bulldozing and repathing, plus structural
//! invariants swept over a running world.

use continuous_traffic_sim_core::entities::{ParkingRef, ParkingState, VehicleState};
use continuous_traffic_sim_core::interact::{remove_entity, Selection};
use continuous_traffic_sim_core::navigation::MotionKind;
use continuous_traffic_sim_core::network::SegLane;
use continuous_traffic_sim_core::simulation::Session;
use continuous_traffic_sim_core::trips::TripId;
use continuous_traffic_sim_core::utils::test_worlds::{
    four_way_cross, spawn_scripted_trip, straight_corridor,
};

const DT: f32 = 1.0 / 60.0;

fn advance_secs(session: &mut Session, secs: f32) {
    let ticks = (secs / DT).round() as usize;
    for _ in 0..ticks {
        session.advance(DT);
    }
}

/// Every lane list must stay sorted nearest-exit-first with non-negative
/// gaps, and no trip may appear in two lane lists at once.
fn check_lane_invariants(session: &Session) {
    let mut seen: Vec<TripId> = Vec::new();
    for sid in session.network.segment_ids() {
        let seg = session.network.segment(sid);
        for lane in &seg.lanes {
            let list = &lane.vehicles.list;
            for pair in list.windows(2) {
                let ahead = &session.trips[&pair[0]].sim;
                let behind = &session.trips[&pair[1]].sim;
                assert!(
                    ahead.bez_t > behind.bez_t,
                    "lane list must be ordered nearest-exit first"
                );
                let gap = (ahead.bez_t - behind.bez_t) * behind.bez_speed - ahead.length;
                assert!(
                    gap > -0.5,
                    "follower overlaps its leader by {} m",
                    -gap
                );
            }
            for tid in list {
                assert!(
                    !seen.contains(tid),
                    "trip {} appears in more than one lane list",
                    tid
                );
                seen.push(*tid);
            }
        }
    }
}

/// `rear_k` always trails `front_k` by exactly the vehicle length.
fn check_tracked_invariants(session: &Session) {
    for nid in session.network.node_ids() {
        for agent in &session.network.node(nid).agents.tracked {
            let Some(trip) = session.trips.get(&agent.trip) else {
                panic!("node tracker holds a dead trip");
            };
            assert!(agent.rear_k <= agent.front_k);
            let span = agent.front_k - agent.rear_k;
            assert!(
                (span - trip.sim.length).abs() < 1e-3,
                "front/rear span {} deviates from vehicle length {}",
                span,
                trip.sim.length
            );
        }
    }
}

/// S1: two cars on one lane of a straight road. The follower must hold a
/// safe gap and still reach cruising speed.
#[test]
fn test_following_straight_road() {
    let mut world = straight_corridor(2, 2);
    world.session.settings.stay_time = 1000.0;

    let path = world.segments.clone();
    let dest = world.buildings[1];
    let lead = spawn_scripted_trip(
        &mut world.session,
        world.vehicle_asset,
        path.clone(),
        0,
        0,
        0.10,
        dest,
        -0.1,
    );
    let follower = spawn_scripted_trip(
        &mut world.session,
        world.vehicle_asset,
        path,
        0,
        0,
        0.05,
        dest,
        -0.1,
    );

    advance_secs(&mut world.session, 5.0);

    let lead_sim = &world.session.trips[&lead].sim;
    let follow_sim = &world.session.trips[&follower].sim;
    assert_eq!(follow_sim.mot.kind, MotionKind::Segment);

    assert!(
        follow_sim.speed > 10.5 && follow_sim.speed < 14.0,
        "follower should cruise near the limit, got {} m/s",
        follow_sim.speed
    );

    // both still on the first segment: compare curve parameters directly
    assert_eq!(lead_sim.mot.cur_lane, follow_sim.mot.cur_lane);
    let gap = (lead_sim.bez_t - follow_sim.bez_t) * follow_sim.bez_speed;
    assert!(
        gap >= lead_sim.length + 0.9,
        "longitudinal gap {} must cover lead length plus safety",
        gap
    );

    check_lane_invariants(&world.session);
    check_tracked_invariants(&world.session);
}

/// S2: unsignalized cross, right-before-left. A crossing turner
/// (north arm -> east arm) counts as the left vehicle against the
/// east-arm straight, because the straight's approach arm classifies as
/// right of the turner's. The turner must halt inside its approach despite
/// its head start; the straight crosses without ever braking hard and
/// finishes first.
#[test]
fn test_cross_turn_yields_right_before_left() {
    let mut world = four_way_cross(false);
    world.session.settings.stay_time = 1000.0;

    // the yielding rule, independent of spawn distances
    assert_eq!(
        continuous_traffic_sim_core::network::classify_turn(
            &world.session.network,
            world.center,
            world.arms[1],
            world.arms[0],
        ),
        continuous_traffic_sim_core::network::Turns::RIGHT,
        "the straight's arm must classify as right of the turner's approach"
    );

    // straight: east arm -> west arm, far out; turner: north arm -> east
    // arm, close to the line so it arrives first and still has to wait
    let straight = spawn_scripted_trip(
        &mut world.session,
        world.vehicle_asset,
        vec![world.arms[0], world.arms[2]],
        0,
        1,
        0.55,
        world.buildings[2],
        -0.1,
    );
    let turner = spawn_scripted_trip(
        &mut world.session,
        world.vehicle_asset,
        vec![world.arms[1], world.arms[0]],
        0,
        1,
        0.90,
        world.buildings[0],
        -0.1,
    );

    let mut straight_min_brake = f32::INFINITY;
    let mut turner_min_speed = f32::INFINITY;
    let mut straight_done: Option<f32> = None;
    let mut turner_done: Option<f32> = None;

    for _ in 0..(120.0 / DT) as usize {
        world.session.advance(DT);
        let t = world.session.sim_time();

        match world.session.trips.get(&straight) {
            Some(trip) => straight_min_brake = straight_min_brake.min(trip.sim.brake),
            None => straight_done = straight_done.or(Some(t)),
        }
        match world.session.trips.get(&turner) {
            Some(trip) => {
                if t > 2.0 && straight_done.is_none() {
                    turner_min_speed = turner_min_speed.min(trip.sim.speed);
                }
            }
            None => turner_done = turner_done.or(Some(t)),
        }

        check_tracked_invariants(&world.session);
    }

    assert!(
        turner_min_speed < 1.0,
        "the turner must brake to a crawl while yielding, min speed {}",
        turner_min_speed
    );
    assert!(
        straight_min_brake >= 0.2,
        "the priority vehicle must not be braked below 0.2, got {}",
        straight_min_brake
    );

    let straight_done = straight_done.expect("straight trip must finish");
    let turner_done = turner_done.expect("turner trip must finish");
    assert!(
        straight_done < turner_done,
        "the straight ({}s) finishes before the yielding turner ({}s)",
        straight_done,
        turner_done
    );
}

/// S3: signalized cross. Phase 0 serves the north-south pair, so an
/// east-approach vehicle must halt at the line and enter only after the
/// full green + yellow + all-red interval.
#[test]
fn test_signal_red_halt() {
    let mut world = four_way_cross(true);
    world.session.settings.stay_time = 1000.0;

    let light = world
        .session
        .network
        .node(world.center)
        .traffic_light
        .as_ref()
        .expect("cross is signalized");
    assert_eq!(light.num_phases(), 2);
    let cycle = light.cycle_time();
    assert!((cycle - 11.0).abs() < 1e-4, "default timing is 8+2+1");

    // east approach, crossing to the west arm
    let tid = spawn_scripted_trip(
        &mut world.session,
        world.vehicle_asset,
        vec![world.arms[0], world.arms[2]],
        0,
        1,
        0.80,
        world.buildings[2],
        -0.1,
    );

    let mut entered: Option<f32> = None;
    let mut stopped_at_line = false;

    for _ in 0..(30.0 / DT) as usize {
        world.session.advance(DT);
        let t = world.session.sim_time();

        let phase = world
            .session
            .network
            .node(world.center)
            .traffic_light
            .as_ref()
            .map(|l| l.current_phase());

        if let Some(trip) = world.session.trips.get(&tid) {
            if trip.sim.mot.kind == MotionKind::Node && entered.is_none() {
                entered = Some(t);
            }
            if phase == Some(0) && trip.sim.mot.kind == MotionKind::Segment {
                if trip.sim.bez_t > 0.95 && trip.sim.speed < 0.3 {
                    stopped_at_line = true;
                }
            }
        }
    }

    assert!(
        stopped_at_line,
        "the vehicle must come to rest at the stop line during red"
    );
    let entered = entered.expect("vehicle must cross on green");
    assert!(
        entered >= 10.9,
        "crossing may only start after green+yellow+clearance, got {}s",
        entered
    );
}

/// S4: one lot spot, two arrivals. The first reserves the lot, the second
/// falls back to street parking; both finish parked.
#[test]
fn test_parking_reservation_fallback() {
    let mut world = straight_corridor(3, 1);
    world.session.settings.stay_time = 1000.0;

    // destination with a single lot spot, plus curbside fallback
    let dest_seg = world.segments[2];
    let dest = {
        let asset = world.session.assets.add_building_asset(
            continuous_traffic_sim_core::assets::BuildingAsset::new("shop").with_parking_spots(1),
        );
        world.session.add_building(
            asset,
            continuous_traffic_sim_core::geom::Vec3::new(250.0, -16.0, 0.0),
            dest_seg,
        )
    };
    world.session.add_street_parking(dest_seg, 2);

    let path = world.segments.clone();
    let first = spawn_scripted_trip(
        &mut world.session,
        world.vehicle_asset,
        path.clone(),
        0,
        0,
        0.5,
        dest,
        -0.1,
    );
    let second = spawn_scripted_trip(
        &mut world.session,
        world.vehicle_asset,
        path,
        0,
        0,
        0.2,
        dest,
        -0.1,
    );

    let first_person = world.session.trips[&first].person;
    let second_person = world.session.trips[&second].person;

    advance_secs(&mut world.session, 120.0);

    assert!(
        world.session.trips.is_empty(),
        "both trips should have finished"
    );

    let lot_ref = ParkingRef::Building(dest, 0);
    let lot = &world.session.buildings[&dest].parking[0];
    assert_eq!(
        lot.state,
        ParkingState::Occupied(first_person),
        "the leading vehicle takes the single lot spot"
    );
    assert_eq!(
        world.session.persons[&first_person].vehicle_state,
        VehicleState::Parked(lot_ref)
    );

    match world.session.persons[&second_person].vehicle_state {
        VehicleState::Parked(ParkingRef::Street(sid, idx)) => {
            assert_eq!(sid, dest_seg);
            let spot = &world.session.network.segment(sid).parking[idx as usize];
            assert_eq!(spot.state, ParkingState::Occupied(second_person));
        }
        other => panic!("second vehicle should street-park, got {:?}", other),
    }
}

/// S5: bulldozing a mid-path segment cancels the trip and leaves no
/// dangling references anywhere.
#[test]
fn test_bulldoze_cancels_trip() {
    let mut world = straight_corridor(5, 1);
    world.session.settings.stay_time = 1000.0;

    let home = world.buildings[0];
    let tid = spawn_scripted_trip(
        &mut world.session,
        world.vehicle_asset,
        world.segments.clone(),
        0,
        0,
        0.3,
        home,
        -0.1,
    );
    let pid = world.session.trips[&tid].person;

    advance_secs(&mut world.session, 2.0);
    assert!(world.session.trips.contains_key(&tid));

    remove_entity(&mut world.session, Selection::Segment(world.segments[2]));

    assert!(
        !world.session.trips.contains_key(&tid),
        "trips touching the removed segment must be cancelled"
    );
    let person = &world.session.persons[&pid];
    assert_eq!(person.vehicle_state, VehicleState::Pocket, "vehicle pockets");
    assert_eq!(person.cur_building, Some(home), "person returns home");

    // full traversal: nothing may still reference the trip
    for sid in world.session.network.segment_ids() {
        for lane in &world.session.network.segment(sid).lanes {
            assert!(
                !lane.vehicles.list.contains(&tid),
                "lane list on {} still references the cancelled trip",
                sid
            );
        }
    }
    for nid in world.session.network.node_ids() {
        assert!(
            !world.session.network.node(nid).agents.contains(tid),
            "node tracker still references the cancelled trip"
        );
    }
}

/// S6: repathing mid-segment keeps the committed lane and the vehicle's
/// kinematic state, and the new path starts at the current segment.
#[test]
fn test_repath_keeps_committed_lane() {
    let mut world = straight_corridor(5, 1);
    world.session.settings.stay_time = 1000.0;

    // an extra destination on segment #4
    let branch_dest = {
        let asset = world
            .session
            .assets
            .add_building_asset(continuous_traffic_sim_core::assets::BuildingAsset::new("cafe"));
        world.session.add_building(
            asset,
            continuous_traffic_sim_core::geom::Vec3::new(330.0, -14.0, 0.0),
            world.segments[3],
        )
    };

    let tid = spawn_scripted_trip(
        &mut world.session,
        world.vehicle_asset,
        world.segments.clone(),
        1,
        0,
        0.4,
        world.buildings[1],
        -0.1,
    );

    advance_secs(&mut world.session, 1.0);

    let (old_lane, old_bez_t, old_speed) = {
        let sim = &world.session.trips[&tid].sim;
        (sim.mot.cur_lane, sim.bez_t, sim.speed)
    };
    assert_eq!(
        old_lane,
        Some(SegLane { seg: world.segments[1], lane: 0 })
    );

    world
        .session
        .repath(tid, branch_dest)
        .expect("repath toward a reachable destination succeeds");

    let trip = &world.session.trips[&tid];
    assert_eq!(
        trip.nav.path.first().copied(),
        Some(world.segments[1]),
        "the new path starts with the committed segment"
    );
    assert_eq!(
        trip.nav.path.last().copied(),
        Some(world.segments[3]),
        "the new path ends at the new destination's segment"
    );
    assert_eq!(trip.sim.mot.cur_lane, old_lane, "committed lane survives");
    assert_eq!(trip.sim.bez_t, old_bez_t, "curve position is untouched");
    assert_eq!(trip.sim.speed, old_speed, "speed is untouched");
    assert_eq!(
        trip.sim.mot.next_lane.map(|sl| sl.seg),
        Some(world.segments[2]),
        "the next-lane choice stays on the following segment"
    );

    // the trip must still complete at the new destination
    advance_secs(&mut world.session, 90.0);
    assert!(world.session.trips.is_empty(), "repathed trip finishes");
    let pid = world.session.persons.keys().copied().next().unwrap();
    assert_eq!(
        world.session.persons[&pid].cur_building,
        Some(branch_dest),
        "person arrives at the repathed destination"
    );
}

/// Repathing on the END curve is refused.
#[test]
fn test_repath_refused_on_terminal_motion() {
    let mut world = straight_corridor(2, 1);
    world.session.settings.stay_time = 1000.0;

    let tid = spawn_scripted_trip(
        &mut world.session,
        world.vehicle_asset,
        world.segments.clone(),
        1,
        0,
        0.5,
        world.buildings[1],
        -0.1,
    );

    // final segment: no successor, so repath is refused
    let err = world.session.repath(tid, world.buildings[0]);
    assert!(err.is_err(), "repath on the destination segment is refused");
}

/// Determinism: the same seed and inputs reproduce the same trajectories.
#[test]
fn test_deterministic_replay() {
    let run = || {
        let mut world = four_way_cross(false);
        world.session.settings.stay_time = 1000.0;
        let _a = spawn_scripted_trip(
            &mut world.session,
            world.vehicle_asset,
            vec![world.arms[1], world.arms[3]],
            0,
            1,
            0.7,
            world.buildings[3],
            -0.1,
        );
        let _b = spawn_scripted_trip(
            &mut world.session,
            world.vehicle_asset,
            vec![world.arms[3], world.arms[2]],
            0,
            1,
            0.7,
            world.buildings[2],
            -0.1,
        );
        advance_secs(&mut world.session, 20.0);
        continuous_traffic_sim_core::simulation::snapshot(&world.session).to_json()
    };

    let first = run();
    let second = run();
    assert_eq!(first, second, "identical runs must produce identical state");
}
