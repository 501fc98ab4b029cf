//! Tick-boundary state snapshots.
//!
//! The core has no on-disk format of its own; a session is reconstructible
//! from the road topology, the population and per-trip progress at a tick
//! boundary. The snapshot carries exactly that, and dumps to JSON for
//! external consumers.

use crate::entities::person::{PersonId, VehicleState};
use crate::navigation::MotionKind;
use crate::network::{NodeId, SegmentId};
use crate::simulation::session::Session;
use crate::trips::TripId;
use serde_json::{json, Value};

/// State of a single vehicle at a tick boundary.
#[derive(Debug, Clone)]
pub struct VehicleSnapshot {
    pub trip: TripId,
    pub person: PersonId,
    pub pos: [f32; 3],
    pub speed: f32,
    pub brake: f32,
    pub motion_kind: MotionKind,
    pub motion_idx: i32,
    pub bez_t: f32,
    pub path: Vec<SegmentId>,
}

/// State of a traffic light at a tick boundary.
#[derive(Debug, Clone)]
pub struct LightSnapshot {
    pub node: NodeId,
    pub phase: usize,
    pub elapsed: f32,
}

/// Everything needed to reconstruct a session at a tick boundary.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub step: u64,
    pub sim_time: f32,
    pub nodes: Vec<(NodeId, [f32; 3])>,
    pub segments: Vec<(SegmentId, NodeId, NodeId)>,
    pub persons: Vec<PersonSnapshot>,
    pub vehicles: Vec<VehicleSnapshot>,
    pub lights: Vec<LightSnapshot>,
}

/// Population entry: home, assets and the vehicle's whereabouts.
#[derive(Debug, Clone)]
pub struct PersonSnapshot {
    pub person: PersonId,
    pub home: crate::entities::building::BuildingId,
    pub aggressiveness: f32,
    pub tint: [f32; 3],
    pub state: String,
}

/// Captures the current session state.
pub fn snapshot(session: &Session) -> SessionSnapshot {
    let nodes = session
        .network
        .node_ids()
        .into_iter()
        .map(|nid| {
            let p = session.network.node(nid).pos;
            (nid, [p.x, p.y, p.z])
        })
        .collect();

    let segments = session
        .network
        .segment_ids()
        .into_iter()
        .map(|sid| {
            let seg = session.network.segment(sid);
            (sid, seg.node_a, seg.node_b)
        })
        .collect();

    let persons = session
        .persons
        .iter()
        .map(|(&pid, p)| PersonSnapshot {
            person: pid,
            home: p.home_building,
            aggressiveness: p.aggressiveness,
            tint: p.tint,
            state: match p.vehicle_state {
                VehicleState::Pocket => "pocket".to_string(),
                VehicleState::Parked(spot) => format!("parked:{}", spot),
                VehicleState::Trip(tid) => format!("trip:{}", tid),
            },
        })
        .collect();

    let mut vehicles: Vec<VehicleSnapshot> = session
        .trips
        .iter()
        .map(|(&tid, trip)| {
            let pos = trip.sim.front_pos;
            VehicleSnapshot {
                trip: tid,
                person: trip.person,
                pos: [pos.x, pos.y, pos.z],
                speed: trip.sim.speed,
                brake: trip.sim.brake,
                motion_kind: trip.sim.mot.kind,
                motion_idx: trip.sim.mot.idx,
                bez_t: trip.sim.bez_t,
                path: trip.nav.path.clone(),
            }
        })
        .collect();
    vehicles.sort_by_key(|v| v.trip);

    let lights = session
        .network
        .node_ids()
        .into_iter()
        .filter_map(|nid| {
            let light = session.network.node(nid).traffic_light.as_ref()?;
            Some(LightSnapshot {
                node: nid,
                phase: light.current_phase(),
                elapsed: light.elapsed(),
            })
        })
        .collect();

    SessionSnapshot {
        step: session.steps(),
        sim_time: session.sim_time(),
        nodes,
        segments,
        persons,
        vehicles,
        lights,
    }
}

impl SessionSnapshot {
    pub fn to_json(&self) -> Value {
        json!({
            "step": self.step,
            "sim_time": self.sim_time,
            "nodes": self.nodes.iter().map(|(id, pos)| json!({
                "id": id.0, "pos": pos,
            })).collect::<Vec<_>>(),
            "segments": self.segments.iter().map(|(id, a, b)| json!({
                "id": id.0, "node_a": a.0, "node_b": b.0,
            })).collect::<Vec<_>>(),
            "persons": self.persons.iter().map(|p| json!({
                "id": p.person.0,
                "home": p.home.0,
                "aggressiveness": p.aggressiveness,
                "tint": p.tint,
                "state": p.state,
            })).collect::<Vec<_>>(),
            "vehicles": self.vehicles.iter().map(|v| json!({
                "trip": v.trip,
                "person": v.person.0,
                "pos": v.pos,
                "speed": v.speed,
                "brake": v.brake,
                "motion": format!("{}", v.motion_kind),
                "motion_idx": v.motion_idx,
                "bez_t": v.bez_t,
                "path": v.path.iter().map(|s| s.0).collect::<Vec<_>>(),
            })).collect::<Vec<_>>(),
            "lights": self.lights.iter().map(|l| json!({
                "node": l.node.0,
                "phase": l.phase,
                "elapsed": l.elapsed,
            })).collect::<Vec<_>>(),
        })
    }
}
