//! The phase machine driving a node's signals.
//!
//! Each in-lane of the node owns a stable *signal slot* (its index in the
//! node's sorted in-lane list); a phase is a 64-bit mask of slots that get
//! green together. Nodes needing more than 64 slots must be subdivided and
//! simply get no light.

use crate::network::{classify_turn, Network, NodeId, SegLane, Turns};
use crate::traffic_lights::signals::Signal;

pub const DEFAULT_GREEN: f32 = 8.0;
pub const DEFAULT_YELLOW: f32 = 2.0;
pub const DEFAULT_ALL_RED: f32 = 1.0;

/// How phases are generated from node geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrafficLightMode {
    /// Each segment's approaches get an exclusive phase.
    ExclusiveSegments,
    /// Opposing straight approaches share a phase; an unpaired arm gets a
    /// phase of its own.
    #[default]
    TwoPhase,
}

/// A fixed-program traffic light.
#[derive(Debug, Clone)]
pub struct TrafficLight {
    phases: Vec<u64>,
    green: f32,
    yellow: f32,
    all_red: f32,
    phase_idx: usize,
    timer: f32,
}

impl TrafficLight {
    /// Builds the phase program for a node, or `None` when the node has no
    /// usable approaches or needs more than 64 signal slots.
    pub fn for_node(net: &Network, nid: NodeId) -> Option<TrafficLight> {
        Self::for_node_with_mode(net, nid, TrafficLightMode::default())
    }

    pub fn for_node_with_mode(
        net: &Network,
        nid: NodeId,
        mode: TrafficLightMode,
    ) -> Option<TrafficLight> {
        let node = net.node(nid);
        if node.in_lanes.is_empty() || node.segments.len() < 2 {
            return None;
        }
        if node.in_lanes.len() > 64 {
            return None;
        }

        let phases = match mode {
            TrafficLightMode::ExclusiveSegments => exclusive_segment_phases(net, nid),
            TrafficLightMode::TwoPhase => two_phase_phases(net, nid),
        };
        if phases.is_empty() {
            return None;
        }

        Some(TrafficLight {
            phases,
            green: DEFAULT_GREEN,
            yellow: DEFAULT_YELLOW,
            all_red: DEFAULT_ALL_RED,
            phase_idx: 0,
            timer: 0.0,
        })
    }

    pub fn with_timings(mut self, green: f32, yellow: f32, all_red: f32) -> Self {
        self.green = green;
        self.yellow = yellow;
        self.all_red = all_red;
        self
    }

    pub fn num_phases(&self) -> usize {
        self.phases.len()
    }

    pub fn current_phase(&self) -> usize {
        self.phase_idx
    }

    pub fn phase_mask(&self, idx: usize) -> u64 {
        self.phases[idx]
    }

    pub fn elapsed(&self) -> f32 {
        self.timer
    }

    pub fn cycle_time(&self) -> f32 {
        self.green + self.yellow + self.all_red
    }

    /// Advances the phase timer, wrapping to the next phase after
    /// green + yellow + all-red clearance.
    pub fn update(&mut self, dt: f32) {
        self.timer += dt;
        if self.timer >= self.cycle_time() {
            self.phase_idx = (self.phase_idx + 1) % self.phases.len();
            self.timer = 0.0;
        }
    }

    pub fn reset(&mut self) {
        self.phase_idx = 0;
        self.timer = 0.0;
    }

    /// Signal colour for a slot at the current phase time.
    pub fn signal(&self, slot: u8) -> Signal {
        let in_phase = self.phases[self.phase_idx] & (1u64 << slot) != 0;
        if !in_phase {
            return Signal::Red;
        }
        if self.timer < self.green {
            Signal::Green
        } else if self.timer < self.green + self.yellow {
            Signal::Yellow
        } else {
            Signal::Red
        }
    }

    /// Mask of slots currently showing green.
    pub fn green_mask(&self) -> u64 {
        if self.timer < self.green {
            self.phases[self.phase_idx]
        } else {
            0
        }
    }
}

/// Signal for a specific in-lane of a node, if the node is signalized.
pub fn lane_signal(net: &Network, nid: NodeId, lane: SegLane) -> Option<Signal> {
    let node = net.node(nid);
    let light = node.traffic_light.as_ref()?;
    let slot = node.signal_slot(lane)?;
    Some(light.signal(slot))
}

fn slot_mask_of_segment(net: &Network, nid: NodeId, seg_idx: usize) -> u64 {
    let node = net.node(nid);
    let seg = node.segments[seg_idx];
    let mut mask = 0u64;
    for (slot, sl) in node.in_lanes.iter().enumerate() {
        if sl.seg == seg {
            mask |= 1u64 << slot;
        }
    }
    mask
}

fn exclusive_segment_phases(net: &Network, nid: NodeId) -> Vec<u64> {
    let count = net.node(nid).segments.len();
    (0..count)
        .map(|i| slot_mask_of_segment(net, nid, i))
        .filter(|&m| m != 0)
        .collect()
}

fn two_phase_phases(net: &Network, nid: NodeId) -> Vec<u64> {
    let node = net.node(nid);
    let seg_ids = node.segments.clone();
    let mut remaining: Vec<usize> = (0..seg_ids.len()).collect();
    let mut phases = Vec::new();

    while !remaining.is_empty() {
        let seg_idx = remaining.remove(0);

        // pair with the first remaining arm that reads as straight-through
        let mut partner = None;
        for (j, &other_idx) in remaining.iter().enumerate() {
            let turn = classify_turn(net, nid, seg_ids[seg_idx], seg_ids[other_idx]);
            if turn == Turns::STRAIGHT {
                partner = Some(remaining.remove(j));
                break;
            }
        }

        let mut mask = slot_mask_of_segment(net, nid, seg_idx);
        if let Some(p) = partner {
            mask |= slot_mask_of_segment(net, nid, p);
        }
        if mask != 0 {
            phases.push(mask);
        }
    }
    phases
}
