//! The result of a routing query.

use crate::network::SegmentId;

/// An ordered run of segments from start to destination, with the travel-time
/// cost the router assigned to it.
#[derive(Debug, Clone)]
pub struct RoutePath {
    segments: Vec<SegmentId>,
    cost: f32,
}

impl RoutePath {
    /// # Panics
    /// Panics if the segment run is shorter than two segments; single-segment
    /// paths are unsupported by the router.
    pub fn new(segments: Vec<SegmentId>, cost: f32) -> Self {
        assert!(
            segments.len() >= 2,
            "a route must span at least two segments, got {}",
            segments.len()
        );
        RoutePath { segments, cost }
    }

    pub fn segments(&self) -> &[SegmentId] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<SegmentId> {
        self.segments
    }

    pub fn cost(&self) -> f32 {
        self.cost
    }
}
