//! Conflict geometry between two node traversals.
//!
//! Each connection's curve is thickened into a corridor by a fixed lane
//! half-width; the conflict is the pair of curve-parameter intervals over
//! which the two corridors overlap. Results are cached per node under an
//! order-normalized key so `a vs b` and `b vs a` share one entry.

use crate::geom::{line_segment_intersect, Bezier};
use crate::network::{Connection, Network};
use indexmap::IndexMap;

/// Subdivision count for corridor polylines. Raising it trades cache size
/// for detection precision.
pub const COLLISION_STEPS: u32 = 4;
/// Corridor half-width in metres.
pub const LANE_COLLISION_R: f32 = 1.3;

/// Order-normalized cache key; `a < b` under the connection ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConflictKey {
    pub a: Connection,
    pub b: Connection,
}

/// Curve-parameter intervals where two corridors overlap. All fields stay at
/// their infinities when the corridors never touch.
#[derive(Debug, Clone, Copy)]
pub struct Conflict {
    pub a_t0: f32,
    pub a_t1: f32,
    pub b_t0: f32,
    pub b_t1: f32,
}

impl Conflict {
    pub fn empty() -> Self {
        Conflict {
            a_t0: f32::INFINITY,
            a_t1: f32::NEG_INFINITY,
            b_t0: f32::INFINITY,
            b_t1: f32::NEG_INFINITY,
        }
    }

    pub fn exists(&self) -> bool {
        self.a_t0.is_finite()
    }

    /// The same conflict seen from the other vehicle's side.
    pub fn swapped(&self) -> Conflict {
        Conflict {
            a_t0: self.b_t0,
            a_t1: self.b_t1,
            b_t0: self.a_t0,
            b_t1: self.a_t1,
        }
    }
}

/// A connection with its curve and arc length, cached per tracked vehicle.
#[derive(Debug, Clone, Copy)]
pub struct CachedConnection {
    pub conn: Connection,
    pub bezier: Bezier,
    pub length: f32,
}

impl CachedConnection {
    pub fn new(net: &Network, conn: Connection) -> Self {
        let bezier = net.connection_curve(conn.a, conn.b);
        let length = bezier.approx_len(COLLISION_STEPS);
        CachedConnection {
            conn,
            bezier,
            length,
        }
    }
}

/// Computes the corridor overlap of two distinct connections.
///
/// Both corridors are sampled as left/right offset polylines; every offset
/// segment pair is intersected and the parameter extents accumulated. Shared
/// endpoints are forced to the interval edge because parallel offset lines
/// miss there.
pub fn check_conflict(a: &CachedConnection, b: &CachedConnection) -> Conflict {
    assert!(a.conn != b.conn, "identical connections are never cached");

    let a_l = a.bezier.offset_points(COLLISION_STEPS + 1, -LANE_COLLISION_R);
    let a_r = a.bezier.offset_points(COLLISION_STEPS + 1, LANE_COLLISION_R);
    let b_l = b.bezier.offset_points(COLLISION_STEPS + 1, -LANE_COLLISION_R);
    let b_r = b.bezier.offset_points(COLLISION_STEPS + 1, LANE_COLLISION_R);

    let mut u0 = f32::INFINITY;
    let mut v0 = f32::INFINITY;
    let mut u1 = f32::NEG_INFINITY;
    let mut v1 = f32::NEG_INFINITY;

    for i in 0..COLLISION_STEPS as usize {
        let a_sides = [
            (a_l[i], a_l[i + 1] - a_l[i]),
            (a_r[i], a_r[i + 1] - a_r[i]),
        ];
        for j in 0..COLLISION_STEPS as usize {
            let b_sides = [
                (b_l[j], b_l[j + 1] - b_l[j]),
                (b_r[j], b_r[j + 1] - b_r[j]),
            ];
            for (a_pos, a_dir) in a_sides {
                for (b_pos, b_dir) in b_sides {
                    if let Some((line_u, line_v)) =
                        line_segment_intersect(a_pos, a_dir, b_pos, b_dir)
                    {
                        let u = line_u + i as f32;
                        let v = line_v + j as f32;
                        u0 = u0.min(u);
                        v0 = v0.min(v);
                        u1 = u1.max(u);
                        v1 = v1.max(v);
                    }
                }
            }
        }
    }

    let scale = 1.0 / COLLISION_STEPS as f32;
    u0 *= scale;
    u1 *= scale;
    v0 *= scale;
    v1 *= scale;

    if a.conn.a == b.conn.a {
        // same start point, the offset lines run parallel there
        u0 = 0.0;
        v0 = 0.0;
    }
    if a.conn.b == b.conn.b {
        // same end point
        u1 = 1.0;
        v1 = 1.0;
    }

    Conflict {
        a_t0: u0,
        a_t1: u1,
        b_t0: v0,
        b_t1: v1,
    }
}

/// Cache lookup, computing and inserting on miss. Identical connections
/// overlap trivially and are never cached.
pub fn query_conflict(
    cache: &mut IndexMap<ConflictKey, Conflict>,
    a: &CachedConnection,
    b: &CachedConnection,
) -> Conflict {
    if a.conn == b.conn {
        return Conflict {
            a_t0: 0.0,
            a_t1: 1.0,
            b_t0: 0.0,
            b_t1: 1.0,
        };
    }

    let ordered = a.conn < b.conn;
    let (pa, pb) = if ordered { (a, b) } else { (b, a) };
    let key = ConflictKey {
        a: pa.conn,
        b: pb.conn,
    };

    let conf = *cache
        .entry(key)
        .or_insert_with(|| check_conflict(pa, pb));

    if ordered {
        conf
    } else {
        conf.swapped()
    }
}
