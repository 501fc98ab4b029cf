//! Cubic Bézier evaluation, curvature and approximate arc length.

use crate::geom::vec::{lerp3, Vec2, Vec3};

/// Result of evaluating a Bézier curve at a parameter value.
#[derive(Debug, Clone, Copy)]
pub struct BezierPoint {
    pub pos: Vec3,
    /// Velocity over the curve parameter (d pos / d t).
    pub vel: Vec3,
    /// Curvature (delta angle over distance along the curve), positive for
    /// CCW bends. Zero where the velocity is degenerate.
    pub curv: f32,
}

/// A cubic Bézier curve in 3-space.
///
/// Straight lane centerlines and quadratic corner curves are folded into the
/// cubic form (degree elevation is exact), so every motion in the simulation
/// carries the same curve type.
///
/// # Basic usage:
///
/// ```
/// use continuous_traffic_sim_core::geom::{Bezier, Vec3};
/// let bez = Bezier::from_line(Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 0.0));
/// let mid = bez.eval(0.5);
/// assert!((mid.pos.x - 5.0).abs() < 1e-4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bezier {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
    pub d: Vec3,
}

impl Bezier {
    pub fn new(a: Vec3, b: Vec3, c: Vec3, d: Vec3) -> Self {
        Bezier { a, b, c, d }
    }

    /// A straight line as a cubic with evenly spaced control points,
    /// giving a constant-velocity parameterization.
    pub fn from_line(a: Vec3, b: Vec3) -> Self {
        Bezier {
            a,
            b: lerp3(a, b, 1.0 / 3.0),
            c: lerp3(a, b, 2.0 / 3.0),
            d: b,
        }
    }

    /// Exact degree elevation of a quadratic curve.
    pub fn from_quadratic(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Bezier {
            a,
            b: a + (b - a) * (2.0 / 3.0),
            c: c + (b - c) * (2.0 / 3.0),
            d: c,
        }
    }

    fn coefficients(&self) -> (Vec3, Vec3, Vec3, Vec3) {
        // f(t) = c3*t^3 + c2*t^2 + c1*t + c0
        let c0 = self.a;
        let c1 = (self.b - self.a) * 3.0;
        let c2 = (self.a + self.c) * 3.0 - self.b * 6.0;
        let c3 = (self.b - self.c) * 3.0 - self.a + self.d;
        (c0, c1, c2, c3)
    }

    /// Evaluates position and velocity, leaving curvature at zero.
    pub fn eval(&self, t: f32) -> BezierPoint {
        let (c0, c1, c2, c3) = self.coefficients();
        let t2 = t * t;
        let t3 = t2 * t;

        let pos = c3 * t3 + c2 * t2 + c1 * t + c0;
        let vel = c3 * (t2 * 3.0) + c2 * (t * 2.0) + c1;

        BezierPoint { pos, vel, curv: 0.0 }
    }

    /// Evaluates position, velocity and planar curvature.
    ///
    /// Curvature is `(vel.x * accel.y - accel.x * vel.y) / |vel|^3` using the
    /// horizontal components only. Where `|vel|^2` is nearly zero the
    /// curvature is defined as `0`.
    pub fn eval_with_curv(&self, t: f32) -> BezierPoint {
        let (c0, c1, c2, c3) = self.coefficients();
        let t2 = t * t;
        let t3 = t2 * t;

        let pos = c3 * t3 + c2 * t2 + c1 * t + c0;
        let vel = c3 * (t2 * 3.0) + c2 * (t * 2.0) + c1;
        let accel = c3 * (t * 6.0) + c2 * 2.0;

        let denom = vel.x * vel.x + vel.y * vel.y;
        let curv = if denom < 1e-6 {
            0.0
        } else {
            (vel.x * accel.y - accel.x * vel.y) / (denom * denom.sqrt())
        };

        BezierPoint { pos, vel, curv }
    }

    /// Polyline approximation of the arc length using `steps` samples.
    pub fn approx_len(&self, steps: u32) -> f32 {
        let mut prev = self.a;
        let mut len = 0.0;
        for i in 0..steps {
            let t = (i + 1) as f32 / steps as f32;
            let pos = self.eval(t).pos;
            len += pos.distance_to(prev);
            prev = pos;
        }
        len
    }

    /// Samples `count` points of the curve offset sideways by `offset`
    /// metres (positive = to the right of travel). Used to thicken a path
    /// corridor for conflict detection.
    pub fn offset_points(&self, count: u32, offset: f32) -> Vec<Vec2> {
        let mut points = Vec::with_capacity(count as usize);
        for i in 0..count {
            let t = i as f32 / (count - 1) as f32;
            let res = self.eval(t);
            let right = res.vel.xy().normalize_safe().right();
            points.push(res.pos.xy() + right * offset);
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_eval() {
        let bez = Bezier::from_line(Vec3::new(0.0, 0.0, 1.0), Vec3::new(8.0, 0.0, 1.0));
        for i in 0..=4 {
            let t = i as f32 / 4.0;
            let res = bez.eval_with_curv(t);
            assert!(
                (res.pos.x - 8.0 * t).abs() < 1e-4,
                "Straight-line cubic should be linear in t, got x={} at t={}",
                res.pos.x,
                t
            );
            assert!(
                res.curv.abs() < 1e-5,
                "Straight line should have zero curvature, got {}",
                res.curv
            );
        }
        assert!((bez.eval(0.5).pos.z - 1.0).abs() < 1e-6, "z must carry through");
    }

    #[test]
    fn test_approx_len_straight() {
        let bez = Bezier::from_line(Vec3::ZERO, Vec3::new(3.0, 4.0, 0.0));
        let len = bez.approx_len(4);
        assert!(
            (len - 5.0).abs() < 1e-3,
            "Length of the 3-4-5 line should be 5, got {}",
            len
        );
    }

    #[test]
    fn test_quarter_turn_curvature_sign() {
        // A left (CCW) quarter turn from +X heading to +Y heading.
        let bez = Bezier::from_quadratic(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(10.0, 10.0, 0.0),
        );
        let res = bez.eval_with_curv(0.5);
        assert!(
            res.curv > 0.0,
            "CCW turn should have positive curvature, got {}",
            res.curv
        );
    }

    #[test]
    fn test_offset_points_sides() {
        let bez = Bezier::from_line(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0));
        let right = bez.offset_points(5, 1.3);
        let left = bez.offset_points(5, -1.3);
        for (r, l) in right.iter().zip(left.iter()) {
            assert!(
                (r.y + 1.3).abs() < 1e-4 && (l.y - 1.3).abs() < 1e-4,
                "Offsets should straddle the +X centerline, got r={} l={}",
                r,
                l
            );
        }
    }
}
