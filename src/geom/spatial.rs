//! Intersection primitives: line/line, line-segment/line-segment and the
//! ray tests used by hover picking.

use crate::geom::vec::{Vec2, Vec3};

/// A picking ray in world space, usually derived from the camera cursor.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub pos: Vec3,
    pub dir: Vec3,
}

/// Intersects the infinite lines `a + u*ab` and `c + v*cd`.
///
/// Returns `None` for parallel lines (overlapping or not).
pub fn line_line_intersect(a: Vec2, ab: Vec2, c: Vec2, cd: Vec2) -> Option<Vec2> {
    let ac = c - a;
    let denom = ab.x * cd.y - ab.y * cd.x;
    if denom == 0.0 {
        return None;
    }
    let numer = ac.x * cd.y - ac.y * cd.x;
    let u = numer / denom;
    Some(a + ab * u)
}

/// Intersects the segments `a..a+ab` and `c..c+cd`, returning the parameter
/// pair `(u, v)` only when both lie in `[0, 1]`.
pub fn line_segment_intersect(a: Vec2, ab: Vec2, c: Vec2, cd: Vec2) -> Option<(f32, f32)> {
    let ac = c - a;
    let denom = ab.x * cd.y - ab.y * cd.x;
    if denom == 0.0 {
        return None;
    }
    let u = (ac.x * cd.y - ac.y * cd.x) / denom;
    let v = (ac.x * ab.y - ac.y * ab.x) / denom;
    if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
        return None;
    }
    Some((u, v))
}

/// Tests a ray against a horizontal disc of radius `r` centered at `pos`.
/// Returns the distance from the disc center to the hit point.
pub fn intersect_circle_ray(pos: Vec3, r: f32, ray: &Ray) -> Option<f32> {
    let t = if ray.dir.z == 0.0 {
        if ray.pos.z != pos.z {
            return None;
        }
        0.0
    } else {
        (pos.z - ray.pos.z) / ray.dir.z
    };

    let x = ray.pos.x + ray.dir.x * t - pos.x;
    let y = ray.pos.y + ray.dir.y * t - pos.y;
    let dist_sqr = x * x + y * y;
    if dist_sqr > r * r {
        return None;
    }
    Some(dist_sqr.sqrt())
}

/// Tests a ray against the parallelogram spanned by `forw` and `right` at
/// `pos`. Returns the ray parameter of the hit.
pub fn intersect_rect_ray(pos: Vec3, forw: Vec3, right: Vec3, ray: &Ray) -> Option<f32> {
    let up = right.cross(forw).normalize_safe();
    let rel = pos - ray.pos;

    let denom = up.dot(ray.dir);
    if denom == 0.0 {
        return None;
    }
    let t = up.dot(rel) / denom;
    if t < 0.0 {
        return None;
    }

    let hit_rel = ray.dir * t - rel;
    let y = hit_rel.dot(forw.normalize_safe()) / forw.length();
    let x = hit_rel.dot(right.normalize_safe()) / right.length();
    if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
        return None;
    }
    Some(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_line_intersect() {
        let p = line_line_intersect(
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(5.0, -3.0),
            Vec2::new(0.0, 1.0),
        )
        .expect("perpendicular lines must intersect");
        assert!(
            (p.x - 5.0).abs() < 1e-5 && p.y.abs() < 1e-5,
            "Intersection should be (5, 0), got {}",
            p
        );

        let parallel = line_line_intersect(
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 2.0),
            Vec2::new(2.0, 2.0),
        );
        assert!(parallel.is_none(), "Parallel lines must not intersect");
    }

    #[test]
    fn test_line_segment_intersect_bounds() {
        // Crossing inside both spans.
        let hit = line_segment_intersect(
            Vec2::new(0.0, 0.0),
            Vec2::new(4.0, 0.0),
            Vec2::new(1.0, -1.0),
            Vec2::new(0.0, 2.0),
        );
        let (u, v) = hit.expect("segments cross at (1, 0)");
        assert!((u - 0.25).abs() < 1e-5, "u should be 0.25, got {}", u);
        assert!((v - 0.5).abs() < 1e-5, "v should be 0.5, got {}", v);

        // The same lines but the second segment ends before the crossing.
        let miss = line_segment_intersect(
            Vec2::new(0.0, 0.0),
            Vec2::new(4.0, 0.0),
            Vec2::new(1.0, -3.0),
            Vec2::new(0.0, 2.0),
        );
        assert!(miss.is_none(), "Out-of-span crossing must be rejected");
    }

    #[test]
    fn test_circle_ray_from_above() {
        let ray = Ray {
            pos: Vec3::new(2.0, 1.0, 10.0),
            dir: Vec3::new(0.0, 0.0, -1.0),
        };
        let hit = intersect_circle_ray(Vec3::new(0.0, 0.0, 0.0), 3.0, &ray);
        let dist = hit.expect("ray straight down inside the disc must hit");
        assert!(
            (dist - (5.0f32).sqrt()).abs() < 1e-4,
            "Hit distance from center should be sqrt(5), got {}",
            dist
        );
        assert!(
            intersect_circle_ray(Vec3::new(10.0, 0.0, 0.0), 3.0, &ray).is_none(),
            "Disc far away must miss"
        );
    }
}
