//! Shape catalogue
//!
//! Value types for every primitive shape the narrow phase understands, plus
//! the polygon helpers they share. Shapes are immutable once constructed;
//! transforming one produces a new shape, possibly of a different kind.

pub mod aabb;
pub mod circle;
pub mod convex_hull;
pub mod kdop;
pub mod obb;
pub mod ray;

pub use aabb::Aabb;
pub use circle::Circle;
pub use convex_hull::ConvexHull;
pub use kdop::{CustomKdop, Kdop, Kdop2, Kdop3, Kdop4};
pub use obb::Obb;
pub use ray::Ray;

use std::f32::consts::{PI, TAU};

use crate::foundation::math::{normalize_or_zero, Vec2};

/// Relative tolerance used when comparing projected positions
pub const PROJECTION_EPSILON: f32 = 1.0e-5;

/// Projection interval of a point set onto an axis
pub(crate) fn project(points: &[Vec2], axis: &Vec2) -> (f32, f32) {
    points.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| {
        let d = p.dot(axis);
        (lo.min(d), hi.max(d))
    })
}

/// Outward unit normals of a counter-clockwise polygon, one per non-degenerate edge
pub(crate) fn edge_normals(points: &[Vec2]) -> Vec<Vec2> {
    if points.len() < 2 {
        return Vec::new();
    }
    (0..points.len())
        .filter_map(|i| {
            let e = points[(i + 1) % points.len()] - points[i];
            let n = normalize_or_zero(&Vec2::new(e.y, -e.x));
            (n != Vec2::zeros()).then_some(n)
        })
        .collect()
}

/// Average of the points lying furthest along `direction`
///
/// Points within a small tolerance of the maximum all count, so a face
/// pointing along `direction` reports its midpoint.
pub(crate) fn support(points: &[Vec2], direction: &Vec2) -> Vec2 {
    let (_, hi) = project(points, direction);
    let eps = PROJECTION_EPSILON * (1.0 + hi.abs());
    let (sum, count) = points
        .iter()
        .filter(|p| p.dot(direction) >= hi - eps)
        .fold((Vec2::zeros(), 0usize), |(s, n), p| (s + p, n + 1));
    if count == 0 {
        Vec2::zeros()
    } else {
        sum / count as f32
    }
}

/// Point-in-polygon test for a counter-clockwise convex polygon (boundary inclusive)
pub(crate) fn polygon_contains(points: &[Vec2], point: &Vec2) -> bool {
    match points.len() {
        0 => false,
        1 => (points[0] - point).norm() <= PROJECTION_EPSILON,
        2 => {
            let d = points[1] - points[0];
            let len_sq = d.norm_squared();
            let t = if len_sq > 0.0 { (point - points[0]).dot(&d) / len_sq } else { 0.0 };
            let closest = points[0] + d * t.clamp(0.0, 1.0);
            (closest - point).norm() <= PROJECTION_EPSILON * (1.0 + d.norm())
        }
        n => (0..n).all(|i| {
            let a = points[i];
            let e = points[(i + 1) % n] - a;
            let eps = PROJECTION_EPSILON * (1.0 + e.norm_squared());
            e.x * (point.y - a.y) - e.y * (point.x - a.x) >= -eps
        }),
    }
}

/// Vertices of the polytope `{ p : min[i] <= axes[i] . p <= max[i] }`
///
/// Starts from a square large enough to hold the polytope and clips it
/// against both half planes of every axis. The result is counter-clockwise.
pub(crate) fn clip_polytope(axes: &[Vec2], min: &[f32], max: &[f32]) -> Vec<Vec2> {
    let reach = min
        .iter()
        .chain(max.iter())
        .fold(0.0_f32, |acc, d| acc.max(d.abs()));

    // Every point is within half the widest angular gap of some face normal.
    let mut angles: Vec<f32> = axes
        .iter()
        .flat_map(|a| {
            let t = a.y.atan2(a.x);
            [t.rem_euclid(TAU), (t + PI).rem_euclid(TAU)]
        })
        .collect();
    angles.sort_by(f32::total_cmp);
    let widest_gap = angles
        .windows(2)
        .map(|w| w[1] - w[0])
        .chain(angles.first().zip(angles.last()).map(|(f, l)| f + TAU - l))
        .fold(0.0_f32, f32::max);
    let cos_half_gap = (widest_gap * 0.5).cos().max(0.05);
    let r = reach / cos_half_gap * 1.5 + 1.0;

    let mut polygon = vec![
        Vec2::new(-r, -r),
        Vec2::new(r, -r),
        Vec2::new(r, r),
        Vec2::new(-r, r),
    ];
    for ((axis, &lo), &hi) in axes.iter().zip(min).zip(max) {
        polygon = clip_half_plane(&polygon, axis, hi);
        polygon = clip_half_plane(&polygon, &-axis, -lo);
    }

    polygon.dedup_by(|a, b| (*a - *b).norm() <= PROJECTION_EPSILON * (1.0 + r));
    while polygon.len() > 1 {
        let (first, last) = (polygon[0], polygon[polygon.len() - 1]);
        if (first - last).norm() <= PROJECTION_EPSILON * (1.0 + r) {
            polygon.pop();
        } else {
            break;
        }
    }
    polygon
}

/// Keep the part of a convex polygon where `normal . p <= offset`
fn clip_half_plane(polygon: &[Vec2], normal: &Vec2, offset: f32) -> Vec<Vec2> {
    let mut out = Vec::with_capacity(polygon.len() + 1);
    for (i, a) in polygon.iter().enumerate() {
        let b = polygon[(i + 1) % polygon.len()];
        let da = normal.dot(a) - offset;
        let db = normal.dot(&b) - offset;
        if da <= 0.0 {
            out.push(*a);
        }
        if (da < 0.0 && db > 0.0) || (da > 0.0 && db < 0.0) {
            let t = da / (da - db);
            out.push(a + (b - a) * t);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_clip_box() {
        let vertices = clip_polytope(
            &[Vec2::x(), Vec2::y()],
            &[1.0, -2.0],
            &[3.0, 2.0],
        );
        assert_eq!(vertices.len(), 4);
        let (lo, hi) = project(&vertices, &Vec2::x());
        assert_relative_eq!(lo, 1.0, epsilon = 1e-4);
        assert_relative_eq!(hi, 3.0, epsilon = 1e-4);
    }

    #[test]
    fn test_support_averages_faces() {
        let square = [
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(0.0, 2.0),
        ];
        assert_relative_eq!(support(&square, &Vec2::x()), Vec2::new(2.0, 1.0));
        assert_relative_eq!(
            support(&square, &Vec2::new(1.0, 1.0).normalize()),
            Vec2::new(2.0, 2.0)
        );
    }

    #[test]
    fn test_polygon_contains_boundary() {
        let triangle = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)];
        assert!(polygon_contains(&triangle, &Vec2::new(0.5, 0.5)));
        assert!(polygon_contains(&triangle, &Vec2::new(0.0, 0.0)));
        assert!(!polygon_contains(&triangle, &Vec2::new(0.6, 0.6)));
    }
}
