//! Convex hull primitive

use crate::foundation::math::{cross, transform_point, vec_cmp, Mat3, Vec2};
use crate::physics::primitive::Primitive;
use crate::physics::shapes::{aabb::Aabb, edge_normals, polygon_contains, project};

/// Convex polygon with counter-clockwise vertices
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexHull {
    /// Hull vertices in counter-clockwise order, no collinear points
    pub points: Vec<Vec2>,
}

impl ConvexHull {
    /// Build the convex hull of an arbitrary point cloud (monotone chain)
    ///
    /// Degenerate input collapses to the unique extreme points: a segment
    /// keeps its two end points and a single point stays a single point.
    pub fn new(points: &[Vec2]) -> Self {
        let mut sorted: Vec<Vec2> = points.to_vec();
        sorted.sort_by(vec_cmp);
        sorted.dedup_by(|a, b| (*a - *b).norm_squared() <= f32::EPSILON * f32::EPSILON);

        if sorted.len() < 3 {
            return Self { points: sorted };
        }

        let mut hull: Vec<Vec2> = Vec::with_capacity(sorted.len() * 2);

        // Lower hull
        for p in &sorted {
            while hull.len() >= 2 && turn(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0.0 {
                hull.pop();
            }
            hull.push(*p);
        }

        // Upper hull
        let lower_len = hull.len() + 1;
        for p in sorted.iter().rev().skip(1) {
            while hull.len() >= lower_len
                && turn(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0.0
            {
                hull.pop();
            }
            hull.push(*p);
        }
        hull.pop();

        Self { points: hull }
    }

    /// Outward unit normal of every edge
    pub fn normals(&self) -> Vec<Vec2> {
        edge_normals(&self.points)
    }

    /// Centroid of the vertices
    pub fn center(&self) -> Vec2 {
        if self.points.is_empty() {
            return Vec2::zeros();
        }
        self.points.iter().sum::<Vec2>() / self.points.len() as f32
    }

    /// Bounding box
    pub fn wrap(&self) -> Aabb {
        Aabb::from_points(&self.points)
    }

    /// Check if a point lies inside or on the hull
    pub fn point_hits(&self, point: &Vec2) -> bool {
        polygon_contains(&self.points, point)
    }

    /// Projection interval onto a unit axis
    pub fn extent_along(&self, axis: &Vec2) -> (f32, f32) {
        project(&self.points, axis)
    }

    /// Apply an affine transform; hulls stay hulls under any transform
    pub fn transform_primitive(&self, m: &Mat3) -> Primitive {
        let points: Vec<Vec2> = self.points.iter().map(|p| transform_point(m, p)).collect();
        Primitive::ConvexHull(ConvexHull::new(&points))
    }
}

fn turn(o: &Vec2, a: &Vec2, b: &Vec2) -> f32 {
    cross(&(a - o), &(b - o))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hull_discards_interior_and_collinear_points() {
        let hull = ConvexHull::new(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 2.0),
        ]);
        assert_eq!(
            hull.points,
            vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(2.0, 0.0),
                Vec2::new(2.0, 2.0),
                Vec2::new(0.0, 2.0)
            ]
        );
    }

    #[test]
    fn test_mirror_keeps_ccw_order() {
        let hull = ConvexHull::new(&[Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)]);
        let mirror = Mat3::new(-1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        let Primitive::ConvexHull(mirrored) = hull.transform_primitive(&mirror) else {
            panic!("expected hull");
        };
        let p = &mirrored.points;
        assert!(turn(&p[0], &p[1], &p[2]) > 0.0);
        assert!(mirrored.point_hits(&Vec2::new(-0.25, 0.25)));
    }

    #[test]
    fn test_degenerate_segment() {
        let hull = ConvexHull::new(&[Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(0.0, 0.0)]);
        assert_eq!(hull.points.len(), 2);
    }
}
