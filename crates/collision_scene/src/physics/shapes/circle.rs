//! Circle primitive

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

use crate::foundation::math::{classify, transform_point, uniform_scale, AffineClass, Mat3, Vec2};
use crate::physics::primitive::Primitive;
use crate::physics::shapes::{aabb::Aabb, convex_hull::ConvexHull};

/// Number of sides of the hull that replaces a circle under non-conformal transforms
pub const CIRCLE_HULL_SIDES: usize = 16;

/// A circle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    /// Center in local or world space
    pub center: Vec2,
    /// Radius
    pub radius: f32,
}

impl Circle {
    /// Creates a new circle with the given center and radius
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Bounding box
    pub fn wrap(&self) -> Aabb {
        Aabb::from_center_extents(self.center, Vec2::new(self.radius, self.radius))
    }

    /// Check if a point lies inside or on the circle
    pub fn point_hits(&self, point: &Vec2) -> bool {
        (point - self.center).norm_squared() <= self.radius * self.radius
    }

    /// Projection interval onto a unit axis
    pub fn extent_along(&self, axis: &Vec2) -> (f32, f32) {
        let c = self.center.dot(axis);
        (c - self.radius, c + self.radius)
    }

    /// Vertices of the circumscribed regular polygon with `sides` sides
    pub fn circumscribed_polygon(&self, sides: usize) -> Vec<Vec2> {
        let step = 2.0 * PI / sides as f32;
        let r = self.radius / (step * 0.5).cos();
        (0..sides)
            .map(|i| {
                let (sin, cos) = (step * i as f32).sin_cos();
                self.center + Vec2::new(cos, sin) * r
            })
            .collect()
    }

    /// Apply an affine transform
    ///
    /// Angle-preserving transforms keep a circle. Anything that would turn it
    /// into an ellipse yields a hull circumscribing that ellipse.
    pub fn transform_primitive(&self, m: &Mat3) -> Primitive {
        match classify(m) {
            AffineClass::Scale { uniform: true } | AffineClass::Conformal => {
                Primitive::Circle(Circle::new(
                    transform_point(m, &self.center),
                    self.radius * uniform_scale(m),
                ))
            }
            AffineClass::Scale { uniform: false } | AffineClass::General => {
                let points: Vec<Vec2> = self
                    .circumscribed_polygon(CIRCLE_HULL_SIDES)
                    .iter()
                    .map(|p| transform_point(m, p))
                    .collect();
                Primitive::ConvexHull(ConvexHull::new(&points))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Transform2D;
    use approx::assert_relative_eq;

    #[test]
    fn test_circle_under_rotation_stays_circle() {
        let circle = Circle::new(Vec2::new(1.0, 0.0), 2.0);
        let m = Transform2D {
            position: Vec2::new(0.0, 1.0),
            rotation: std::f32::consts::FRAC_PI_2,
            scale: Vec2::new(3.0, 3.0),
        }
        .to_matrix();

        match circle.transform_primitive(&m) {
            Primitive::Circle(c) => {
                assert_relative_eq!(c.center, Vec2::new(0.0, 4.0), epsilon = 1e-5);
                assert_relative_eq!(c.radius, 6.0, epsilon = 1e-5);
            }
            other => panic!("expected circle, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_stretched_circle_circumscribes_ellipse() {
        let circle = Circle::new(Vec2::zeros(), 1.0);
        let m = Transform2D {
            scale: Vec2::new(4.0, 1.0),
            ..Default::default()
        }
        .to_matrix();

        let Primitive::ConvexHull(hull) = circle.transform_primitive(&m) else {
            panic!("expected hull");
        };
        assert_eq!(hull.points.len(), CIRCLE_HULL_SIDES);
        // Every point of the ellipse must be inside the hull.
        for i in 0..64 {
            let t = i as f32 / 64.0 * 2.0 * PI;
            assert!(hull.point_hits(&(Vec2::new(4.0 * t.cos(), t.sin()) * 0.999)));
        }
    }
}
