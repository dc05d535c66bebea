//! Ray segments used by ray, circle and rect casts

use crate::foundation::math::{normalize_or_zero, Vec2};
use crate::physics::shapes::aabb::Aabb;

/// A ray for ray casting and picking, limited to `length`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// The origin point of the ray in world space
    pub origin: Vec2,
    /// The direction of the ray (normalized)
    pub direction: Vec2,
    /// Maximum distance travelled along `direction`
    pub length: f32,
}

impl Ray {
    /// Creates a new ray; the direction is normalized
    pub fn new(origin: Vec2, direction: Vec2, length: f32) -> Self {
        Self {
            origin,
            direction: normalize_or_zero(&direction),
            length,
        }
    }

    /// Ray from `start` to `end`
    pub fn between(start: Vec2, end: Vec2) -> Self {
        Self::new(start, end - start, (end - start).norm())
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vec2 {
        self.origin + self.direction * t
    }

    /// End point of the ray
    pub fn end(&self) -> Vec2 {
        self.point_at(self.length)
    }

    /// Bounding box of the segment
    pub fn wrap(&self) -> Aabb {
        Aabb::from_points(&[self.origin, self.end()])
    }
}
