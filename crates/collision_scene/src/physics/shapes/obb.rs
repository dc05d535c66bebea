//! Oriented bounding box

use crate::foundation::math::{
    classify, rotation_angle, transform_point, uniform_scale, AffineClass, Mat3, Vec2,
};
use crate::physics::primitive::Primitive;
use crate::physics::shapes::{aabb::Aabb, kdop::CustomKdop};

/// Oriented bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obb {
    /// Center of the box
    pub center: Vec2,
    /// Half size along the box's own axes
    pub half_extents: Vec2,
    /// Counter-clockwise rotation in radians
    pub rotation: f32,
}

impl From<Aabb> for Obb {
    fn from(aabb: Aabb) -> Self {
        Self::new(aabb.center(), aabb.half_extents(), 0.0)
    }
}

impl Obb {
    /// Create a new oriented box
    pub fn new(center: Vec2, half_extents: Vec2, rotation: f32) -> Self {
        Self {
            center,
            half_extents,
            rotation,
        }
    }

    /// The box's local x and y axes in world space
    pub fn axes(&self) -> [Vec2; 2] {
        let (sin, cos) = self.rotation.sin_cos();
        [Vec2::new(cos, sin), Vec2::new(-sin, cos)]
    }

    /// Corners in counter-clockwise order
    pub fn corners(&self) -> [Vec2; 4] {
        let [u, v] = self.axes();
        let hu = u * self.half_extents.x;
        let hv = v * self.half_extents.y;
        [
            self.center - hu - hv,
            self.center + hu - hv,
            self.center + hu + hv,
            self.center - hu + hv,
        ]
    }

    /// Bounding box
    pub fn wrap(&self) -> Aabb {
        let (x0, x1) = self.extent_along(&Vec2::x());
        let (y0, y1) = self.extent_along(&Vec2::y());
        Aabb::new(Vec2::new(x0, y0), Vec2::new(x1, y1))
    }

    /// Check if a point lies inside or on the box
    pub fn point_hits(&self, point: &Vec2) -> bool {
        let d = point - self.center;
        let [u, v] = self.axes();
        let eps = f32::EPSILON * (1.0 + self.half_extents.amax());
        d.dot(&u).abs() <= self.half_extents.x + eps && d.dot(&v).abs() <= self.half_extents.y + eps
    }

    /// Projection interval onto a unit axis
    pub fn extent_along(&self, axis: &Vec2) -> (f32, f32) {
        let [u, v] = self.axes();
        let c = self.center.dot(axis);
        let r = self.half_extents.x * u.dot(axis).abs() + self.half_extents.y * v.dot(axis).abs();
        (c - r, c + r)
    }

    /// Apply a conformal (rotation + uniform scale) transform
    pub fn transformed_conformal(&self, m: &Mat3) -> Obb {
        Obb::new(
            transform_point(m, &self.center),
            self.half_extents * uniform_scale(m),
            self.rotation + rotation_angle(m),
        )
    }

    /// Apply an affine transform
    ///
    /// Rotations and uniform scales keep an OBB; non-uniform scale or shear
    /// yields a two-axis custom k-DOP along the sheared box faces.
    pub fn transform_primitive(&self, m: &Mat3) -> Primitive {
        match classify(m) {
            AffineClass::Scale { uniform: true } | AffineClass::Conformal => {
                Primitive::Obb(self.transformed_conformal(m))
            }
            AffineClass::Scale { uniform: false } | AffineClass::General => {
                CustomKdop::<2>::from_polytope(&self.axes(), &self.corners(), m)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Transform2D;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_4;

    #[test]
    fn test_rotated_wrap() {
        let obb = Obb::new(Vec2::zeros(), Vec2::new(1.0, 1.0), FRAC_PI_4);
        let wrap = obb.wrap();
        let r = 2.0_f32.sqrt();
        assert_relative_eq!(wrap.max, Vec2::new(r, r), epsilon = 1e-5);
        assert!(obb.point_hits(&Vec2::new(1.3, 0.0)));
        assert!(!obb.point_hits(&Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn test_uniform_negative_scale_stays_box() {
        let obb = Obb::new(Vec2::new(1.0, 0.0), Vec2::new(2.0, 1.0), 0.0);
        let m = Transform2D {
            scale: Vec2::new(-1.0, -1.0),
            ..Default::default()
        }
        .to_matrix();
        let Primitive::Obb(flipped) = obb.transform_primitive(&m) else {
            panic!("expected obb");
        };
        assert_relative_eq!(flipped.center, Vec2::new(-1.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(flipped.half_extents, Vec2::new(2.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_stretch_becomes_custom_kdop() {
        let obb = Obb::new(Vec2::zeros(), Vec2::new(1.0, 1.0), FRAC_PI_4);
        let m = Transform2D {
            scale: Vec2::new(3.0, 1.0),
            ..Default::default()
        }
        .to_matrix();
        assert!(matches!(obb.transform_primitive(&m), Primitive::CustomKdop2(_)));
    }
}
