//! Discrete oriented polytopes
//!
//! [`Kdop<A>`] uses `A` axes evenly spaced over half a turn, so `Kdop<2>` is
//! a box, `Kdop<3>` a hexagon and `Kdop<4>` an octagon. [`CustomKdop<A>`]
//! carries its own `A` axes; it is what fixed k-DOPs and boxes become under
//! transforms that do not preserve their axes.

use std::f32::consts::PI;

use crate::foundation::math::{
    classify, transform_normal, transform_point, AffineClass, Mat3, Vec2,
};
use crate::physics::primitive::Primitive;
use crate::physics::shapes::{
    aabb::Aabb, clip_polytope, convex_hull::ConvexHull, project,
    PROJECTION_EPSILON,
};

/// Two-axis k-DOP (a box)
pub type Kdop2 = Kdop<2>;
/// Three-axis k-DOP (a hexagon)
pub type Kdop3 = Kdop<3>;
/// Four-axis k-DOP (an octagon)
pub type Kdop4 = Kdop<4>;

/// Axis `index` of a fixed k-DOP with `count` axes
pub fn kdop_axis(index: usize, count: usize) -> Vec2 {
    let (sin, cos) = (PI * index as f32 / count as f32).sin_cos();
    // Snap the float noise of cos(pi/2) and friends so the box axes are exact.
    let snap = |v: f32| if v.abs() < 1.0e-6 { 0.0 } else { v };
    Vec2::new(snap(cos), snap(sin))
}

/// k-DOP over `A` fixed axes
#[derive(Debug, Clone, PartialEq)]
pub struct Kdop<const A: usize> {
    /// Minimum projection per axis
    pub min: [f32; A],
    /// Maximum projection per axis
    pub max: [f32; A],
    vertices: Vec<Vec2>,
}

impl<const A: usize> Kdop<A> {
    /// The fixed axes of this k-DOP family
    pub fn axes() -> [Vec2; A] {
        std::array::from_fn(|i| kdop_axis(i, A))
    }

    /// Create a k-DOP from per-axis extents
    pub fn new(min: [f32; A], max: [f32; A]) -> Self {
        let vertices = clip_polytope(&Self::axes(), &min, &max);
        Self { min, max, vertices }
    }

    /// Tightest k-DOP around an arbitrary interval function
    pub fn from_extents(extent_along: impl Fn(&Vec2) -> (f32, f32)) -> Self {
        let axes = Self::axes();
        let mut min = [0.0; A];
        let mut max = [0.0; A];
        for (i, axis) in axes.iter().enumerate() {
            (min[i], max[i]) = extent_along(axis);
        }
        Self::new(min, max)
    }

    /// Tightest k-DOP around a point set
    pub fn from_points(points: &[Vec2]) -> Self {
        Self::from_extents(|axis| project(points, axis))
    }

    /// Polygon vertices in counter-clockwise order
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    /// Bounding box
    pub fn wrap(&self) -> Aabb {
        Aabb::from_points(&self.vertices)
    }

    /// Check if a point lies inside or on the k-DOP
    pub fn point_hits(&self, point: &Vec2) -> bool {
        within_slabs(&Self::axes(), &self.min, &self.max, point)
    }

    /// Projection interval onto a unit axis
    pub fn extent_along(&self, axis: &Vec2) -> (f32, f32) {
        project(&self.vertices, axis)
    }

    /// Apply an affine transform
    ///
    /// Only translation with uniform scale keeps the fixed axes; everything
    /// else produces a custom k-DOP over the transformed face normals.
    pub fn transform_primitive(&self, m: &Mat3) -> Primitive
    where
        CustomKdop<A>: Into<Primitive>,
        Kdop<A>: Into<Primitive>,
    {
        match classify(m) {
            AffineClass::Scale { uniform: true } => {
                let s = m.m11;
                let t = Vec2::new(m.m13, m.m23);
                let axes = Self::axes();
                let mut min = [0.0; A];
                let mut max = [0.0; A];
                for (i, axis) in axes.iter().enumerate() {
                    let (a, b) = (self.min[i] * s, self.max[i] * s);
                    min[i] = a.min(b) + axis.dot(&t);
                    max[i] = a.max(b) + axis.dot(&t);
                }
                Kdop::new(min, max).into()
            }
            _ => CustomKdop::<A>::from_polytope(&Self::axes(), &self.vertices, m),
        }
    }
}

/// k-DOP over `A` arbitrary unit axes
#[derive(Debug, Clone, PartialEq)]
pub struct CustomKdop<const A: usize> {
    /// Unit face normals
    pub axes: [Vec2; A],
    /// Minimum projection per axis
    pub min: [f32; A],
    /// Maximum projection per axis
    pub max: [f32; A],
    vertices: Vec<Vec2>,
}

impl<const A: usize> CustomKdop<A> {
    /// Create a custom k-DOP; axes are normalized
    pub fn new(axes: [Vec2; A], min: [f32; A], max: [f32; A]) -> Self {
        let axes = axes.map(|a| a.normalize());
        let vertices = clip_polytope(&axes, &min, &max);
        Self {
            axes,
            min,
            max,
            vertices,
        }
    }

    /// Custom k-DOP bounding a transformed polytope
    ///
    /// Face normals follow the inverse transpose of the transform and the
    /// extents come from projecting the transformed vertices. A singular
    /// transform flattens the shape, which then becomes a degenerate hull.
    pub fn from_polytope(axes: &[Vec2], vertices: &[Vec2], m: &Mat3) -> Primitive
    where
        Self: Into<Primitive>,
    {
        let transformed: Vec<Vec2> = vertices.iter().map(|p| transform_point(m, p)).collect();

        let mut new_axes = [Vec2::zeros(); A];
        for (slot, axis) in new_axes.iter_mut().zip(axes) {
            match transform_normal(m, axis) {
                Some(n) => *slot = n,
                None => return Primitive::ConvexHull(ConvexHull::new(&transformed)),
            }
        }

        let mut min = [0.0; A];
        let mut max = [0.0; A];
        for (i, axis) in new_axes.iter().enumerate() {
            (min[i], max[i]) = project(&transformed, axis);
        }
        Self::new(new_axes, min, max).into()
    }

    /// Polygon vertices in counter-clockwise order
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    /// Bounding box
    pub fn wrap(&self) -> Aabb {
        Aabb::from_points(&self.vertices)
    }

    /// Check if a point lies inside or on the k-DOP
    pub fn point_hits(&self, point: &Vec2) -> bool {
        within_slabs(&self.axes, &self.min, &self.max, point)
    }

    /// Projection interval onto a unit axis
    pub fn extent_along(&self, axis: &Vec2) -> (f32, f32) {
        project(&self.vertices, axis)
    }

    /// Apply an affine transform; custom k-DOPs stay custom k-DOPs
    pub fn transform_primitive(&self, m: &Mat3) -> Primitive
    where
        Self: Into<Primitive>,
    {
        Self::from_polytope(&self.axes, &self.vertices, m)
    }
}

fn within_slabs(axes: &[Vec2], min: &[f32], max: &[f32], point: &Vec2) -> bool {
    axes.iter().zip(min).zip(max).all(|((axis, lo), hi)| {
        let d = axis.dot(point);
        let eps = PROJECTION_EPSILON * (1.0 + lo.abs().max(hi.abs()));
        d >= lo - eps && d <= hi + eps
    })
}

macro_rules! kdop_into_primitive {
    ($($a:literal => $fixed:ident, $custom:ident;)*) => {
        $(
            impl From<Kdop<$a>> for Primitive {
                fn from(kdop: Kdop<$a>) -> Self {
                    Primitive::$fixed(kdop)
                }
            }

            impl From<CustomKdop<$a>> for Primitive {
                fn from(kdop: CustomKdop<$a>) -> Self {
                    Primitive::$custom(kdop)
                }
            }
        )*
    };
}

kdop_into_primitive! {
    2 => Kdop2, CustomKdop2;
    3 => Kdop3, CustomKdop3;
    4 => Kdop4, CustomKdop4;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Transform2D;
    use approx::assert_relative_eq;

    #[test]
    fn test_kdop2_is_a_box() {
        let kdop = Kdop2::new([0.0, 0.0], [2.0, 1.0]);
        assert_eq!(Kdop2::axes(), [Vec2::x(), Vec2::y()]);
        assert_eq!(kdop.vertices().len(), 4);
        let wrap = kdop.wrap();
        assert_relative_eq!(wrap.min, Vec2::new(0.0, 0.0), epsilon = 1e-4);
        assert_relative_eq!(wrap.max, Vec2::new(2.0, 1.0), epsilon = 1e-4);
    }

    #[test]
    fn test_octagon_from_points() {
        let square = [
            Vec2::new(-1.0, -1.0),
            Vec2::new(1.0, -1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(-1.0, 1.0),
        ];
        let kdop = Kdop4::from_points(&square);
        // The diagonal slabs touch the corners, so the octagon equals the square.
        assert!(kdop.point_hits(&Vec2::new(0.99, 0.99)));
        assert!(!kdop.point_hits(&Vec2::new(1.1, 0.0)));
    }

    #[test]
    fn test_translation_keeps_fixed_axes() {
        let kdop = Kdop3::from_points(&[Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0)]);
        let m = Transform2D::from_position(Vec2::new(3.0, 0.0)).to_matrix();
        let Primitive::Kdop3(moved) = kdop.transform_primitive(&m) else {
            panic!("expected fixed k-DOP");
        };
        assert_relative_eq!(moved.min[0], kdop.min[0] + 3.0, epsilon = 1e-5);

        let rotated = Transform2D::from_position_rotation(Vec2::zeros(), 0.2).to_matrix();
        assert!(matches!(kdop.transform_primitive(&rotated), Primitive::CustomKdop3(_)));
    }

    #[test]
    fn test_custom_kdop_under_shear_bounds_vertices() {
        let kdop = Kdop2::new([0.0, 0.0], [1.0, 1.0]);
        let shear = Mat3::new(1.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        let Primitive::CustomKdop2(sheared) = kdop.transform_primitive(&shear) else {
            panic!("expected custom k-DOP");
        };
        // The unit square sheared by x += y is the parallelogram (0,0) (1,0) (2,1) (1,1).
        assert!(sheared.point_hits(&Vec2::new(1.5, 0.9)));
        assert!(!sheared.point_hits(&Vec2::new(0.2, 0.9)));
        assert_eq!(sheared.vertices().len(), 4);
    }
}
