//! Primitive shapes as one closed enum, plus narrow-phase result types
//!
//! [`Primitive`] is the unit every collider object is built from. A
//! [`TPrimitive`] pairs a local primitive with a [`Transformer`] and keeps
//! the world-space shape baked until the transform changes.

use once_cell::unsync::OnceCell;

use crate::foundation::math::{Mat3, Transformer, Vec2};
use crate::physics::narrow_phase;
use crate::physics::shapes::{
    Aabb, Circle, ConvexHull, CustomKdop, Kdop2, Kdop3, Kdop4, Obb, Ray,
};

/// Result of a collision test between two subjects
///
/// `impulse` is the unit direction that pushes the first subject out of the
/// second; `depth` is how far it must travel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CollisionResult {
    /// Whether the subjects overlap (touching counts)
    pub overlaps: bool,
    /// Penetration depth along `impulse`
    pub depth: f32,
    /// Unit push-out direction for the first subject
    pub impulse: Vec2,
}

impl CollisionResult {
    /// A non-overlapping result
    pub fn none() -> Self {
        Self::default()
    }

    /// Create an overlapping result
    pub fn new(depth: f32, impulse: Vec2) -> Self {
        Self {
            overlaps: true,
            depth,
            impulse,
        }
    }

    /// Minimum translation vector for the first subject
    pub fn mtv(&self) -> Vec2 {
        self.impulse * self.depth
    }

    /// The same result seen from the second subject
    pub fn invert(&self) -> Self {
        Self {
            impulse: -self.impulse,
            ..*self
        }
    }
}

/// Collision result extended with the deepest point of each subject
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContactResult {
    /// Whether the subjects overlap (touching counts)
    pub overlaps: bool,
    /// Penetration depth along `impulse`
    pub depth: f32,
    /// Unit push-out direction for the first subject
    pub impulse: Vec2,
    /// Deepest point of the first subject, then of the second
    pub contacts: [Vec2; 2],
}

impl ContactResult {
    /// A non-overlapping result
    pub fn none() -> Self {
        Self::default()
    }

    /// Minimum translation vector for the first subject
    pub fn mtv(&self) -> Vec2 {
        self.impulse * self.depth
    }

    /// Drop the contact points
    pub fn collision(&self) -> CollisionResult {
        CollisionResult {
            overlaps: self.overlaps,
            depth: self.depth,
            impulse: self.impulse,
        }
    }

    /// The same result seen from the second subject
    pub fn invert(&self) -> Self {
        Self {
            overlaps: self.overlaps,
            depth: self.depth,
            impulse: -self.impulse,
            contacts: [self.contacts[1], self.contacts[0]],
        }
    }
}

/// How a ray met a shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HitKind {
    /// The ray never touches the shape
    #[default]
    Miss,
    /// The ray enters the shape from outside
    Outside,
    /// The ray starts inside the shape
    Inside,
}

/// Result of a raycast
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RaycastResult {
    /// Hit classification
    pub hit: HitKind,
    /// Distance from the ray origin to `contact`
    pub distance: f32,
    /// First point of the shape along the ray
    pub contact: Vec2,
    /// Outward surface normal at `contact`
    pub normal: Vec2,
}

impl RaycastResult {
    /// A missed ray
    pub fn miss() -> Self {
        Self::default()
    }

    /// Whether the ray touched the shape
    pub fn is_hit(&self) -> bool {
        self.hit != HitKind::Miss
    }
}

/// Closed set of primitive shapes
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// Circle
    Circle(Circle),
    /// Axis-aligned box
    Aabb(Aabb),
    /// Oriented box
    Obb(Obb),
    /// Convex polygon
    ConvexHull(ConvexHull),
    /// Box-shaped k-DOP
    Kdop2(Kdop2),
    /// Hexagonal k-DOP
    Kdop3(Kdop3),
    /// Octagonal k-DOP
    Kdop4(Kdop4),
    /// Two free axes
    CustomKdop2(CustomKdop<2>),
    /// Three free axes
    CustomKdop3(CustomKdop<3>),
    /// Four free axes
    CustomKdop4(CustomKdop<4>),
}

macro_rules! for_each_shape {
    ($value:expr, $shape:ident => $body:expr) => {
        match $value {
            Primitive::Circle($shape) => $body,
            Primitive::Aabb($shape) => $body,
            Primitive::Obb($shape) => $body,
            Primitive::ConvexHull($shape) => $body,
            Primitive::Kdop2($shape) => $body,
            Primitive::Kdop3($shape) => $body,
            Primitive::Kdop4($shape) => $body,
            Primitive::CustomKdop2($shape) => $body,
            Primitive::CustomKdop3($shape) => $body,
            Primitive::CustomKdop4($shape) => $body,
        }
    };
}

impl Primitive {
    /// Name of the held shape
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Circle(_) => "Circle",
            Self::Aabb(_) => "Aabb",
            Self::Obb(_) => "Obb",
            Self::ConvexHull(_) => "ConvexHull",
            Self::Kdop2(_) => "Kdop2",
            Self::Kdop3(_) => "Kdop3",
            Self::Kdop4(_) => "Kdop4",
            Self::CustomKdop2(_) => "CustomKdop2",
            Self::CustomKdop3(_) => "CustomKdop3",
            Self::CustomKdop4(_) => "CustomKdop4",
        }
    }

    /// Bounding box
    pub fn wrap(&self) -> Aabb {
        for_each_shape!(self, shape => shape.wrap())
    }

    /// Projection interval onto a unit axis
    pub fn extent_along(&self, axis: &Vec2) -> (f32, f32) {
        for_each_shape!(self, shape => shape.extent_along(axis))
    }

    /// Check if a point lies inside or on the shape
    pub fn point_hits(&self, point: &Vec2) -> bool {
        for_each_shape!(self, shape => shape.point_hits(point))
    }

    /// Apply an affine transform, choosing the cheapest shape that represents the result
    pub fn transform_primitive(&self, m: &Mat3) -> Primitive {
        for_each_shape!(self, shape => shape.transform_primitive(m))
    }

    /// Polygon outline (circles are approximated with `circle_sides` sides)
    pub fn outline(&self, circle_sides: usize) -> Vec<Vec2> {
        match self {
            Self::Circle(circle) => circle.circumscribed_polygon(circle_sides),
            Self::Aabb(aabb) => aabb.corners().to_vec(),
            Self::Obb(obb) => obb.corners().to_vec(),
            Self::ConvexHull(hull) => hull.points.clone(),
            Self::Kdop2(k) => k.vertices().to_vec(),
            Self::Kdop3(k) => k.vertices().to_vec(),
            Self::Kdop4(k) => k.vertices().to_vec(),
            Self::CustomKdop2(k) => k.vertices().to_vec(),
            Self::CustomKdop3(k) => k.vertices().to_vec(),
            Self::CustomKdop4(k) => k.vertices().to_vec(),
        }
    }

    /// Whether the two shapes overlap (touching counts)
    pub fn overlaps(&self, other: &Primitive) -> bool {
        narrow_phase::overlaps(self, other)
    }

    /// Penetration depth and push-out direction against another shape
    pub fn collide(&self, other: &Primitive) -> CollisionResult {
        narrow_phase::collide(self, other)
    }

    /// Collision result with the deepest point of each shape
    pub fn contact(&self, other: &Primitive) -> ContactResult {
        narrow_phase::contact(self, other)
    }

    /// Cast a ray against the shape
    pub fn raycast(&self, ray: &Ray) -> RaycastResult {
        narrow_phase::raycast(self, ray)
    }

    /// Whether a ray touches the shape
    pub fn ray_hits(&self, ray: &Ray) -> bool {
        self.raycast(ray).is_hit()
    }

    /// Whether a circle of `radius` swept along `ray` touches the shape
    pub fn circle_cast_hits(&self, ray: &Ray, radius: f32) -> bool {
        narrow_phase::circle_cast_hits(self, ray, radius)
    }

    /// Whether an axis-aligned rectangle swept along `ray` touches the shape
    pub fn rect_cast_hits(&self, ray: &Ray, half_extents: &Vec2) -> bool {
        narrow_phase::rect_cast_hits(self, ray, half_extents)
    }
}

impl From<Circle> for Primitive {
    fn from(circle: Circle) -> Self {
        Self::Circle(circle)
    }
}

impl From<Aabb> for Primitive {
    fn from(aabb: Aabb) -> Self {
        Self::Aabb(aabb)
    }
}

impl From<Obb> for Primitive {
    fn from(obb: Obb) -> Self {
        Self::Obb(obb)
    }
}

impl From<ConvexHull> for Primitive {
    fn from(hull: ConvexHull) -> Self {
        Self::ConvexHull(hull)
    }
}

/// A primitive with its own transform
///
/// `baked` is the world-space shape. It is dropped whenever the transform or
/// the local shape changes and rebuilt on the next read. The dirty flag
/// stays set until [`TPrimitive::bake`] acknowledges the change, so the
/// owning collider knows to re-home itself.
#[derive(Debug, Clone)]
pub struct TPrimitive {
    local: Primitive,
    transformer: Transformer,
    baked: OnceCell<Primitive>,
}

impl PartialEq for TPrimitive {
    fn eq(&self, other: &Self) -> bool {
        self.local == other.local && self.transformer.matrix() == other.transformer.matrix()
    }
}

impl TPrimitive {
    /// Create a transformed primitive and bake it once
    pub fn new(local: impl Into<Primitive>, matrix: Mat3) -> Self {
        let local = local.into();
        let baked = OnceCell::from(local.transform_primitive(&matrix));
        let mut transformer = Transformer::new(matrix);
        transformer.clear_dirty();
        Self {
            local,
            transformer,
            baked,
        }
    }

    /// Local-space shape
    pub fn local(&self) -> &Primitive {
        &self.local
    }

    /// Replace the local-space shape
    pub fn set_local(&mut self, local: impl Into<Primitive>) {
        self.local = local.into();
        self.transformer.mark_dirty();
        self.baked.take();
    }

    /// Current world matrix
    pub fn matrix(&self) -> &Mat3 {
        self.transformer.matrix()
    }

    /// Replace the world matrix
    pub fn set_matrix(&mut self, matrix: Mat3) {
        if self.transformer.matrix() != &matrix {
            self.transformer.set_matrix(matrix);
            self.baked.take();
        }
    }

    /// Whether the transform or shape changed since the last bake
    pub fn is_dirty(&self) -> bool {
        self.transformer.is_dirty()
    }

    /// Rebake the world-space shape if stale; returns whether it ran
    pub fn bake(&mut self) -> bool {
        if !self.transformer.is_dirty() {
            return false;
        }
        self.baked();
        self.transformer.clear_dirty();
        true
    }

    /// World-space shape, rebuilt on first read after a change
    pub fn baked(&self) -> &Primitive {
        self.baked
            .get_or_init(|| self.local.transform_primitive(self.transformer.matrix()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Transform2D;
    use approx::assert_relative_eq;

    #[test]
    fn test_invert_swaps_roles() {
        let contact = ContactResult {
            overlaps: true,
            depth: 0.5,
            impulse: Vec2::new(1.0, 0.0),
            contacts: [Vec2::new(1.0, 2.0), Vec2::new(3.0, 4.0)],
        };
        let inverted = contact.invert();
        assert_eq!(inverted.impulse, Vec2::new(-1.0, 0.0));
        assert_eq!(inverted.contacts, [Vec2::new(3.0, 4.0), Vec2::new(1.0, 2.0)]);
        assert_eq!(inverted.invert(), contact);
        assert_eq!(contact.collision().invert(), inverted.collision());
    }

    #[test]
    fn test_tprimitive_bakes_on_read() {
        let mut shape = TPrimitive::new(Circle::new(Vec2::zeros(), 1.0), Mat3::identity());
        assert!(!shape.is_dirty());
        assert!(!shape.bake());

        shape.set_matrix(Transform2D::from_position(Vec2::new(2.0, 0.0)).to_matrix());
        assert!(shape.is_dirty());
        // Reads see the new transform before the bake is acknowledged.
        assert_relative_eq!(shape.baked().wrap().center(), Vec2::new(2.0, 0.0));
        assert!(shape.is_dirty());
        assert!(shape.bake());
        assert!(!shape.is_dirty());

        shape.set_local(Circle::new(Vec2::new(0.0, 1.0), 0.5));
        assert_relative_eq!(shape.baked().wrap().center(), Vec2::new(2.0, 1.0));
        assert_eq!(shape, TPrimitive::new(Circle::new(Vec2::new(0.0, 1.0), 0.5), *shape.matrix()));
    }
}
