//! Axis-aligned bounding box
//!
//! Doubles as the collider wrap ("quad wrap") and as the bound of every
//! collision tree node.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{classify, transform_point, AffineClass, Mat3, Vec2};
use crate::physics::primitive::Primitive;
use crate::physics::shapes::{kdop::CustomKdop, obb::Obb};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec2,
    /// Maximum corner of the bounding box
    pub max: Vec2,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new(Vec2::zeros(), Vec2::zeros())
    }
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given half extents
    pub fn from_center_extents(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Smallest AABB containing every point
    ///
    /// Returns an empty box at the origin for an empty slice.
    pub fn from_points(points: &[Vec2]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };
        points[1..].iter().fold(Self::new(*first, *first), |acc, p| {
            Self::new(acc.min.inf(p), acc.max.sup(p))
        })
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Get the half extents of the AABB
    pub fn half_extents(&self) -> Vec2 {
        (self.max - self.min) * 0.5
    }

    /// Full width and height
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Corners in counter-clockwise order starting at `min`
    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            self.max,
            Vec2::new(self.min.x, self.max.y),
        ]
    }

    /// Check if this AABB contains a point (boundary inclusive)
    pub fn contains_point(&self, point: &Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y
    }

    /// Bounding box (the box itself)
    pub fn wrap(&self) -> Aabb {
        *self
    }

    /// Same as [`Aabb::contains_point`]
    pub fn point_hits(&self, point: &Vec2) -> bool {
        self.contains_point(point)
    }

    /// Check if `other` lies entirely inside this AABB (boundary inclusive)
    pub fn contains(&self, other: &Aabb) -> bool {
        other.min.x >= self.min.x && other.max.x <= self.max.x &&
        other.min.y >= self.min.y && other.max.y <= self.max.y
    }

    /// Check if this AABB intersects another AABB (touching counts)
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y
    }

    /// Smallest AABB containing both boxes
    pub fn union(&self, other: &Aabb) -> Aabb {
        Self::new(self.min.inf(&other.min), self.max.sup(&other.max))
    }

    /// Grow the box by `margin` on every side
    pub fn expanded(&self, margin: f32) -> Aabb {
        let m = Vec2::new(margin, margin);
        Self::new(self.min - m, self.max + m)
    }

    /// Projection interval onto an axis
    pub fn extent_along(&self, axis: &Vec2) -> (f32, f32) {
        let c = self.center().dot(axis);
        let h = self.half_extents();
        let r = h.x * axis.x.abs() + h.y * axis.y.abs();
        (c - r, c + r)
    }

    /// Sub-rectangle `(ix, iy)` of a `degree[0] x degree[1]` grid over this box
    pub fn grid_cell(&self, degree: [usize; 2], ix: usize, iy: usize) -> Aabb {
        let size = self.size();
        let step = Vec2::new(size.x / degree[0] as f32, size.y / degree[1] as f32);
        let min = Vec2::new(
            self.min.x + step.x * ix as f32,
            self.min.y + step.y * iy as f32,
        );
        // The last cell snaps to the parent edge so rounding never leaves a gap.
        let max = Vec2::new(
            if ix + 1 == degree[0] { self.max.x } else { min.x + step.x },
            if iy + 1 == degree[1] { self.max.y } else { min.y + step.y },
        );
        Aabb::new(min, max)
    }

    /// Apply an affine transform
    ///
    /// Pure scale and translation keep an AABB; rotation with uniform scale
    /// yields an OBB; anything else becomes a two-axis custom k-DOP.
    pub fn transform_primitive(&self, m: &Mat3) -> Primitive {
        match classify(m) {
            AffineClass::Scale { .. } => {
                let corners = self.corners().map(|c| transform_point(m, &c));
                Primitive::Aabb(Aabb::from_points(&corners))
            }
            AffineClass::Conformal => Primitive::Obb(Obb::from(*self).transformed_conformal(m)),
            AffineClass::General => CustomKdop::<2>::from_polytope(
                &[Vec2::x(), Vec2::y()],
                &self.corners(),
                m,
            ),
        }
    }
}
