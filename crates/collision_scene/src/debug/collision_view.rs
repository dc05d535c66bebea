//! Collision debug view snapshots

use crate::foundation::math::{Vec2, Vec4};
use crate::physics::primitive::Primitive;
use crate::physics::shapes::Aabb;

/// Sides used when a view has to outline a circle as a polygon
pub const VIEW_CIRCLE_SIDES: usize = 24;

/// Color scheme for collision visualization
#[derive(Clone, Debug)]
pub struct CollisionViewColors {
    /// Color for collider shapes (not colliding)
    pub shape_default: Vec4,

    /// Color for collider shapes (currently colliding)
    pub shape_colliding: Vec4,

    /// Color for collider wraps
    pub wrap: Vec4,

    /// Color for collision tree node bounds
    pub tree_node: Vec4,
}

impl Default for CollisionViewColors {
    fn default() -> Self {
        Self {
            shape_default: Vec4::new(0.0, 1.0, 0.0, 0.3),   // Green, semi-transparent
            shape_colliding: Vec4::new(1.0, 0.0, 0.0, 0.5), // Red, semi-transparent
            wrap: Vec4::new(0.5, 0.8, 1.0, 0.15),           // Light blue, transparent
            tree_node: Vec4::new(1.0, 1.0, 0.0, 0.2),       // Yellow, transparent
        }
    }
}

/// One outline in a view
#[derive(Debug, Clone, PartialEq)]
pub enum ViewShape {
    /// Circle outline
    Circle {
        /// Center in world space
        center: Vec2,
        /// Radius
        radius: f32,
    },
    /// Closed polygon outline
    Polygon(Vec<Vec2>),
}

impl ViewShape {
    /// Outline of a primitive
    pub fn from_primitive(primitive: &Primitive) -> Self {
        match primitive {
            Primitive::Circle(c) => Self::Circle {
                center: c.center,
                radius: c.radius,
            },
            other => Self::Polygon(other.outline(VIEW_CIRCLE_SIDES)),
        }
    }

    /// Outline of a box
    pub fn from_aabb(aabb: &Aabb) -> Self {
        Self::Polygon(aabb.corners().to_vec())
    }
}

/// Snapshot of debug geometry with one color
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionView {
    /// RGBA color
    pub color: Vec4,
    /// Outlines in world space
    pub shapes: Vec<ViewShape>,
}

impl CollisionView {
    /// Create an empty view
    pub fn new(color: Vec4) -> Self {
        Self {
            color,
            shapes: Vec::new(),
        }
    }

    /// Replace the outlines, keeping the color
    pub fn set_shapes(&mut self, shapes: impl IntoIterator<Item = ViewShape>) {
        self.shapes.clear();
        self.shapes.extend(shapes);
    }

    /// Whether the view holds no outlines
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::shapes::{Circle, Obb};

    #[test]
    fn test_view_shapes() {
        let circle = ViewShape::from_primitive(&Circle::new(Vec2::new(1.0, 2.0), 3.0).into());
        assert_eq!(circle, ViewShape::Circle { center: Vec2::new(1.0, 2.0), radius: 3.0 });

        let obb = ViewShape::from_primitive(&Obb::new(Vec2::zeros(), Vec2::new(1.0, 1.0), 0.3).into());
        assert!(matches!(obb, ViewShape::Polygon(ref points) if points.len() == 4));

        let mut view = CollisionView::new(CollisionViewColors::default().shape_default);
        assert!(view.is_empty());
        view.set_shapes([circle, obb]);
        assert_eq!(view.shapes.len(), 2);
    }
}
