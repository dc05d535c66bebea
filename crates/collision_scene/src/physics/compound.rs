//! Compound collision subjects
//!
//! A [`Compound`] is a set of primitives that collide as one body and share a
//! layer and mask. [`TCompound`] adds a shared transform and keeps the
//! world-space primitives baked until that transform changes.

use once_cell::unsync::OnceCell;

use crate::foundation::math::{Mat3, Transformer};
use crate::physics::collision_layers::LayerMask;
use crate::physics::primitive::Primitive;
use crate::physics::shapes::Aabb;

/// Union of the wraps of a primitive list
pub(crate) fn wrap_all<'a>(primitives: impl IntoIterator<Item = &'a Primitive>) -> Aabb {
    primitives
        .into_iter()
        .map(Primitive::wrap)
        .reduce(|acc, w| acc.union(&w))
        .unwrap_or_default()
}

/// A set of primitives colliding as one subject
#[derive(Debug, Clone, PartialEq)]
pub struct Compound {
    primitives: Vec<Primitive>,
    wrap: Aabb,
    /// Layers this compound can hit
    pub mask: LayerMask,
    /// Layers this compound belongs to
    pub layer: LayerMask,
}

impl Compound {
    /// Create a compound
    pub fn new(primitives: Vec<Primitive>, mask: LayerMask, layer: LayerMask) -> Self {
        let wrap = wrap_all(&primitives);
        Self {
            primitives,
            wrap,
            mask,
            layer,
        }
    }

    /// Create a compound that hits and is hit by everything
    pub fn unfiltered(primitives: Vec<Primitive>) -> Self {
        Self::new(primitives, LayerMask::all(), LayerMask::all())
    }

    /// Member primitives
    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// Bounding box of all members
    pub fn wrap(&self) -> Aabb {
        self.wrap
    }

    /// Members whose wraps touch `region`
    pub fn primitives_near(&self, region: &Aabb) -> Vec<&Primitive> {
        self.primitives
            .iter()
            .filter(|p| p.wrap().intersects(region))
            .collect()
    }

    /// Apply a transform to every member
    pub fn transformed(&self, m: &Mat3) -> Compound {
        Compound::new(
            self.primitives.iter().map(|p| p.transform_primitive(m)).collect(),
            self.mask,
            self.layer,
        )
    }
}

/// A compound with a shared transform
///
/// The baked members are dropped on every change and rebuilt on next read.
#[derive(Debug, Clone)]
pub struct TCompound {
    local: Compound,
    transformer: Transformer,
    baked: OnceCell<Compound>,
}

impl PartialEq for TCompound {
    fn eq(&self, other: &Self) -> bool {
        self.local == other.local && self.transformer.matrix() == other.transformer.matrix()
    }
}

impl TCompound {
    /// Create a transformed compound and bake it once
    pub fn new(local: Compound, matrix: Mat3) -> Self {
        let baked = OnceCell::from(local.transformed(&matrix));
        let mut transformer = Transformer::new(matrix);
        transformer.clear_dirty();
        Self {
            local,
            transformer,
            baked,
        }
    }

    /// Local-space compound
    pub fn local(&self) -> &Compound {
        &self.local
    }

    /// Replace the local-space compound
    pub fn set_local(&mut self, local: Compound) {
        self.local = local;
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

    /// Whether the transform or members changed since the last bake
    pub fn is_dirty(&self) -> bool {
        self.transformer.is_dirty()
    }

    /// Rebake the world-space members if stale; returns whether it ran
    pub fn bake(&mut self) -> bool {
        if !self.transformer.is_dirty() {
            return false;
        }
        self.baked();
        self.transformer.clear_dirty();
        true
    }

    /// World-space compound, rebuilt on first read after a change
    pub fn baked(&self) -> &Compound {
        self.baked
            .get_or_init(|| self.local.transformed(self.transformer.matrix()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Transform2D, Vec2};
    use crate::physics::shapes::Circle;
    use approx::assert_relative_eq;

    fn pair() -> Compound {
        Compound::new(
            vec![
                Circle::new(Vec2::new(-2.0, 0.0), 1.0).into(),
                Aabb::from_center_extents(Vec2::new(2.0, 0.0), Vec2::new(1.0, 1.0)).into(),
            ],
            LayerMask::PLAYER,
            LayerMask::ENEMY,
        )
    }

    #[test]
    fn test_wrap_and_region_filter() {
        let compound = pair();
        assert_relative_eq!(compound.wrap().min, Vec2::new(-3.0, -1.0));
        assert_relative_eq!(compound.wrap().max, Vec2::new(3.0, 1.0));

        let region = Aabb::new(Vec2::new(1.5, -0.5), Vec2::new(4.0, 0.5));
        let near = compound.primitives_near(&region);
        assert_eq!(near.len(), 1);
        assert!(matches!(near[0], Primitive::Aabb(_)));
    }

    #[test]
    fn test_tcompound_keeps_filter_and_bakes_lazily() {
        let mut compound = TCompound::new(pair(), Mat3::identity());
        compound.set_matrix(Transform2D::from_position(Vec2::new(0.0, 10.0)).to_matrix());
        assert!(compound.is_dirty());
        assert_relative_eq!(compound.baked().wrap().center(), Vec2::new(0.0, 10.0), epsilon = 1e-5);
        assert!(compound.bake());
        assert!(!compound.bake());

        let baked = compound.baked();
        assert_eq!(baked.mask, LayerMask::PLAYER);
        assert_eq!(baked.layer, LayerMask::ENEMY);
        assert_relative_eq!(baked.wrap().center(), Vec2::new(0.0, 10.0), epsilon = 1e-5);
    }
}
