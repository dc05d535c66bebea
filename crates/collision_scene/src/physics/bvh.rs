//! Bounding volume hierarchies over primitives
//!
//! [`Bvh<S>`] groups a compound's primitives under a binary tree of bounding
//! shapes `S`, so a collision against a small region only visits the
//! primitives near it. [`TBvh<S>`] transforms the leaves and refits every
//! node bound on bake while keeping the tree topology.

use once_cell::unsync::OnceCell;

use crate::foundation::math::{Mat3, Transformer, Vec2};
use crate::physics::collision_layers::LayerMask;
use crate::physics::compound::Compound;
use crate::physics::narrow_phase;
use crate::physics::primitive::Primitive;
use crate::physics::shapes::{Aabb, Kdop, Obb};

/// Maximum number of primitives stored in one leaf
pub const LEAF_SIZE: usize = 2;

/// Circle sides used when a bounding shape needs sample points from a circle
const FIT_CIRCLE_SIDES: usize = 8;

/// A shape that can bound a set of primitives
pub trait BoundingShape: Clone + std::fmt::Debug + PartialEq {
    /// Name used in diagnostics
    const NAME: &'static str;

    /// Tightest bound of this kind around the primitives
    fn fit(primitives: &[Primitive]) -> Self;

    /// Bounding box of the bound itself
    fn wrap(&self) -> Aabb;

    /// Whether the bound touches a box
    fn intersects(&self, region: &Aabb) -> bool;

    /// The bound as a primitive (for debug views)
    fn to_primitive(&self) -> Primitive;
}

impl BoundingShape for Aabb {
    const NAME: &'static str = "Aabb";

    fn fit(primitives: &[Primitive]) -> Self {
        crate::physics::compound::wrap_all(primitives)
    }

    fn wrap(&self) -> Aabb {
        *self
    }

    fn intersects(&self, region: &Aabb) -> bool {
        Aabb::intersects(self, region)
    }

    fn to_primitive(&self) -> Primitive {
        Primitive::Aabb(*self)
    }
}

impl BoundingShape for Obb {
    const NAME: &'static str = "Obb";

    /// Orientation from the principal axis of the member outlines
    fn fit(primitives: &[Primitive]) -> Self {
        let points: Vec<Vec2> = primitives
            .iter()
            .flat_map(|p| p.outline(FIT_CIRCLE_SIDES))
            .collect();
        if points.is_empty() {
            return Obb::from(Aabb::default());
        }

        let mean = points.iter().sum::<Vec2>() / points.len() as f32;
        let (mut cxx, mut cxy, mut cyy) = (0.0_f32, 0.0_f32, 0.0_f32);
        for p in &points {
            let d = p - mean;
            cxx += d.x * d.x;
            cxy += d.x * d.y;
            cyy += d.y * d.y;
        }
        let rotation = 0.5 * (2.0 * cxy).atan2(cxx - cyy);

        let frame = Obb::new(Vec2::zeros(), Vec2::zeros(), rotation);
        let [u, v] = frame.axes();
        let extent = |axis: &Vec2| {
            primitives
                .iter()
                .map(|p| p.extent_along(axis))
                .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), (a, b)| (lo.min(a), hi.max(b)))
        };
        let (u0, u1) = extent(&u);
        let (v0, v1) = extent(&v);
        let center = u * ((u0 + u1) * 0.5) + v * ((v0 + v1) * 0.5);
        Obb::new(center, Vec2::new((u1 - u0) * 0.5, (v1 - v0) * 0.5), rotation)
    }

    fn wrap(&self) -> Aabb {
        Obb::wrap(self)
    }

    fn intersects(&self, region: &Aabb) -> bool {
        narrow_phase::overlaps(&Primitive::Obb(*self), &Primitive::Aabb(*region))
    }

    fn to_primitive(&self) -> Primitive {
        Primitive::Obb(*self)
    }
}

impl<const A: usize> BoundingShape for Kdop<A>
where
    Kdop<A>: Into<Primitive>,
{
    const NAME: &'static str = "Kdop";

    fn fit(primitives: &[Primitive]) -> Self {
        Kdop::from_extents(|axis| {
            primitives
                .iter()
                .map(|p| p.extent_along(axis))
                .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), (a, b)| (lo.min(a), hi.max(b)))
        })
    }

    fn wrap(&self) -> Aabb {
        Kdop::wrap(self)
    }

    fn intersects(&self, region: &Aabb) -> bool {
        let axes = Self::axes();
        axes.iter().enumerate().all(|(i, axis)| {
            let (lo, hi) = region.extent_along(axis);
            hi >= self.min[i] && lo <= self.max[i]
        }) && Kdop::wrap(self).intersects(region)
    }

    fn to_primitive(&self) -> Primitive {
        self.clone().into()
    }
}

/// One node of a [`Bvh`]
#[derive(Debug, Clone, PartialEq)]
pub struct BvhNode<S> {
    /// Bound of every primitive under this node
    pub bound: S,
    /// First primitive index covered by this node
    pub start: usize,
    /// Number of primitives covered
    pub count: usize,
    /// Child node indices, `None` for leaves
    pub children: Option<[usize; 2]>,
}

/// Bounding volume hierarchy over primitives
#[derive(Debug, Clone, PartialEq)]
pub struct Bvh<S: BoundingShape> {
    primitives: Vec<Primitive>,
    nodes: Vec<BvhNode<S>>,
    /// Layers this hierarchy can hit
    pub mask: LayerMask,
    /// Layers this hierarchy belongs to
    pub layer: LayerMask,
}

impl<S: BoundingShape> Bvh<S> {
    /// Build a hierarchy with median splits along the widest centroid spread
    pub fn new(primitives: Vec<Primitive>, mask: LayerMask, layer: LayerMask) -> Self {
        let mut order: Vec<usize> = (0..primitives.len()).collect();
        let centers: Vec<Vec2> = primitives.iter().map(|p| p.wrap().center()).collect();
        let mut ranges: Vec<(usize, usize, Option<[usize; 2]>)> = Vec::new();
        if !primitives.is_empty() {
            build(&mut order, &centers, 0, primitives.len(), &mut ranges);
        }

        let mut slots: Vec<Option<Primitive>> = primitives.into_iter().map(Some).collect();
        let primitives: Vec<Primitive> = order.iter().filter_map(|&i| slots[i].take()).collect();

        let nodes = ranges
            .into_iter()
            .map(|(start, count, children)| BvhNode {
                bound: S::fit(&primitives[start..start + count]),
                start,
                count,
                children,
            })
            .collect();

        Self {
            primitives,
            nodes,
            mask,
            layer,
        }
    }

    /// Build a hierarchy over a compound's members, keeping its filter
    pub fn from_compound(compound: &Compound) -> Self {
        Self::new(compound.primitives().to_vec(), compound.mask, compound.layer)
    }

    /// Primitives in tree order
    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// Nodes in build order; the root is node 0
    pub fn nodes(&self) -> &[BvhNode<S>] {
        &self.nodes
    }

    /// Bounding box of the whole hierarchy
    pub fn wrap(&self) -> Aabb {
        self.nodes.first().map(|n| n.bound.wrap()).unwrap_or_default()
    }

    /// Primitives in leaves whose bounds touch `region`
    pub fn query(&self, region: &Aabb) -> Vec<&Primitive> {
        let mut found = Vec::new();
        let mut stack = if self.nodes.is_empty() { Vec::new() } else { vec![0] };
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if !node.bound.intersects(region) {
                continue;
            }
            match node.children {
                Some([left, right]) => {
                    stack.push(right);
                    stack.push(left);
                }
                None => found.extend(
                    self.primitives[node.start..node.start + node.count]
                        .iter()
                        .filter(|p| p.wrap().intersects(region)),
                ),
            }
        }
        found
    }

    /// Same hierarchy with every primitive transformed and every bound refit
    pub fn transformed(&self, m: &Mat3) -> Self {
        let primitives: Vec<Primitive> =
            self.primitives.iter().map(|p| p.transform_primitive(m)).collect();
        let nodes = self
            .nodes
            .iter()
            .map(|node| BvhNode {
                bound: S::fit(&primitives[node.start..node.start + node.count]),
                start: node.start,
                count: node.count,
                children: node.children,
            })
            .collect();
        Self {
            primitives,
            nodes,
            mask: self.mask,
            layer: self.layer,
        }
    }
}

/// Recursive median split; nodes are emitted in pre-order
fn build(
    order: &mut [usize],
    centers: &[Vec2],
    start: usize,
    count: usize,
    nodes: &mut Vec<(usize, usize, Option<[usize; 2]>)>,
) -> usize {
    let index = nodes.len();
    nodes.push((start, count, None));
    if count <= LEAF_SIZE {
        return index;
    }

    let slice = &mut order[start..start + count];
    let spread = Aabb::from_points(&slice.iter().map(|&i| centers[i]).collect::<Vec<_>>()).size();
    let along_x = spread.x >= spread.y;
    slice.sort_by(|&a, &b| {
        let (ca, cb) = (centers[a], centers[b]);
        if along_x {
            ca.x.total_cmp(&cb.x).then(ca.y.total_cmp(&cb.y))
        } else {
            ca.y.total_cmp(&cb.y).then(ca.x.total_cmp(&cb.x))
        }
    });

    let half = count / 2;
    let left = build(order, centers, start, half, nodes);
    let right = build(order, centers, start + half, count - half, nodes);
    nodes[index].2 = Some([left, right]);
    index
}

/// A hierarchy with a shared transform
///
/// The baked hierarchy is dropped on every change and rebuilt on next read.
#[derive(Debug, Clone)]
pub struct TBvh<S: BoundingShape> {
    local: Bvh<S>,
    transformer: Transformer,
    baked: OnceCell<Bvh<S>>,
}

impl<S: BoundingShape> PartialEq for TBvh<S> {
    fn eq(&self, other: &Self) -> bool {
        self.local == other.local && self.transformer.matrix() == other.transformer.matrix()
    }
}

impl<S: BoundingShape> TBvh<S> {
    /// Create a transformed hierarchy and bake it once
    pub fn new(local: Bvh<S>, matrix: Mat3) -> Self {
        let baked = OnceCell::from(local.transformed(&matrix));
        let mut transformer = Transformer::new(matrix);
        transformer.clear_dirty();
        Self {
            local,
            transformer,
            baked,
        }
    }

    /// Local-space hierarchy
    pub fn local(&self) -> &Bvh<S> {
        &self.local
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

    /// Whether the transform changed since the last bake
    pub fn is_dirty(&self) -> bool {
        self.transformer.is_dirty()
    }

    /// Rebake leaves and refit bounds if stale; returns whether it ran
    pub fn bake(&mut self) -> bool {
        if !self.transformer.is_dirty() {
            return false;
        }
        self.baked();
        self.transformer.clear_dirty();
        true
    }

    /// World-space hierarchy, rebuilt on first read after a change
    pub fn baked(&self) -> &Bvh<S> {
        self.baked
            .get_or_init(|| self.local.transformed(self.transformer.matrix()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Transform2D;
    use crate::physics::shapes::{Circle, Kdop3};
    use approx::assert_relative_eq;

    fn row_of_circles(n: usize) -> Vec<Primitive> {
        (0..n)
            .map(|i| Circle::new(Vec2::new(i as f32 * 3.0, 0.0), 1.0).into())
            .collect()
    }

    #[test]
    fn test_build_covers_every_primitive_once() {
        let bvh: Bvh<Aabb> = Bvh::new(row_of_circles(7), LayerMask::all(), LayerMask::all());
        let root = &bvh.nodes()[0];
        assert_eq!((root.start, root.count), (0, 7));
        let leaf_total: usize = bvh
            .nodes()
            .iter()
            .filter(|n| n.children.is_none())
            .map(|n| {
                assert!(n.count <= LEAF_SIZE);
                n.count
            })
            .sum();
        assert_eq!(leaf_total, 7);
    }

    #[test]
    fn test_region_query() {
        let bvh: Bvh<Kdop3> = Bvh::new(row_of_circles(8), LayerMask::all(), LayerMask::all());
        let region = Aabb::new(Vec2::new(5.5, -0.5), Vec2::new(6.5, 0.5));
        let hits = bvh.query(&region);
        assert_eq!(hits.len(), 1);
        assert_relative_eq!(hits[0].wrap().center(), Vec2::new(6.0, 0.0));
        assert!(bvh.query(&Aabb::new(Vec2::new(0.0, 5.0), Vec2::new(1.0, 6.0))).is_empty());
    }

    #[test]
    fn test_obb_fit_follows_diagonal() {
        let diagonal: Vec<Primitive> = (0..5)
            .map(|i| Circle::new(Vec2::new(i as f32, i as f32), 0.1).into())
            .collect();
        let obb = Obb::fit(&diagonal);
        assert_relative_eq!(obb.rotation.abs(), std::f32::consts::FRAC_PI_4, epsilon = 1e-3);
        assert!(obb.half_extents.x.max(obb.half_extents.y) > 2.8);
        assert!(obb.half_extents.x.min(obb.half_extents.y) < 0.2);
    }

    #[test]
    fn test_tbvh_refits_on_bake() {
        let bvh: Bvh<Obb> = Bvh::new(row_of_circles(4), LayerMask::all(), LayerMask::all());
        let mut tbvh = TBvh::new(bvh, Mat3::identity());
        tbvh.set_matrix(Transform2D::from_position_rotation(Vec2::zeros(), std::f32::consts::FRAC_PI_2).to_matrix());
        assert!(tbvh.bake());
        let wrap = tbvh.baked().wrap();
        assert_relative_eq!(wrap.min.y, -1.0, epsilon = 1e-3);
        assert_relative_eq!(wrap.max.y, 10.0, epsilon = 1e-3);
        assert_eq!(tbvh.baked().nodes().len(), tbvh.local().nodes().len());
    }
}
