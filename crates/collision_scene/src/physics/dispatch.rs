//! Pairwise dispatch over collider kinds
//!
//! Every collider kind implements [`CollisionSubject`]. The pair operations
//! (overlap, collide, contact) are generic over two subject types and are
//! instantiated once per kind pair into static `[[fn; 14]; 14]` tables, so a
//! pair test is two array indexes and a direct call. Refresh and dirty
//! checks get one-dimensional tables of the same shape.

use crate::foundation::math::Vec2;
use crate::physics::bvh::{BoundingShape, Bvh, TBvh};
use crate::physics::collider_object::{ColliderKind, ColliderObject, ColliderVariant};
use crate::physics::collision_layers::LayerMask;
use crate::physics::compound::{Compound, TCompound};
use crate::physics::greedy::{greedy_collision, greedy_contact};
use crate::physics::primitive::{
    CollisionResult, ContactResult, HitKind, Primitive, RaycastResult, TPrimitive,
};
use crate::physics::shapes::{Aabb, Kdop2, Kdop3, Kdop4, Obb, Ray};

/// Common interface of every collider kind
pub trait CollisionSubject {
    /// Layers this subject can hit
    fn mask(&self) -> LayerMask {
        LayerMask::all()
    }

    /// Layers this subject belongs to
    fn layer(&self) -> LayerMask {
        LayerMask::all()
    }

    /// World bounding box of the current geometry
    fn wrap(&self) -> Aabb;

    /// World-space primitives whose wraps touch `region`
    fn primitives_near(&self, region: &Aabb) -> Vec<&Primitive>;

    /// Rebake world-space geometry if stale and return the new wrap
    fn refresh(&mut self) -> Aabb;

    /// Whether the world-space geometry is stale
    fn is_dirty(&self) -> bool {
        false
    }
}

impl CollisionSubject for Primitive {
    fn wrap(&self) -> Aabb {
        Primitive::wrap(self)
    }

    fn primitives_near(&self, region: &Aabb) -> Vec<&Primitive> {
        if Primitive::wrap(self).intersects(region) {
            vec![self]
        } else {
            Vec::new()
        }
    }

    fn refresh(&mut self) -> Aabb {
        Primitive::wrap(self)
    }
}

impl CollisionSubject for TPrimitive {
    fn wrap(&self) -> Aabb {
        self.baked().wrap()
    }

    fn primitives_near(&self, region: &Aabb) -> Vec<&Primitive> {
        self.baked().primitives_near(region)
    }

    fn refresh(&mut self) -> Aabb {
        self.bake();
        self.baked().wrap()
    }

    fn is_dirty(&self) -> bool {
        TPrimitive::is_dirty(self)
    }
}

impl CollisionSubject for Compound {
    fn mask(&self) -> LayerMask {
        self.mask
    }

    fn layer(&self) -> LayerMask {
        self.layer
    }

    fn wrap(&self) -> Aabb {
        Compound::wrap(self)
    }

    fn primitives_near(&self, region: &Aabb) -> Vec<&Primitive> {
        Compound::primitives_near(self, region)
    }

    fn refresh(&mut self) -> Aabb {
        Compound::wrap(self)
    }
}

impl CollisionSubject for TCompound {
    fn mask(&self) -> LayerMask {
        self.baked().mask
    }

    fn layer(&self) -> LayerMask {
        self.baked().layer
    }

    fn wrap(&self) -> Aabb {
        self.baked().wrap()
    }

    fn primitives_near(&self, region: &Aabb) -> Vec<&Primitive> {
        self.baked().primitives_near(region)
    }

    fn refresh(&mut self) -> Aabb {
        self.bake();
        self.baked().wrap()
    }

    fn is_dirty(&self) -> bool {
        TCompound::is_dirty(self)
    }
}

impl<S: BoundingShape> CollisionSubject for Bvh<S> {
    fn mask(&self) -> LayerMask {
        self.mask
    }

    fn layer(&self) -> LayerMask {
        self.layer
    }

    fn wrap(&self) -> Aabb {
        Bvh::wrap(self)
    }

    fn primitives_near(&self, region: &Aabb) -> Vec<&Primitive> {
        self.query(region)
    }

    fn refresh(&mut self) -> Aabb {
        Bvh::wrap(self)
    }
}

impl<S: BoundingShape> CollisionSubject for TBvh<S> {
    fn mask(&self) -> LayerMask {
        self.baked().mask
    }

    fn layer(&self) -> LayerMask {
        self.baked().layer
    }

    fn wrap(&self) -> Aabb {
        self.baked().wrap()
    }

    fn primitives_near(&self, region: &Aabb) -> Vec<&Primitive> {
        self.baked().query(region)
    }

    fn refresh(&mut self) -> Aabb {
        self.bake();
        self.baked().wrap()
    }

    fn is_dirty(&self) -> bool {
        TBvh::is_dirty(self)
    }
}

/// Candidate primitive pairs of two subjects, or `None` when filtered out
///
/// Filtering checks `a.mask & b.layer` first, then the two wraps.
fn candidates<'a, A, B>(a: &'a A, b: &'a B) -> Option<(Vec<&'a Primitive>, Vec<&'a Primitive>)>
where
    A: CollisionSubject + ?Sized,
    B: CollisionSubject + ?Sized,
{
    if !a.mask().allows(b.layer()) {
        return None;
    }
    let (wa, wb) = (a.wrap(), b.wrap());
    if !wa.intersects(&wb) {
        return None;
    }
    Some((a.primitives_near(&wb), b.primitives_near(&wa)))
}

/// Whether `a` overlaps `b`, honouring `a`'s mask
pub fn overlap_pair<A, B>(a: &A, b: &B) -> bool
where
    A: CollisionSubject + ?Sized,
    B: CollisionSubject + ?Sized,
{
    let Some((pa, pb)) = candidates(a, b) else {
        return false;
    };
    pa.iter().any(|x| pb.iter().any(|y| x.overlaps(y)))
}

/// Merged collision of `a` against `b`, honouring `a`'s mask
pub fn collide_pair<A, B>(a: &A, b: &B) -> CollisionResult
where
    A: CollisionSubject + ?Sized,
    B: CollisionSubject + ?Sized,
{
    let Some((pa, pb)) = candidates(a, b) else {
        return CollisionResult::none();
    };
    let results: Vec<CollisionResult> = pa
        .iter()
        .flat_map(|x| pb.iter().map(move |y| x.collide(y)))
        .collect();
    greedy_collision(&results)
}

/// Merged contact of `a` against `b`, honouring `a`'s mask
pub fn contact_pair<A, B>(a: &A, b: &B) -> ContactResult
where
    A: CollisionSubject + ?Sized,
    B: CollisionSubject + ?Sized,
{
    let Some((pa, pb)) = candidates(a, b) else {
        return ContactResult::none();
    };
    let results: Vec<ContactResult> = pa
        .iter()
        .flat_map(|x| pb.iter().map(move |y| x.contact(y)))
        .collect();
    greedy_contact(&results)
}

/// Overlap table entry
pub type OverlapFn = fn(&ColliderObject, &ColliderObject) -> bool;
/// Collision table entry
pub type CollideFn = fn(&ColliderObject, &ColliderObject) -> CollisionResult;
/// Contact table entry
pub type ContactFn = fn(&ColliderObject, &ColliderObject) -> ContactResult;
/// Refresh table entry; returns the new wrap
pub type RefreshFn = fn(&mut ColliderObject) -> Aabb;
/// Dirty-check table entry
pub type DirtyFn = fn(&ColliderObject) -> bool;

fn mismatch(op: &str, a: &ColliderObject, b: Option<&ColliderObject>) {
    log::error!(
        "Dispatch table misuse in {}: {} / {}",
        op,
        a.kind().name(),
        b.map_or("-", |b| b.kind().name())
    );
}

fn overlap_entry<A, B>(a: &ColliderObject, b: &ColliderObject) -> bool
where
    A: ColliderVariant + CollisionSubject,
    B: ColliderVariant + CollisionSubject,
{
    match (A::extract(a), B::extract(b)) {
        (Some(a), Some(b)) => overlap_pair(a, b),
        _ => {
            mismatch("overlap", a, Some(b));
            false
        }
    }
}

fn collide_entry<A, B>(a: &ColliderObject, b: &ColliderObject) -> CollisionResult
where
    A: ColliderVariant + CollisionSubject,
    B: ColliderVariant + CollisionSubject,
{
    match (A::extract(a), B::extract(b)) {
        (Some(a), Some(b)) => collide_pair(a, b),
        _ => {
            mismatch("collide", a, Some(b));
            CollisionResult::none()
        }
    }
}

fn contact_entry<A, B>(a: &ColliderObject, b: &ColliderObject) -> ContactResult
where
    A: ColliderVariant + CollisionSubject,
    B: ColliderVariant + CollisionSubject,
{
    match (A::extract(a), B::extract(b)) {
        (Some(a), Some(b)) => contact_pair(a, b),
        _ => {
            mismatch("contact", a, Some(b));
            ContactResult::none()
        }
    }
}

fn refresh_entry<A>(object: &mut ColliderObject) -> Aabb
where
    A: ColliderVariant + CollisionSubject,
{
    if let Some(subject) = A::extract_mut(object) {
        return subject.refresh();
    }
    mismatch("refresh", object, None);
    Aabb::default()
}

fn dirty_entry<A>(object: &ColliderObject) -> bool
where
    A: ColliderVariant + CollisionSubject,
{
    match A::extract(object) {
        Some(subject) => subject.is_dirty(),
        None => {
            mismatch("dirty", object, None);
            false
        }
    }
}

/// Build a square table of `$entry::<Row, Col>` or a row of `$entry::<Kind>`
macro_rules! dispatch_table {
    (pairs $entry:ident as $fn_ty:ty; $($kind:ty),* $(,)?) => {
        dispatch_table!(@rows $entry, $fn_ty; [$($kind),*]; $($kind),*)
    };
    (single $entry:ident as $fn_ty:ty; $($kind:ty),* $(,)?) => {
        [$($entry::<$kind> as $fn_ty),*]
    };
    (@rows $entry:ident, $fn_ty:ty; $all:tt; $($row:ty),*) => {
        [$(dispatch_table!(@row $entry, $fn_ty; $row; $all)),*]
    };
    (@row $entry:ident, $fn_ty:ty; $row:ty; [$($col:ty),*]) => {
        [$($entry::<$row, $col> as $fn_ty),*]
    };
}

/// Instantiate a table over every collider kind, in tag order
macro_rules! every_kind {
    ($mode:ident $entry:ident as $fn_ty:ty) => {
        dispatch_table!(
            $mode $entry as $fn_ty;
            Primitive,
            TPrimitive,
            Compound,
            TCompound,
            Bvh<Aabb>,
            Bvh<Obb>,
            Bvh<Kdop2>,
            Bvh<Kdop3>,
            Bvh<Kdop4>,
            TBvh<Aabb>,
            TBvh<Obb>,
            TBvh<Kdop2>,
            TBvh<Kdop3>,
            TBvh<Kdop4>,
        )
    };
}

const N: usize = ColliderKind::COUNT;

/// Overlap functions indexed by `[kind_a][kind_b]`
pub static OVERLAP_TABLE: [[OverlapFn; N]; N] = every_kind!(pairs overlap_entry as OverlapFn);

/// Collision functions indexed by `[kind_a][kind_b]`
pub static COLLIDE_TABLE: [[CollideFn; N]; N] = every_kind!(pairs collide_entry as CollideFn);

/// Contact functions indexed by `[kind_a][kind_b]`
pub static CONTACT_TABLE: [[ContactFn; N]; N] = every_kind!(pairs contact_entry as ContactFn);

/// Refresh functions indexed by kind
pub static REFRESH_TABLE: [RefreshFn; N] = every_kind!(single refresh_entry as RefreshFn);

/// Dirty checks indexed by kind
pub static DIRTY_TABLE: [DirtyFn; N] = every_kind!(single dirty_entry as DirtyFn);

impl ColliderObject {
    /// Borrow the held value through its subject interface
    pub fn as_subject(&self) -> &dyn CollisionSubject {
        match self {
            Self::Primitive(v) => v,
            Self::TPrimitive(v) => v,
            Self::Compound(v) => v,
            Self::TCompound(v) => v,
            Self::BvhAabb(v) => v,
            Self::BvhObb(v) => v,
            Self::BvhKdop2(v) => v,
            Self::BvhKdop3(v) => v,
            Self::BvhKdop4(v) => v,
            Self::TBvhAabb(v) => v,
            Self::TBvhObb(v) => v,
            Self::TBvhKdop2(v) => v,
            Self::TBvhKdop3(v) => v,
            Self::TBvhKdop4(v) => v,
        }
    }

    /// Layers this object can hit
    pub fn mask(&self) -> LayerMask {
        self.as_subject().mask()
    }

    /// Layers this object belongs to
    pub fn layer(&self) -> LayerMask {
        self.as_subject().layer()
    }

    /// World bounding box of the current geometry
    pub fn wrap(&self) -> Aabb {
        self.as_subject().wrap()
    }

    /// Whether this object overlaps `other` (uses this object's mask)
    pub fn overlaps(&self, other: &ColliderObject) -> bool {
        OVERLAP_TABLE[self.kind().index()][other.kind().index()](self, other)
    }

    /// Merged collision against `other` (uses this object's mask)
    pub fn collide(&self, other: &ColliderObject) -> CollisionResult {
        COLLIDE_TABLE[self.kind().index()][other.kind().index()](self, other)
    }

    /// Merged contact against `other` (uses this object's mask)
    pub fn contact(&self, other: &ColliderObject) -> ContactResult {
        CONTACT_TABLE[self.kind().index()][other.kind().index()](self, other)
    }

    /// Rebake stale geometry and return the new wrap
    pub fn refresh(&mut self) -> Aabb {
        REFRESH_TABLE[self.kind().index()](self)
    }

    /// Whether the world-space geometry is stale
    pub fn is_dirty(&self) -> bool {
        DIRTY_TABLE[self.kind().index()](self)
    }

    /// Whether a point lies inside any world-space primitive
    pub fn point_hits(&self, point: &Vec2) -> bool {
        self.as_subject()
            .primitives_near(&Aabb::new(*point, *point))
            .iter()
            .any(|p| p.point_hits(point))
    }

    /// Nearest ray hit over all world-space primitives
    ///
    /// A ray starting inside any primitive reports an inside hit.
    pub fn raycast(&self, ray: &Ray) -> RaycastResult {
        self.as_subject()
            .primitives_near(&ray.wrap())
            .iter()
            .map(|p| p.raycast(ray))
            .filter(RaycastResult::is_hit)
            .min_by(|x, y| {
                let inside = |r: &RaycastResult| r.hit != HitKind::Inside;
                inside(x)
                    .cmp(&inside(y))
                    .then(x.distance.total_cmp(&y.distance))
            })
            .unwrap_or_default()
    }

    /// Whether a ray touches any world-space primitive
    pub fn ray_hits(&self, ray: &Ray) -> bool {
        self.as_subject()
            .primitives_near(&ray.wrap())
            .iter()
            .any(|p| p.ray_hits(ray))
    }

    /// Whether a circle swept along `ray` touches any world-space primitive
    pub fn circle_cast_hits(&self, ray: &Ray, radius: f32) -> bool {
        let region = ray.wrap().expanded(radius);
        self.as_subject()
            .primitives_near(&region)
            .iter()
            .any(|p| p.circle_cast_hits(ray, radius))
    }

    /// Whether an axis-aligned rectangle swept along `ray` touches any world-space primitive
    pub fn rect_cast_hits(&self, ray: &Ray, half_extents: &Vec2) -> bool {
        let region = ray.wrap().union(&Aabb::new(
            ray.wrap().min - half_extents,
            ray.wrap().max + half_extents,
        ));
        self.as_subject()
            .primitives_near(&region)
            .iter()
            .any(|p| p.rect_cast_hits(ray, half_extents))
    }

    /// Every world-space primitive
    pub fn world_primitives(&self) -> Vec<&Primitive> {
        let subject = self.as_subject();
        subject.primitives_near(&subject.wrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat3, Transform2D};
    use crate::physics::shapes::Circle;

    fn objects_at(center: Vec2) -> Vec<ColliderObject> {
        let circle: Primitive = Circle::new(center, 1.0).into();
        let square: Primitive = Aabb::from_center_extents(center + Vec2::new(0.5, 0.0), Vec2::new(0.5, 0.5)).into();
        let members = vec![circle.clone(), square.clone()];
        let compound = Compound::unfiltered(members.clone());
        let at_origin = Transform2D::from_position(center).to_matrix();
        let local = Compound::unfiltered(vec![
            Circle::new(Vec2::zeros(), 1.0).into(),
            Aabb::from_center_extents(Vec2::new(0.5, 0.0), Vec2::new(0.5, 0.5)).into(),
        ]);
        vec![
            ColliderObject::new(circle.clone()),
            ColliderObject::new(TPrimitive::new(Circle::new(Vec2::zeros(), 1.0), at_origin)),
            ColliderObject::new(compound.clone()),
            ColliderObject::new(TCompound::new(local.clone(), at_origin)),
            ColliderObject::new(Bvh::<Aabb>::from_compound(&compound)),
            ColliderObject::new(Bvh::<Obb>::from_compound(&compound)),
            ColliderObject::new(Bvh::<Kdop2>::from_compound(&compound)),
            ColliderObject::new(Bvh::<Kdop3>::from_compound(&compound)),
            ColliderObject::new(Bvh::<Kdop4>::from_compound(&compound)),
            ColliderObject::new(TBvh::new(Bvh::<Aabb>::from_compound(&local), at_origin)),
            ColliderObject::new(TBvh::new(Bvh::<Obb>::from_compound(&local), at_origin)),
            ColliderObject::new(TBvh::new(Bvh::<Kdop2>::from_compound(&local), at_origin)),
            ColliderObject::new(TBvh::new(Bvh::<Kdop3>::from_compound(&local), at_origin)),
            ColliderObject::new(TBvh::new(Bvh::<Kdop4>::from_compound(&local), at_origin)),
        ]
    }

    #[test]
    fn test_table_covers_every_kind_pair() {
        let left = objects_at(Vec2::zeros());
        let right = objects_at(Vec2::new(1.5, 0.3));
        let kinds: Vec<ColliderKind> = left.iter().map(ColliderObject::kind).collect();
        assert_eq!(kinds, ColliderKind::ALL.to_vec());

        for a in &left {
            for b in &right {
                assert!(a.overlaps(b), "{} vs {}", a.kind().name(), b.kind().name());
                assert!(a.collide(b).overlaps);
                assert!(a.contact(b).overlaps);
            }
        }
    }

    #[test]
    fn test_mask_gates_before_geometry() {
        let shape: Primitive = Circle::new(Vec2::zeros(), 1.0).into();
        let hunter = ColliderObject::new(Compound::new(vec![shape.clone()], LayerMask::ENEMY, LayerMask::PLAYER));
        let prey = ColliderObject::new(Compound::new(vec![shape], LayerMask::empty(), LayerMask::ENEMY));

        assert!(hunter.overlaps(&prey));
        assert!(!prey.overlaps(&hunter));
        assert!(!prey.collide(&hunter).overlaps);
        assert!(!prey.contact(&hunter).overlaps);
    }

    #[test]
    fn test_refresh_bakes_stale_transform() {
        let mut object = ColliderObject::new(TPrimitive::new(Circle::new(Vec2::zeros(), 1.0), Mat3::identity()));
        assert!(!object.is_dirty());
        object
            .set_matrix(Transform2D::from_position(Vec2::new(5.0, 0.0)).to_matrix())
            .unwrap();
        assert!(object.is_dirty());
        let wrap = object.refresh();
        assert!(!object.is_dirty());
        assert!(wrap.contains_point(&Vec2::new(5.5, 0.0)));
        assert!(object.point_hits(&Vec2::new(5.5, 0.0)));
    }

    #[test]
    fn test_raycast_prefers_nearest_primitive() {
        let object = ColliderObject::new(Compound::unfiltered(vec![
            Circle::new(Vec2::new(10.0, 0.0), 1.0).into(),
            Circle::new(Vec2::new(4.0, 0.0), 1.0).into(),
        ]));
        let hit = object.raycast(&Ray::new(Vec2::zeros(), Vec2::x(), 20.0));
        assert_eq!(hit.hit, HitKind::Outside);
        assert!((hit.distance - 3.0).abs() < 1e-5);
    }
}
