//! Colliders: the public per-body collision handle
//!
//! A collider owns one [`ColliderObject`] plus everything the scene needs to
//! track it: a cached world wrap, the tree nodes it currently lives in, the
//! handlers controllers have bound to it, and an optional owning body.

use std::collections::HashMap;

use crate::debug::{CollisionView, ViewShape};
use crate::error::CollisionError;
use crate::events::{ErasedHandler, HandlerKind, HandlerRecord};
use crate::foundation::collections::{BodyId, ControllerId, NodeKey, TreeId};
use crate::foundation::math::{normalize_or_zero, Mat3, Vec2, Vec4};
use crate::physics::collider_object::{ColliderKind, ColliderObject};
use crate::physics::collision_layers::LayerMask;
use crate::physics::primitive::{CollisionResult, ContactResult, RaycastResult};
use crate::physics::shapes::{Aabb, Ray};

type HandlerSlots = [Option<ErasedHandler>; 3];

/// Collision handle of one body
pub struct Collider {
    object: ColliderObject,
    dirty: bool,
    quad_wrap: Aabb,
    residency: HashMap<TreeId, NodeKey>,
    handlers: HashMap<ControllerId, HandlerSlots>,
    body: Option<BodyId>,
    one_way_blocking: Option<Vec2>,
}

impl std::fmt::Debug for Collider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collider")
            .field("kind", &self.object.kind())
            .field("dirty", &self.dirty)
            .field("quad_wrap", &self.quad_wrap)
            .field("residency", &self.residency)
            .field("handlers", &self.handler_count())
            .field("body", &self.body)
            .field("one_way_blocking", &self.one_way_blocking)
            .finish()
    }
}

impl Collider {
    /// Create a collider; its wrap is computed immediately
    pub fn new(object: impl Into<ColliderObject>) -> Self {
        let mut object = object.into();
        let quad_wrap = object.refresh();
        Self {
            object,
            dirty: false,
            quad_wrap,
            residency: HashMap::new(),
            handlers: HashMap::new(),
            body: None,
            one_way_blocking: None,
        }
    }

    /// Held collider object
    pub fn object(&self) -> &ColliderObject {
        &self.object
    }

    /// Mutable access to the held object; marks the collider dirty
    pub fn object_mut(&mut self) -> &mut ColliderObject {
        self.dirty = true;
        &mut self.object
    }

    /// Replace the held object (any kind); marks the collider dirty
    pub fn set_object(&mut self, object: impl Into<ColliderObject>) {
        self.object = object.into();
        self.dirty = true;
    }

    /// Kind of the held object
    pub fn kind(&self) -> ColliderKind {
        self.object.kind()
    }

    /// Replace the world matrix of a transformed object
    pub fn set_matrix(&mut self, matrix: Mat3) -> Result<(), CollisionError> {
        self.object.set_matrix(matrix)?;
        self.dirty |= self.object.is_dirty();
        Ok(())
    }

    /// Whether the wrap or world geometry is stale
    pub fn is_dirty(&self) -> bool {
        self.dirty || self.object.is_dirty()
    }

    /// Mark the collider stale so the next flush re-homes it
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Rebake stale geometry and recompute the wrap; returns whether it ran
    pub fn refresh(&mut self) -> bool {
        if !self.is_dirty() {
            return false;
        }
        self.quad_wrap = self.object.refresh();
        self.dirty = false;
        true
    }

    /// World bounding box; recomputed from the current shape while dirty
    pub fn quad_wrap(&self) -> Aabb {
        if self.is_dirty() {
            self.object.wrap()
        } else {
            self.quad_wrap
        }
    }

    /// Layers this collider can hit
    pub fn mask(&self) -> LayerMask {
        self.object.mask()
    }

    /// Layers this collider belongs to
    pub fn layer(&self) -> LayerMask {
        self.object.layer()
    }

    /// Node holding this collider in each attached tree
    pub fn residency(&self) -> &HashMap<TreeId, NodeKey> {
        &self.residency
    }

    /// Node holding this collider in one tree
    pub fn node_in(&self, tree: TreeId) -> Option<NodeKey> {
        self.residency.get(&tree).copied()
    }

    /// Whether the collider is attached to a tree
    pub fn is_attached_to(&self, tree: TreeId) -> bool {
        self.residency.contains_key(&tree)
    }

    pub(crate) fn set_node(&mut self, tree: TreeId, node: NodeKey) {
        self.residency.insert(tree, node);
    }

    pub(crate) fn clear_node(&mut self, tree: TreeId) -> Option<NodeKey> {
        self.residency.remove(&tree)
    }

    /// Bind a handler for one result kind; replaces a previous binding
    pub fn bind(&mut self, controller: ControllerId, kind: HandlerKind, handler: ErasedHandler) {
        self.handlers.entry(controller).or_default()[kind.index()] = Some(handler);
    }

    /// Remove one binding; returns whether it existed
    pub fn unbind(&mut self, controller: ControllerId, kind: HandlerKind) -> bool {
        let Some(slots) = self.handlers.get_mut(&controller) else {
            return false;
        };
        let existed = slots[kind.index()].take().is_some();
        if slots.iter().all(Option::is_none) {
            self.handlers.remove(&controller);
        }
        existed
    }

    /// Remove every binding of a controller; returns whether any existed
    pub fn unbind_controller(&mut self, controller: ControllerId) -> bool {
        self.handlers.remove(&controller).is_some()
    }

    /// Whether any controller bound a handler of `kind`
    pub fn has_handler(&self, kind: HandlerKind) -> bool {
        self.handlers.values().any(|slots| slots[kind.index()].is_some())
    }

    /// Handlers of `kind`, ordered by controller
    pub fn handlers_for(&self, kind: HandlerKind) -> Vec<HandlerRecord> {
        let mut records: Vec<HandlerRecord> = self
            .handlers
            .iter()
            .filter_map(|(controller, slots)| {
                slots[kind.index()].as_ref().map(|handler| HandlerRecord {
                    controller: *controller,
                    kind,
                    handler: handler.clone(),
                })
            })
            .collect();
        records.sort_by_key(|r| r.controller);
        records
    }

    /// Number of bound handlers over all controllers and kinds
    pub fn handler_count(&self) -> usize {
        self.handlers
            .values()
            .map(|slots| slots.iter().filter(|s| s.is_some()).count())
            .sum()
    }

    /// Owning rigid body
    pub fn body(&self) -> Option<BodyId> {
        self.body
    }

    pub(crate) fn set_body(&mut self, body: Option<BodyId>) {
        self.body = body;
    }

    /// Direction along which this collider blocks; `None` blocks both ways
    pub fn one_way_blocking(&self) -> Option<Vec2> {
        self.one_way_blocking
    }

    /// Make the collider block only bodies moving along `direction`
    ///
    /// A platform passable from below uses a downward direction: bodies
    /// falling onto it are blocked, bodies jumping up through it are not.
    pub fn set_one_way_blocking(&mut self, direction: Option<Vec2>) {
        self.one_way_blocking = direction
            .map(|d| normalize_or_zero(&d))
            .filter(|d| *d != Vec2::zeros());
    }

    /// Whether a point lies inside the collider
    pub fn point_hits(&self, point: &Vec2) -> bool {
        self.quad_wrap().contains_point(point) && self.object.point_hits(point)
    }

    /// Whether a ray touches the collider
    pub fn ray_hits(&self, ray: &Ray) -> bool {
        self.quad_wrap().intersects(&ray.wrap()) && self.object.ray_hits(ray)
    }

    /// Nearest ray hit on the collider
    pub fn raycast(&self, ray: &Ray) -> RaycastResult {
        if !self.quad_wrap().intersects(&ray.wrap()) {
            return RaycastResult::miss();
        }
        self.object.raycast(ray)
    }

    /// Whether this collider overlaps `other` (uses this collider's mask)
    pub fn overlaps(&self, other: &Collider) -> bool {
        self.object.overlaps(&other.object)
    }

    /// Push-out of this collider from `other` (uses this collider's mask)
    pub fn collides(&self, other: &Collider) -> CollisionResult {
        self.object.collide(&other.object)
    }

    /// Push-out and contact points against `other` (uses this collider's mask)
    pub fn contacts(&self, other: &Collider) -> ContactResult {
        self.object.contact(&other.object)
    }

    /// Whether a circle swept along `ray` touches the collider
    pub fn circle_cast_hits(&self, ray: &Ray, radius: f32) -> bool {
        self.quad_wrap().intersects(&ray.wrap().expanded(radius))
            && self.object.circle_cast_hits(ray, radius)
    }

    /// Whether an axis-aligned rectangle swept along `ray` touches the collider
    pub fn rect_cast_hits(&self, ray: &Ray, half_extents: &Vec2) -> bool {
        let swept = ray.wrap();
        let region = Aabb::new(swept.min - half_extents, swept.max + half_extents);
        self.quad_wrap().intersects(&region) && self.object.rect_cast_hits(ray, half_extents)
    }

    /// Snapshot of the world-space outline
    pub fn collision_view(&self, color: Vec4) -> CollisionView {
        let mut view = CollisionView::new(color);
        self.update_view(&mut view);
        view
    }

    /// Refresh an existing snapshot in place
    pub fn update_view(&self, view: &mut CollisionView) {
        view.set_shapes(
            self.object
                .world_primitives()
                .into_iter()
                .map(ViewShape::from_primitive),
        );
    }
}
