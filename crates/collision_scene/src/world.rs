//! Collision world: the explicit context of one scene
//!
//! Owns every collider, tree, controller and body of a scene together with
//! the dispatcher, the layer registry and the configuration. All cross
//! references are generational keys checked on use, so destroying any
//! object never leaves a dangling reference behind.

use std::any::type_name;

use log::{debug, info};

use crate::config::CollisionConfig;
use crate::debug::{CollisionView, CollisionViewColors, ViewShape};
use crate::dynamics::{DynamicsComponent, RigidBody};
use crate::error::CollisionError;
use crate::events::{CollisionController, CollisionEvent, ErasedHandler, HandlerKind, Phase};
use crate::foundation::collections::{BodyId, ColliderId, ControllerId, IdPool, TreeId};
use crate::foundation::math::{Vec2, Vec4};
use crate::physics::collider::Collider;
use crate::physics::collider_object::ColliderObject;
use crate::physics::collision_layers::{LayerMask, LayerRegistry};
use crate::physics::dispatcher::{CollisionDispatcher, ControllerPool, PollStats};
use crate::physics::primitive::{HitKind, RaycastResult};
use crate::physics::shapes::{Aabb, Ray};
use crate::spatial::{CollisionTree, TreeConfig};

/// Nearest hit of a world raycast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    /// Collider that was hit
    pub collider: ColliderId,
    /// Hit details
    pub result: RaycastResult,
}

/// Owner of every object in one collision scene
pub struct CollisionWorld {
    config: CollisionConfig,
    layers: LayerRegistry,
    trees: IdPool<TreeId, CollisionTree>,
    colliders: IdPool<ColliderId, Collider>,
    controllers: ControllerPool,
    bodies: IdPool<BodyId, RigidBody>,
    dispatcher: CollisionDispatcher,
    dynamics: ControllerId,
}

impl std::fmt::Debug for CollisionWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionWorld")
            .field("trees", &self.trees.len())
            .field("colliders", &self.colliders.len())
            .field("controllers", &self.controllers.len())
            .field("bodies", &self.bodies.len())
            .field("frame", &self.dispatcher.frame())
            .finish_non_exhaustive()
    }
}

impl CollisionWorld {
    /// Create a world; named layers from the configuration are registered
    pub fn new(config: CollisionConfig) -> Result<Self, CollisionError> {
        let layers = LayerRegistry::from_table(&config.layers)?;
        let limits = config.limits;
        let mut controllers: ControllerPool = IdPool::new("controller", limits.max_controllers);
        let dynamics = controllers.insert(Box::new(DynamicsComponent::new(config.dynamics.clone())))?;
        info!(
            "Created collision world ({} layers, {} colliders max)",
            layers.len(),
            limits.max_colliders
        );
        Ok(Self {
            layers,
            trees: IdPool::new("tree", limits.max_trees),
            colliders: IdPool::new("collider", limits.max_colliders),
            controllers,
            bodies: IdPool::new("body", limits.max_bodies),
            dispatcher: CollisionDispatcher::new(),
            dynamics,
            config,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    /// Named layer registry
    pub fn layers(&self) -> &LayerRegistry {
        &self.layers
    }

    /// Register another named layer bit
    pub fn assign_layer(&mut self, name: &str, bit: u32) -> Result<(), CollisionError> {
        self.layers.assign(name, bit)
    }

    /// Mask of one named layer
    pub fn layer(&self, name: &str) -> Result<LayerMask, CollisionError> {
        self.layers.layer(name)
    }

    /// Union of several named layers
    pub fn mask(&self, names: &[&str]) -> Result<LayerMask, CollisionError> {
        self.layers.mask(names)
    }

    /// Number of completed polls
    pub fn frame(&self) -> u64 {
        self.dispatcher.frame()
    }

    /// Phase of a relationship as of the last committed poll
    pub fn phase(&self, a: ColliderId, b: ColliderId, kind: HandlerKind) -> Phase {
        self.dispatcher.phase(a, b, kind)
    }

    /// Whether the dispatcher remembers any relationship of a collider
    pub fn is_tracked(&self, id: ColliderId) -> bool {
        self.dispatcher.tracks(id)
    }

    // Trees

    /// Create a tree over `bounds` with the configured defaults
    pub fn create_tree(&mut self, bounds: Aabb) -> Result<TreeId, CollisionError> {
        self.create_tree_with(bounds, self.config.tree)
    }

    /// Create a tree over `bounds` with explicit parameters
    pub fn create_tree_with(&mut self, bounds: Aabb, config: TreeConfig) -> Result<TreeId, CollisionError> {
        let id = self
            .trees
            .insert_with_key(|id| CollisionTree::new(id, bounds, config))?;
        debug!("Created tree {:?} over {:?}", id, bounds);
        Ok(id)
    }

    /// Destroy a tree; its residents stay alive but are no longer attached
    pub fn destroy_tree(&mut self, id: TreeId) -> Result<CollisionTree, CollisionError> {
        let tree = self.trees.remove(id).ok_or(CollisionError::NullReference("tree"))?;
        for (_, collider) in self.colliders.iter_mut() {
            collider.clear_node(id);
        }
        debug!("Destroyed tree {:?}", id);
        Ok(tree)
    }

    /// Look up a tree
    pub fn tree(&self, id: TreeId) -> Result<&CollisionTree, CollisionError> {
        self.trees.try_get(id)
    }

    /// Live tree handles
    pub fn trees(&self) -> impl Iterator<Item = TreeId> + '_ {
        self.trees.keys()
    }

    // Colliders

    /// Create a collider holding `object`
    pub fn create_collider(&mut self, object: impl Into<ColliderObject>) -> Result<ColliderId, CollisionError> {
        let collider = Collider::new(object);
        let kind = collider.kind();
        let id = self.colliders.insert(collider)?;
        debug!("Created collider {:?} ({})", id, kind.name());
        Ok(id)
    }

    /// Destroy a collider
    ///
    /// Its tree residencies, its body link and its tracked relationships go
    /// with it; the handlers it held are dropped with the returned value.
    pub fn destroy_collider(&mut self, id: ColliderId) -> Result<Collider, CollisionError> {
        let mut collider = self
            .colliders
            .remove(id)
            .ok_or(CollisionError::NullReference("collider"))?;
        let residency: Vec<_> = collider.residency().iter().map(|(t, n)| (*t, *n)).collect();
        for (tree, node) in residency {
            if let Some(tree_ref) = self.trees.get_mut(tree) {
                tree_ref.evict(id, node);
            }
            collider.clear_node(tree);
        }
        if let Some(body) = collider.body().and_then(|b| self.bodies.get_mut(b)) {
            body.remove_collider(id);
        }
        collider.set_body(None);
        self.dispatcher.forget(id);
        debug!("Destroyed collider {:?} ({} handlers released)", id, collider.handler_count());
        Ok(collider)
    }

    /// Look up a collider
    pub fn collider(&self, id: ColliderId) -> Result<&Collider, CollisionError> {
        self.colliders.try_get(id)
    }

    /// Look up a collider for modification
    pub fn collider_mut(&mut self, id: ColliderId) -> Result<&mut Collider, CollisionError> {
        self.colliders.try_get_mut(id)
    }

    /// Live collider handles
    pub fn colliders(&self) -> impl Iterator<Item = ColliderId> + '_ {
        self.colliders.keys()
    }

    /// Attach a collider to a tree; returns false if it already was
    pub fn attach(&mut self, collider: ColliderId, tree: TreeId) -> Result<bool, CollisionError> {
        let tree = self.trees.try_get_mut(tree)?;
        let collider_ref = self.colliders.try_get_mut(collider)?;
        Ok(tree.attach(collider, collider_ref))
    }

    /// Detach a collider from a tree; returns false if it was not attached
    pub fn detach(&mut self, collider: ColliderId, tree: TreeId) -> Result<bool, CollisionError> {
        let tree = self.trees.try_get_mut(tree)?;
        let collider_ref = self.colliders.try_get_mut(collider)?;
        Ok(tree.detach(collider, collider_ref))
    }

    // Controllers

    /// Register a controller
    pub fn create_controller<C: CollisionController>(&mut self, controller: C) -> Result<ControllerId, CollisionError> {
        let id = self.controllers.insert(Box::new(controller))?;
        debug!("Created controller {:?} ({})", id, type_name::<C>());
        Ok(id)
    }

    /// Remove a controller and every handler it bound
    pub fn destroy_controller(&mut self, id: ControllerId) -> Result<Box<dyn CollisionController>, CollisionError> {
        let controller = self
            .controllers
            .remove(id)
            .ok_or(CollisionError::NullReference("controller"))?;
        let unbound = CollisionDispatcher::unbind_controller(&mut self.colliders, id);
        debug!("Destroyed controller {:?} ({} colliders unbound)", id, unbound);
        Ok(controller)
    }

    /// Borrow a controller as its concrete type
    pub fn controller<C: CollisionController>(&self, id: ControllerId) -> Result<&C, CollisionError> {
        let controller = self.controllers.try_get(id)?;
        let found = controller.name();
        controller
            .as_any()
            .downcast_ref::<C>()
            .ok_or(CollisionError::InvalidType {
                expected: type_name::<C>(),
                found,
            })
    }

    /// Mutably borrow a controller as its concrete type
    pub fn controller_mut<C: CollisionController>(&mut self, id: ControllerId) -> Result<&mut C, CollisionError> {
        let controller = self.controllers.try_get_mut(id)?;
        let found = controller.name();
        controller
            .as_any_mut()
            .downcast_mut::<C>()
            .ok_or(CollisionError::InvalidType {
                expected: type_name::<C>(),
                found,
            })
    }

    /// Handle of the built-in impulse response controller
    pub fn dynamics(&self) -> ControllerId {
        self.dynamics
    }

    /// Bind a controller's handler to a collider
    pub fn bind(
        &mut self,
        collider: ColliderId,
        controller: ControllerId,
        kind: HandlerKind,
        handler: ErasedHandler,
    ) -> Result<(), CollisionError> {
        CollisionDispatcher::bind(&mut self.colliders, &self.controllers, collider, controller, kind, handler)
    }

    /// Remove a controller's handler from a collider
    pub fn unbind(
        &mut self,
        collider: ColliderId,
        controller: ControllerId,
        kind: HandlerKind,
    ) -> Result<bool, CollisionError> {
        CollisionDispatcher::unbind(&mut self.colliders, collider, controller, kind)
    }

    /// Deliver an event right away to the handlers bound on `from`
    pub fn emit(&mut self, from: ColliderId, event: &CollisionEvent) -> Result<usize, CollisionError> {
        CollisionDispatcher::emit(&self.colliders, &mut self.controllers, from, event)
    }

    // Bodies

    /// Register a rigid body
    pub fn create_body(&mut self, body: RigidBody) -> Result<BodyId, CollisionError> {
        let id = self.bodies.insert(body)?;
        debug!("Created body {:?}", id);
        Ok(id)
    }

    /// Remove a body; its colliders stay alive without an owner
    pub fn destroy_body(&mut self, id: BodyId) -> Result<RigidBody, CollisionError> {
        let body = self.bodies.remove(id).ok_or(CollisionError::NullReference("body"))?;
        for collider in body.colliders() {
            if let Some(collider) = self.colliders.get_mut(*collider) {
                collider.set_body(None);
                collider.unbind(self.dynamics, HandlerKind::Contact);
            }
        }
        debug!("Destroyed body {:?}", id);
        Ok(body)
    }

    /// Look up a body
    pub fn body(&self, id: BodyId) -> Result<&RigidBody, CollisionError> {
        self.bodies.try_get(id)
    }

    /// Look up a body for modification
    pub fn body_mut(&mut self, id: BodyId) -> Result<&mut RigidBody, CollisionError> {
        self.bodies.try_get_mut(id)
    }

    /// Make a collider follow a body and take part in the impulse response
    ///
    /// The collider must carry its own transform.
    pub fn attach_to_body(&mut self, collider: ColliderId, body: BodyId) -> Result<(), CollisionError> {
        let matrix = self.bodies.try_get(body)?.matrix();
        let collider_ref = self.colliders.try_get_mut(collider)?;
        if !collider_ref.kind().is_transformed() {
            return Err(CollisionError::InvalidType {
                expected: "transformed collider",
                found: collider_ref.kind().name(),
            });
        }
        let previous = collider_ref.body();
        collider_ref.set_matrix(matrix)?;
        collider_ref.set_body(Some(body));
        if let Some(old) = previous.filter(|old| *old != body).and_then(|old| self.bodies.get_mut(old)) {
            old.remove_collider(collider);
        }
        self.bodies.try_get_mut(body)?.add_collider(collider);
        if self.controllers.contains(self.dynamics) {
            self.bind(collider, self.dynamics, HandlerKind::Contact, DynamicsComponent::contact_handler())?;
        }
        Ok(())
    }

    /// Release a collider from its body; returns false if it had none
    pub fn detach_from_body(&mut self, collider: ColliderId) -> Result<bool, CollisionError> {
        let collider_ref = self.colliders.try_get_mut(collider)?;
        let Some(body) = collider_ref.body() else {
            return Ok(false);
        };
        collider_ref.set_body(None);
        collider_ref.unbind(self.dynamics, HandlerKind::Contact);
        if let Some(body) = self.bodies.get_mut(body) {
            body.remove_collider(collider);
        }
        Ok(true)
    }

    // Frame

    /// Flush every tree and dispatch this frame's collision events
    pub fn poll(&mut self) -> PollStats {
        self.dispatcher
            .poll(&mut self.trees, &mut self.colliders, &mut self.controllers, &self.bodies)
    }

    /// Poll, resolve contacts, integrate bodies by `dt` and move their colliders
    pub fn step(&mut self, dt: f32) -> Result<PollStats, CollisionError> {
        let stats = self.poll();
        if let Some(dynamics) = self
            .controllers
            .get_mut(self.dynamics)
            .and_then(|c| c.as_any_mut().downcast_mut::<DynamicsComponent>())
        {
            dynamics.resolve(&mut self.bodies, &self.colliders);
            dynamics.integrate(&mut self.bodies, dt);
        }
        DynamicsComponent::sync_colliders(&self.bodies, &mut self.colliders)?;
        Ok(stats)
    }

    // Queries

    /// Colliders in `tree` whose bounds touch `region`
    ///
    /// The tree is flushed first, so colliders moved since the last poll are
    /// found at their new place.
    pub fn query(&mut self, tree: TreeId, region: &Aabb) -> Result<Vec<ColliderId>, CollisionError> {
        let tree = self.trees.try_get_mut(tree)?;
        tree.flush(&mut self.colliders);
        let colliders = &self.colliders;
        Ok(tree
            .query(region)
            .filter(|id| colliders.get(*id).is_some_and(|c| c.quad_wrap().intersects(region)))
            .collect())
    }

    /// Colliders in `tree` whose shape contains `point`
    pub fn query_point(&mut self, tree: TreeId, point: &Vec2) -> Result<Vec<ColliderId>, CollisionError> {
        let region = Aabb::new(*point, *point);
        let candidates = self.query(tree, &region)?;
        Ok(candidates
            .into_iter()
            .filter(|id| self.colliders.get(*id).is_some_and(|c| c.point_hits(point)))
            .collect())
    }

    /// Nearest collider in `tree` hit by `ray`
    ///
    /// Colliders containing the ray origin come first.
    pub fn raycast(&mut self, tree: TreeId, ray: &Ray) -> Result<Option<RaycastHit>, CollisionError> {
        let tree = self.trees.try_get_mut(tree)?;
        tree.flush(&mut self.colliders);
        let colliders = &self.colliders;
        let nearest = tree
            .query(&ray.wrap())
            .filter_map(|id| {
                let result = colliders.get(id)?.raycast(ray);
                result.is_hit().then_some(RaycastHit { collider: id, result })
            })
            .min_by(|x, y| {
                let outside = |h: &RaycastHit| h.result.hit != HitKind::Inside;
                outside(x)
                    .cmp(&outside(y))
                    .then(x.result.distance.total_cmp(&y.result.distance))
                    .then(x.collider.cmp(&y.collider))
            });
        Ok(nearest)
    }

    // Debug views

    /// Outline of one collider
    pub fn collider_view(&self, id: ColliderId, color: Vec4) -> Result<CollisionView, CollisionError> {
        Ok(self.colliders.try_get(id)?.collision_view(color))
    }

    /// Node grid of one tree
    pub fn tree_view(&self, id: TreeId, color: Vec4) -> Result<CollisionView, CollisionError> {
        Ok(self.trees.try_get(id)?.collision_view(color))
    }

    /// Every collider outline, collider wrap and tree grid
    ///
    /// Colliders touching anything in the latest poll use the colliding color.
    pub fn debug_views(&self, colors: &CollisionViewColors) -> Vec<CollisionView> {
        let touching = self.dispatcher.touching_colliders();
        let mut views = Vec::with_capacity(self.colliders.len() + 1 + self.trees.len());
        let mut wraps = CollisionView::new(colors.wrap);
        let mut outlines = Vec::new();
        for (id, collider) in self.colliders.iter() {
            let color = if touching.contains(&id) {
                colors.shape_colliding
            } else {
                colors.shape_default
            };
            views.push(collider.collision_view(color));
            outlines.push(ViewShape::from_aabb(&collider.quad_wrap()));
        }
        wraps.set_shapes(outlines);
        views.push(wraps);
        views.extend(self.trees.iter().map(|(_, tree)| tree.collision_view(colors.tree_node)));
        views
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Transform2D;
    use crate::physics::primitive::{Primitive, TPrimitive};
    use crate::physics::shapes::Circle;
    use std::any::Any;
    use std::collections::BTreeMap;

    struct Nobody;

    impl CollisionController for Nobody {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn world() -> (CollisionWorld, TreeId) {
        let mut world = CollisionWorld::new(CollisionConfig::default()).unwrap();
        let tree = world
            .create_tree(Aabb::new(Vec2::new(-50.0, -50.0), Vec2::new(50.0, 50.0)))
            .unwrap();
        (world, tree)
    }

    fn ball(world: &mut CollisionWorld, tree: TreeId, x: f32, y: f32) -> ColliderId {
        let matrix = Transform2D::from_position(Vec2::new(x, y)).to_matrix();
        let id = world
            .create_collider(TPrimitive::new(Circle::new(Vec2::zeros(), 1.0), matrix))
            .unwrap();
        world.attach(id, tree).unwrap();
        id
    }

    #[test]
    fn test_layers_from_config() {
        let mut config = CollisionConfig::default();
        config.layers = BTreeMap::from([("player".to_string(), 0), ("wall".to_string(), 3)]);
        let world = CollisionWorld::new(config).unwrap();
        assert_eq!(world.mask(&["player", "wall"]).unwrap().bits(), 0b1001);
        assert_eq!(world.layer("ghost"), Err(CollisionError::UnknownLayer("ghost".to_string())));

        let mut config = CollisionConfig::default();
        config.layers = BTreeMap::from([("far".to_string(), 40)]);
        assert!(CollisionWorld::new(config).is_err());
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut config = CollisionConfig::default();
        config.limits.max_trees = 1;
        let mut world = CollisionWorld::new(config).unwrap();
        let bounds = Aabb::new(Vec2::zeros(), Vec2::new(1.0, 1.0));
        world.create_tree(bounds).unwrap();
        assert_eq!(
            world.create_tree(bounds),
            Err(CollisionError::StorageOverflow { what: "tree", capacity: 1 })
        );
    }

    #[test]
    fn test_controller_downcast() {
        let (mut world, _) = world();
        let id = world.create_controller(Nobody).unwrap();
        assert!(world.controller::<Nobody>(id).is_ok());
        assert!(matches!(
            world.controller::<DynamicsComponent>(id),
            Err(CollisionError::InvalidType { .. })
        ));
        world.destroy_controller(id).unwrap();
        assert_eq!(
            world.controller::<Nobody>(id).err(),
            Some(CollisionError::NullReference("controller"))
        );
    }

    #[test]
    fn test_queries_use_exact_bounds() {
        let (mut world, tree) = world();
        let a = ball(&mut world, tree, 0.0, 0.0);
        let b = ball(&mut world, tree, 10.0, 0.0);
        world.poll();

        let hits = world
            .query(tree, &Aabb::new(Vec2::new(0.5, -0.5), Vec2::new(2.0, 0.5)))
            .unwrap();
        assert_eq!(hits, vec![a]);
        assert_eq!(world.query_point(tree, &Vec2::new(10.5, 0.0)).unwrap(), vec![b]);

        let hit = world
            .raycast(tree, &Ray::new(Vec2::new(-5.0, 0.0), Vec2::new(1.0, 0.0), 30.0))
            .unwrap()
            .unwrap();
        assert_eq!(hit.collider, a);
        assert!(world
            .raycast(tree, &Ray::new(Vec2::new(-5.0, 5.0), Vec2::new(1.0, 0.0), 30.0))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_queries_see_moves_before_poll() {
        let (mut world, tree) = world();
        let moving = world
            .create_collider(TPrimitive::new(Circle::new(Vec2::zeros(), 1.0), Transform2D::identity().to_matrix()))
            .unwrap();
        world.attach(moving, tree).unwrap();
        world.poll();

        world
            .collider_mut(moving)
            .unwrap()
            .set_matrix(Transform2D::from_position(Vec2::new(12.0, 6.0)).to_matrix())
            .unwrap();
        let near_old = Aabb::from_center_extents(Vec2::zeros(), Vec2::new(1.5, 1.5));
        let near_new = Aabb::from_center_extents(Vec2::new(12.0, 6.0), Vec2::new(1.5, 1.5));
        assert!(world.query(tree, &near_old).unwrap().is_empty());
        assert_eq!(world.query(tree, &near_new).unwrap(), vec![moving]);
        assert_eq!(world.query_point(tree, &Vec2::new(12.5, 6.0)).unwrap(), vec![moving]);
        assert!(world.query_point(tree, &Vec2::zeros()).unwrap().is_empty());

        let hit = world
            .raycast(tree, &Ray::new(Vec2::new(0.0, 6.0), Vec2::new(1.0, 0.0), 30.0))
            .unwrap()
            .unwrap();
        assert_eq!(hit.collider, moving);
        assert!((hit.result.distance - 11.0).abs() < 1e-4);
    }

    #[test]
    fn test_body_requires_transformed_collider() {
        let (mut world, _) = world();
        let body = world.create_body(RigidBody::new_static(Vec2::zeros())).unwrap();
        let plain = world
            .create_collider(Primitive::Circle(Circle::new(Vec2::zeros(), 1.0)))
            .unwrap();
        assert!(matches!(
            world.attach_to_body(plain, body),
            Err(CollisionError::InvalidType { .. })
        ));

        let moving = world
            .create_collider(TPrimitive::new(Circle::new(Vec2::zeros(), 1.0), Transform2D::identity().to_matrix()))
            .unwrap();
        world.attach_to_body(moving, body).unwrap();
        assert_eq!(world.collider(moving).unwrap().body(), Some(body));
        assert!(world.collider(moving).unwrap().has_handler(HandlerKind::Contact));
        assert!(world.detach_from_body(moving).unwrap());
        assert!(!world.collider(moving).unwrap().has_handler(HandlerKind::Contact));
        assert!(world.body(body).unwrap().colliders().is_empty());
    }

    #[test]
    fn test_debug_views_cover_scene() {
        let (mut world, tree) = world();
        ball(&mut world, tree, 0.0, 0.0);
        ball(&mut world, tree, 0.5, 0.0);
        world.poll();
        let views = world.debug_views(&CollisionViewColors::default());
        // Two colliders, one wrap view, one tree view.
        assert_eq!(views.len(), 4);
        assert_eq!(views[2].shapes.len(), 2);
        assert!(world.tree_view(tree, Vec4::zeros()).is_ok());
    }
}
