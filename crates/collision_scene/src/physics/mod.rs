//! Physics module for collision detection
//!
//! Holds the shape catalogue and the narrow phase, the type-erased collider
//! objects with their dispatch tables, collision layers, the per-object
//! collider state and the event dispatcher that drives a frame.

pub mod shapes;
pub mod primitive;
pub mod narrow_phase;
pub mod greedy;
pub mod compound;
pub mod bvh;
pub mod collider_object;
pub mod dispatch;
pub mod collision_layers;
pub mod collider;
pub mod dispatcher;

pub use bvh::{BoundingShape, Bvh, TBvh};
pub use collider::Collider;
pub use collider_object::{ColliderKind, ColliderObject, ColliderVariant};
pub use collision_layers::{can_hit, LayerMask, LayerRegistry};
pub use compound::{Compound, TCompound};
pub use dispatch::CollisionSubject;
pub use dispatcher::{CollisionDispatcher, ControllerPool, PollStats};
pub use greedy::{greedy_collision, greedy_contact, greedy_overlap};
pub use primitive::{CollisionResult, ContactResult, HitKind, Primitive, RaycastResult, TPrimitive};
