//! # Collision Scene
//!
//! A 2D collision scene for games: a catalogue of primitive shapes with an
//! exact narrow phase, composite and hierarchical colliders, a grid tree
//! broad phase, frame-coherent collision events and a small impulse
//! response for rigid bodies.
//!
//! ## Features
//!
//! - **Shapes**: circles, boxes, oriented boxes, convex hulls and k-DOPs
//! - **Composites**: compounds and bounding volume hierarchies, optionally transformed
//! - **Broad Phase**: a bounded grid tree with lazy subdivision and collapse
//! - **Events**: started / ongoing / completed phases delivered to controllers
//! - **Dynamics**: restitution and friction impulses for rigid bodies
//! - **Debug Views**: outline snapshots of colliders, wraps and tree nodes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use collision_scene::prelude::*;
//!
//! fn main() -> Result<(), CollisionError> {
//!     let mut world = CollisionWorld::new(CollisionConfig::default())?;
//!     let tree = world.create_tree(Aabb::new(Vec2::new(-100.0, -100.0), Vec2::new(100.0, 100.0)))?;
//!
//!     let ball = world.create_collider(TPrimitive::new(
//!         Circle::new(Vec2::zeros(), 1.0),
//!         Transform2D::from_position(Vec2::new(0.0, 5.0)).to_matrix(),
//!     ))?;
//!     world.attach(ball, tree)?;
//!
//!     let body = world.create_body(RigidBody::new_kinematic(Vec2::new(0.0, 5.0), 1.0, 0.5))?;
//!     world.attach_to_body(ball, body)?;
//!
//!     for _ in 0..60 {
//!         world.step(1.0 / 60.0)?;
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod error;
pub mod physics;
pub mod spatial;
pub mod events;
pub mod dynamics;
pub mod debug;

mod world;

pub use error::CollisionError;
pub use world::{CollisionWorld, RaycastHit};

#[cfg(test)]
mod tests;

/// Common imports for collision scene users
pub mod prelude {
    pub use crate::{
        CollisionError, CollisionWorld, RaycastHit,
        config::{CollisionConfig, Config, Limits},
        debug::{CollisionView, CollisionViewColors, ViewShape},
        dynamics::{BlendPolicy, BodyKind, DynamicsComponent, DynamicsConfig, Material, RigidBody},
        events::{
            erase, CollisionController, CollisionEvent, ErasedHandler, EventData, HandlerKind, Phase,
        },
        foundation::{
            collections::{BodyId, ColliderId, ControllerId, TreeId},
            math::{Mat3, Transform2D, Vec2, Vec4},
        },
        physics::{
            collider::Collider,
            collider_object::{ColliderKind, ColliderObject},
            collision_layers::{LayerMask, LayerRegistry},
            compound::{Compound, TCompound},
            bvh::{Bvh, TBvh},
            primitive::{CollisionResult, ContactResult, HitKind, Primitive, RaycastResult, TPrimitive},
            shapes::{Aabb, Circle, ConvexHull, Kdop2, Kdop3, Kdop4, Obb, Ray},
        },
        spatial::{CollisionTree, TreeConfig},
    };
}
