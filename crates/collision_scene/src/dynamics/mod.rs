//! Rigid-body impulse response
//!
//! [`DynamicsComponent`] is a collision controller. Its contact handler
//! collects the contacts reported during a poll, one per collider pair, and
//! [`DynamicsComponent::resolve`] turns them into impulses:
//!
//! - the normal impulse `j = -m_eff * (1 + e) * v_n`, never pulling
//! - a friction impulse capped by `min(mu * j, m_eff * |v_t|)`
//! - a positional nudge of `resolution_bias` times the push-out; rotation
//!   is left to the angular impulse
//!
//! Bodies are then integrated and their colliders follow the new poses.

pub mod material;
pub mod rigid_body;

pub use material::{BlendPolicy, FrictionRegime, Material};
pub use rigid_body::{BodyKind, RigidBody};

use std::any::Any;
use std::collections::BTreeMap;

use log::{trace, warn};
use serde::{Deserialize, Serialize};

use crate::error::CollisionError;
use crate::events::{erase, CollisionController, CollisionEvent, ErasedHandler, EventData, PairKey};
use crate::foundation::collections::{BodyId, ColliderId, IdPool};
use crate::foundation::math::{cross, cross_scalar, normalize_or_zero, Vec2};
use crate::physics::collider::Collider;
use crate::physics::primitive::ContactResult;

/// Tuning of the impulse response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicsConfig {
    /// Acceleration applied to every moving body
    pub gravity: Vec2,
    /// How two restitution coefficients combine
    pub restitution_blend: BlendPolicy,
    /// How two friction coefficients combine
    pub friction_blend: BlendPolicy,
    /// Speed below which a contact counts as not sliding
    pub static_threshold: f32,
    /// Fraction of the push-out applied directly to positions
    pub resolution_bias: f32,
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::zeros(),
            restitution_blend: BlendPolicy::ArithmeticMean,
            friction_blend: BlendPolicy::GeometricMean,
            static_threshold: 0.05,
            resolution_bias: 0.2,
        }
    }
}

/// One contact collected during a poll, oriented from `collider`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactRecord {
    /// Active collider
    pub collider: ColliderId,
    /// Passive collider
    pub other: ColliderId,
    /// Push-out of `collider` from `other` with contact points
    pub contact: ContactResult,
}

/// Working copy of one side of a contact
#[derive(Debug, Clone, Copy)]
struct ContactBody {
    position: Vec2,
    velocity: Vec2,
    angular_velocity: f32,
    inverse_mass: f32,
    inverse_inertia: f32,
    material: Material,
    offset: Vec2,
}

impl ContactBody {
    /// A missing body behaves like an immovable one
    fn of(body: Option<&RigidBody>) -> Self {
        match body {
            Some(body) => Self {
                position: body.position,
                velocity: body.velocity,
                angular_velocity: body.angular_velocity,
                inverse_mass: body.inverse_mass(),
                inverse_inertia: body.inverse_inertia(),
                material: body.material,
                offset: Vec2::zeros(),
            },
            None => Self {
                position: Vec2::zeros(),
                velocity: Vec2::zeros(),
                angular_velocity: 0.0,
                inverse_mass: 0.0,
                inverse_inertia: 0.0,
                material: Material::default(),
                offset: Vec2::zeros(),
            },
        }
    }

    fn velocity_at(&self, point: &Vec2) -> Vec2 {
        self.velocity + cross_scalar(self.angular_velocity, &(point - self.position))
    }

    fn apply_impulse(&mut self, impulse: &Vec2, arm: &Vec2) {
        self.velocity += impulse * self.inverse_mass;
        self.angular_velocity += cross(arm, impulse) * self.inverse_inertia;
    }

    fn store(&self, body: &mut RigidBody) {
        if body.is_static() {
            return;
        }
        body.velocity = self.velocity;
        body.angular_velocity = self.angular_velocity;
        body.nudge(&self.offset);
    }
}

/// Inverse of the mass both bodies present along `direction`
fn effective_mass(a: &ContactBody, b: &ContactBody, arm_a: &Vec2, arm_b: &Vec2, direction: &Vec2) -> f32 {
    let ra = cross(arm_a, direction);
    let rb = cross(arm_b, direction);
    let k = a.inverse_mass + b.inverse_mass + ra * ra * a.inverse_inertia + rb * rb * b.inverse_inertia;
    if k > f32::EPSILON {
        k.recip()
    } else {
        0.0
    }
}

/// Collision controller resolving contacts between rigid bodies
#[derive(Debug, Default)]
pub struct DynamicsComponent {
    config: DynamicsConfig,
    contacts: BTreeMap<PairKey, ContactRecord>,
}

impl CollisionController for DynamicsComponent {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl DynamicsComponent {
    /// Create a component with the given tuning
    pub fn new(config: DynamicsConfig) -> Self {
        Self {
            config,
            contacts: BTreeMap::new(),
        }
    }

    /// Active tuning
    pub fn config(&self) -> &DynamicsConfig {
        &self.config
    }

    /// Replace the tuning
    pub fn set_config(&mut self, config: DynamicsConfig) {
        self.config = config;
    }

    /// Contact handler to bind on body colliders
    pub fn contact_handler() -> ErasedHandler {
        erase(Self::on_contact)
    }

    /// Record a contact event; the first report of a pair wins
    pub fn on_contact(&mut self, event: &CollisionEvent) {
        let EventData::Contact(contact) = event.data else {
            return;
        };
        if !event.phase.is_touching() || !contact.overlaps {
            return;
        }
        self.contacts
            .entry(PairKey::new(event.collider, event.other))
            .or_insert(ContactRecord {
                collider: event.collider,
                other: event.other,
                contact,
            });
    }

    /// Contacts waiting for [`DynamicsComponent::resolve`]
    pub fn pending(&self) -> impl Iterator<Item = &ContactRecord> {
        self.contacts.values()
    }

    /// Number of contacts waiting
    pub fn pending_len(&self) -> usize {
        self.contacts.len()
    }

    /// Apply impulses for every collected contact; returns how many were resolved
    pub fn resolve(&mut self, bodies: &mut IdPool<BodyId, RigidBody>, colliders: &IdPool<ColliderId, Collider>) -> usize {
        let contacts = std::mem::take(&mut self.contacts);
        let mut resolved = 0;
        for record in contacts.into_values() {
            let (Some(active), Some(passive)) = (colliders.get(record.collider), colliders.get(record.other)) else {
                continue;
            };
            let (body_a, body_b) = (active.body(), passive.body());
            if (body_a.is_none() && body_b.is_none()) || (body_a.is_some() && body_a == body_b) {
                continue;
            }
            if self.resolve_contact(bodies, body_a, body_b, &record.contact) {
                resolved += 1;
            }
        }
        trace!("Resolved {} contacts", resolved);
        resolved
    }

    fn resolve_contact(
        &self,
        bodies: &mut IdPool<BodyId, RigidBody>,
        body_a: Option<BodyId>,
        body_b: Option<BodyId>,
        contact: &ContactResult,
    ) -> bool {
        let mut a = ContactBody::of(body_a.and_then(|id| bodies.get(id)));
        let mut b = ContactBody::of(body_b.and_then(|id| bodies.get(id)));
        if a.inverse_mass + b.inverse_mass <= 0.0 {
            return false;
        }

        // The impulse direction pushes `a` away from `b`.
        let normal = normalize_or_zero(&contact.impulse);
        let point = (contact.contacts[0] + contact.contacts[1]) * 0.5;
        let arm_a = point - a.position;
        let arm_b = point - b.position;

        let relative = a.velocity_at(&point) - b.velocity_at(&point);
        let normal_speed = relative.dot(&normal);
        let normal_mass = effective_mass(&a, &b, &arm_a, &arm_b, &normal);
        let restitution = self
            .config
            .restitution_blend
            .blend(a.material.restitution, b.material.restitution);
        let j = (-normal_mass * (1.0 + restitution) * normal_speed).max(0.0);
        a.apply_impulse(&(normal * j), &arm_a);
        b.apply_impulse(&(-normal * j), &arm_b);

        let relative = a.velocity_at(&point) - b.velocity_at(&point);
        let tangential = relative - normal * relative.dot(&normal);
        let tangential_speed = tangential.norm();
        if j > 0.0 && tangential_speed > f32::EPSILON {
            let tangent = tangential / tangential_speed;
            let spin = a.angular_velocity.abs().max(b.angular_velocity.abs());
            let regime = FrictionRegime::classify(tangential_speed, spin, self.config.static_threshold);
            let mu = self
                .config
                .friction_blend
                .blend(a.material.friction(regime), b.material.friction(regime));
            let tangent_mass = effective_mass(&a, &b, &arm_a, &arm_b, &tangent);
            let jt = (mu * j).min(tangent_mass * tangential_speed);
            a.apply_impulse(&(-tangent * jt), &arm_a);
            b.apply_impulse(&(tangent * jt), &arm_b);
        }

        let share = a.inverse_mass + b.inverse_mass;
        let correction = contact.mtv() * self.config.resolution_bias;
        a.offset = correction * (a.inverse_mass / share);
        b.offset = -correction * (b.inverse_mass / share);

        if let Some(body) = body_a.and_then(|id| bodies.get_mut(id)) {
            a.store(body);
        }
        if let Some(body) = body_b.and_then(|id| bodies.get_mut(id)) {
            b.store(body);
        }
        true
    }

    /// Advance every body by `dt` seconds
    pub fn integrate(&self, bodies: &mut IdPool<BodyId, RigidBody>, dt: f32) {
        for (_, body) in bodies.iter_mut() {
            body.integrate(dt, &self.config.gravity);
        }
    }

    /// Move every body's colliders to the body pose
    ///
    /// Every collider is synced even when one of them rejects the matrix;
    /// the first failure is returned afterwards.
    pub fn sync_colliders(
        bodies: &IdPool<BodyId, RigidBody>,
        colliders: &mut IdPool<ColliderId, Collider>,
    ) -> Result<(), CollisionError> {
        let mut failure = None;
        for (body_id, body) in bodies.iter() {
            let matrix = body.matrix();
            for id in body.colliders() {
                let Some(collider) = colliders.get_mut(*id) else {
                    continue;
                };
                if let Err(err) = collider.set_matrix(matrix) {
                    warn!("Collider {:?} cannot follow body {:?}: {}", id, body_id, err);
                    failure.get_or_insert(err);
                }
            }
        }
        failure.map_or(Ok(()), Err)
    }
}
