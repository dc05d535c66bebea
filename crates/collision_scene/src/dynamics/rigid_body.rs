//! Rigid bodies driven by the impulse response
//!
//! A body owns the pose and velocity of one simulated object and lists the
//! colliders that follow it. Static bodies never move and behave as if
//! their mass were infinite.

use crate::foundation::collections::ColliderId;
use crate::foundation::math::{cross, cross_scalar, Mat3, Transform2D, Vec2};

use super::material::Material;

/// How a body takes part in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyKind {
    /// Immovable; infinite mass
    #[default]
    Static,
    /// Moved by impulses and integration
    Kinematic,
}

/// Pose, velocity and mass properties of one simulated object
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    /// Participation in the simulation
    pub kind: BodyKind,

    /// World position of the center of mass
    pub position: Vec2,

    /// Rotation in radians (counter-clockwise)
    pub rotation: f32,

    /// Linear velocity in units per second
    pub velocity: Vec2,

    /// Angular velocity in radians per second
    pub angular_velocity: f32,

    /// Surface response
    pub material: Material,

    inverse_mass: f32,
    inverse_inertia: f32,
    colliders: Vec<ColliderId>,
}

impl RigidBody {
    /// Create an immovable body
    pub fn new_static(position: Vec2) -> Self {
        Self {
            kind: BodyKind::Static,
            position,
            rotation: 0.0,
            velocity: Vec2::zeros(),
            angular_velocity: 0.0,
            material: Material::default(),
            inverse_mass: 0.0,
            inverse_inertia: 0.0,
            colliders: Vec::new(),
        }
    }

    /// Create a moving body; a non-positive mass or inertia is treated as infinite
    pub fn new_kinematic(position: Vec2, mass: f32, inertia: f32) -> Self {
        let mut body = Self::new_static(position);
        body.kind = BodyKind::Kinematic;
        body.set_mass(mass, inertia);
        body
    }

    /// Builder: initial linear velocity
    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    /// Builder: initial angular velocity
    pub fn with_angular_velocity(mut self, angular_velocity: f32) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    /// Builder: initial rotation
    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    /// Builder: surface material
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    /// Set mass and moment of inertia
    pub fn set_mass(&mut self, mass: f32, inertia: f32) {
        self.inverse_mass = if mass > 0.0 { mass.recip() } else { 0.0 };
        self.inverse_inertia = if inertia > 0.0 { inertia.recip() } else { 0.0 };
    }

    /// Whether the body never moves
    pub fn is_static(&self) -> bool {
        self.kind == BodyKind::Static
    }

    /// Inverse mass (0 for static bodies)
    pub fn inverse_mass(&self) -> f32 {
        if self.is_static() {
            0.0
        } else {
            self.inverse_mass
        }
    }

    /// Inverse moment of inertia (0 for static bodies)
    pub fn inverse_inertia(&self) -> f32 {
        if self.is_static() {
            0.0
        } else {
            self.inverse_inertia
        }
    }

    /// Colliders following this body
    pub fn colliders(&self) -> &[ColliderId] {
        &self.colliders
    }

    pub(crate) fn add_collider(&mut self, id: ColliderId) {
        if !self.colliders.contains(&id) {
            self.colliders.push(id);
        }
    }

    pub(crate) fn remove_collider(&mut self, id: ColliderId) -> bool {
        let before = self.colliders.len();
        self.colliders.retain(|c| *c != id);
        self.colliders.len() != before
    }

    /// Current pose as a transform
    pub fn transform(&self) -> Transform2D {
        Transform2D::from_position_rotation(self.position, self.rotation)
    }

    /// Current pose as a world matrix
    pub fn matrix(&self) -> Mat3 {
        self.transform().to_matrix()
    }

    /// Velocity of the material point at world position `point`
    pub fn velocity_at(&self, point: &Vec2) -> Vec2 {
        self.velocity + cross_scalar(self.angular_velocity, &(point - self.position))
    }

    /// Apply an impulse at offset `arm` from the center of mass
    pub fn apply_impulse(&mut self, impulse: &Vec2, arm: &Vec2) {
        self.velocity += impulse * self.inverse_mass();
        self.angular_velocity += cross(arm, impulse) * self.inverse_inertia();
    }

    /// Move the center of mass directly; rotation is untouched
    pub fn nudge(&mut self, offset: &Vec2) {
        if !self.is_static() {
            self.position += offset;
        }
    }

    /// Advance the pose by `dt` seconds under `gravity`
    pub fn integrate(&mut self, dt: f32, gravity: &Vec2) {
        if self.is_static() {
            return;
        }
        if self.inverse_mass > 0.0 {
            self.velocity += gravity * dt;
        }
        self.position += self.velocity * dt;
        self.rotation += self.angular_velocity * dt;
    }

    /// Linear plus rotational kinetic energy
    pub fn kinetic_energy(&self) -> f32 {
        let linear = if self.inverse_mass() > 0.0 {
            0.5 * self.velocity.norm_squared() / self.inverse_mass()
        } else {
            0.0
        };
        let angular = if self.inverse_inertia() > 0.0 {
            0.5 * self.angular_velocity * self.angular_velocity / self.inverse_inertia()
        } else {
            0.0
        };
        linear + angular
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_static_body_ignores_impulses() {
        let mut body = RigidBody::new_static(Vec2::zeros());
        body.apply_impulse(&Vec2::new(5.0, 0.0), &Vec2::new(0.0, 1.0));
        body.integrate(1.0, &Vec2::new(0.0, -10.0));
        assert_eq!(body.velocity, Vec2::zeros());
        assert_eq!(body.position, Vec2::zeros());
        assert_relative_eq!(body.kinetic_energy(), 0.0);
    }

    #[test]
    fn test_off_center_impulse_spins() {
        let mut body = RigidBody::new_kinematic(Vec2::zeros(), 2.0, 0.5);
        body.apply_impulse(&Vec2::new(0.0, 1.0), &Vec2::new(1.0, 0.0));
        assert_relative_eq!(body.velocity, Vec2::new(0.0, 0.5));
        assert_relative_eq!(body.angular_velocity, 2.0);
        assert_relative_eq!(body.velocity_at(&Vec2::new(1.0, 0.0)), Vec2::new(0.0, 2.5));
    }

    #[test]
    fn test_integrate_applies_gravity() {
        let mut body = RigidBody::new_kinematic(Vec2::zeros(), 1.0, 1.0).with_velocity(Vec2::new(1.0, 0.0));
        body.integrate(0.5, &Vec2::new(0.0, -2.0));
        assert_relative_eq!(body.velocity, Vec2::new(1.0, -1.0));
        assert_relative_eq!(body.position, Vec2::new(0.5, -0.5));
        assert_relative_eq!(body.kinetic_energy(), 1.0);
    }

    #[test]
    fn test_nudge_moves_position_only() {
        let mut body = RigidBody::new_kinematic(Vec2::zeros(), 1.0, 1.0);
        body.rotation = 0.3;
        body.nudge(&Vec2::new(0.25, -0.5));
        assert_relative_eq!(body.position, Vec2::new(0.25, -0.5));
        assert_relative_eq!(body.rotation, 0.3);

        let mut wall = RigidBody::new_static(Vec2::zeros());
        wall.nudge(&Vec2::new(1.0, 0.0));
        assert_eq!(wall.position, Vec2::zeros());
    }
}
