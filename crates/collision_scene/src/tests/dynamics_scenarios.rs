//! Scenario tests for the impulse response driven by world steps

use crate::config::CollisionConfig;
use crate::dynamics::{Material, RigidBody};
use crate::foundation::collections::{BodyId, ColliderId, TreeId};
use crate::foundation::math::{Transform2D, Vec2};
use crate::physics::primitive::{Primitive, TPrimitive};
use crate::physics::shapes::{Aabb, Circle};
use crate::CollisionWorld;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn world(gravity: Vec2) -> (CollisionWorld, TreeId) {
        let mut config = CollisionConfig::default();
        config.dynamics.gravity = gravity;
        let mut world = CollisionWorld::new(config).unwrap();
        let tree = world
            .create_tree(Aabb::new(Vec2::new(-50.0, -50.0), Vec2::new(50.0, 50.0)))
            .unwrap();
        (world, tree)
    }

    fn spawn(world: &mut CollisionWorld, tree: TreeId, shape: impl Into<Primitive>, body: RigidBody) -> (BodyId, ColliderId) {
        let collider = world
            .create_collider(TPrimitive::new(shape, body.matrix()))
            .unwrap();
        world.attach(collider, tree).unwrap();
        let body = world.create_body(body).unwrap();
        world.attach_to_body(collider, body).unwrap();
        (body, collider)
    }

    #[test]
    fn test_elastic_head_on_exchange() {
        let (mut world, tree) = world(Vec2::zeros());
        let material = Material::frictionless(1.0);
        let ball = || Circle::new(Vec2::zeros(), 1.0);
        let (left, _) = spawn(
            &mut world,
            tree,
            ball(),
            RigidBody::new_kinematic(Vec2::new(-0.95, 0.0), 1.0, 1.0)
                .with_velocity(Vec2::new(1.0, 0.0))
                .with_material(material),
        );
        let (right, _) = spawn(
            &mut world,
            tree,
            ball(),
            RigidBody::new_kinematic(Vec2::new(0.95, 0.0), 1.0, 1.0)
                .with_velocity(Vec2::new(-1.0, 0.0))
                .with_material(material),
        );
        let energy = |world: &CollisionWorld| {
            world.body(left).unwrap().kinetic_energy() + world.body(right).unwrap().kinetic_energy()
        };
        let before = energy(&world);

        for _ in 0..3 {
            world.step(0.1).unwrap();
        }

        assert_relative_eq!(world.body(left).unwrap().velocity, Vec2::new(-1.0, 0.0), epsilon = 1e-4);
        assert_relative_eq!(world.body(right).unwrap().velocity, Vec2::new(1.0, 0.0), epsilon = 1e-4);
        assert_relative_eq!(world.body(left).unwrap().angular_velocity, 0.0, epsilon = 1e-4);
        assert_relative_eq!(energy(&world), before, epsilon = 1e-4);
        assert!(world.body(right).unwrap().position.x - world.body(left).unwrap().position.x > 2.0);
    }

    #[test]
    fn test_ball_comes_to_rest_on_floor() {
        let (mut world, tree) = world(Vec2::new(0.0, -10.0));
        let material = Material::frictionless(0.0);
        spawn(
            &mut world,
            tree,
            Aabb::from_center_extents(Vec2::zeros(), Vec2::new(10.0, 0.5)),
            RigidBody::new_static(Vec2::new(0.0, -0.5)).with_material(material),
        );
        let (ball, _) = spawn(
            &mut world,
            tree,
            Circle::new(Vec2::zeros(), 0.5),
            RigidBody::new_kinematic(Vec2::new(0.0, 3.0), 1.0, 0.125).with_material(material),
        );

        for _ in 0..120 {
            world.step(1.0 / 60.0).unwrap();
        }

        let ball = world.body(ball).unwrap();
        assert!(ball.position.y > 0.4 && ball.position.y < 0.55, "ball at {}", ball.position.y);
        assert!(ball.velocity.y.abs() < 0.5);
        assert_relative_eq!(ball.position.x, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_colliders_of_one_body_do_not_push_each_other() {
        let (mut world, tree) = world(Vec2::zeros());
        let body = RigidBody::new_kinematic(Vec2::zeros(), 1.0, 1.0).with_velocity(Vec2::new(0.5, 0.0));
        let (id, _) = spawn(&mut world, tree, Circle::new(Vec2::zeros(), 1.0), body.clone());
        let second = world
            .create_collider(TPrimitive::new(Circle::new(Vec2::new(0.5, 0.0), 1.0), body.matrix()))
            .unwrap();
        world.attach(second, tree).unwrap();
        world.attach_to_body(second, id).unwrap();
        assert_eq!(world.body(id).unwrap().colliders().len(), 2);

        let stats = world.step(1.0).unwrap();
        assert_eq!(stats.delivered, 2);
        assert_relative_eq!(world.body(id).unwrap().velocity, Vec2::new(0.5, 0.0));
        assert_relative_eq!(world.body(id).unwrap().position, Vec2::new(0.5, 0.0));
        assert_relative_eq!(
            world.collider(second).unwrap().object().matrix().unwrap()[(0, 2)],
            0.5
        );
    }
}
