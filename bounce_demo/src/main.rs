//! Bounce Demo
//!
//! Headless scene that drops a handful of balls into a walled arena with a
//! one-way ledge in the middle. Runs a fixed number of frames and logs the
//! collision events and tree statistics along the way.
//!
//! Usage: `bounce_demo [config.toml|config.ron]`

use std::any::Any;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use collision_scene::foundation::logging;
use collision_scene::prelude::*;

// Arena settings
const ARENA_HALF: f32 = 20.0;
const WALL_THICKNESS: f32 = 1.0;
const LEDGE_HEIGHT: f32 = 2.0;

// Ball settings
const NUM_BALLS: usize = 24;
const BALL_RADIUS: f32 = 0.6;
const BALL_MASS: f32 = 1.0;

// Simulation
const FRAMES: usize = 600;
const DT: f32 = 1.0 / 60.0;
const REPORT_EVERY: usize = 60;
const SCATTER_SEED: u64 = 0xb0a7;

/// Counts collision phases seen by the ledge
#[derive(Default)]
struct LedgeWatcher {
    landed: usize,
    left: usize,
}

impl CollisionController for LedgeWatcher {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn name(&self) -> &'static str {
        "LedgeWatcher"
    }
}

impl LedgeWatcher {
    fn on_collision(&mut self, event: &CollisionEvent) {
        match event.phase {
            Phase::Started => {
                self.landed += 1;
                log::debug!("Ball {:?} landed on the ledge", event.other);
            }
            Phase::Completed => self.left += 1,
            Phase::Ongoing | Phase::Expired => {}
        }
    }
}

fn load_config() -> Result<CollisionConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading configuration from {}", path);
            Ok(CollisionConfig::load_from_file(&path)?)
        }
        None => {
            let mut config = CollisionConfig::default();
            config.dynamics.gravity = Vec2::new(0.0, -9.81);
            Ok(config)
        }
    }
}

/// Static box collider with its own body
fn add_block(world: &mut CollisionWorld, tree: TreeId, center: Vec2, half_extents: Vec2) -> Result<ColliderId, CollisionError> {
    let body = world.create_body(RigidBody::new_static(center).with_material(Material::frictionless(0.4)))?;
    let shape = Aabb::from_center_extents(Vec2::zeros(), half_extents);
    let matrix = world.body(body)?.matrix();
    let collider = world.create_collider(TPrimitive::new(shape, matrix))?;
    world.attach(collider, tree)?;
    world.attach_to_body(collider, body)?;
    Ok(collider)
}

fn build_arena(world: &mut CollisionWorld, tree: TreeId) -> Result<ColliderId, CollisionError> {
    let span = ARENA_HALF - WALL_THICKNESS;
    add_block(world, tree, Vec2::new(0.0, -span), Vec2::new(ARENA_HALF, WALL_THICKNESS))?;
    add_block(world, tree, Vec2::new(-span, 0.0), Vec2::new(WALL_THICKNESS, ARENA_HALF))?;
    add_block(world, tree, Vec2::new(span, 0.0), Vec2::new(WALL_THICKNESS, ARENA_HALF))?;

    let ledge = add_block(world, tree, Vec2::new(0.0, LEDGE_HEIGHT), Vec2::new(6.0, 0.25))?;
    world
        .collider_mut(ledge)?
        .set_one_way_blocking(Some(Vec2::new(0.0, -1.0)));
    Ok(ledge)
}

fn spawn_balls(world: &mut CollisionWorld, tree: TreeId) -> Result<Vec<BodyId>, CollisionError> {
    let mut rng = StdRng::seed_from_u64(SCATTER_SEED);
    let inertia = 0.5 * BALL_MASS * BALL_RADIUS * BALL_RADIUS;
    let mut bodies = Vec::with_capacity(NUM_BALLS);
    for _ in 0..NUM_BALLS {
        let position = Vec2::new(rng.gen_range(-15.0..15.0), rng.gen_range(-12.0..15.0));
        let velocity = Vec2::new(rng.gen_range(-4.0..4.0), rng.gen_range(-2.0..6.0));
        let body = world.create_body(
            RigidBody::new_kinematic(position, BALL_MASS, inertia)
                .with_velocity(velocity)
                .with_material(Material::default()),
        )?;
        let matrix = world.body(body)?.matrix();
        let collider = world.create_collider(TPrimitive::new(Circle::new(Vec2::zeros(), BALL_RADIUS), matrix))?;
        world.attach(collider, tree)?;
        world.attach_to_body(collider, body)?;
        bodies.push(body);
    }
    Ok(bodies)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_with_default_filter("info");

    let config = load_config()?;
    let mut world = CollisionWorld::new(config)?;
    let tree = world.create_tree(Aabb::new(
        Vec2::new(-ARENA_HALF, -ARENA_HALF),
        Vec2::new(ARENA_HALF, ARENA_HALF),
    ))?;

    let ledge = build_arena(&mut world, tree)?;
    let watcher = world.create_controller(LedgeWatcher::default())?;
    world.bind(ledge, watcher, HandlerKind::Collision, erase(LedgeWatcher::on_collision))?;
    let balls = spawn_balls(&mut world, tree)?;

    log::info!("Simulating {} balls for {} frames", balls.len(), FRAMES);
    for frame in 1..=FRAMES {
        let stats = world.step(DT)?;
        if frame % REPORT_EVERY == 0 {
            let energy: f32 = balls
                .iter()
                .filter_map(|id| world.body(*id).ok())
                .map(RigidBody::kinetic_energy)
                .sum();
            let tree_ref = world.tree(tree)?;
            log::info!(
                "Frame {}: {} candidate pairs, {} tests, {} events, {} tree nodes, kinetic energy {:.2}",
                frame,
                stats.pairs,
                stats.tested,
                stats.delivered,
                tree_ref.node_count(),
                energy
            );
        }
    }

    let watcher = world.controller::<LedgeWatcher>(watcher)?;
    log::info!("Ledge landings: {}, departures: {}", watcher.landed, watcher.left);

    let views = world.debug_views(&CollisionViewColors::default());
    let outlines: usize = views.iter().map(|v| v.shapes.len()).sum();
    log::info!("Debug views: {} layers, {} outlines", views.len(), outlines);
    Ok(())
}
