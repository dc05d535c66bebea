//! Broad phase completeness checked against brute force
//!
//! A deterministic generator scatters boxes over a small, deep tree; region
//! queries and candidate pairs must match an exhaustive scan before and
//! after the boxes move.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::CollisionConfig;
use crate::foundation::collections::{ColliderId, TreeId};
use crate::foundation::math::{Transform2D, Vec2};
use crate::physics::primitive::TPrimitive;
use crate::physics::shapes::{Aabb, Ray};
use crate::spatial::TreeConfig;
use crate::CollisionWorld;

#[cfg(test)]
mod tests {
    use super::*;

    const HALF: f32 = 32.0;

    fn scene(count: usize, rng: &mut StdRng) -> (CollisionWorld, TreeId, Vec<ColliderId>) {
        let mut world = CollisionWorld::new(CollisionConfig::default()).unwrap();
        let config = TreeConfig {
            degree: [2, 2],
            cell_capacity: 2,
            max_depth: 5,
        };
        let tree = world
            .create_tree_with(Aabb::new(Vec2::new(-HALF, -HALF), Vec2::new(HALF, HALF)), config)
            .unwrap();
        let ids = (0..count)
            .map(|_| {
                let half = Vec2::new(rng.gen_range(0.1..2.0), rng.gen_range(0.1..2.0));
                let matrix = Transform2D::from_position(random_point(rng, HALF - 2.0)).to_matrix();
                let id = world
                    .create_collider(TPrimitive::new(Aabb::from_center_extents(Vec2::zeros(), half), matrix))
                    .unwrap();
                world.attach(id, tree).unwrap();
                id
            })
            .collect();
        (world, tree, ids)
    }

    fn random_point(rng: &mut StdRng, extent: f32) -> Vec2 {
        Vec2::new(rng.gen_range(-extent..extent), rng.gen_range(-extent..extent))
    }

    fn brute_query(world: &CollisionWorld, ids: &[ColliderId], region: &Aabb) -> BTreeSet<ColliderId> {
        ids.iter()
            .copied()
            .filter(|id| world.collider(*id).unwrap().quad_wrap().intersects(region))
            .collect()
    }

    fn brute_pairs(world: &CollisionWorld, ids: &[ColliderId]) -> BTreeSet<(ColliderId, ColliderId)> {
        let mut pairs = BTreeSet::new();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                let wrap_a = world.collider(*a).unwrap().quad_wrap();
                if wrap_a.intersects(&world.collider(*b).unwrap().quad_wrap()) {
                    pairs.insert((*a.min(b), *a.max(b)));
                }
            }
        }
        pairs
    }

    fn tree_pairs(world: &CollisionWorld, tree: TreeId) -> BTreeSet<(ColliderId, ColliderId)> {
        world
            .tree(tree)
            .unwrap()
            .pairs()
            .filter(|(a, b)| a != b)
            .filter(|(a, b)| {
                let wrap_a = world.collider(*a).unwrap().quad_wrap();
                wrap_a.intersects(&world.collider(*b).unwrap().quad_wrap())
            })
            .map(|(a, b)| (a.min(b), a.max(b)))
            .collect()
    }

    fn check(world: &mut CollisionWorld, tree: TreeId, ids: &[ColliderId], rng: &mut StdRng) {
        for _ in 0..25 {
            let center = random_point(rng, HALF);
            let half = Vec2::new(rng.gen_range(0.0..8.0), rng.gen_range(0.0..8.0));
            let region = Aabb::from_center_extents(center, half);
            let found: BTreeSet<ColliderId> = world.query(tree, &region).unwrap().into_iter().collect();
            assert_eq!(found, brute_query(world, ids, &region), "region {:?}", region);
        }
        assert_eq!(tree_pairs(world, tree), brute_pairs(world, ids));

        let tree_ref = world.tree(tree).unwrap();
        assert_eq!(tree_ref.len(), ids.len());
        for id in ids {
            let node = world.collider(*id).unwrap().node_in(tree).unwrap();
            assert!(tree_ref.node(node).unwrap().colliders().contains(id));
        }
    }

    #[test]
    fn test_queries_and_pairs_match_brute_force() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let (mut world, tree, ids) = scene(80, &mut rng);
        world.poll();
        assert!(world.tree(tree).unwrap().node_count() > 1);
        check(&mut world, tree, &ids, &mut rng);

        for id in ids.iter().step_by(2) {
            let matrix = Transform2D::from_position(random_point(&mut rng, HALF - 2.0)).to_matrix();
            world.collider_mut(*id).unwrap().set_matrix(matrix).unwrap();
        }
        // Queries flush the tree themselves.
        check(&mut world, tree, &ids, &mut rng);
    }

    #[test]
    fn test_tree_collapses_after_removal() {
        let mut rng = StdRng::seed_from_u64(7);
        let (mut world, tree, ids) = scene(40, &mut rng);
        world.poll();
        let grown = world.tree(tree).unwrap().node_count();
        for id in &ids[4..] {
            world.destroy_collider(*id).unwrap();
        }
        world.poll();
        world.poll();

        let tree_ref = world.tree(tree).unwrap();
        assert_eq!(tree_ref.len(), 4);
        assert!(tree_ref.node_count() < grown);
        check(&mut world, tree, &ids[..4], &mut rng);
    }

    #[test]
    fn test_raycast_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(99);
        let (mut world, tree, ids) = scene(50, &mut rng);
        world.poll();

        for _ in 0..20 {
            let origin = random_point(&mut rng, HALF);
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let ray = Ray::new(origin, Vec2::new(angle.cos(), angle.sin()), 40.0);
            let expected = ids
                .iter()
                .filter_map(|id| {
                    let result = world.collider(*id).unwrap().raycast(&ray);
                    result.is_hit().then_some((result.hit, result.distance))
                })
                .min_by(|x, y| {
                    let outside = |h: &(crate::physics::primitive::HitKind, f32)| {
                        h.0 != crate::physics::primitive::HitKind::Inside
                    };
                    outside(x).cmp(&outside(y)).then(x.1.total_cmp(&y.1))
                });
            let hit = world.raycast(tree, &ray).unwrap();
            assert_eq!(hit.map(|h| (h.result.hit, h.result.distance)), expected);
        }
    }
}
