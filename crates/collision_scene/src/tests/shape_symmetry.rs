//! Inversion symmetry across the whole collider catalogue
//!
//! Testing `a` against `b` must give the mirror image of testing `b`
//! against `a`, whichever pair of collider kinds meets.

use std::f32::consts::FRAC_PI_6;

use crate::foundation::math::{Mat3, Transform2D, Vec2};
use crate::physics::bvh::{Bvh, TBvh};
use crate::physics::collider_object::ColliderObject;
use crate::physics::collision_layers::LayerMask;
use crate::physics::compound::{Compound, TCompound};
use crate::physics::primitive::{Primitive, TPrimitive};
use crate::physics::shapes::{Aabb, Circle, ConvexHull, Kdop2, Kdop3, Kdop4, Obb};

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pose(x: f32, y: f32, rotation: f32) -> Mat3 {
        Transform2D::from_position_rotation(Vec2::new(x, y), rotation).to_matrix()
    }

    fn triangle(offset: Vec2) -> ConvexHull {
        ConvexHull::new(&[
            offset + Vec2::new(-1.0, -0.8),
            offset + Vec2::new(1.2, -0.6),
            offset + Vec2::new(0.1, 1.1),
        ])
    }

    fn cluster(center: Vec2) -> Vec<Primitive> {
        vec![
            Circle::new(center + Vec2::new(-0.6, 0.0), 0.7).into(),
            Obb::new(center + Vec2::new(0.6, 0.2), Vec2::new(0.5, 0.3), 0.4).into(),
            triangle(center + Vec2::new(0.0, -0.7)).into(),
        ]
    }

    /// One object of every kind, all crowded around the origin
    fn catalogue() -> Vec<ColliderObject> {
        let octagon = [Vec2::new(-0.9, -0.2), Vec2::new(0.7, -0.5), Vec2::new(0.2, 0.9)];
        let all = LayerMask::all();
        let mut objects: Vec<ColliderObject> = vec![
            Primitive::from(Circle::new(Vec2::new(0.3, 0.1), 1.0)).into(),
            Primitive::from(Aabb::from_center_extents(Vec2::new(-0.4, 0.5), Vec2::new(0.9, 0.6))).into(),
            Primitive::from(Obb::new(Vec2::new(0.5, -0.3), Vec2::new(1.0, 0.4), FRAC_PI_6)).into(),
            Primitive::from(triangle(Vec2::new(-0.2, -0.1))).into(),
            Primitive::Kdop2(Kdop2::from_points(&octagon)).into(),
            Primitive::Kdop3(Kdop3::from_points(&octagon)).into(),
            Primitive::Kdop4(Kdop4::from_points(&octagon)).into(),
            TPrimitive::new(Obb::new(Vec2::zeros(), Vec2::new(0.8, 0.5), 0.0), pose(0.2, 0.4, 0.7)).into(),
            Compound::new(cluster(Vec2::new(0.1, 0.3)), all, all).into(),
            TCompound::new(Compound::unfiltered(cluster(Vec2::zeros())), pose(-0.3, -0.2, -0.5)).into(),
            Bvh::<Aabb>::new(cluster(Vec2::new(0.4, -0.1)), all, all).into(),
            Bvh::<Obb>::new(cluster(Vec2::new(-0.5, 0.2)), all, all).into(),
            Bvh::<Kdop4>::new(cluster(Vec2::new(0.0, 0.6)), all, all).into(),
            TBvh::new(Bvh::<Kdop3>::new(cluster(Vec2::zeros()), all, all), pose(0.6, 0.3, 1.1)).into(),
        ];
        for object in &mut objects {
            object.refresh();
        }
        objects
    }

    #[test]
    fn test_results_mirror_across_every_kind_pair() {
        let objects = catalogue();
        let mut overlapping = 0;
        for (i, a) in objects.iter().enumerate() {
            for b in &objects[i + 1..] {
                let forward = a.collide(b);
                let backward = b.collide(a).invert();
                assert_eq!(a.overlaps(b), b.overlaps(a), "{:?} vs {:?}", a.kind(), b.kind());
                assert_eq!(forward.overlaps, backward.overlaps);
                assert_relative_eq!(forward.depth, backward.depth, epsilon = 1e-4);
                assert_relative_eq!(forward.impulse, backward.impulse, epsilon = 1e-4);

                let contact = a.contact(b);
                let mirrored = b.contact(a).invert();
                assert_relative_eq!(contact.mtv(), mirrored.mtv(), epsilon = 1e-4);
                assert_relative_eq!(contact.contacts[0], mirrored.contacts[0], epsilon = 1e-4);
                assert_relative_eq!(contact.contacts[1], mirrored.contacts[1], epsilon = 1e-4);
                if forward.overlaps {
                    overlapping += 1;
                }
            }
        }
        // The catalogue is crowded enough that most pairs overlap.
        assert!(overlapping > objects.len());
    }

    #[test]
    fn test_composites_reduce_to_their_parts() {
        let circle = Circle::new(Vec2::zeros(), 1.0);
        let obstacle: ColliderObject = Primitive::from(Obb::new(Vec2::new(1.5, 0.2), Vec2::new(1.0, 0.5), 0.3)).into();
        let single: ColliderObject = Compound::unfiltered(vec![circle.into()]).into();
        let bare: ColliderObject = Primitive::from(circle).into();

        assert_eq!(single.collide(&obstacle), bare.collide(&obstacle));
        assert_eq!(single.contact(&obstacle), bare.contact(&obstacle));

        let empty: ColliderObject = Compound::unfiltered(Vec::new()).into();
        assert!(!empty.overlaps(&obstacle));
        assert!(!obstacle.collide(&empty).overlaps);
        assert!(!empty.contact(&obstacle).overlaps);
    }
}
