//! Greedy merge of many pairwise results into one compound result
//!
//! Testing every primitive of one compound against every primitive of
//! another yields a set of push-outs. They are merged in three steps:
//!
//! 1. Group push-outs by direction (quantized to [`DIRECTION_TOLERANCE`]) and
//!    keep the deepest one per direction. Directly opposing directions cancel:
//!    the shallower one is dropped, and equal ones drop each other.
//! 2. Try every surviving direction as a primary axis, with its
//!    perpendicular as the secondary axis. Project every survivor onto both
//!    and keep the signed extreme on each. The pair of axes capturing the
//!    largest combined push-out wins.
//! 3. Rebuild the push-out from the two extremes. Contact points are blended
//!    by the share of each axis in the result.
//!
//! Every tie is settled by value, never by input order, so merging the
//! inverted results gives exactly the inverted merge.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::foundation::math::{canonical_axis, perp, vec_cmp, Vec2};
use crate::physics::primitive::{CollisionResult, ContactResult};

/// Two push-out directions closer than this are the same direction
pub const DIRECTION_TOLERANCE: f32 = 1.0e-3;

type DirectionKey = (i64, i64);

fn direction_key(impulse: &Vec2) -> DirectionKey {
    (
        (impulse.x / DIRECTION_TOLERANCE).round() as i64,
        (impulse.y / DIRECTION_TOLERANCE).round() as i64,
    )
}

/// Order-independent preference between two results of equal depth
fn tie_order(a: &ContactResult, b: &ContactResult) -> Ordering {
    vec_cmp(&canonical_axis(&a.impulse), &canonical_axis(&b.impulse))
        .then_with(|| vec_cmp(&(a.contacts[0] + a.contacts[1]), &(b.contacts[0] + b.contacts[1])))
}

/// Whether `candidate` should replace `current` as the deepest of its kind
fn deeper(candidate: &ContactResult, current: &ContactResult) -> bool {
    match candidate.depth.total_cmp(&current.depth) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => tie_order(candidate, current) == Ordering::Less,
    }
}

/// Step 1: deepest result per direction, opposing directions cancelled
fn survivors(results: &[ContactResult]) -> Vec<ContactResult> {
    let mut groups: BTreeMap<DirectionKey, ContactResult> = BTreeMap::new();
    for result in results.iter().filter(|r| r.overlaps) {
        let key = direction_key(&result.impulse);
        match groups.get(&key) {
            Some(current) if !deeper(result, current) => {}
            _ => {
                groups.insert(key, *result);
            }
        }
    }

    let mut kept: Vec<ContactResult> = groups
        .iter()
        .filter(|((x, y), result)| match groups.get(&(-x, -y)) {
            Some(opposing) => result.depth > opposing.depth,
            None => true,
        })
        .map(|(_, result)| *result)
        .collect();

    kept.sort_by(|a, b| tie_order(a, b));
    kept
}

/// Signed extreme projection on one axis and the result that produced it
#[derive(Clone, Copy)]
struct Extreme {
    value: f32,
    source: Option<ContactResult>,
}

fn extreme_along(survivors: &[ContactResult], axis: &Vec2) -> Extreme {
    let mut high = Extreme { value: 0.0, source: None };
    let mut low = Extreme { value: 0.0, source: None };

    for result in survivors {
        let p = result.depth * result.impulse.dot(axis);
        let better = |current: &Extreme, ordering: Ordering| match current.source {
            None => true,
            Some(source) => match p.total_cmp(&current.value) {
                o if o == ordering => true,
                Ordering::Equal => tie_order(result, &source) == Ordering::Less,
                _ => false,
            },
        };
        if p > 0.0 && better(&high, Ordering::Greater) {
            high = Extreme { value: p, source: Some(*result) };
        }
        if p < 0.0 && better(&low, Ordering::Less) {
            low = Extreme { value: p, source: Some(*result) };
        }
    }

    match high.value.total_cmp(&-low.value) {
        Ordering::Greater => high,
        Ordering::Less => low,
        Ordering::Equal => Extreme { value: 0.0, source: None },
    }
}

/// Steps 2 and 3 over already-filtered survivors
fn merge(survivors: &[ContactResult]) -> ContactResult {
    let mut best: Option<(f32, Vec2, Extreme, Extreme)> = None;
    for candidate in survivors {
        let axis = candidate.impulse;
        let e1 = extreme_along(survivors, &axis);
        let e2 = extreme_along(survivors, &perp(&axis));
        let score = e1.value.abs() + e2.value.abs();
        if best.as_ref().map_or(true, |(s, ..)| score > *s) {
            best = Some((score, axis, e1, e2));
        }
    }

    let Some((_, axis, e1, e2)) = best else {
        return ContactResult::none();
    };

    let mtv = axis * e1.value + perp(&axis) * e2.value;
    let depth = mtv.norm();
    if depth <= f32::EPSILON {
        // Only touching contacts survive when every depth is zero.
        return survivors
            .iter()
            .find(|r| r.depth == 0.0)
            .copied()
            .unwrap_or_default();
    }

    let total = e1.value.abs() + e2.value.abs();
    let (w1, w2) = (e1.value.abs() / total, e2.value.abs() / total);
    let blend = |k: usize| match (e1.source, e2.source) {
        (Some(a), Some(b)) => a.contacts[k] * w1 + b.contacts[k] * w2,
        (Some(a), None) => a.contacts[k],
        (None, Some(b)) => b.contacts[k],
        (None, None) => Vec2::zeros(),
    };

    ContactResult {
        overlaps: true,
        depth,
        impulse: mtv / depth,
        contacts: [blend(0), blend(1)],
    }
}

/// Merge pairwise contact results into one result
pub fn greedy_contact(results: &[ContactResult]) -> ContactResult {
    match results {
        [] => ContactResult::none(),
        [single] => *single,
        many => {
            let kept = survivors(many);
            match kept.as_slice() {
                [] => ContactResult::none(),
                [single] => *single,
                _ => merge(&kept),
            }
        }
    }
}

/// Merge pairwise collision results into one result
pub fn greedy_collision(results: &[CollisionResult]) -> CollisionResult {
    match results {
        [] => CollisionResult::none(),
        [single] => *single,
        many => {
            let lifted: Vec<ContactResult> = many
                .iter()
                .map(|r| ContactResult {
                    overlaps: r.overlaps,
                    depth: r.depth,
                    impulse: r.impulse,
                    contacts: [Vec2::zeros(); 2],
                })
                .collect();
            greedy_contact(&lifted).collision()
        }
    }
}

/// Merge pairwise overlap flags; any overlap makes the pair overlap
pub fn greedy_overlap(results: &[bool]) -> bool {
    results.iter().any(|&o| o)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn push(depth: f32, x: f32, y: f32) -> CollisionResult {
        CollisionResult::new(depth, Vec2::new(x, y).normalize())
    }

    #[test]
    fn test_empty_and_single() {
        assert_eq!(greedy_collision(&[]), CollisionResult::none());
        let only = push(0.3, 1.0, 2.0);
        assert_eq!(greedy_collision(&[only]), only);
        let miss = CollisionResult::none();
        assert_eq!(greedy_collision(&[miss]), miss);
    }

    #[test]
    fn test_same_direction_keeps_deepest() {
        let merged = greedy_collision(&[push(0.2, 1.0, 0.0), push(0.5, 1.0, 0.0), push(0.1, 1.0, 0.0)]);
        assert!(merged.overlaps);
        assert_relative_eq!(merged.depth, 0.5);
        assert_relative_eq!(merged.impulse, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_opposing_pushes_cancel() {
        let merged = greedy_collision(&[push(0.5, 1.0, 0.0), push(0.5, -1.0, 0.0)]);
        assert!(!merged.overlaps);

        let merged = greedy_collision(&[push(0.5, 1.0, 0.0), push(0.2, -1.0, 0.0)]);
        assert_relative_eq!(merged.depth, 0.5);
        assert_relative_eq!(merged.impulse, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_orthogonal_pushes_combine() {
        let merged = greedy_collision(&[push(0.3, 1.0, 0.0), push(0.4, 0.0, 1.0)]);
        assert_relative_eq!(merged.mtv(), Vec2::new(0.3, 0.4), epsilon = 1e-5);
        assert_relative_eq!(merged.depth, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_merge_is_inversion_symmetric() {
        let results = [push(0.3, 1.0, 0.1), push(0.4, 0.2, 1.0), push(0.1, -1.0, 0.5), push(0.2, 0.0, 1.0)];
        let inverted: Vec<CollisionResult> = results.iter().rev().map(|r| r.invert()).collect();
        assert_eq!(greedy_collision(&inverted), greedy_collision(&results).invert());
    }

    #[test]
    fn test_contacts_are_weighted() {
        let a = ContactResult {
            overlaps: true,
            depth: 0.3,
            impulse: Vec2::new(1.0, 0.0),
            contacts: [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)],
        };
        let b = ContactResult {
            overlaps: true,
            depth: 0.1,
            impulse: Vec2::new(0.0, 1.0),
            contacts: [Vec2::new(4.0, 0.0), Vec2::new(5.0, 0.0)],
        };
        let merged = greedy_contact(&[a, b]);
        assert_relative_eq!(merged.contacts[0], Vec2::new(1.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(merged.contacts[1], Vec2::new(2.0, 0.0), epsilon = 1e-5);
    }
}
