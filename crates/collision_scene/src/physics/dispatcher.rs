//! Per-frame collision dispatch
//!
//! [`CollisionDispatcher::poll`] is the single entry point of a frame:
//!
//! 1. commit the phases staged by the previous poll and clear the memo
//! 2. flush every tree, then walk its candidate pairs
//! 3. for each pair and each handler kind bound on either side, compute the
//!    result once, derive the phase and deliver it to both sides
//! 4. complete every relationship that was touching but is not reported
//!
//! The active side of a pair receives the result as computed; the passive
//! side receives it inverted.

use std::collections::BTreeSet;

use log::{debug, trace, warn};

use crate::dynamics::RigidBody;
use crate::error::CollisionError;
use crate::events::{
    CollisionCache, CollisionController, CollisionEvent, ErasedHandler, EventData, HandlerKind, HandlerRecord,
    PairKey, Phase, PhaseTracker, TrackKey,
};
use crate::foundation::collections::{BodyId, ColliderId, ControllerId, IdPool, TreeId};
use crate::foundation::math::Vec2;
use crate::physics::collider::Collider;
use crate::spatial::CollisionTree;

/// Storage of the controllers a dispatcher delivers to
pub type ControllerPool = IdPool<ControllerId, Box<dyn CollisionController>>;

/// Counters of one poll, logged at trace level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    /// Distinct candidate pairs after the broad phase
    pub pairs: usize,
    /// Results computed or taken from the memo
    pub tested: usize,
    /// Handler invocations
    pub delivered: usize,
    /// Relationships completed because their pair was not reported
    pub completed: usize,
}

/// Frame-coherent collision event dispatch
#[derive(Debug, Default)]
pub struct CollisionDispatcher {
    tracker: PhaseTracker,
    cache: CollisionCache,
    frame: u64,
}

/// Linear velocity of the body owning `collider` (zero without a body)
fn body_velocity(collider: &Collider, bodies: &IdPool<BodyId, RigidBody>) -> Vec2 {
    collider
        .body()
        .and_then(|id| bodies.get(id))
        .map_or_else(Vec2::zeros, |body| body.velocity)
}

/// Whether `blocker` blocks `mover` given their current velocities
fn blocks(blocker: &Collider, mover: &Collider, bodies: &IdPool<BodyId, RigidBody>) -> bool {
    match blocker.one_way_blocking() {
        Some(direction) => {
            let relative = body_velocity(mover, bodies) - body_velocity(blocker, bodies);
            relative.dot(&direction) >= 0.0
        }
        None => true,
    }
}

/// Invoke each record's handler on its controller
fn deliver(controllers: &mut ControllerPool, records: &[HandlerRecord], event: &CollisionEvent) -> usize {
    let mut delivered = 0;
    for record in records {
        match controllers.get_mut(record.controller) {
            Some(controller) => {
                (record.handler)(controller.as_mut(), event);
                delivered += 1;
            }
            None => warn!(
                "Skipping handler of expired controller {:?} on collider {:?}",
                record.controller, event.collider
            ),
        }
    }
    delivered
}

/// Side whose mask admits the other's layer; the smaller key wins a tie
fn active_side(pair: PairKey, first: &Collider, second: &Collider) -> Option<(ColliderId, ColliderId)> {
    let first_admits = first.mask().intersects(second.layer());
    let second_admits = second.mask().intersects(first.layer());
    match (first_admits, second_admits) {
        (true, _) => Some((pair.first, pair.second)),
        (false, true) => Some((pair.second, pair.first)),
        (false, false) => None,
    }
}

impl CollisionDispatcher {
    /// Create a dispatcher with no tracked relationships
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed polls
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Phase of a relationship as of the last committed poll
    pub fn phase(&self, a: ColliderId, b: ColliderId, kind: HandlerKind) -> Phase {
        self.tracker.phase(&(PairKey::new(a, b), kind))
    }

    /// Colliders touching anything as of the latest poll
    pub fn touching_colliders(&self) -> BTreeSet<ColliderId> {
        self.tracker
            .staged_touching()
            .flat_map(|(pair, _)| [pair.first, pair.second])
            .collect()
    }

    /// Whether any tracked relationship involves a collider
    pub fn tracks(&self, id: ColliderId) -> bool {
        self.tracker.involves(id)
    }

    /// Drop every relationship involving a destroyed collider
    pub fn forget(&mut self, id: ColliderId) {
        self.tracker.forget(id);
    }

    /// Run one frame of collision dispatch
    pub fn poll(
        &mut self,
        trees: &mut IdPool<TreeId, CollisionTree>,
        colliders: &mut IdPool<ColliderId, Collider>,
        controllers: &mut ControllerPool,
        bodies: &IdPool<BodyId, RigidBody>,
    ) -> PollStats {
        self.tracker.commit();
        self.cache.clear();
        let mut stats = PollStats::default();

        let mut pairs = BTreeSet::new();
        for (_, tree) in trees.iter_mut() {
            tree.flush(colliders);
            pairs.extend(tree.pairs().filter(|(a, b)| a != b).map(|(a, b)| PairKey::new(a, b)));
        }
        stats.pairs = pairs.len();

        for pair in pairs {
            let (Some(first), Some(second)) = (colliders.get(pair.first), colliders.get(pair.second)) else {
                continue;
            };
            if !first.quad_wrap().intersects(&second.quad_wrap()) {
                continue;
            }
            let Some((active_id, passive_id)) = active_side(pair, first, second) else {
                continue;
            };
            let (active, passive) = if active_id == pair.first {
                (first, second)
            } else {
                (second, first)
            };

            for kind in HandlerKind::ALL {
                if !active.has_handler(kind) && !passive.has_handler(kind) {
                    continue;
                }
                let raw = self.compute(pair, kind, active_id, active, passive);
                stats.tested += 1;
                self.cache.insert(pair, active_id, raw);

                let honored = kind == HandlerKind::Overlap
                    || (blocks(active, passive, bodies) && blocks(passive, active, bodies));
                let data = if honored { raw } else { EventData::none(kind) };

                let phase = self.tracker.advance((pair, kind), data.overlaps());
                if phase == Phase::Expired {
                    continue;
                }
                let event = CollisionEvent {
                    phase,
                    collider: active_id,
                    other: passive_id,
                    data,
                };
                stats.delivered += deliver(controllers, &active.handlers_for(kind), &event);
                stats.delivered += deliver(controllers, &passive.handlers_for(kind), &event.invert());
            }
        }

        for key in self.tracker.touching() {
            if self.tracker.is_staged(&key) {
                continue;
            }
            stats.completed += 1;
            stats.delivered += self.complete(key, colliders, controllers);
        }

        self.frame += 1;
        trace!("Poll {}: {:?}", self.frame, stats);
        stats
    }

    /// Result of `kind` for `active` against `passive`, reusing finer results
    fn compute(
        &self,
        pair: PairKey,
        kind: HandlerKind,
        active_id: ColliderId,
        active: &Collider,
        passive: &Collider,
    ) -> EventData {
        if let Some(data) = self.cache.get(pair, kind, active_id) {
            return data;
        }
        let contact = self.cache.get(pair, HandlerKind::Contact, active_id);
        match kind {
            HandlerKind::Contact => EventData::Contact(active.contacts(passive)),
            HandlerKind::Collision => match contact {
                Some(EventData::Contact(c)) => EventData::Collision(c.collision()),
                _ => EventData::Collision(active.collides(passive)),
            },
            HandlerKind::Overlap => {
                let finer = contact.or_else(|| self.cache.get(pair, HandlerKind::Collision, active_id));
                EventData::Overlap(finer.map_or_else(|| active.overlaps(passive), |d| d.overlaps()))
            }
        }
    }

    /// Stage and deliver the completion of an unreported relationship
    fn complete(
        &mut self,
        key: TrackKey,
        colliders: &IdPool<ColliderId, Collider>,
        controllers: &mut ControllerPool,
    ) -> usize {
        let (pair, kind) = key;
        let phase = self.tracker.advance(key, false);
        let (Some(first), Some(second)) = (colliders.get(pair.first), colliders.get(pair.second)) else {
            return 0;
        };
        let event = CollisionEvent {
            phase,
            collider: pair.first,
            other: pair.second,
            data: EventData::none(kind),
        };
        deliver(controllers, &first.handlers_for(kind), &event)
            + deliver(controllers, &second.handlers_for(kind), &event.invert())
    }

    /// Bind a controller's handler to a collider
    pub fn bind(
        colliders: &mut IdPool<ColliderId, Collider>,
        controllers: &ControllerPool,
        collider: ColliderId,
        controller: ControllerId,
        kind: HandlerKind,
        handler: ErasedHandler,
    ) -> Result<(), CollisionError> {
        if !controllers.contains(controller) {
            return Err(CollisionError::NullReference("controller"));
        }
        colliders.try_get_mut(collider)?.bind(controller, kind, handler);
        debug!("Bound {:?} handler of {:?} to collider {:?}", kind, controller, collider);
        Ok(())
    }

    /// Remove a controller's handler from a collider; returns whether it was bound
    pub fn unbind(
        colliders: &mut IdPool<ColliderId, Collider>,
        collider: ColliderId,
        controller: ControllerId,
        kind: HandlerKind,
    ) -> Result<bool, CollisionError> {
        Ok(colliders.try_get_mut(collider)?.unbind(controller, kind))
    }

    /// Remove every binding of a controller; returns how many colliders held one
    pub fn unbind_controller(colliders: &mut IdPool<ColliderId, Collider>, controller: ControllerId) -> usize {
        colliders
            .iter_mut()
            .filter_map(|(_, collider)| collider.unbind_controller(controller).then_some(()))
            .count()
    }

    /// Deliver `event` right away to the handlers of its kind bound on `from`
    ///
    /// The event is addressed to `from`: its `collider` field is rewritten
    /// when it names another collider. No phase is tracked.
    pub fn emit(
        colliders: &IdPool<ColliderId, Collider>,
        controllers: &mut ControllerPool,
        from: ColliderId,
        event: &CollisionEvent,
    ) -> Result<usize, CollisionError> {
        let collider = colliders.try_get(from)?;
        let addressed = if event.collider == from {
            *event
        } else if event.other == from {
            event.invert()
        } else {
            CollisionEvent {
                collider: from,
                ..*event
            }
        };
        let records = collider.handlers_for(addressed.data.kind());
        Ok(deliver(controllers, &records, &addressed))
    }
}
