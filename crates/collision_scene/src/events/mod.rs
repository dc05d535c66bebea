//! Collision events and frame-coherent phase tracking
//!
//! Each tracked relationship moves through the phases
//! `Expired -> Started -> Ongoing -> Completed -> Expired`. Phases are
//! derived from the raw overlap result of the current frame and the phase
//! committed at the end of the previous frame. Writes made during a poll are
//! staged and only committed when the next poll starts, so the order in
//! which pairs are visited never changes a result.

pub mod controller;

pub use controller::{erase, CollisionController, ErasedHandler, HandlerRecord};

use std::collections::HashMap;

use crate::foundation::collections::ColliderId;
use crate::physics::primitive::{CollisionResult, ContactResult};

/// Phase of a pairwise collision relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// First frame of contact
    Started,
    /// Contact continues from the previous frame
    Ongoing,
    /// First frame without contact
    Completed,
    /// No contact now or last frame
    #[default]
    Expired,
}

impl Phase {
    /// Whether the pair was touching in the frame this phase describes
    pub fn is_touching(self) -> bool {
        matches!(self, Phase::Started | Phase::Ongoing)
    }
}

/// Phase transition from a raw overlap result
pub fn next_phase(overlap_now: bool, prior: Phase) -> Phase {
    match (overlap_now, prior.is_touching()) {
        (true, false) => Phase::Started,
        (true, true) => Phase::Ongoing,
        (false, true) => Phase::Completed,
        (false, false) => Phase::Expired,
    }
}

/// Which result a handler asks for
///
/// Declared in dispatch order: contact, then collision, then overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HandlerKind {
    /// Contact result (push-out plus contact points)
    Contact,
    /// Collision result (push-out)
    Collision,
    /// Boolean overlap
    Overlap,
}

impl HandlerKind {
    /// Every kind in dispatch order
    pub const ALL: [HandlerKind; 3] = [HandlerKind::Contact, HandlerKind::Collision, HandlerKind::Overlap];

    /// Slot index
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Unordered collider pair stored with the smaller key first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    /// Smaller collider key
    pub first: ColliderId,
    /// Larger collider key
    pub second: ColliderId,
}

impl PairKey {
    /// Normalize a pair
    pub fn new(a: ColliderId, b: ColliderId) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    /// Whether the pair involves `id`
    pub fn contains(&self, id: ColliderId) -> bool {
        self.first == id || self.second == id
    }

    /// The member that is not `id`
    pub fn other(&self, id: ColliderId) -> ColliderId {
        if self.first == id {
            self.second
        } else {
            self.first
        }
    }
}

/// Key of one tracked relationship
pub type TrackKey = (PairKey, HandlerKind);

/// Per-pair phase memory with lazy commits
#[derive(Debug, Default)]
pub struct PhaseTracker {
    committed: HashMap<TrackKey, Phase>,
    pending: HashMap<TrackKey, Phase>,
}

impl PhaseTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase as of the last committed frame (`Expired` when never seen)
    pub fn phase(&self, key: &TrackKey) -> Phase {
        self.committed.get(key).copied().unwrap_or_default()
    }

    /// Stage a phase for the next commit
    pub fn stage(&mut self, key: TrackKey, phase: Phase) {
        self.pending.insert(key, phase);
    }

    /// Derive, stage and return the next phase of a relationship
    pub fn advance(&mut self, key: TrackKey, overlap_now: bool) -> Phase {
        let phase = next_phase(overlap_now, self.phase(&key));
        self.stage(key, phase);
        phase
    }

    /// Whether a phase was already staged this frame
    pub fn is_staged(&self, key: &TrackKey) -> bool {
        self.pending.contains_key(key)
    }

    /// Replace the committed phases with the staged ones
    ///
    /// Relationships that were not staged fall back to `Expired`; every
    /// touching relationship is re-staged each poll, so only finished ones
    /// are forgotten.
    pub fn commit(&mut self) {
        self.committed = std::mem::take(&mut self.pending)
            .into_iter()
            .filter(|(_, phase)| *phase != Phase::Expired)
            .collect();
    }

    /// Relationships that were touching at the last commit
    pub fn touching(&self) -> Vec<TrackKey> {
        let mut keys: Vec<TrackKey> = self
            .committed
            .iter()
            .filter(|(_, phase)| phase.is_touching())
            .map(|(key, _)| *key)
            .collect();
        keys.sort();
        keys
    }

    /// Relationships staged as touching during the current poll
    pub fn staged_touching(&self) -> impl Iterator<Item = &TrackKey> {
        self.pending
            .iter()
            .filter(|(_, phase)| phase.is_touching())
            .map(|(key, _)| key)
    }

    /// Whether any committed or staged relationship involves a collider
    pub fn involves(&self, id: ColliderId) -> bool {
        self.committed
            .keys()
            .chain(self.pending.keys())
            .any(|(pair, _)| pair.contains(id))
    }

    /// Drop every relationship involving a collider
    pub fn forget(&mut self, id: ColliderId) {
        self.committed.retain(|(pair, _), _| !pair.contains(id));
        self.pending.retain(|(pair, _), _| !pair.contains(id));
    }

    /// Number of committed relationships
    pub fn len(&self) -> usize {
        self.committed.len()
    }

    /// Whether no relationship is committed
    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }
}

/// Result carried by a collision event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventData {
    /// Boolean overlap
    Overlap(bool),
    /// Push-out of the receiving collider
    Collision(CollisionResult),
    /// Push-out and contact points, receiving collider first
    Contact(ContactResult),
}

impl EventData {
    /// Empty result of a handler kind
    pub fn none(kind: HandlerKind) -> Self {
        match kind {
            HandlerKind::Contact => Self::Contact(ContactResult::none()),
            HandlerKind::Collision => Self::Collision(CollisionResult::none()),
            HandlerKind::Overlap => Self::Overlap(false),
        }
    }

    /// Handler kind this data answers
    pub fn kind(&self) -> HandlerKind {
        match self {
            Self::Overlap(_) => HandlerKind::Overlap,
            Self::Collision(_) => HandlerKind::Collision,
            Self::Contact(_) => HandlerKind::Contact,
        }
    }

    /// Raw overlap flag
    pub fn overlaps(&self) -> bool {
        match self {
            Self::Overlap(o) => *o,
            Self::Collision(r) => r.overlaps,
            Self::Contact(r) => r.overlaps,
        }
    }

    /// The same data seen from the other collider
    pub fn invert(&self) -> Self {
        match self {
            Self::Overlap(o) => Self::Overlap(*o),
            Self::Collision(r) => Self::Collision(r.invert()),
            Self::Contact(r) => Self::Contact(r.invert()),
        }
    }
}

/// Event delivered to a bound handler
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvent {
    /// Phase of the relationship this frame
    pub phase: Phase,
    /// Collider the handler is bound to
    pub collider: ColliderId,
    /// The other collider of the pair
    pub other: ColliderId,
    /// Result oriented from `collider` towards `other`
    pub data: EventData,
}

impl CollisionEvent {
    /// The same event addressed to the other collider
    pub fn invert(&self) -> Self {
        Self {
            phase: self.phase,
            collider: self.other,
            other: self.collider,
            data: self.data.invert(),
        }
    }
}

/// Per-poll memo of computed results
///
/// Results are stored oriented from the pair's first (smaller) key.
#[derive(Debug, Default)]
pub struct CollisionCache {
    entries: HashMap<TrackKey, EventData>,
}

impl CollisionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Result for `from` against the other member of `pair`, if computed
    pub fn get(&self, pair: PairKey, kind: HandlerKind, from: ColliderId) -> Option<EventData> {
        let data = self.entries.get(&(pair, kind))?;
        Some(if from == pair.first { *data } else { data.invert() })
    }

    /// Store a result computed for `from` against the other member of `pair`
    pub fn insert(&mut self, pair: PairKey, from: ColliderId, data: EventData) {
        let oriented = if from == pair.first { data } else { data.invert() };
        self.entries.insert((pair, data.kind()), oriented);
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of memoized results
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is memoized
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
