//! Specialized collection types
//!
//! Every cross-object pointer in the collision scene is a generational
//! slot-map key. A key is a soft reference: it never dangles, and its
//! liveness is checked with a lookup before it is dereferenced.

use crate::error::CollisionError;
pub use slotmap::{Key, SlotMap};

slotmap::new_key_type! {
    /// Soft reference to a collider owned by a `CollisionWorld`
    pub struct ColliderId;

    /// Soft reference to a collision tree owned by a `CollisionWorld`
    pub struct TreeId;

    /// Soft reference to a collision controller owned by a `CollisionWorld`
    pub struct ControllerId;

    /// Soft reference to a rigid body owned by a `CollisionWorld`
    pub struct BodyId;

    /// Handle to a node inside one collision tree's node arena
    pub struct NodeKey;
}

/// Slot map with a hard capacity
///
/// Backs every ID generator in the scene; inserting past the capacity fails
/// with [`CollisionError::StorageOverflow`] instead of growing.
#[derive(Debug, Clone)]
pub struct IdPool<K: Key, V> {
    slots: SlotMap<K, V>,
    capacity: usize,
    what: &'static str,
}

impl<K: Key, V> IdPool<K, V> {
    /// Create an empty pool holding at most `capacity` values
    pub fn new(what: &'static str, capacity: usize) -> Self {
        Self {
            slots: SlotMap::with_key(),
            capacity,
            what,
        }
    }

    /// Insert a value and return its key
    pub fn insert(&mut self, value: V) -> Result<K, CollisionError> {
        self.insert_with_key(|_| value)
    }

    /// Insert a value built from its own key
    pub fn insert_with_key(&mut self, f: impl FnOnce(K) -> V) -> Result<K, CollisionError> {
        if self.slots.len() >= self.capacity {
            return Err(CollisionError::StorageOverflow {
                what: self.what,
                capacity: self.capacity,
            });
        }
        Ok(self.slots.insert_with_key(f))
    }

    /// Remove a value, returning it if the key was live
    pub fn remove(&mut self, key: K) -> Option<V> {
        self.slots.remove(key)
    }

    /// Liveness check for a soft reference
    pub fn contains(&self, key: K) -> bool {
        self.slots.contains_key(key)
    }

    /// Get a value by key
    pub fn get(&self, key: K) -> Option<&V> {
        self.slots.get(key)
    }

    /// Get a mutable value by key
    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.slots.get_mut(key)
    }

    /// Get a value or fail with a null-reference error
    pub fn try_get(&self, key: K) -> Result<&V, CollisionError> {
        self.slots
            .get(key)
            .ok_or(CollisionError::NullReference(self.what))
    }

    /// Get a mutable value or fail with a null-reference error
    pub fn try_get_mut(&mut self, key: K) -> Result<&mut V, CollisionError> {
        let what = self.what;
        self.slots
            .get_mut(key)
            .ok_or(CollisionError::NullReference(what))
    }

    /// Number of live values
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the pool holds no values
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Maximum number of live values
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate over keys and values
    pub fn iter(&self) -> slotmap::basic::Iter<'_, K, V> {
        self.slots.iter()
    }

    /// Iterate over keys
    pub fn keys(&self) -> slotmap::basic::Keys<'_, K, V> {
        self.slots.keys()
    }

    /// Iterate mutably over keys and values
    pub fn iter_mut(&mut self) -> slotmap::basic::IterMut<'_, K, V> {
        self.slots.iter_mut()
    }

    /// Borrow the underlying slot map
    pub fn slots(&self) -> &SlotMap<K, V> {
        &self.slots
    }

    /// Mutably borrow the underlying slot map
    pub fn slots_mut(&mut self) -> &mut SlotMap<K, V> {
        &mut self.slots
    }
}
