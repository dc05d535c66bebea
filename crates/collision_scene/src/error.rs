//! Error types for the collision scene
//!
//! Every error here is a local invariant violation. They propagate to the
//! caller (usually a frame boundary or an asset-load routine) and are never
//! caught and retried inside the collision core.

use thiserror::Error;

/// Collision scene errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollisionError {
    /// A typed accessor was used against a value of another type
    #[error("Invalid type: expected {expected}, found {found}")]
    InvalidType {
        /// What the caller asked for
        expected: &'static str,
        /// What is actually stored
        found: &'static str,
    },

    /// A soft reference was dereferenced after its target was destroyed
    #[error("Null reference: {0} no longer exists")]
    NullReference(&'static str),

    /// An ID generator ran out of slots
    #[error("Storage overflow: {what} capacity of {capacity} exhausted")]
    StorageOverflow {
        /// What kind of slot was requested
        what: &'static str,
        /// Configured capacity
        capacity: usize,
    },

    /// A layer name or bit is already owned by a different assignment
    #[error("Duplicate key: layer '{name}' conflicts at bit {bit}")]
    DuplicateKey {
        /// Layer name being assigned
        name: String,
        /// Bit index in conflict
        bit: u32,
    },

    /// A layer bit index outside the 32-bit mask
    #[error("Index out of range: {index} (max {max})")]
    IndexOutOfRange {
        /// Requested index
        index: u32,
        /// Largest valid index
        max: u32,
    },

    /// A layer name that was never registered
    #[error("Unknown layer: {0}")]
    UnknownLayer(String),
}
