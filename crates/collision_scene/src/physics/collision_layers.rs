//! Collision layer system for filtering collision detection
//!
//! Layers and masks are 32-bit sets. Subject A may hit subject B when
//! `A.mask & B.layer` is nonzero. The relation is deliberately one-sided:
//! A may be able to hit B while B cannot hit A.

use std::collections::{BTreeMap, HashMap};

use bitflags::bitflags;

use crate::error::CollisionError;

bitflags! {
    /// Collision layer / mask bit set
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct LayerMask: u32 {
        /// Player character layer
        const PLAYER = 1 << 0;
        /// Enemy character layer
        const ENEMY = 1 << 1;
        /// Projectiles (bullets, missiles, etc.)
        const PROJECTILE = 1 << 2;
        /// Static environment geometry
        const ENVIRONMENT = 1 << 3;
        /// Trigger volumes (no physical response)
        const TRIGGER = 1 << 4;
        /// Debris and small physics objects
        const DEBRIS = 1 << 5;
        /// Vehicles
        const VEHICLE = 1 << 6;
        /// Pickups and collectibles
        const PICKUP = 1 << 7;

        // Bits 8-31 are free for user-defined layers.
        const _ = !0;
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::all()
    }
}

impl LayerMask {
    /// Number of usable layer bits
    pub const BITS: u32 = 32;

    /// Mask with a single bit set
    pub fn bit(index: u32) -> Result<Self, CollisionError> {
        if index >= Self::BITS {
            return Err(CollisionError::IndexOutOfRange {
                index,
                max: Self::BITS - 1,
            });
        }
        Ok(Self::from_bits_retain(1 << index))
    }

    /// Check whether a subject with this mask may hit a subject on `other_layer`
    pub fn allows(self, other_layer: LayerMask) -> bool {
        self.intersects(other_layer)
    }
}

/// Check if subject A may hit subject B
///
/// Only A's mask and B's layer are consulted; swap the arguments to ask the
/// reverse question.
pub fn can_hit(mask_a: LayerMask, layer_b: LayerMask) -> bool {
    mask_a.allows(layer_b)
}

/// Name <-> bit assignments loaded from configuration
#[derive(Debug, Clone, Default)]
pub struct LayerRegistry {
    by_name: HashMap<String, u32>,
    by_bit: [Option<String>; 32],
}

impl LayerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from a name -> bit table
    pub fn from_table(table: &BTreeMap<String, u32>) -> Result<Self, CollisionError> {
        let mut registry = Self::new();
        for (name, &bit) in table {
            registry.assign(name, bit)?;
        }
        Ok(registry)
    }

    /// Assign a name to a bit index
    ///
    /// Re-assigning the same pair is a no-op. Fails when the bit belongs to a
    /// different name, when the name already owns a different bit, or when
    /// the bit is outside the 32-bit mask.
    pub fn assign(&mut self, name: &str, bit: u32) -> Result<(), CollisionError> {
        if bit >= LayerMask::BITS {
            return Err(CollisionError::IndexOutOfRange {
                index: bit,
                max: LayerMask::BITS - 1,
            });
        }

        if let Some(owner) = &self.by_bit[bit as usize] {
            if owner != name {
                return Err(CollisionError::DuplicateKey {
                    name: name.to_string(),
                    bit,
                });
            }
        }
        if let Some(&existing) = self.by_name.get(name) {
            if existing != bit {
                return Err(CollisionError::DuplicateKey {
                    name: name.to_string(),
                    bit: existing,
                });
            }
        }

        self.by_name.insert(name.to_string(), bit);
        self.by_bit[bit as usize] = Some(name.to_string());
        log::debug!("Layer '{}' assigned to bit {}", name, bit);
        Ok(())
    }

    /// Bit index of a named layer
    pub fn bit_of(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    /// Name owning a bit index
    pub fn name_of(&self, bit: u32) -> Option<&str> {
        self.by_bit.get(bit as usize)?.as_deref()
    }

    /// Mask of a single named layer
    pub fn layer(&self, name: &str) -> Result<LayerMask, CollisionError> {
        let bit = self
            .bit_of(name)
            .ok_or_else(|| CollisionError::UnknownLayer(name.to_string()))?;
        LayerMask::bit(bit)
    }

    /// Union of several named layers
    pub fn mask(&self, names: &[&str]) -> Result<LayerMask, CollisionError> {
        names
            .iter()
            .try_fold(LayerMask::empty(), |acc, name| Ok(acc | self.layer(name)?))
    }

    /// Number of assigned names
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether no names are assigned
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
