//! Configuration system
//!
//! Collision scenes are tuned through [`CollisionConfig`], which can be built
//! in code or loaded from TOML/RON files through the [`Config`] trait.

use std::collections::BTreeMap;

pub use serde::{Serialize, Deserialize};

use crate::dynamics::DynamicsConfig;
use crate::spatial::TreeConfig;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        // Try different formats
        if path.ends_with(".toml") {
            Self::from_toml_str(&contents)
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Parse configuration from TOML text
    fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, Default::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Slot capacities for the world's ID generators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum live colliders
    pub max_colliders: usize,
    /// Maximum live collision trees
    pub max_trees: usize,
    /// Maximum live collision controllers
    pub max_controllers: usize,
    /// Maximum live rigid bodies
    pub max_bodies: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_colliders: 65_536,
            max_trees: 64,
            max_controllers: 256,
            max_bodies: 65_536,
        }
    }
}

/// Top-level configuration of a collision world
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Default parameters for new collision trees
    pub tree: TreeConfig,
    /// Impulse response tuning
    pub dynamics: DynamicsConfig,
    /// ID generator capacities
    pub limits: Limits,
    /// Named layer bits (name -> bit index, 0..32)
    pub layers: BTreeMap<String, u32>,
}

impl Config for CollisionConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_toml() {
        let text = r#"
            [tree]
            degree = [4, 4]
            cell_capacity = 3

            [limits]
            max_trees = 2

            [layers]
            player = 0
            terrain = 5
        "#;
        let config = CollisionConfig::from_toml_str(text).unwrap();
        assert_eq!(config.tree.degree, [4, 4]);
        assert_eq!(config.tree.cell_capacity, 3);
        assert_eq!(config.tree.max_depth, TreeConfig::default().max_depth);
        assert_eq!(config.limits.max_trees, 2);
        assert_eq!(config.limits.max_colliders, Limits::default().max_colliders);
        assert_eq!(config.layers.get("terrain"), Some(&5));
    }

    #[test]
    fn test_unsupported_format() {
        let err = CollisionConfig::load_from_file("collision.ini").unwrap_err();
        // Reading fails first when the file does not exist.
        assert!(matches!(err, ConfigError::Io(_) | ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_ron_round_trip_through_text() {
        let config = CollisionConfig::default();
        let text = ron::ser::to_string_pretty(&config, Default::default()).unwrap();
        let parsed: CollisionConfig = ron::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
