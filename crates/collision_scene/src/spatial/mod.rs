//! Spatial partitioning data structures
//!
//! Provides the broad phase of the collision scene: a bounded grid tree that
//! answers region queries and enumerates candidate collider pairs.

mod collision_tree;

pub use collision_tree::{CollisionNode, CollisionTree, FlushStats, Pairs, Query, TreeConfig};
