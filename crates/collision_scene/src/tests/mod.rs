//! Scenario tests spanning several modules
//!
//! Each file drives a [`crate::CollisionWorld`] (or the collider objects
//! directly) through a complete workflow rather than a single function.

mod dynamics_scenarios;
mod shape_symmetry;
mod spatial_queries;
