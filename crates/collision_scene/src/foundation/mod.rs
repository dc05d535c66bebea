//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the collision scene:
//! - 2D math types, affine transforms and the transformer node
//! - Generational handles and bounded slot storage
//! - Logging utilities

pub mod math;
pub mod collections;
pub mod logging;
