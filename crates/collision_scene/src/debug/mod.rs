//! Debug view data
//!
//! Only the geometry snapshots are produced here; drawing them is left to
//! whatever renderer the application uses.

pub mod collision_view;

pub use collision_view::{CollisionView, CollisionViewColors, ViewShape};
