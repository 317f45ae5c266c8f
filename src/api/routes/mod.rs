//! API Routes
//!
//! Route handlers organized by functionality.

pub mod health;
pub mod heatmaps;
pub mod status;
pub mod tables;
