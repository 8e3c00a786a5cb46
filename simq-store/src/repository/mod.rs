//! Repository Module
//!
//! Data access layer for the durable queue.
//! Each repository handles database operations for a specific domain entity.

pub mod alpha;
pub mod field;
pub mod simulation;

// Re-export for convenience
pub use alpha as alpha_repository;
pub use field as field_repository;
pub use simulation as simulation_repository;
