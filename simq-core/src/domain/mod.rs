//! Core domain types
//!
//! These types represent the entities persisted by the store and advanced by
//! the schedulers.

pub mod alpha;
pub mod field;
pub mod job;
pub mod lifecycle;
