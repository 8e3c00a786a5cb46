//! simq Store
//!
//! SQLite-backed durable queue for simq: queued simulations, collected
//! alphas and the crawled data field catalog.

pub mod db;
pub mod error;
pub mod repository;

pub use error::{Result, StoreError};
pub use sqlx::SqlitePool;
