//! simq Core
//!
//! Core types shared by the simq crates.
//!
//! This crate contains:
//! - Domain types: queued jobs, their lifecycle, alpha artifacts, data fields
//! - DTOs: request/response shapes of the remote research API

pub mod domain;
pub mod dto;
