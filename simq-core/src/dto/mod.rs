//! Data Transfer Objects for the remote research API
//!
//! Wire shapes sent to and received from the API, kept apart from the domain
//! types they are converted into.

pub mod field;
pub mod simulation;
