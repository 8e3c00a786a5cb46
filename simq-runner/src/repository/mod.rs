//! Repository layer
//!
//! The two seams the schedulers depend on: the durable job queue and the
//! remote research API. Both are trait-based so the schedulers can be
//! driven by in-memory fakes in tests.

mod queue;
mod remote;

// Re-export traits
pub use queue::JobQueue;
pub use remote::{PollStatus, RemoteJobClient};

// Re-export implementations
pub use queue::SqliteJobQueue;
pub use remote::BrainRemoteClient;
