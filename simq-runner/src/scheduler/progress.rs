//! Progress lines
//!
//! Every outcome prints one `[succ|fail] message` line for the operator,
//! alongside the structured tracing event.

use colored::Colorize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Success and failure counters of one scheduler
#[derive(Debug, Default)]
pub struct Progress {
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a success and print `message`
    pub fn success(&self, message: &str) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.print(message);
    }

    /// Count a failure and print `message`
    pub fn failure(&self, message: &str) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.print(message);
    }

    /// Print `message` without counting anything
    pub fn note(&self, message: &str) {
        self.print(message);
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    fn print(&self, message: &str) {
        println!("{}", format_line(self.succeeded(), self.failed(), message));
    }
}

fn format_line(succeeded: u64, failed: u64, message: &str) -> String {
    format!(
        "[{}|{}] {}",
        format!("{:0>4}", succeeded).green(),
        format!("{:0>4}", failed).red(),
        message
    )
}

/// `label` padded to a column, then `message`
pub fn job_line(label: &str, message: &str) -> String {
    format!("{:<50} {}", label, message)
}

/// Wait rendered the way progress lines show it
pub fn secs(wait: Duration) -> String {
    format!("{:.2} secs", wait.as_secs_f64())
}
