//! Adaptive backoff controller
//!
//! The wait between remote calls is a pure function of the outcome history.
//! Failures grow it geometrically, the first success after a failure halves
//! it, and a long enough success streak shrinks it gradually.
//!
//! [`BackoffState`] is an immutable value with pure transitions so the policy
//! can be tested without a clock. [`SharedBackoff`] wraps it for the
//! schedulers, which report outcomes from several tasks.

use std::time::Duration;
use tokio::sync::Mutex;

/// Tuning of the backoff controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// Wait before any outcome has been observed
    pub initial_wait: Duration,
    /// Multiplier applied on every failure, greater than 2
    pub failure_factor: f64,
    /// Consecutive successes before the wait starts shrinking
    pub streak_threshold: u32,
    /// Scale applied at the threshold; grows by `streak_step` per success
    pub streak_base: f64,
    pub streak_step: f64,
    /// Streak length at which the scale saturates
    pub streak_cap: u32,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_wait: Duration::from_secs(1),
            failure_factor: 2.1,
            streak_threshold: 5,
            streak_base: 0.8,
            streak_step: 0.02,
            streak_cap: 10,
            min_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(300),
        }
    }
}

impl BackoffPolicy {
    fn clamp(&self, wait: Duration) -> Duration {
        wait.clamp(self.min_wait, self.max_wait)
    }

    /// Scale applied to the wait on a success streak of `streak`
    fn streak_scale(&self, streak: u32) -> f64 {
        let scale = self.streak_base + f64::from(streak.min(self.streak_cap)) * self.streak_step;
        scale.min(1.0)
    }

    /// Validates the policy
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.min_wait.is_zero() {
            anyhow::bail!("min_wait must be greater than 0");
        }

        if self.min_wait > self.max_wait {
            anyhow::bail!("min_wait cannot exceed max_wait");
        }

        if self.failure_factor <= 1.0 {
            anyhow::bail!("failure_factor must be greater than 1");
        }

        if self.streak_base <= 0.0 || self.streak_base > 1.0 {
            anyhow::bail!("streak_base must be in (0, 1]");
        }

        Ok(())
    }
}

/// Where the controller stands after the outcomes seen so far
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffState {
    wait: Duration,
    success_streak: u32,
    failure_streak: u32,
}

impl BackoffState {
    pub fn new(policy: &BackoffPolicy) -> Self {
        Self {
            wait: policy.clamp(policy.initial_wait),
            success_streak: 0,
            failure_streak: 0,
        }
    }

    /// Current wait, without recording an outcome
    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Record a success
    ///
    /// # Returns
    /// The next state and the wait to apply before the next call
    pub fn on_success(self, policy: &BackoffPolicy) -> (Self, Duration) {
        let next = if self.failure_streak > 0 {
            Self {
                wait: policy.clamp(self.wait / 2),
                success_streak: 0,
                failure_streak: 0,
            }
        } else {
            let streak = self.success_streak.saturating_add(1);
            let wait = if streak >= policy.streak_threshold {
                policy.clamp(self.wait.mul_f64(policy.streak_scale(streak)))
            } else {
                self.wait
            };
            Self {
                wait,
                success_streak: streak,
                failure_streak: 0,
            }
        };

        (next, next.wait)
    }

    /// Record a failure
    ///
    /// # Returns
    /// The next state and the wait to apply before retrying
    pub fn on_failure(self, policy: &BackoffPolicy) -> (Self, Duration) {
        let wait = policy.clamp(scale_saturating(self.wait, policy.failure_factor, policy.max_wait));
        let next = Self {
            wait,
            success_streak: 0,
            failure_streak: self.failure_streak.saturating_add(1),
        };

        (next, next.wait)
    }
}

/// `wait * factor`, saturating at `cap` instead of overflowing
fn scale_saturating(wait: Duration, factor: f64, cap: Duration) -> Duration {
    let secs = wait.as_secs_f64() * factor;
    if !secs.is_finite() || secs >= cap.as_secs_f64() {
        cap
    } else {
        Duration::from_secs_f64(secs)
    }
}

/// Backoff controller shared by the tasks of one scheduler
#[derive(Debug)]
pub struct SharedBackoff {
    policy: BackoffPolicy,
    state: Mutex<BackoffState>,
}

impl SharedBackoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(BackoffState::new(&policy)),
        }
    }

    pub async fn on_success(&self) -> Duration {
        let mut state = self.state.lock().await;
        let (next, wait) = state.on_success(&self.policy);
        *state = next;
        wait
    }

    pub async fn on_failure(&self) -> Duration {
        let mut state = self.state.lock().await;
        let (next, wait) = state.on_failure(&self.policy);
        *state = next;
        wait
    }

    /// Current wait, without recording an outcome
    pub async fn current(&self) -> Duration {
        self.state.lock().await.wait()
    }
}
