use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

/// How heavy a mutating call is for the bridge; heavier calls wait longer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallWeight {
    /// Single light-state writes.
    Light,
    /// Group, rule and light updates.
    Standard,
    /// Scene membership and behavior instance rewrites.
    Heavy,
}

/// Minimum gap enforced before a mutating call of each weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    pub light: Duration,
    pub standard: Duration,
    pub heavy: Duration,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            light: Duration::from_millis(50),
            standard: Duration::from_millis(100),
            heavy: Duration::from_millis(300),
        }
    }
}

impl ThrottlePolicy {
    pub fn interval(&self, weight: CallWeight) -> Duration {
        match weight {
            CallWeight::Light => self.light,
            CallWeight::Standard => self.standard,
            CallWeight::Heavy => self.heavy,
        }
    }
}

/// Spaces out mutating calls.
///
/// The lock is held from the wait until the caller drops the returned
/// permit, so two writes are never in flight at once.
pub struct Throttle {
    policy: ThrottlePolicy,
    last: Mutex<Option<Instant>>,
}

pub struct Permit<'a> {
    last: tokio::sync::MutexGuard<'a, Option<Instant>>,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        *self.last = Some(Instant::now());
    }
}

impl Throttle {
    pub fn new(policy: ThrottlePolicy) -> Self {
        Self {
            policy,
            last: Mutex::new(None),
        }
    }

    /// Wait until a call of `weight` may start. Completion time is recorded
    /// when the permit drops.
    pub async fn acquire(&self, weight: CallWeight) -> Permit<'_> {
        let last = self.last.lock().await;
        if let Some(previous) = *last {
            sleep_until(previous + self.policy.interval(weight)).await;
        }
        Permit { last }
    }
}
