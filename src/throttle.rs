//! Inter-call throttling for the summarization provider.
//!
//! The provider enforces request- and token-rate ceilings; a fixed minimum
//! delay before each call keeps a run proactively under them instead of
//! bouncing off 429s. The gate is a trait so it can later be swapped for a
//! token-bucket limiter without touching call sites.

use async_trait::async_trait;
use std::time::Duration;

/// Minimum-interval gate invoked before each provider call.
#[async_trait]
pub trait Throttle: Send + Sync {
    async fn wait(&self);
}

/// Sleeps for a fixed duration before every call.
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    /// A zero delay disables throttling entirely.
    pub fn from_millis(millis: u64) -> Self {
        Self {
            delay: Duration::from_millis(millis),
        }
    }
}

#[async_trait]
impl Throttle for FixedDelay {
    async fn wait(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// No-op gate for tests and delay-disabled configurations.
pub struct NoThrottle;

#[async_trait]
impl Throttle for NoThrottle {
    async fn wait(&self) {}
}
