//! Human-like pacing: jittered delays and the pause seam.

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

/// Inclusive millisecond range a delay is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Jitter {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Jitter {
    pub const fn millis(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub const fn secs(min_secs: u64, max_secs: u64) -> Self {
        Self::millis(min_secs * 1000, max_secs * 1000)
    }

    pub const fn none() -> Self {
        Self::millis(0, 0)
    }

    pub fn sample(&self) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        let mut rng = rand::thread_rng();
        Duration::from_millis(rng.gen_range(self.min_ms..=self.max_ms))
    }
}

/// Inclusive integer range, used for step counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CountRange {
    pub min: u32,
    pub max: u32,
}

impl CountRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn sample(&self) -> u32 {
        if self.max <= self.min {
            return self.min;
        }
        let mut rng = rand::thread_rng();
        rng.gen_range(self.min..=self.max)
    }
}

/// Where the reader suspends itself.
///
/// Short pacing delays and the long post-reward cooldown both go through
/// here, which is also what tests substitute to run without waiting.
#[async_trait]
pub trait Pause: Send + Sync {
    async fn pause(&self, duration: Duration);

    async fn cooldown(&self, duration: Duration) {
        self.pause(duration).await;
    }
}

/// Real-time pauses on the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPause;

#[async_trait]
impl Pause for TokioPause {
    async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Pauses that return immediately
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPause;

#[async_trait]
impl Pause for NoPause {
    async fn pause(&self, _duration: Duration) {}
}
