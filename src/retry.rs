//! Backoff schedule for retrying failed next-chapter lookups.

use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

/// Backoff settings for retrying a failed browser probe
#[derive(Debug, Clone, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    #[serde(default = "default_initial_retry_delay")]
    pub initial_retry_delay_ms: u64,

    #[serde(default = "default_max_retry_delay")]
    pub max_retry_delay_ms: u64,
}

fn default_max_retries() -> usize { 4 }
fn default_initial_retry_delay() -> u64 { 500 }
fn default_max_retry_delay() -> u64 { 8000 }

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_retry_delay_ms: default_initial_retry_delay(),
            max_retry_delay_ms: default_max_retry_delay(),
        }
    }
}

impl RetryPolicy {
    /// No retries at all; the first failure is final
    pub fn never() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Total attempts including the first one
    pub fn attempts(&self) -> usize {
        self.max_retries + 1
    }

    /// Delay before retry number `attempt` (0-based): exponential with ±25% jitter
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let base_delay = self.initial_retry_delay_ms;
        let max_delay = self.max_retry_delay_ms;

        let factor = 2u64.saturating_pow(attempt.min(32) as u32);
        let delay_ms = base_delay.saturating_mul(factor).min(max_delay);

        let mut rng = rand::thread_rng();
        let jitter = rng.gen_range(0.75..=1.25);
        Duration::from_millis((delay_ms as f64 * jitter) as u64)
    }
}
