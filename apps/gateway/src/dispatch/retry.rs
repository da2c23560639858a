use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::AppError;

/// Bounded retry for unreachable backends.
///
/// Only `BackendUnavailable` failures are retried; application-level errors
/// and timeouts surface immediately. Retry `n` (1-based) waits `n * unit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub unit: Duration,
}

impl RetryPolicy {
    pub const NONE: Self = Self {
        max_retries: 0,
        unit: Duration::ZERO,
    };

    /// Policy used by the subscription dispatcher: 5 retries, 1s, 2s, ... 5s.
    pub const fn linear(max_retries: u32, unit: Duration) -> Self {
        Self { max_retries, unit }
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        self.unit.saturating_mul(retry)
    }

    /// Worst-case added latency before the final failure surfaces.
    pub fn ceiling(&self) -> Duration {
        (1..=self.max_retries).map(|n| self.delay_for(n)).sum()
    }

    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let mut retry = 0u32;
        loop {
            match op().await {
                Err(err) if err.is_unavailable() && retry < self.max_retries => {
                    retry += 1;
                    let delay = self.delay_for(retry);
                    warn!(
                        operation = label,
                        retry,
                        retry_delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "backend unreachable, retrying"
                    );
                    sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::NONE
    }
}
