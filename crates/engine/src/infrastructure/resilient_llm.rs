//! Retries around an Oracle client.
//!
//! Failure escalation sits outside this wrapper, so it only ever sees the
//! final outcome of a whole retry sequence.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::infrastructure::ports::{LlmError, LlmPort, LlmRequest, LlmResponse};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempts after the first one. Zero disables retrying.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    /// Upper bound on a single backoff before jitter.
    pub max_delay_ms: u64,
    /// Fraction of the delay added or removed at random, `0.0..=1.0`.
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            jitter_factor: 0.2,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `retry` (1-based): doubling from the base,
    /// capped, then jittered.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let doublings = retry.saturating_sub(1).min(32);
        let capped = self
            .base_delay_ms
            .saturating_mul(1u64 << doublings)
            .min(self.max_delay_ms);

        let spread = (capped as f64 * self.jitter_factor.clamp(0.0, 1.0)) as u64;
        let millis = if spread == 0 {
            capped
        } else {
            let low = capped.saturating_sub(spread);
            rand::thread_rng().gen_range(low..=capped.saturating_add(spread))
        };
        Duration::from_millis(millis)
    }
}

pub struct ResilientLlmClient {
    inner: Arc<dyn LlmPort>,
    config: RetryConfig,
}

impl ResilientLlmClient {
    pub fn new(inner: Arc<dyn LlmPort>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl LlmPort for ResilientLlmClient {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let mut retry = 0;
        loop {
            let error = match self.inner.generate(request.clone()).await {
                Ok(response) => {
                    if retry > 0 {
                        tracing::info!(retries = retry, "Oracle recovered");
                    }
                    return Ok(response);
                }
                Err(e) => e,
            };

            if !error.is_transient() {
                tracing::warn!(error = %error, "Oracle error is not retryable");
                return Err(error);
            }
            if retry >= self.config.max_retries {
                tracing::error!(
                    attempts = retry + 1,
                    error = %error,
                    "Oracle still failing, giving up"
                );
                return Err(error);
            }

            retry += 1;
            let delay = self.config.backoff_delay(retry);
            tracing::warn!(
                retry,
                max_retries = self.config.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Oracle call failed, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
