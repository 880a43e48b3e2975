//! Failure escalation for repeated Oracle failures.
//!
//! Counts consecutive failed Oracle calls across the whole process. Every
//! `threshold`-th consecutive failure pauses Oracle traffic until a human
//! decides whether to continue:
//!
//! - **Interactive**: a [`ConfirmationPort`] is asked while the lock is held,
//!   so concurrent callers wait for the answer.
//! - **Deferred**: with no port, the failure surfaces as
//!   [`EscalationError::ConfirmationRequired`] and every later call is refused
//!   until [`FailureEscalation::resolve`] is called (e.g. over HTTP).
//!
//! Continuing resets the counter. Declining resets it too and aborts the
//! in-flight turn with [`EscalationError::Declined`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::infrastructure::ports::{
    ConfirmationPort, EscalationError, LlmError, LlmPort, LlmRequest, LlmResponse,
};

/// Consecutive failures between confirmations.
pub const DEFAULT_ESCALATION_THRESHOLD: u32 = 3;

/// A confirmation that was requested but not answered yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConfirmation {
    pub failures: u32,
    pub last_error: String,
}

/// Point-in-time view of the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationStatus {
    pub consecutive_failures: u32,
    pub threshold: u32,
    pub pending: Option<PendingConfirmation>,
}

#[derive(Debug, Default)]
struct EscalationState {
    consecutive_failures: u32,
    pending: Option<PendingConfirmation>,
}

/// Process-wide consecutive-failure counter with human-in-the-loop confirmation.
pub struct FailureEscalation {
    threshold: u32,
    confirmation: Option<Arc<dyn ConfirmationPort>>,
    state: Mutex<EscalationState>,
}

impl FailureEscalation {
    /// Deferred mode: confirmations are resolved out of band.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            confirmation: None,
            state: Mutex::new(EscalationState::default()),
        }
    }

    /// Interactive mode: `confirmation` is asked synchronously.
    pub fn with_confirmation(mut self, confirmation: Arc<dyn ConfirmationPort>) -> Self {
        self.confirmation = Some(confirmation);
        self
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Refuse to start an Oracle call while a confirmation is outstanding.
    pub async fn before_call(&self) -> Result<(), EscalationError> {
        let state = self.state.lock().await;
        match &state.pending {
            Some(pending) => Err(EscalationError::ConfirmationRequired {
                failures: pending.failures,
                last_error: pending.last_error.clone(),
            }),
            None => Ok(()),
        }
    }

    pub async fn record_success(&self) {
        let mut state = self.state.lock().await;
        if state.consecutive_failures > 0 {
            tracing::debug!(
                previous_failures = state.consecutive_failures,
                "Oracle call succeeded, failure counter reset"
            );
        }
        state.consecutive_failures = 0;
    }

    /// Count a failed Oracle call.
    ///
    /// `Ok(())` means the caller may carry on (and degrade); `Err` means the
    /// turn must be aborted.
    pub async fn record_failure(&self, error: &str) -> Result<(), EscalationError> {
        let mut state = self.state.lock().await;
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        let failures = state.consecutive_failures;

        tracing::warn!(
            consecutive_failures = failures,
            threshold = self.threshold,
            error = error,
            "Oracle call failed"
        );

        if failures % self.threshold != 0 {
            return Ok(());
        }

        match &self.confirmation {
            Some(confirmation) => {
                tracing::warn!(consecutive_failures = failures, "Asking whether to continue Oracle calls");
                let should_continue = confirmation.confirm(failures, error.to_string()).await;
                state.consecutive_failures = 0;
                if should_continue {
                    tracing::info!("Continuing Oracle calls after confirmation");
                    Ok(())
                } else {
                    tracing::error!(consecutive_failures = failures, "Continuing Oracle calls was declined");
                    Err(EscalationError::Declined {
                        failures,
                        last_error: error.to_string(),
                    })
                }
            }
            None => {
                let pending = PendingConfirmation {
                    failures,
                    last_error: error.to_string(),
                };
                tracing::error!(
                    consecutive_failures = failures,
                    "Oracle calls paused until confirmation"
                );
                state.pending = Some(pending);
                Err(EscalationError::ConfirmationRequired {
                    failures,
                    last_error: error.to_string(),
                })
            }
        }
    }

    /// Answer an outstanding confirmation. Both answers reset the counter and
    /// unblock Oracle calls; declining only ever affects the turn that was
    /// already aborted.
    ///
    /// Returns the confirmation that was resolved, if there was one.
    pub async fn resolve(&self, continue_calls: bool) -> Option<PendingConfirmation> {
        let mut state = self.state.lock().await;
        let pending = state.pending.take();
        state.consecutive_failures = 0;
        if let Some(pending) = &pending {
            tracing::info!(
                failures = pending.failures,
                continue_calls,
                "Oracle escalation resolved"
            );
        }
        pending
    }

    pub async fn status(&self) -> EscalationStatus {
        let state = self.state.lock().await;
        EscalationStatus {
            consecutive_failures: state.consecutive_failures,
            threshold: self.threshold,
            pending: state.pending.clone(),
        }
    }
}

/// Oracle wrapper that reports every final outcome to a [`FailureEscalation`].
///
/// Sits outside the retry layer, so one failure here means a whole retry
/// sequence failed.
pub struct EscalatingLlm {
    inner: Arc<dyn LlmPort>,
    escalation: Arc<FailureEscalation>,
}

impl EscalatingLlm {
    pub fn new(inner: Arc<dyn LlmPort>, escalation: Arc<FailureEscalation>) -> Self {
        Self { inner, escalation }
    }
}

#[async_trait]
impl LlmPort for EscalatingLlm {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        self.escalation.before_call().await?;

        match self.inner.generate(request).await {
            Ok(response) => {
                self.escalation.record_success().await;
                Ok(response)
            }
            Err(e) => {
                self.escalation.record_failure(&e.to_string()).await?;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{MockConfirmationPort, MockLlmPort};

    fn failing_oracle() -> Arc<dyn LlmPort> {
        let mut llm = MockLlmPort::new();
        llm.expect_generate()
            .returning(|_| Err(LlmError::RequestFailed("connection reset".into())));
        Arc::new(llm)
    }

    #[tokio::test]
    async fn success_resets_the_counter() {
        let escalation = FailureEscalation::new(3);
        escalation.record_failure("boom").await.unwrap();
        escalation.record_failure("boom").await.unwrap();
        escalation.record_success().await;
        assert_eq!(escalation.status().await.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn every_third_failure_asks_for_confirmation() {
        let mut confirmation = MockConfirmationPort::new();
        confirmation
            .expect_confirm()
            .withf(|failures, _| *failures == 3)
            .times(1)
            .returning(|_, _| true);
        let escalation = FailureEscalation::new(3).with_confirmation(Arc::new(confirmation));

        for _ in 0..3 {
            escalation.record_failure("boom").await.unwrap();
        }
        assert_eq!(escalation.status().await.consecutive_failures, 0);

        // Counting starts over after a confirmed continue
        escalation.record_failure("boom").await.unwrap();
        assert_eq!(escalation.status().await.consecutive_failures, 1);
    }

    #[tokio::test]
    async fn declining_aborts_and_resets() {
        let mut confirmation = MockConfirmationPort::new();
        confirmation.expect_confirm().times(1).returning(|_, _| false);
        let escalation = FailureEscalation::new(3).with_confirmation(Arc::new(confirmation));

        escalation.record_failure("boom").await.unwrap();
        escalation.record_failure("boom").await.unwrap();
        let err = escalation.record_failure("boom").await.unwrap_err();

        assert!(matches!(err, EscalationError::Declined { failures: 3, .. }));
        assert_eq!(escalation.status().await.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn without_a_port_calls_are_blocked_until_resolved() {
        let escalation = Arc::new(FailureEscalation::new(3));
        let llm = EscalatingLlm::new(failing_oracle(), Arc::clone(&escalation));

        for _ in 0..2 {
            let err = llm.generate(LlmRequest::new(vec![])).await.unwrap_err();
            assert!(err.escalation().is_none());
        }
        let err = llm.generate(LlmRequest::new(vec![])).await.unwrap_err();
        assert!(matches!(
            err.escalation(),
            Some(EscalationError::ConfirmationRequired { failures: 3, .. })
        ));

        // Refused before reaching the Oracle
        let err = llm.generate(LlmRequest::new(vec![])).await.unwrap_err();
        assert!(err.escalation().is_some());

        let resolved = escalation.resolve(true).await.unwrap();
        assert_eq!(resolved.failures, 3);
        let status = escalation.status().await;
        assert!(status.pending.is_none());
        assert_eq!(status.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn wrapper_passes_successes_through() {
        let mut llm = MockLlmPort::new();
        llm.expect_generate()
            .returning(|_| Ok(LlmResponse::text("{\"ok\": true}")));
        let escalation = Arc::new(FailureEscalation::new(3));
        escalation.record_failure("earlier").await.unwrap();

        let wrapped = EscalatingLlm::new(Arc::new(llm), Arc::clone(&escalation));
        let response = wrapped.generate(LlmRequest::new(vec![])).await.unwrap();

        assert_eq!(response.content, "{\"ok\": true}");
        assert_eq!(escalation.status().await.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn zero_threshold_is_clamped() {
        let escalation = FailureEscalation::new(0);
        assert_eq!(escalation.threshold(), 1);
        assert!(escalation.record_failure("boom").await.is_err());
    }
}
