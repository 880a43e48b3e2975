//! Errors surfaced through the ports.

/// Failures of the theme and save stores.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// A theme, character or snapshot that does not exist.
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// The filesystem refused `operation`.
    #[error("{operation} failed: {message}")]
    Storage {
        operation: &'static str,
        message: String,
    },

    /// A stored document that does not parse, or a value that does not encode.
    #[error("Malformed document: {0}")]
    Serialization(String),

    /// The request conflicts with what is already stored, e.g. a second `0_step`.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl RepoError {
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        RepoError::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    pub fn storage(operation: &'static str, message: impl ToString) -> Self {
        RepoError::Storage {
            operation,
            message: message.to_string(),
        }
    }

    pub fn serialization(message: impl ToString) -> Self {
        RepoError::Serialization(message.to_string())
    }

    pub fn constraint(message: impl ToString) -> Self {
        RepoError::ConstraintViolation(message.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RepoError::NotFound { .. })
    }
}

/// Oracle failures that need a human decision.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EscalationError {
    /// Threshold reached with nobody to ask synchronously. Further calls are
    /// refused until the confirmation is resolved.
    #[error("{failures} consecutive oracle failures, confirmation required (last error: {last_error})")]
    ConfirmationRequired { failures: u32, last_error: String },

    /// Confirmation was requested and declined.
    #[error("continuing after {failures} consecutive oracle failures was declined (last error: {last_error})")]
    Declined { failures: u32, last_error: String },
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    /// Transport trouble: connection refused, timeout, 5xx.
    #[error("Oracle request failed: {0}")]
    RequestFailed(String),
    /// The backend answered with a client error.
    #[error("Oracle rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("Oracle response unreadable: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    Escalation(#[from] EscalationError),
}

impl LlmError {
    /// Escalation errors abort the turn. Everything else degrades in place.
    pub fn escalation(&self) -> Option<&EscalationError> {
        match self {
            LlmError::Escalation(e) => Some(e),
            _ => None,
        }
    }

    /// Worth sending the same request again.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::RequestFailed(_) | LlmError::InvalidResponse(_) => true,
            // Request timeout and rate limiting clear up on their own.
            LlmError::Rejected { status, .. } => matches!(status, 408 | 429),
            LlmError::Escalation(_) => false,
        }
    }
}
