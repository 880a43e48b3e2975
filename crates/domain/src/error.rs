//! Invariant violations raised by domain types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Authored content or a value breaks a rule, e.g. duplicate room ids.
    #[error("Invalid: {0}")]
    Validation(String),

    /// A save step or id string that does not parse.
    #[error("Malformed id: {0}")]
    InvalidId(String),

    /// A story graph reference to a scene or room it does not declare.
    #[error("{entity_type} '{id}' is not declared")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        DomainError::InvalidId(msg.into())
    }

    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        DomainError::NotFound {
            entity_type,
            id: id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_node() {
        assert_eq!(
            DomainError::not_found("Room", "room_009").to_string(),
            "Room 'room_009' is not declared"
        );
    }
}
