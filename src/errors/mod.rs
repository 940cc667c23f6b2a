//! Error handling module for the HackMap store.
//!
//! Provides the centralized error type and its translation into the details
//! shown to users.

use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const CAPACITY_EXCEEDED: &str = "CAPACITY_EXCEEDED";
    pub const DUPLICATE_MEMBERSHIP: &str = "DUPLICATE_MEMBERSHIP";
    pub const INVALID_INVITE_CODE: &str = "INVALID_INVITE_CODE";
    pub const UNIQUENESS_VIOLATION: &str = "UNIQUENESS_VIOLATION";
    pub const DESERIALIZATION_ERROR: &str = "DESERIALIZATION_ERROR";
    pub const NOT_AUTHENTICATED: &str = "NOT_AUTHENTICATED";
    pub const VERSION_MISMATCH: &str = "VERSION_MISMATCH";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const SEARCH_ERROR: &str = "SEARCH_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Store error type.
#[derive(Debug)]
pub enum StoreError {
    /// Referenced record absent
    NotFound(String),
    /// Team already at `maxMembers`
    CapacityExceeded(String),
    /// User already belongs to the team
    DuplicateMembership(String),
    /// Invite code matches no team
    InvalidInviteCode(String),
    /// Username or email already registered
    UniquenessViolation(String),
    /// Stored JSON could not be parsed
    Deserialization(String),
    /// Action requires a logged-in user
    NotAuthenticated(String),
    /// Optimistic concurrency conflict
    Conflict {
        message: String,
        current_version: i64,
    },
    /// Input rejected before touching the store
    Validation(String),
    /// Persistent store failure
    Database(String),
    /// Search index failure
    Search(String),
    /// Anything else
    Internal(String),
}

impl StoreError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => codes::NOT_FOUND,
            StoreError::CapacityExceeded(_) => codes::CAPACITY_EXCEEDED,
            StoreError::DuplicateMembership(_) => codes::DUPLICATE_MEMBERSHIP,
            StoreError::InvalidInviteCode(_) => codes::INVALID_INVITE_CODE,
            StoreError::UniquenessViolation(_) => codes::UNIQUENESS_VIOLATION,
            StoreError::Deserialization(_) => codes::DESERIALIZATION_ERROR,
            StoreError::NotAuthenticated(_) => codes::NOT_AUTHENTICATED,
            StoreError::Conflict { .. } => codes::VERSION_MISMATCH,
            StoreError::Validation(_) => codes::VALIDATION_ERROR,
            StoreError::Database(_) => codes::DATABASE_ERROR,
            StoreError::Search(_) => codes::SEARCH_ERROR,
            StoreError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            StoreError::NotFound(msg)
            | StoreError::CapacityExceeded(msg)
            | StoreError::DuplicateMembership(msg)
            | StoreError::InvalidInviteCode(msg)
            | StoreError::UniquenessViolation(msg)
            | StoreError::Deserialization(msg)
            | StoreError::NotAuthenticated(msg)
            | StoreError::Validation(msg)
            | StoreError::Database(msg)
            | StoreError::Search(msg)
            | StoreError::Internal(msg) => msg.clone(),
            StoreError::Conflict { message, .. } => message.clone(),
        }
    }

    /// Every error kind leaves the store usable; the UI aborts the action and carries on.
    pub fn is_recoverable(&self) -> bool {
        true
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        StoreError::Database(format!("Database error: {}", err))
    }
}

impl From<tantivy::TantivyError> for StoreError {
    fn from(err: tantivy::TantivyError) -> Self {
        tracing::error!("Search error: {:?}", err);
        StoreError::Search(format!("Search error: {}", err))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        StoreError::Deserialization(format!("JSON error: {}", err))
    }
}

/// User-facing description of an error.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&StoreError> for ErrorDetails {
    fn from(error: &StoreError) -> Self {
        let details = match error {
            StoreError::Conflict {
                current_version, ..
            } => Some(serde_json::json!({ "currentVersion": current_version })),
            _ => None,
        };

        Self {
            code: error.error_code().to_string(),
            message: error.message(),
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code() {
        let err = StoreError::CapacityExceeded("Team Rustaceans is full".to_string());
        assert_eq!(err.to_string(), "CAPACITY_EXCEEDED: Team Rustaceans is full");
    }

    #[test]
    fn test_conflict_details_carry_version() {
        let err = StoreError::Conflict {
            message: "stale".to_string(),
            current_version: 7,
        };
        let details = ErrorDetails::from(&err);
        assert_eq!(details.code, codes::VERSION_MISMATCH);
        assert_eq!(details.details.unwrap()["currentVersion"], 7);
    }

    #[test]
    fn test_json_error_maps_to_deserialization() {
        let parse_err = serde_json::from_str::<Vec<String>>("{not json").unwrap_err();
        let err: StoreError = parse_err.into();
        assert_eq!(err.error_code(), codes::DESERIALIZATION_ERROR);
        assert!(err.is_recoverable());
    }
}
