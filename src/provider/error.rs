//! Error types for provider calls.

use thiserror::Error;

/// Errors a provider client reports back to the core.
///
/// Only [`AccessError::Conflict`] is ever retried, and only by callers that
/// opt in (the reaper and node destruction). Everything else is terminal for
/// the operation that observed it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The resource does not exist (404)
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The resource is in use or in an illegal state for this call (409)
    #[error("resource in use: {0}")]
    Conflict(String),

    /// Credentials rejected (401/403)
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Provider returned another error response
    #[error("provider error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Network-level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Response could not be interpreted
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl AccessError {
    /// Map an HTTP status and message onto the taxonomy.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => AccessError::Unauthorized(message),
            404 => AccessError::NotFound(message),
            409 => AccessError::Conflict(message),
            _ => AccessError::Upstream { status, message },
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, AccessError::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AccessError::NotFound(_))
    }

    /// HTTP status equivalent, when one applies.
    pub fn status(&self) -> Option<u16> {
        match self {
            AccessError::NotFound(_) => Some(404),
            AccessError::Conflict(_) => Some(409),
            AccessError::Unauthorized(_) => Some(401),
            AccessError::Upstream { status, .. } => Some(*status),
            AccessError::Transport(_) | AccessError::InvalidResponse(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_mapping() {
        assert!(AccessError::from_status(409, "in use").is_conflict());
        assert!(AccessError::from_status(404, "gone").is_not_found());
        assert!(matches!(
            AccessError::from_status(403, "denied"),
            AccessError::Unauthorized(_)
        ));
        assert_eq!(
            AccessError::from_status(500, "boom"),
            AccessError::Upstream {
                status: 500,
                message: "boom".to_string()
            }
        );
    }

    #[test]
    fn test_display() {
        let err = AccessError::Upstream {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "provider error 503: unavailable");
        assert_eq!(
            AccessError::Conflict("sg-1".to_string()).to_string(),
            "resource in use: sg-1"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AccessError::Conflict(String::new()).status(), Some(409));
        assert_eq!(AccessError::Transport(String::new()).status(), None);
    }
}
