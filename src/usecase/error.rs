use thiserror::Error;
use validator::ValidationErrors;

use crate::repository::errors::{ApiError, RepositoryError};

pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred. Please try again.";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("network failure: {0}")]
    Network(String),

    #[error("rejected by server: {}", .0.as_deref().unwrap_or("no message"))]
    Rejected(Option<String>),

    #[error("{0}")]
    Validation(String),

    #[error("no stored session")]
    NoSession,

    #[error("session changed while the request was in flight")]
    Superseded,

    #[error(transparent)]
    Store(#[from] RepositoryError),
}

pub type AuthResult<T> = Result<T, SessionError>;

impl SessionError {
    /// Text to show next to the failed form: the server's own message when it
    /// sent one, the local validation message, or `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            SessionError::Rejected(Some(message)) if !message.trim().is_empty() => {
                message.clone()
            }
            SessionError::Validation(message) => message.clone(),
            SessionError::Network(_) => GENERIC_ERROR_MESSAGE.to_string(),
            _ => fallback.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, SessionError::Validation(_))
    }
}

impl From<ApiError> for SessionError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Rejected { message, .. } => SessionError::Rejected(message),
            ApiError::Network(msg) | ApiError::Decode(msg) | ApiError::InvalidUrl(msg) => {
                SessionError::Network(msg)
            }
        }
    }
}

impl From<ValidationErrors> for SessionError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field))
                })
            })
            .collect();
        messages.sort();
        messages.dedup();
        SessionError::Validation(messages.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    #[test]
    fn test_rejection_with_message_is_shown() {
        let err = SessionError::from(ApiError::Rejected {
            status: StatusCode::UNAUTHORIZED,
            message: Some("bad credentials".to_string()),
        });

        assert_eq!(err.user_message("Login failed."), "bad credentials");
    }

    #[test]
    fn test_rejection_without_message_uses_fallback() {
        let err = SessionError::Rejected(None);

        assert_eq!(err.user_message("Login failed."), "Login failed.");
    }

    #[test]
    fn test_network_failure_uses_generic_message() {
        let err = SessionError::from(ApiError::Network("connection refused".to_string()));

        assert_eq!(err.user_message("Login failed."), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_decode_failure_collapses_to_network() {
        let err = SessionError::from(ApiError::Decode("eof".to_string()));

        assert!(matches!(err, SessionError::Network(_)));
    }
}
