//! Error types for the registration proxy.

use crate::registration::RegistrationOutcome;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use synapse_admin_client::SynapseError;
use thiserror::Error;

/// Why a submission failed local validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid registration token")]
    InvalidToken,

    #[error("Username must be non-empty and contain only a-z and 0-9")]
    InvalidUsername,

    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),

    #[error("Password must not contain whitespace")]
    PasswordWhitespace,

    #[error("Password confirmation does not match")]
    PasswordMismatch,
}

/// Every way a registration attempt can fail.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Actor blocked until {0}")]
    Blocked(DateTime<Utc>),

    #[error("Homeserver rejected the shared secret: {0}")]
    UpstreamAuth(String),

    #[error("User already exists: {0}")]
    UpstreamConflict(String),

    #[error("Homeserver unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Homeserver protocol error: {0}")]
    Protocol(String),
}

impl RegistrationError {
    /// The outcome reported to the caller. Carries no error detail.
    pub fn outcome(&self) -> RegistrationOutcome {
        match self {
            RegistrationError::Validation(ValidationError::InvalidToken) => {
                RegistrationOutcome::InvalidToken
            }
            RegistrationError::Validation(
                ValidationError::InvalidUsername
                | ValidationError::PasswordTooShort(_)
                | ValidationError::PasswordWhitespace
                | ValidationError::PasswordMismatch,
            ) => RegistrationOutcome::InvalidUserOrPass,
            RegistrationError::Blocked(_) => RegistrationOutcome::Blocked,
            RegistrationError::UpstreamAuth(_) => RegistrationOutcome::WrongSharedSecret,
            RegistrationError::UpstreamConflict(_) => RegistrationOutcome::UserExists,
            RegistrationError::UpstreamUnavailable(_) | RegistrationError::Protocol(_) => {
                RegistrationOutcome::InternalError
            }
        }
    }
}

impl From<SynapseError> for RegistrationError {
    fn from(e: SynapseError) -> Self {
        match e {
            SynapseError::WrongSharedSecret(msg) => RegistrationError::UpstreamAuth(msg),
            SynapseError::UserExists(msg) => RegistrationError::UpstreamConflict(msg),
            SynapseError::Http(_) | SynapseError::Timeout => {
                RegistrationError::UpstreamUnavailable(e.to_string())
            }
            SynapseError::UnexpectedStatus { .. }
            | SynapseError::MalformedResponse(_)
            | SynapseError::InvalidKey => RegistrationError::Protocol(e.to_string()),
        }
    }
}

/// Proxy error types for failures outside the registration vocabulary.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ProxyError::RateLimitExceeded => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED"),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_outcomes() {
        assert_eq!(
            RegistrationError::from(ValidationError::InvalidToken).outcome(),
            RegistrationOutcome::InvalidToken
        );
        for err in [
            ValidationError::InvalidUsername,
            ValidationError::PasswordTooShort(3),
            ValidationError::PasswordWhitespace,
            ValidationError::PasswordMismatch,
        ] {
            assert_eq!(
                RegistrationError::from(err).outcome(),
                RegistrationOutcome::InvalidUserOrPass
            );
        }
    }

    #[test]
    fn test_synapse_error_mapping() {
        let cases = [
            (
                SynapseError::WrongSharedSecret("HMAC incorrect".into()),
                RegistrationOutcome::WrongSharedSecret,
            ),
            (
                SynapseError::UserExists("taken".into()),
                RegistrationOutcome::UserExists,
            ),
            (SynapseError::Timeout, RegistrationOutcome::InternalError),
            (
                SynapseError::UnexpectedStatus {
                    status: 502,
                    body: String::new(),
                },
                RegistrationOutcome::InternalError,
            ),
            (
                SynapseError::MalformedResponse("eof".into()),
                RegistrationOutcome::InternalError,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(RegistrationError::from(err).outcome(), expected);
        }
    }

    #[test]
    fn test_rate_limit_response_status() {
        let response = ProxyError::RateLimitExceeded.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
