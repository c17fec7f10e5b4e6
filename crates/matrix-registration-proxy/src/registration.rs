//! Registration request and the outcome vocabulary returned to callers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw form submission.
#[derive(Clone, Deserialize)]
pub struct RegistrationRequest {
    pub username: String,
    pub password: String,
    #[serde(rename = "passwordConfirmation", default)]
    pub password_confirmation: String,
    pub token: String,
}

impl fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("password_confirmation", &"[REDACTED]")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Result of one registration attempt.
///
/// Serializes as `{"registrationState": "<STATE>"}`, plus `username` for
/// [`RegistrationOutcome::Registered`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "registrationState", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationOutcome {
    Registered { username: String },
    WrongSharedSecret,
    Blocked,
    InvalidToken,
    InvalidUserOrPass,
    UserExists,
    InternalError,
}

impl RegistrationOutcome {
    /// The wire tag, e.g. `INVALID_TOKEN`.
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationOutcome::Registered { .. } => "REGISTERED",
            RegistrationOutcome::WrongSharedSecret => "WRONG_SHARED_SECRET",
            RegistrationOutcome::Blocked => "BLOCKED",
            RegistrationOutcome::InvalidToken => "INVALID_TOKEN",
            RegistrationOutcome::InvalidUserOrPass => "INVALID_USER_OR_PASS",
            RegistrationOutcome::UserExists => "USER_EXISTS",
            RegistrationOutcome::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for RegistrationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_carries_username() {
        let outcome = RegistrationOutcome::Registered {
            username: "alice".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "registrationState": "REGISTERED", "username": "alice" })
        );
    }

    #[test]
    fn test_other_outcomes_omit_username() {
        for outcome in [
            RegistrationOutcome::WrongSharedSecret,
            RegistrationOutcome::Blocked,
            RegistrationOutcome::InvalidToken,
            RegistrationOutcome::InvalidUserOrPass,
            RegistrationOutcome::UserExists,
            RegistrationOutcome::InternalError,
        ] {
            let json = serde_json::to_value(&outcome).unwrap();
            assert_eq!(json, serde_json::json!({ "registrationState": outcome.as_str() }));
        }
    }

    #[test]
    fn test_request_debug_redacts_secrets() {
        let request = RegistrationRequest {
            username: "alice".into(),
            password: "hunter23".into(),
            password_confirmation: "hunter23".into(),
            token: "letmein".into(),
        };
        let debug = format!("{:?}", request);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter23"));
        assert!(!debug.contains("letmein"));
    }
}
