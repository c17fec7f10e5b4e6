//! Input validation for registration submissions.

use crate::error::ValidationError;
use crate::registration::RegistrationRequest;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Fields that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRegistration {
    /// Lower-cased localpart
    pub username: String,
    pub password: String,
}

/// Validates submissions against the configured token and password policy.
///
/// Only a SHA-256 digest of the token is kept.
#[derive(Clone)]
pub struct Validator {
    token_digest: [u8; 32],
    min_password_length: usize,
}

impl Validator {
    pub fn new(token: &SecretString, min_password_length: usize) -> Self {
        Self {
            token_digest: digest(token.expose_secret()),
            min_password_length,
        }
    }

    /// Validate a submission. Username and password are checked before the
    /// token, so malformed fields never count as a bad token.
    pub fn validate(
        &self,
        request: &RegistrationRequest,
    ) -> Result<ValidRegistration, ValidationError> {
        let username = normalize_username(&request.username)?;
        check_password(
            &request.password,
            &request.password_confirmation,
            self.min_password_length,
        )?;

        if !self.token_matches(&request.token) {
            return Err(ValidationError::InvalidToken);
        }

        Ok(ValidRegistration {
            username,
            password: request.password.clone(),
        })
    }

    /// Constant-time token comparison. Hashing first keeps the configured
    /// token's length out of the timing as well.
    pub fn token_matches(&self, provided: &str) -> bool {
        digest(provided)[..].ct_eq(&self.token_digest[..]).into()
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

/// Lower-case a username and require it to be non-empty `[a-z0-9]+`.
pub fn normalize_username(raw: &str) -> Result<String, ValidationError> {
    let username = raw.to_lowercase();

    if username.is_empty()
        || !username
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(ValidationError::InvalidUsername);
    }

    Ok(username)
}

/// Check the password policy and confirmation.
pub fn check_password(
    password: &str,
    confirmation: &str,
    min_length: usize,
) -> Result<(), ValidationError> {
    if password.chars().count() < min_length {
        return Err(ValidationError::PasswordTooShort(min_length));
    }
    if password.chars().any(char::is_whitespace) {
        return Err(ValidationError::PasswordWhitespace);
    }
    if password != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> Validator {
        Validator::new(&SecretString::new("letmein".into()), 3)
    }

    fn request(username: &str, password: &str, confirmation: &str, token: &str) -> RegistrationRequest {
        RegistrationRequest {
            username: username.into(),
            password: password.into(),
            password_confirmation: confirmation.into(),
            token: token.into(),
        }
    }

    #[test]
    fn test_valid_submission() {
        let valid = validator()
            .validate(&request("Alice42", "hunter23", "hunter23", "letmein"))
            .unwrap();
        assert_eq!(valid.username, "alice42");
        assert_eq!(valid.password, "hunter23");
    }

    #[test]
    fn test_normalize_username() {
        assert_eq!(normalize_username("bob"), Ok("bob".into()));
        assert_eq!(normalize_username("BOB7"), Ok("bob7".into()));
        for bad in ["", "bob smith", "bob_smith", "bob.s", "@bob", "bob:example.org", "bób", " bob"] {
            assert_eq!(
                normalize_username(bad),
                Err(ValidationError::InvalidUsername),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_check_password() {
        assert_eq!(check_password("abc", "abc", 3), Ok(()));
        assert_eq!(
            check_password("ab", "ab", 3),
            Err(ValidationError::PasswordTooShort(3))
        );
        assert_eq!(
            check_password("hunter 23", "hunter 23", 3),
            Err(ValidationError::PasswordWhitespace)
        );
        assert_eq!(
            check_password("hunter\t23", "hunter\t23", 3),
            Err(ValidationError::PasswordWhitespace)
        );
        assert_eq!(
            check_password("hunter23", "hunter24", 3),
            Err(ValidationError::PasswordMismatch)
        );
    }

    #[test]
    fn test_fields_checked_before_token() {
        let v = validator();
        assert_eq!(
            v.validate(&request("bad name", "hunter23", "hunter23", "nope")),
            Err(ValidationError::InvalidUsername)
        );
        assert_eq!(
            v.validate(&request("alice", "hunter23", "hunter24", "nope")),
            Err(ValidationError::PasswordMismatch)
        );
        assert_eq!(
            v.validate(&request("alice", "hunter23", "hunter23", "nope")),
            Err(ValidationError::InvalidToken)
        );
    }

    #[test]
    fn test_token_matches() {
        let v = validator();
        assert!(v.token_matches("letmein"));
        assert!(!v.token_matches("letmei"));
        assert!(!v.token_matches("letmein "));
        assert!(!v.token_matches(""));
        assert!(!v.token_matches("LETMEIN"));
    }
}
