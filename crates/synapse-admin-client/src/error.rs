//! Synapse admin client errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SynapseError {
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Homeserver request timed out")]
    Timeout,

    #[error("Unexpected homeserver status: {status} - {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Malformed homeserver response: {0}")]
    MalformedResponse(String),

    #[error("Homeserver rejected the registration MAC: {0}")]
    WrongSharedSecret(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Shared secret cannot be used as an HMAC key")]
    InvalidKey,
}

impl From<reqwest::Error> for SynapseError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SynapseError::Timeout
        } else {
            SynapseError::Http(e)
        }
    }
}
