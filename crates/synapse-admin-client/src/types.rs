//! Wire types for the shared-secret registration endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `GET /_synapse/admin/v1/register`.
#[derive(Debug, Deserialize)]
pub struct NonceResponse {
    pub nonce: String,
}

/// A nonce issued by the homeserver.
///
/// Deliberately not `Clone`: registering consumes it, so a nonce can back at
/// most one registration call.
#[derive(Debug)]
pub struct Nonce {
    value: String,
    issued_at: DateTime<Utc>,
}

impl Nonce {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            issued_at: Utc::now(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }
}

/// Body of `POST /_synapse/admin/v1/register`.
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub nonce: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub mac: String,
    pub admin: bool,
}

/// Successful registration response. The access token Synapse returns is
/// intentionally not deserialized.
#[derive(Debug, Deserialize)]
pub struct RegisterResponse {
    pub user_id: String,
}

/// Standard Matrix error body (`{"errcode": ..., "error": ...}`).
#[derive(Debug, Default, Deserialize)]
pub struct MatrixErrorBody {
    #[serde(default)]
    pub errcode: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A user created on the homeserver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredUser {
    /// Localpart as submitted.
    pub username: String,
    /// Fully qualified Matrix ID, e.g. `@alice:example.org`.
    pub user_id: String,
}
