//! Synapse admin API client for shared-secret registration.

use crate::error::SynapseError;
use crate::mac::registration_mac;
use crate::types::*;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const REGISTER_PATH: &str = "/_synapse/admin/v1/register";

/// Errcode Synapse uses when the requested localpart is taken.
const USER_IN_USE: &str = "M_USER_IN_USE";

/// Client for `/_synapse/admin/v1/register`.
///
/// The shared secret is stored using `SecretString` to prevent accidental
/// exposure in logs or debug output.
#[derive(Clone)]
pub struct SynapseAdminClient {
    client: Client,
    base_url: String,
    shared_secret: SecretString,
}

impl SynapseAdminClient {
    /// Create a new client. Trailing slashes on `base_url` are ignored.
    pub fn new(
        base_url: impl Into<String>,
        shared_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SynapseError> {
        let client = Client::builder().timeout(timeout).build()?;

        let base_url: String = base_url.into();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            shared_secret: SecretString::new(shared_secret.into()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn register_url(&self) -> String {
        format!("{}{}", self.base_url, REGISTER_PATH)
    }

    /// Ask the homeserver for a fresh registration nonce.
    #[instrument(skip(self))]
    pub async fn fetch_nonce(&self) -> Result<Nonce, SynapseError> {
        let response = self.client.get(self.register_url()).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Nonce request failed");
            return Err(SynapseError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let payload: NonceResponse = serde_json::from_str(&body)
            .map_err(|e| SynapseError::MalformedResponse(format!("nonce response: {}", e)))?;

        if payload.nonce.is_empty() {
            return Err(SynapseError::MalformedResponse("empty nonce".into()));
        }

        debug!("Nonce received");
        Ok(Nonce::new(payload.nonce))
    }

    /// Register a non-admin user with a previously fetched nonce.
    ///
    /// The nonce is consumed whatever the outcome.
    #[instrument(skip(self, nonce, password))]
    pub async fn register_with_nonce(
        &self,
        nonce: Nonce,
        username: &str,
        password: &str,
    ) -> Result<RegisteredUser, SynapseError> {
        let mac = registration_mac(
            nonce.value(),
            username,
            password,
            self.shared_secret.expose_secret(),
        )?;

        let request = RegisterRequest {
            nonce: nonce.value(),
            username,
            password,
            mac,
            admin: false,
        };

        let response = self
            .client
            .post(self.register_url())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            warn!(status = %status, body = %body, "Homeserver refused registration");
            return Err(classify_failure(status.as_u16(), &body));
        }

        let registered: RegisterResponse = serde_json::from_str(&body)
            .map_err(|e| SynapseError::MalformedResponse(format!("register response: {}", e)))?;

        debug!(user_id = %registered.user_id, "User registered");
        Ok(RegisteredUser {
            username: username.to_string(),
            user_id: registered.user_id,
        })
    }

    /// Run the full nonce + MAC handshake for one registration attempt.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<RegisteredUser, SynapseError> {
        let nonce = self.fetch_nonce().await?;
        self.register_with_nonce(nonce, username, password).await
    }
}

/// Map a non-200 register response onto an error.
pub fn classify_failure(status: u16, body: &str) -> SynapseError {
    let parsed: MatrixErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed.error.clone().unwrap_or_else(|| body.to_string());
    let lowered = message.to_ascii_lowercase();

    let user_in_use = parsed.errcode.as_deref() == Some(USER_IN_USE)
        || lowered.contains("already taken")
        || lowered.contains("already exists");

    match status {
        400 | 409 if user_in_use => SynapseError::UserExists(message),
        400 | 403 if lowered.contains("hmac") => SynapseError::WrongSharedSecret(message),
        _ => SynapseError::UnexpectedStatus {
            status,
            body: body.to_string(),
        },
    }
}
