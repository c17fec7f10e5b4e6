//! The homeserver as seen by the broker.

use async_trait::async_trait;
use synapse_admin_client::{RegisteredUser, SynapseAdminClient, SynapseError};

/// Something that can create a user via the admin registration handshake.
#[async_trait]
pub trait Homeserver: Send + Sync {
    /// Run one complete registration attempt, nonce included.
    async fn register(&self, username: &str, password: &str)
        -> Result<RegisteredUser, SynapseError>;
}

#[async_trait]
impl Homeserver for SynapseAdminClient {
    async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<RegisteredUser, SynapseError> {
        SynapseAdminClient::register(self, username, password).await
    }
}
