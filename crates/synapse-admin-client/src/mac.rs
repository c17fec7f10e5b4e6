//! Registration MAC as defined by the Synapse shared-secret registration API.

use crate::error::SynapseError;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Compute the lower-case hex HMAC-SHA1 over
/// `nonce \0 username \0 password \0 "notadmin"` keyed by the shared secret.
pub fn registration_mac(
    nonce: &str,
    username: &str,
    password: &str,
    shared_secret: &str,
) -> Result<String, SynapseError> {
    let mut mac =
        HmacSha1::new_from_slice(shared_secret.as_bytes()).map_err(|_| SynapseError::InvalidKey)?;

    mac.update(nonce.as_bytes());
    mac.update(b"\x00");
    mac.update(username.as_bytes());
    mac.update(b"\x00");
    mac.update(password.as_bytes());
    mac.update(b"\x00");
    mac.update(b"notadmin");

    Ok(hex::encode(mac.finalize().into_bytes()))
}
