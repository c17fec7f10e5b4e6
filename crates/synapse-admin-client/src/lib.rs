//! Client for the Synapse shared-secret admin registration API.
//!
//! Registration is a two-step handshake: fetch a single-use nonce, then post
//! the user details together with an HMAC-SHA1 over them keyed by the
//! homeserver's `registration_shared_secret`.

mod client;
mod error;
mod mac;
mod types;

pub use client::{classify_failure, SynapseAdminClient};
pub use error::SynapseError;
pub use mac::registration_mac;
pub use types::*;
