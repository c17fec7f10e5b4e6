//! Matrix Registration Proxy - token-gated self-registration for Synapse.
//!
//! This proxy sits in front of a Synapse homeserver to:
//! - Let users with an operator-issued token create accounts
//! - Keep the homeserver's registration shared secret server-side
//! - Block actors that repeatedly fail (bad tokens, upstream errors)

pub mod abuse;
pub mod api;
pub mod broker;
pub mod config;
pub mod error;
pub mod homeserver;
pub mod registration;
pub mod validation;

pub use abuse::{AbuseTracker, Actor, AttemptRecord, Verdict};
pub use broker::RegistrationBroker;
pub use config::Config;
pub use error::{ProxyError, RegistrationError, ValidationError};
pub use homeserver::Homeserver;
pub use registration::{RegistrationOutcome, RegistrationRequest};
pub use validation::Validator;
