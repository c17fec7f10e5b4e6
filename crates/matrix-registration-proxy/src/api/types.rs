//! API response types. The request body is [`crate::RegistrationRequest`]
//! and the registration response is [`crate::RegistrationOutcome`].

use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub tracked_actors: usize,
}
