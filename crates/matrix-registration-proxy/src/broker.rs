//! Registration broker: abuse gate, validation, homeserver call, outcome.

use crate::abuse::{AbuseTracker, Actor, Verdict};
use crate::error::{RegistrationError, ValidationError};
use crate::homeserver::Homeserver;
use crate::registration::{RegistrationOutcome, RegistrationRequest};
use crate::validation::Validator;
use std::sync::Arc;
use synapse_admin_client::RegisteredUser;
use tracing::{debug, error, info, instrument, warn};

/// Orchestrates one registration request end to end.
pub struct RegistrationBroker {
    validator: Validator,
    tracker: Arc<AbuseTracker>,
    homeserver: Arc<dyn Homeserver>,
    count_user_exists: bool,
}

impl RegistrationBroker {
    pub fn new(
        validator: Validator,
        tracker: Arc<AbuseTracker>,
        homeserver: Arc<dyn Homeserver>,
        count_user_exists: bool,
    ) -> Self {
        Self {
            validator,
            tracker,
            homeserver,
            count_user_exists,
        }
    }

    pub fn tracker(&self) -> &Arc<AbuseTracker> {
        &self.tracker
    }

    /// Handle a submission and classify the result.
    #[instrument(skip(self, actor, request), fields(actor = %actor, username = %request.username))]
    pub async fn register(
        &self,
        actor: &Actor,
        request: RegistrationRequest,
    ) -> RegistrationOutcome {
        match self.try_register(actor, request).await {
            Ok(user) => {
                info!(user_id = %user.user_id, "User registered");
                RegistrationOutcome::Registered {
                    username: user.username,
                }
            }
            Err(err) => self.resolve(actor, err),
        }
    }

    async fn try_register(
        &self,
        actor: &Actor,
        request: RegistrationRequest,
    ) -> Result<RegisteredUser, RegistrationError> {
        if let Verdict::Blocked { until } = self.tracker.check(actor) {
            return Err(RegistrationError::Blocked(until));
        }

        let valid = self.validator.validate(&request)?;
        drop(request);

        let user = self
            .homeserver
            .register(&valid.username, &valid.password)
            .await?;

        self.tracker.record_success(actor);
        Ok(user)
    }

    /// Record the failure if it counts, log it, and reduce it to an outcome.
    fn resolve(&self, actor: &Actor, err: RegistrationError) -> RegistrationOutcome {
        if self.counts_as_failure(&err) {
            if let Verdict::Blocked { until } = self.tracker.record_failure(actor) {
                debug!(until = %until, "Failure pushed actor into a block");
            }
        }

        match &err {
            RegistrationError::Validation(e) => debug!(reason = %e, "Submission rejected"),
            RegistrationError::Blocked(until) => {
                warn!(until = %until, "Rejected submission from blocked actor")
            }
            RegistrationError::UpstreamAuth(e) => {
                error!(error = %e, "Homeserver rejected the registration MAC; check MATRIX_SHARED_SECRET")
            }
            RegistrationError::UpstreamConflict(_) => info!("Username already taken"),
            RegistrationError::UpstreamUnavailable(e) | RegistrationError::Protocol(e) => {
                error!(error = %e, "Registration failed")
            }
        }

        err.outcome()
    }

    fn counts_as_failure(&self, err: &RegistrationError) -> bool {
        match err {
            RegistrationError::Validation(ValidationError::InvalidToken) => true,
            RegistrationError::Validation(
                ValidationError::InvalidUsername
                | ValidationError::PasswordTooShort(_)
                | ValidationError::PasswordWhitespace
                | ValidationError::PasswordMismatch,
            ) => false,
            RegistrationError::Blocked(_) => false,
            RegistrationError::UpstreamAuth(_) => true,
            RegistrationError::UpstreamConflict(_) => self.count_user_exists,
            RegistrationError::UpstreamUnavailable(_) | RegistrationError::Protocol(_) => true,
        }
    }
}
