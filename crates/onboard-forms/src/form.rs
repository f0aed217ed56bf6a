//! Onboarding form coordinator
//!
//! Owns the field values, the displayed per-field errors and the corporation
//! number checker. Field rules run on blur, the corporation number is also
//! checked remotely on blur, and `submit` re-validates everything before
//! sending the profile.

use std::sync::Arc;

use onboard_client::{Client, ClientConfig, ClientError};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::backend::{CorpNumberVerifier, ProfileSubmitter};
use crate::corp_check::{CorpCheckState, CorpCheckStatus, CorpNumberChecker};
use crate::schema::{validate, validate_field, Field, FormFields, ValidationResult};

/// Reported after a successful submission
pub const SUBMIT_SUCCESS: &str = "Profile submitted successfully.";

/// Reason used when a failed submission carries no message
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Corporation number error when the checker has no message of its own
pub const CORPORATION_NUMBER_FALLBACK: &str = "Invalid Corporation Number";

/// Helper text while the corporation number is being checked
pub const VALIDATING: &str = "Validating…";

/// Result of [`OnboardingForm::submit`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SubmitOutcome {
    /// Profile accepted by the backend
    Success { message: String },
    /// Backend refused the profile or could not be reached
    Failure { reason: String },
    /// Field errors or a failed corporation number check; nothing was sent
    Invalid,
    /// A submission is already in flight
    Busy,
}

/// Form notifications for UI binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FormEvent {
    Submitted { message: String },
    SubmissionFailed { reason: String },
}

#[derive(Debug, Default)]
struct FormState {
    fields: FormFields,
    errors: ValidationResult,
    submitting: bool,
}

/// Clears the submitting flag even if the submit future is dropped
struct SubmittingGuard<'a>(&'a RwLock<FormState>);

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        self.0.write().submitting = false;
    }
}

/// Onboarding form
pub struct OnboardingForm<V: ?Sized, S: ?Sized> {
    checker: CorpNumberChecker<V>,
    submitter: Arc<S>,
    state: RwLock<FormState>,
    event_tx: broadcast::Sender<FormEvent>,
}

impl OnboardingForm<Client, Client> {
    /// Form backed by one API client for both checks and submission
    pub fn with_client(client: Client) -> Self {
        let client = Arc::new(client);
        Self::new(client.clone(), client)
    }

    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        Ok(Self::with_client(Client::with_config(config)?))
    }
}

impl<V, S> OnboardingForm<V, S>
where
    V: CorpNumberVerifier + ?Sized,
    S: ProfileSubmitter + ?Sized,
{
    pub fn new(verifier: Arc<V>, submitter: Arc<S>) -> Self {
        let (event_tx, _) = broadcast::channel(16);
        Self {
            checker: CorpNumberChecker::new(verifier),
            submitter,
            state: RwLock::new(FormState::default()),
            event_tx,
        }
    }

    /// Subscribe to submission notifications
    pub fn subscribe(&self) -> broadcast::Receiver<FormEvent> {
        self.event_tx.subscribe()
    }

    pub fn fields(&self) -> FormFields {
        self.state.read().fields.clone()
    }

    pub fn value(&self, field: Field) -> String {
        self.state.read().fields.get(field).to_string()
    }

    /// Store a new value. Editing the corporation number invalidates the
    /// previous check.
    pub fn set_field(&self, field: Field, value: impl Into<String>) {
        {
            let mut state = self.state.write();
            state.fields.set(field, value);
            if field == Field::CorporationNumber {
                state.errors.clear(field);
            }
        }
        if field == Field::CorporationNumber {
            self.checker.reset();
        }
    }

    /// Field lost focus: apply its rule, and check the corporation number remotely
    pub async fn blur(&self, field: Field) {
        let value = {
            let mut state = self.state.write();
            let value = state.fields.get(field).to_string();
            match validate_field(field, &value) {
                Some(message) => state.errors.set(field, message),
                None => state.errors.clear(field),
            }
            value
        };

        if field == Field::CorporationNumber {
            self.verify_corporation_number(&value).await;
        }
    }

    /// Displayed errors
    pub fn errors(&self) -> ValidationResult {
        self.state.read().errors.clone()
    }

    /// Message shown under `field`, including the checker's failure for the
    /// corporation number
    pub fn field_error(&self, field: Field) -> Option<String> {
        if let Some(message) = self.state.read().errors.get(field) {
            return Some(message.to_string());
        }
        if field != Field::CorporationNumber {
            return None;
        }
        let corp = self.checker.state();
        corp.is_failure().then(|| {
            corp.message()
                .unwrap_or(CORPORATION_NUMBER_FALLBACK)
                .to_string()
        })
    }

    pub fn helper_text(&self, field: Field) -> Option<&'static str> {
        (field == Field::CorporationNumber && self.checker.status() == CorpCheckStatus::Checking)
            .then_some(VALIDATING)
    }

    pub fn corp_state(&self) -> CorpCheckState {
        self.checker.state()
    }

    pub fn corp_watch(&self) -> watch::Receiver<CorpCheckState> {
        self.checker.watch()
    }

    /// All current values pass their rules and no error is displayed
    pub fn is_valid(&self) -> bool {
        let state = self.state.read();
        state.errors.is_empty() && validate(&state.fields).is_valid()
    }

    pub fn is_submitting(&self) -> bool {
        self.state.read().submitting
    }

    /// Submit-eligibility: valid fields, idle submission, accepted corporation number
    pub fn can_submit(&self) -> bool {
        self.is_valid() && !self.is_submitting() && self.checker.status() == CorpCheckStatus::Valid
    }

    /// Validate everything, re-check the corporation number, then submit.
    ///
    /// Never retried; the caller triggers another submit if needed.
    pub async fn submit(&self) -> SubmitOutcome {
        {
            let mut state = self.state.write();
            if state.submitting {
                debug!("submit ignored: submission already in flight");
                return SubmitOutcome::Busy;
            }
            state.submitting = true;
        }
        let guard = SubmittingGuard(&self.state);

        let outcome = self.run_submit().await;
        drop(guard);

        match &outcome {
            SubmitOutcome::Success { message } => {
                self.reset_form();
                let _ = self.event_tx.send(FormEvent::Submitted {
                    message: message.clone(),
                });
            }
            SubmitOutcome::Failure { reason } => {
                let _ = self.event_tx.send(FormEvent::SubmissionFailed {
                    reason: reason.clone(),
                });
            }
            SubmitOutcome::Invalid | SubmitOutcome::Busy => {}
        }
        outcome
    }

    /// Discard values, errors and the corporation number check
    pub fn reset_form(&self) {
        {
            let mut state = self.state.write();
            state.fields = FormFields::default();
            state.errors = ValidationResult::default();
        }
        self.checker.reset();
    }

    async fn run_submit(&self) -> SubmitOutcome {
        let fields = {
            let mut state = self.state.write();
            state.errors = validate(&state.fields);
            if !state.errors.is_valid() {
                debug!(errors = state.errors.len(), "submit blocked by field errors");
                return SubmitOutcome::Invalid;
            }
            state.fields.clone()
        };

        if !self
            .verify_corporation_number(&fields.corporation_number)
            .await
        {
            debug!(
                corporation_number = %fields.corporation_number,
                "submit blocked by corporation number check"
            );
            return SubmitOutcome::Invalid;
        }

        match self.submitter.submit(&fields.to_profile()).await {
            Ok(()) => {
                info!(corporation_number = %fields.corporation_number, "profile submitted");
                SubmitOutcome::Success {
                    message: SUBMIT_SUCCESS.into(),
                }
            }
            Err(err) => {
                let reason = match err.user_message() {
                    reason if reason.is_empty() => UNKNOWN_ERROR.to_string(),
                    reason => reason,
                };
                warn!(%reason, transport = err.is_transport(), "profile submission failed");
                SubmitOutcome::Failure { reason }
            }
        }
    }

    /// Run the checker and mirror its outcome into the corporation number slot
    async fn verify_corporation_number(&self, number: &str) -> bool {
        let ok = self.checker.check(number).await;

        let mut state = self.state.write();
        if state.fields.corporation_number != number {
            // edited while the check was running
            return false;
        }
        if ok {
            state.errors.clear(Field::CorporationNumber);
        } else {
            let corp = self.checker.state();
            if corp.is_failure() {
                let message = corp.message().unwrap_or(CORPORATION_NUMBER_FALLBACK);
                state.errors.set(Field::CorporationNumber, message);
            }
        }
        ok
    }
}
