//! Onboarding form
//!
//! Collects first name, last name, phone number and corporation number,
//! validates them locally and against the corporation number service, and
//! submits the completed profile.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        OnboardingForm                         │
//! │   field values · displayed errors · submit sequencing         │
//! │                                                               │
//! │  ┌──────────────┐   ┌─────────────────────┐                   │
//! │  │    schema    │   │  CorpNumberChecker  │                   │
//! │  │ (pure rules) │   │ (generation + token)│                   │
//! │  └──────────────┘   └──────────┬──────────┘                   │
//! │                                │                              │
//! │              CorpNumberVerifier│      ProfileSubmitter        │
//! └────────────────────────────────┼──────────────┼───────────────┘
//!                                  ▼              ▼
//!                        onboard_client::Client (HTTP)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use onboard_client::ClientConfig;
//! use onboard_forms::{Field, OnboardingForm, SubmitOutcome};
//!
//! # async fn run() -> onboard_client::Result<()> {
//! let form = OnboardingForm::from_config(ClientConfig::default())?;
//! form.set_field(Field::FirstName, "Jane");
//! form.set_field(Field::LastName, "Doe");
//! form.set_field(Field::Phone, "+14165551234");
//! form.set_field(Field::CorporationNumber, "123456789");
//! form.blur(Field::CorporationNumber).await;
//!
//! match form.submit().await {
//!     SubmitOutcome::Success { message } => println!("{message}"),
//!     SubmitOutcome::Failure { reason } => eprintln!("Submission failed: {reason}"),
//!     SubmitOutcome::Invalid | SubmitOutcome::Busy => {}
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod corp_check;
pub mod form;
pub mod schema;

pub use backend::{CorpNumberVerifier, ProfileSubmitter};
pub use corp_check::{CorpCheckState, CorpCheckStatus, CorpNumberChecker};
pub use form::{FormEvent, OnboardingForm, SubmitOutcome};
pub use schema::{validate, validate_field, Field, FormFields, ValidationResult};
