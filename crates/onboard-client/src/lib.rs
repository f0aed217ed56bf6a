//! Onboarding API client
//!
//! Thin async client for the onboarding backend. Two operations:
//!
//! - `GET {base}/corporation-number/{number}`: remote corporation number check
//! - `POST {base}/profile-details`: profile submission
//!
//! # Example
//!
//! ```rust,no_run
//! use onboard_client::{Client, ClientConfig, ProfileDetails};
//!
//! # async fn run() -> onboard_client::Result<()> {
//! let client = Client::with_config(ClientConfig::default())?;
//!
//! let check = client.check_corporation_number("123456789").await?;
//! if check.is_valid() {
//!     client
//!         .submit_profile(&ProfileDetails {
//!             first_name: "Jane".into(),
//!             last_name: "Doe".into(),
//!             phone: "+14165551234".into(),
//!             corporation_number: "123456789".into(),
//!         })
//!         .await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::Client;
pub use config::ClientConfig;
pub use error::ClientError;
pub use types::{CorpCheckResponse, ProfileDetails};

/// Client version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type alias for onboarding API operations
pub type Result<T> = std::result::Result<T, ClientError>;
