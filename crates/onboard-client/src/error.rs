//! Error types for the onboarding API client

use thiserror::Error;

/// Error type for onboarding API operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// Non-2xx response from the server
    #[error("API error ({status_code}): {message}")]
    Api { status_code: u16, message: String },

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not have the expected shape
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Human-readable reason, suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Returns true if the request never produced a usable response
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Http(_) | ClientError::Json(_))
    }

    /// HTTP status code, if the server answered
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::Api { status_code, .. } => Some(*status_code),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
