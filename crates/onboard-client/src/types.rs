//! Wire types

use serde::{Deserialize, Serialize};

/// Corporation number check result.
///
/// The server answers either `{ corporationNumber, valid: true }` or
/// `{ valid: false, message? }`. Missing `valid` is treated as `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpCheckResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corporation_number: Option<String>,
    #[serde(default)]
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CorpCheckResponse {
    /// Accepted response for `number`
    pub fn accepted(number: impl Into<String>) -> Self {
        Self {
            corporation_number: Some(number.into()),
            valid: true,
            message: None,
        }
    }

    /// Rejected response with an optional server message
    pub fn rejected(message: Option<String>) -> Self {
        Self {
            corporation_number: None,
            valid: false,
            message,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Server-provided rejection message. Empty strings count as absent.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.is_empty())
    }
}

/// Profile submission payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDetails {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub corporation_number: String,
}
