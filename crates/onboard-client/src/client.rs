//! HTTP client

use std::sync::Arc;

use reqwest::header;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::types::{CorpCheckResponse, ProfileDetails};
use crate::{ClientError, Result};

/// Message carried by a non-2xx corporation number check
pub const CHECK_FAILED_MESSAGE: &str = "Validation failed. Try again.";

/// Message used when a failed submission carries no usable reason
pub const SUBMISSION_FAILED_MESSAGE: &str = "Submission failed";

/// Onboarding API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    base_url: Url,
    http: reqwest::Client,
}

impl Client {
    /// Create a client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "base url cannot carry a path: {}",
                config.base_url
            )));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            inner: Arc::new(ClientInner { base_url, http }),
        })
    }

    /// Ask the service whether `number` is a registered corporation number.
    ///
    /// A non-2xx answer is an [`ClientError::Api`] carrying
    /// [`CHECK_FAILED_MESSAGE`]; an unreadable body is [`ClientError::Json`].
    pub async fn check_corporation_number(&self, number: &str) -> Result<CorpCheckResponse> {
        let url = self.endpoint(&["corporation-number", number])?;
        debug!(corporation_number = %number, "checking corporation number");

        let response = self.inner.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(
                corporation_number = %number,
                status = status.as_u16(),
                "corporation number check rejected by server"
            );
            return Err(ClientError::Api {
                status_code: status.as_u16(),
                message: CHECK_FAILED_MESSAGE.into(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Submit the completed profile. Any 2xx answer is a success.
    pub async fn submit_profile(&self, details: &ProfileDetails) -> Result<()> {
        let url = self.endpoint(&["profile-details"])?;
        debug!(
            corporation_number = %details.corporation_number,
            "submitting profile details"
        );

        let response = self.inner.http.post(url).json(details).send().await?;
        let status = response.status();
        if status.is_success() {
            info!(status = status.as_u16(), "profile details accepted");
            return Ok(());
        }

        #[derive(Deserialize)]
        struct ErrorBody {
            message: Option<String>,
        }

        let body = response.bytes().await.unwrap_or_default();
        let message = serde_json::from_slice::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| SUBMISSION_FAILED_MESSAGE.to_string());

        warn!(status = status.as_u16(), %message, "profile submission rejected");
        Err(ClientError::Api {
            status_code: status.as_u16(),
            message,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Config("base url cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}
