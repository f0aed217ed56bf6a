//! Backend seams used by the checker and the form

use onboard_client::{Client, ClientError, CorpCheckResponse, ProfileDetails};

/// Remote corporation number verification
#[async_trait::async_trait]
pub trait CorpNumberVerifier: Send + Sync {
    async fn verify(&self, number: &str) -> Result<CorpCheckResponse, ClientError>;
}

/// Profile submission endpoint
#[async_trait::async_trait]
pub trait ProfileSubmitter: Send + Sync {
    async fn submit(&self, details: &ProfileDetails) -> Result<(), ClientError>;
}

#[async_trait::async_trait]
impl CorpNumberVerifier for Client {
    async fn verify(&self, number: &str) -> Result<CorpCheckResponse, ClientError> {
        self.check_corporation_number(number).await
    }
}

#[async_trait::async_trait]
impl ProfileSubmitter for Client {
    async fn submit(&self, details: &ProfileDetails) -> Result<(), ClientError> {
        self.submit_profile(details).await
    }
}
