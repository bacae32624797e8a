use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode, Url};

use crate::types::{CompletionRequest, CompletionResponse};

/// Upper bound on a completion response body.
pub const MAX_RESPONSE_BYTES: usize = 1024 * 1024;

#[derive(thiserror::Error, Debug)]
pub enum CompletionError {
    #[error("failed to encode completion request: {0}")]
    Encoding(#[source] serde_json::Error),
    #[error("completion service unreachable: {0}")]
    Unavailable(#[source] reqwest::Error),
    #[error("completion service responded with status {0}")]
    Rejected(StatusCode),
    #[error("failed to decode completion response: {0}")]
    Decoding(#[source] serde_json::Error),
    #[error("completion response exceeds {limit} bytes")]
    Oversized { limit: usize },
}

/// Anything that can turn a prompt and a token budget into completions.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError>;
}

/// Client for an Azure OpenAI completions deployment.
pub struct AzureOpenAiClient {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl AzureOpenAiClient {
    pub fn new(endpoint: Url, api_key: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl CompletionClient for AzureOpenAiClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError> {
        let body = serde_json::to_vec(request).map_err(CompletionError::Encoding)?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .bearer_auth(&self.api_key)
            .body(body)
            .send()
            .await
            .map_err(|e| CompletionError::Unavailable(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CompletionError::Rejected(status));
        }

        let bytes = read_body(response, MAX_RESPONSE_BYTES).await?;
        serde_json::from_slice(&bytes).map_err(CompletionError::Decoding)
    }
}

async fn read_body(
    mut response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, CompletionError> {
    if response.content_length().is_some_and(|len| len > limit as u64) {
        return Err(CompletionError::Oversized { limit });
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| CompletionError::Unavailable(e.without_url()))?
    {
        if body.len() + chunk.len() > limit {
            return Err(CompletionError::Oversized { limit });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
