use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CompletionError;

/// Language-model completion capability. Used by the extractor and the
/// answer generator; implementations must not have side effects beyond the
/// remote call itself.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url,
            model,
            client,
        }
    }
}

#[async_trait]
impl CompletionModel for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(CompletionError::Status(response.status().as_u16()));
        }

        let body: OllamaResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Decode(e.to_string()))?;

        Ok(body.response)
    }
}
