use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("embedding provider returned status {0}")]
    Status(u16),
    #[error("embedding response could not be decoded: {0}")]
    Decode(String),
}

/// Embedding capability, version-pinned: the same model version must embed
/// both the offense index and incoming queries.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Identifier persisted next to every vector this model produces.
    fn model_version(&self) -> &str;
}

#[derive(Clone)]
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    prompt: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
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
impl EmbeddingModel for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/api/embeddings", self.base_url);

        let request = EmbeddingRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(EmbeddingError::Status(response.status().as_u16()));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Decode(e.to_string()))?;

        if body.embedding.is_empty() {
            return Err(EmbeddingError::Decode("empty embedding vector".into()));
        }

        Ok(body.embedding)
    }

    fn model_version(&self) -> &str {
        &self.model
    }
}
