use std::sync::Arc;
use tracing::{info, warn};

use crate::embeddings::EmbeddingModel;
use crate::store::{GraphStore, StoreError};

/// Backfills embeddings for offense nodes that have none, or whose stored
/// vector came from a different embedding model version.
pub struct EmbeddingIndexBuilder {
    store: Arc<dyn GraphStore>,
    embedder: Arc<dyn EmbeddingModel>,
}

impl EmbeddingIndexBuilder {
    pub fn new(store: Arc<dyn GraphStore>, embedder: Arc<dyn EmbeddingModel>) -> Self {
        Self { store, embedder }
    }

    /// Embed every offense missing a current-version vector. Per-offense
    /// failures are logged and skipped; returns the number written.
    pub async fn embed_missing(&self) -> Result<usize, StoreError> {
        let version = self.embedder.model_version();
        let missing = self.store.offenses_missing_embedding(version).await?;

        if missing.is_empty() {
            return Ok(0);
        }

        info!(count = missing.len(), version, "embedding offenses");

        let mut written = 0;
        for offense in &missing {
            let text = match self.store.offense_context(offense).await? {
                Some(context) => context.offense,
                None => offense.clone(),
            };

            let vector = match self.embedder.embed(&text).await {
                Ok(vector) => vector,
                Err(e) => {
                    warn!(offense = %offense, error = %e, "embedding failed, skipping offense");
                    continue;
                }
            };

            match self.store.store_embedding(offense, version, &vector).await {
                Ok(()) => written += 1,
                Err(e) => {
                    warn!(offense = %offense, error = %e, "failed to persist embedding");
                }
            }
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::embeddings::EmbeddingError;
    use crate::memory_store::MemoryStore;
    use extract::ExtractionRecord;

    struct HashEmbedder {
        version: String,
    }

    #[async_trait]
    impl EmbeddingModel for HashEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            let sum = text.bytes().map(|b| b as f32).sum::<f32>();
            Ok(vec![sum, 1.0])
        }

        fn model_version(&self) -> &str {
            &self.version
        }
    }

    fn record(offense: &str) -> ExtractionRecord {
        ExtractionRecord {
            offense: offense.into(),
            chapter: "XVII".into(),
            section: "303".into(),
            punishment: "Three years".into(),
            provenance: None,
        }
    }

    #[tokio::test]
    async fn backfills_only_missing_embeddings() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_record(&record("Theft")).await.unwrap();
        store.upsert_record(&record("Robbery")).await.unwrap();
        store.store_embedding("theft", "v1", &[1.0, 0.0]).await.unwrap();

        let builder = EmbeddingIndexBuilder::new(
            store.clone(),
            Arc::new(HashEmbedder {
                version: "v1".into(),
            }),
        );

        assert_eq!(builder.embed_missing().await.unwrap(), 1);
        assert_eq!(store.offense_embeddings("v1").await.unwrap().len(), 2);

        // Idempotent: nothing left to embed.
        assert_eq!(builder.embed_missing().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn model_version_change_triggers_recomputation() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_record(&record("Theft")).await.unwrap();
        store.store_embedding("theft", "v1", &[1.0, 0.0]).await.unwrap();

        let builder = EmbeddingIndexBuilder::new(
            store.clone(),
            Arc::new(HashEmbedder {
                version: "v2".into(),
            }),
        );

        assert_eq!(builder.embed_missing().await.unwrap(), 1);
        assert_eq!(store.offense_embeddings("v2").await.unwrap().len(), 1);
        assert!(store.offense_embeddings("v1").await.unwrap().is_empty());
    }
}
