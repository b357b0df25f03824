use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use extract::ExtractionRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Connectivity and other retryable failures.
    #[error("transient store error: {0}")]
    Transient(String),
    /// Schema/constraint violations and anything a retry will not fix.
    #[error("permanent store error: {0}")]
    Permanent(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphStats {
    pub offenses: usize,
    pub chapters: usize,
    pub sections: usize,
    pub punishments: usize,
    pub edges: usize,
}

/// The legal context reachable from one offense node.
#[derive(Debug, Clone, PartialEq)]
pub struct OffenseContext {
    pub offense: String,
    pub chapter: Option<String>,
    pub section: Option<String>,
    pub punishment: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OffenseEmbedding {
    pub offense: String,
    pub vector: Vec<f32>,
}

/// Graph storage capability: idempotent upserts keyed by entity identity,
/// embedding persistence tagged with the producing model version, and the
/// read surface the query pipeline needs.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Merge the record's offense, chapter, section and punishment nodes and
    /// their edges as one atomic operation. Re-running the same record must
    /// not grow the graph.
    async fn upsert_record(&self, record: &ExtractionRecord) -> Result<(), StoreError>;

    /// Offense keys with no embedding tagged with `model_version`.
    async fn offenses_missing_embedding(
        &self,
        model_version: &str,
    ) -> Result<Vec<String>, StoreError>;

    async fn store_embedding(
        &self,
        offense: &str,
        model_version: &str,
        vector: &[f32],
    ) -> Result<(), StoreError>;

    /// Every offense embedding produced by `model_version`. Stale versions
    /// are never returned, so queries cannot compare incompatible vectors.
    async fn offense_embeddings(
        &self,
        model_version: &str,
    ) -> Result<Vec<OffenseEmbedding>, StoreError>;

    async fn offense_context(&self, offense: &str) -> Result<Option<OffenseContext>, StoreError>;

    async fn stats(&self) -> Result<GraphStats, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
