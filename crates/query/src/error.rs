use thiserror::Error;

use extract::CompletionError;
use index::{EmbeddingError, StoreError};

/// Fatal retrieval failures: nothing to search, or no way to embed the
/// query. A weak best match is NOT an error; it is flagged, not failed.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("no offense embeddings in the index")]
    EmptyIndex,
    #[error("failed to embed query: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("graph store error during retrieval: {0}")]
    Store(#[from] StoreError),
}

/// Provider failure while generating the final answer. A model that
/// *declines* to answer still returns text and is not this error.
#[derive(Debug, Error)]
#[error("answer generation failed: {0}")]
pub struct GenerationError(#[from] pub CompletionError);

/// Anything that aborts one query. Only that query dies; the serving
/// process carries on.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query must not be empty")]
    EmptyQuery,
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("graph store error: {0}")]
    Store(#[from] StoreError),
    #[error("query abandoned by caller")]
    Cancelled,
}
