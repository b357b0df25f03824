use thiserror::Error;

/// Failure of the completion capability itself (network, provider, decode).
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("completion provider returned status {0}")]
    Status(u16),
    #[error("completion response could not be decoded: {0}")]
    Decode(String),
}

/// The model's output did not contain a usable structured payload.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no JSON payload found in model output")]
    NoPayload,
    #[error("JSON payload is not an array or object of records: {0}")]
    UnexpectedShape(String),
    #[error("invalid JSON in model output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-chunk extraction failure. Parse trouble is absorbed inside the
/// extractor (skip and log); only capability failures escape.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Completion(#[from] CompletionError),
}
