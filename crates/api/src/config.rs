use serde::{Deserialize, Serialize};
use std::env;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub neo4j: Neo4jConfig,
    pub models: ModelConfig,
    pub query: QueryTuning,
    pub indexing: IndexingConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neo4jConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub base_url: String,
    pub completion_model: String,
    pub embedding_model: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryTuning {
    pub similarity_threshold: f32,
    pub max_context_chars: usize,
    pub max_query_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    pub max_concurrent_extractions: usize,
    pub chunk_max_chars: usize,
    pub chunk_overlap_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            neo4j: Neo4jConfig {
                uri: "bolt://localhost:7687".to_string(),
                user: "neo4j".to_string(),
                password: "neo4j".to_string(),
            },
            models: ModelConfig {
                base_url: "http://localhost:11434".to_string(),
                completion_model: "llama3".to_string(),
                embedding_model: "nomic-embed-text".to_string(),
                request_timeout_secs: 60,
            },
            query: QueryTuning {
                similarity_threshold: 0.35,
                max_context_chars: 4096,
                max_query_chars: 2000,
            },
            indexing: IndexingConfig {
                max_concurrent_extractions: 4,
                chunk_max_chars: 3000,
                chunk_overlap_chars: 300,
            },
            retry: RetryConfig {
                max_retries: 3,
                initial_backoff_ms: 250,
                max_backoff_ms: 5000,
            },
        }
    }
}

impl AppConfig {
    /// Environment variables override the defaults; `.env` is honored via
    /// dotenvy before this runs.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            server: ServerConfig {
                host: env_or("SERVER_HOST", defaults.server.host),
                port: parse_or("SERVER_PORT", defaults.server.port),
            },
            neo4j: Neo4jConfig {
                uri: env_or("NEO4J_URI", defaults.neo4j.uri),
                user: env_or("NEO4J_USERNAME", defaults.neo4j.user),
                password: env_or("NEO4J_PASSWORD", defaults.neo4j.password),
            },
            models: ModelConfig {
                base_url: env_or("OLLAMA_BASE_URL", defaults.models.base_url),
                completion_model: env_or("COMPLETION_MODEL", defaults.models.completion_model),
                embedding_model: env_or("EMBEDDING_MODEL", defaults.models.embedding_model),
                request_timeout_secs: parse_or(
                    "MODEL_TIMEOUT_SECS",
                    defaults.models.request_timeout_secs,
                ),
            },
            query: QueryTuning {
                similarity_threshold: parse_or(
                    "SIMILARITY_THRESHOLD",
                    defaults.query.similarity_threshold,
                ),
                max_context_chars: parse_or("MAX_CONTEXT_CHARS", defaults.query.max_context_chars),
                max_query_chars: parse_or("MAX_QUERY_CHARS", defaults.query.max_query_chars),
            },
            indexing: IndexingConfig {
                max_concurrent_extractions: parse_or(
                    "MAX_CONCURRENT_EXTRACTIONS",
                    defaults.indexing.max_concurrent_extractions,
                ),
                chunk_max_chars: parse_or("CHUNK_MAX_CHARS", defaults.indexing.chunk_max_chars),
                chunk_overlap_chars: parse_or(
                    "CHUNK_OVERLAP_CHARS",
                    defaults.indexing.chunk_overlap_chars,
                ),
            },
            retry: RetryConfig {
                max_retries: parse_or("STORE_MAX_RETRIES", defaults.retry.max_retries),
                initial_backoff_ms: parse_or(
                    "STORE_INITIAL_BACKOFF_MS",
                    defaults.retry.initial_backoff_ms,
                ),
                max_backoff_ms: parse_or("STORE_MAX_BACKOFF_MS", defaults.retry.max_backoff_ms),
            },
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

fn parse_or<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "unparseable env var, using default");
            default
        }),
        Err(_) => default,
    }
}
