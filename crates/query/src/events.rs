use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// One typed message in the query lifecycle stream. Serializes to the wire
/// shape the presentation layer consumes: `{"type": "log", ...}`.
///
/// A successful run emits `log*, matched_node, log*, context, log*, answer,
/// complete`; a failing run ends with a single `error` and nothing after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryEvent {
    Log {
        message: String,
    },
    MatchedNode {
        node_name: String,
        similarity_score: f32,
        low_confidence: bool,
    },
    Context {
        context: String,
    },
    Answer {
        answer: String,
    },
    Complete,
    Error {
        message: String,
    },
}

impl QueryEvent {
    pub fn log(message: impl Into<String>) -> Self {
        QueryEvent::Log {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        QueryEvent::Error {
            message: message.into(),
        }
    }

    /// Terminal events close the stream; nothing may follow them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, QueryEvent::Complete | QueryEvent::Error { .. })
    }
}

/// Where the pipeline reports progress. `emit` returns false once the
/// consumer is gone, which the pipeline treats as cancellation.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: QueryEvent) -> bool;
}

/// Forwards events into a bounded channel, e.g. toward an SSE response.
pub struct ChannelSink {
    tx: mpsc::Sender<QueryEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<QueryEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn emit(&self, event: QueryEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }
}

/// Swallows events. Used by the request/response path, which reads the
/// milestone values from the terminal aggregate instead.
pub struct NullSink;

#[async_trait]
impl EventSink for NullSink {
    async fn emit(&self, _event: QueryEvent) -> bool {
        true
    }
}
