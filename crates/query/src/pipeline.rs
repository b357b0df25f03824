use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use extract::CompletionModel;
use index::{EmbeddingModel, GraphStore};

use crate::answer::AnswerGenerator;
use crate::context::ContextAssembler;
use crate::error::QueryError;
use crate::events::{ChannelSink, EventSink, NullSink, QueryEvent};
use crate::resolver::QueryResolver;

#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Best-match scores below this are flagged low confidence.
    pub similarity_threshold: f32,
    pub max_context_chars: usize,
    pub max_query_chars: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.35,
            max_context_chars: 4096,
            max_query_chars: 2000,
        }
    }
}

/// Terminal aggregate of one query: the same content the event stream
/// carries, folded into a single value.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub answer: String,
    pub matched_node: String,
    pub similarity_score: f32,
    pub low_confidence: bool,
    pub context: String,
}

/// One query lifecycle: resolve, assemble context, generate answer.
/// A single event-producing driver is consumed two ways (forwarded
/// incrementally over a channel, or run with a null sink and read from the
/// returned aggregate), so event content has one source of truth.
#[derive(Clone)]
pub struct QueryPipeline {
    resolver: QueryResolver,
    assembler: ContextAssembler,
    generator: AnswerGenerator,
    max_query_chars: usize,
}

impl QueryPipeline {
    pub fn new(
        store: Arc<dyn GraphStore>,
        embedder: Arc<dyn EmbeddingModel>,
        llm: Arc<dyn CompletionModel>,
        config: QueryConfig,
    ) -> Self {
        Self {
            resolver: QueryResolver::new(store.clone(), embedder, config.similarity_threshold),
            assembler: ContextAssembler::new(store, config.max_context_chars),
            generator: AnswerGenerator::new(llm),
            max_query_chars: config.max_query_chars,
        }
    }

    /// Request/response consumption: milestones come back in the aggregate.
    pub async fn run_collected(&self, query: &str) -> Result<QueryOutcome, QueryError> {
        self.drive(query, &NullSink).await
    }

    /// Streaming consumption. The returned receiver yields the lifecycle
    /// events in order and always ends with `complete` or `error`; dropping
    /// it abandons the query at the next suspension point.
    pub fn stream(&self, query: String) -> mpsc::Receiver<QueryEvent> {
        let (tx, rx) = mpsc::channel(32);
        let pipeline = self.clone();

        tokio::spawn(async move {
            let sink = ChannelSink::new(tx);
            match pipeline.drive(&query, &sink).await {
                Ok(_) => {
                    sink.emit(QueryEvent::Complete).await;
                }
                Err(QueryError::Cancelled) => {
                    debug!("query stream abandoned by caller");
                }
                Err(e) => {
                    sink.emit(QueryEvent::error(e.to_string())).await;
                }
            }
        });

        rx
    }

    async fn drive(
        &self,
        query: &str,
        sink: &dyn EventSink,
    ) -> Result<QueryOutcome, QueryError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(QueryError::EmptyQuery);
        }
        let query = bounded(query, self.max_query_chars);

        emit(sink, QueryEvent::log("Searching knowledge graph...")).await?;

        let matched = self.resolver.resolve(&query).await?;

        emit(
            sink,
            QueryEvent::log(format!(
                "Found: {} ({:.1}% match)",
                matched.offense,
                matched.score * 100.0
            )),
        )
        .await?;
        if matched.low_confidence {
            emit(
                sink,
                QueryEvent::log("Best match is below the confidence threshold; treat as tentative."),
            )
            .await?;
        }
        emit(
            sink,
            QueryEvent::MatchedNode {
                node_name: matched.offense.clone(),
                similarity_score: matched.score,
                low_confidence: matched.low_confidence,
            },
        )
        .await?;

        emit(sink, QueryEvent::log("Retrieving legal context...")).await?;

        let context = self.assembler.assemble(&matched.offense).await?;

        emit(
            sink,
            QueryEvent::Context {
                context: context.clone(),
            },
        )
        .await?;

        emit(sink, QueryEvent::log("Generating interpretation...")).await?;

        let answer = self
            .generator
            .generate(&query, &matched.offense, &context)
            .await?;

        emit(
            sink,
            QueryEvent::Answer {
                answer: answer.clone(),
            },
        )
        .await?;

        Ok(QueryOutcome {
            answer,
            matched_node: matched.offense,
            similarity_score: matched.score,
            low_confidence: matched.low_confidence,
            context,
        })
    }
}

async fn emit(sink: &dyn EventSink, event: QueryEvent) -> Result<(), QueryError> {
    if sink.emit(event).await {
        Ok(())
    } else {
        Err(QueryError::Cancelled)
    }
}

fn bounded(query: &str, max_chars: usize) -> String {
    if query.chars().count() <= max_chars {
        query.to_string()
    } else {
        query.chars().take(max_chars).collect()
    }
}
