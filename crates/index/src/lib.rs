pub mod builder;
pub mod embeddings;
pub mod memory_store;
pub mod neo4j_store;
pub mod retry;
pub mod store;
pub mod upserter;

pub use builder::EmbeddingIndexBuilder;
pub use embeddings::{EmbeddingError, EmbeddingModel, OllamaEmbedder};
pub use memory_store::MemoryStore;
pub use neo4j_store::Neo4jStore;
pub use retry::RetryPolicy;
pub use store::{GraphStats, GraphStore, OffenseContext, OffenseEmbedding, StoreError};
pub use upserter::GraphUpserter;

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use extract::Extractor;
use ingest::Chunk;

/// Outcome of one indexing run. Failed chunks and records are counted, not
/// fatal: re-running the pipeline is always safe because upserts are
/// idempotent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexReport {
    pub chunks_processed: usize,
    pub chunks_failed: usize,
    pub records_extracted: usize,
    pub records_upserted: usize,
    pub records_failed: usize,
    pub embeddings_written: usize,
}

/// Drives the indexing pipeline (chunks to extraction to graph upserts to
/// embedding backfill) with bounded chunk-level concurrency.
pub struct Indexer {
    extractor: Arc<Extractor>,
    upserter: Arc<GraphUpserter>,
    builder: Arc<EmbeddingIndexBuilder>,
    max_concurrent: usize,
}

impl Indexer {
    pub fn new(
        extractor: Arc<Extractor>,
        upserter: Arc<GraphUpserter>,
        builder: Arc<EmbeddingIndexBuilder>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            extractor,
            upserter,
            builder,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub async fn index_chunks(&self, chunks: Vec<Chunk>) -> IndexReport {
        let mut report = IndexReport::default();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks: JoinSet<ChunkOutcome> = JoinSet::new();

        for chunk in chunks {
            let extractor = self.extractor.clone();
            let upserter = self.upserter.clone();
            let semaphore = semaphore.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                process_chunk(&extractor, &upserter, &chunk).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    report.chunks_processed += 1;
                    if outcome.failed {
                        report.chunks_failed += 1;
                    }
                    report.records_extracted += outcome.extracted;
                    report.records_upserted += outcome.upserted;
                    report.records_failed += outcome.record_failures;
                }
                Err(e) => {
                    report.chunks_processed += 1;
                    report.chunks_failed += 1;
                    error!(error = %e, "chunk task panicked");
                }
            }
        }

        match self.builder.embed_missing().await {
            Ok(written) => report.embeddings_written = written,
            Err(e) => warn!(error = %e, "embedding backfill failed"),
        }

        info!(
            chunks = report.chunks_processed,
            failed_chunks = report.chunks_failed,
            records = report.records_upserted,
            embeddings = report.embeddings_written,
            "indexing run complete"
        );

        report
    }
}

struct ChunkOutcome {
    failed: bool,
    extracted: usize,
    upserted: usize,
    record_failures: usize,
}

async fn process_chunk(
    extractor: &Extractor,
    upserter: &GraphUpserter,
    chunk: &Chunk,
) -> ChunkOutcome {
    let records = match extractor.extract_chunk(chunk).await {
        Ok(records) => records,
        Err(e) => {
            warn!(chunk_id = %chunk.chunk_id, error = %e, "extraction failed, skipping chunk");
            return ChunkOutcome {
                failed: true,
                extracted: 0,
                upserted: 0,
                record_failures: 0,
            };
        }
    };

    let mut outcome = ChunkOutcome {
        failed: false,
        extracted: records.len(),
        upserted: 0,
        record_failures: 0,
    };

    for record in &records {
        match upserter.upsert(record).await {
            Ok(()) => outcome.upserted += 1,
            Err(e) => {
                outcome.record_failures += 1;
                warn!(
                    chunk_id = %chunk.chunk_id,
                    offense = %record.offense,
                    error = %e,
                    "record upsert failed, continuing with next record"
                );
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use extract::{CompletionError, CompletionModel};

    /// Emits one fixed record array for any chunk whose text mentions an
    /// offense marker, prose otherwise.
    struct CannedModel;

    #[async_trait]
    impl CompletionModel for CannedModel {
        async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
            if prompt.contains("303") {
                Ok(r#"[{"offense": "Theft", "chapter": "XVII", "section": "303", "punishment": "Imprisonment up to three years"}]"#.into())
            } else {
                Ok("No offenses here.".into())
            }
        }
    }

    struct NoopEmbedder;

    #[async_trait]
    impl EmbeddingModel for NoopEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![1.0, 0.0])
        }

        fn model_version(&self) -> &str {
            "test-embedder"
        }
    }

    fn indexer(store: Arc<MemoryStore>) -> Indexer {
        let extractor = Arc::new(Extractor::new(Arc::new(CannedModel)).with_parse_retries(0));
        let upserter = Arc::new(GraphUpserter::new(store.clone(), RetryPolicy::new(1, 1, 2)));
        let builder = Arc::new(EmbeddingIndexBuilder::new(store, Arc::new(NoopEmbedder)));
        Indexer::new(extractor, upserter, builder, 4)
    }

    fn chunk(text: &str) -> Chunk {
        Chunk::new("doc".into(), text.into(), "code.txt".into(), (0, text.len()))
    }

    #[tokio::test]
    async fn indexing_twice_leaves_graph_unchanged() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer(store.clone());
        let chunks = vec![chunk("303. Theft. Whoever..."), chunk("General commentary.")];

        let first = indexer.index_chunks(chunks.clone()).await;
        let stats_once = store.stats().await.unwrap();

        let second = indexer.index_chunks(chunks).await;
        let stats_twice = store.stats().await.unwrap();

        assert_eq!(first.records_upserted, 1);
        assert_eq!(first.embeddings_written, 1);
        assert_eq!(second.embeddings_written, 0);
        assert_eq!(stats_once.offenses, stats_twice.offenses);
        assert_eq!(stats_once.edges, stats_twice.edges);
    }

    #[tokio::test]
    async fn prose_chunk_is_not_a_failure() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer(store);
        let report = indexer.index_chunks(vec![chunk("General commentary.")]).await;

        assert_eq!(report.chunks_processed, 1);
        assert_eq!(report.chunks_failed, 0);
        assert_eq!(report.records_extracted, 0);
    }
}
