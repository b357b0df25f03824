use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use extract::ExtractionRecord;

use crate::retry::RetryPolicy;
use crate::store::{GraphStore, StoreError};

/// Writes extraction records into the graph. Concurrent workers upserting
/// the same offense are serialized through a per-key mutex; transient store
/// failures are retried with backoff.
pub struct GraphUpserter {
    store: Arc<dyn GraphStore>,
    retry: RetryPolicy,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl GraphUpserter {
    pub fn new(store: Arc<dyn GraphStore>, retry: RetryPolicy) -> Self {
        Self {
            store,
            retry,
            locks: DashMap::new(),
        }
    }

    pub async fn upsert(&self, record: &ExtractionRecord) -> Result<(), StoreError> {
        let key = record.offense_key();
        let lock = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        self.retry
            .retry_store("upsert_record", || self.store.upsert_record(record))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::memory_store::MemoryStore;
    use crate::store::{GraphStats, OffenseContext, OffenseEmbedding};

    /// Fails the first N upserts with a transient error, then delegates.
    struct FlakyStore {
        inner: MemoryStore,
        failures_left: AtomicUsize,
    }

    impl FlakyStore {
        fn new(failures: usize) -> Self {
            Self {
                inner: MemoryStore::new(),
                failures_left: AtomicUsize::new(failures),
            }
        }
    }

    #[async_trait]
    impl GraphStore for FlakyStore {
        async fn upsert_record(&self, record: &ExtractionRecord) -> Result<(), StoreError> {
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(StoreError::Transient("broken pipe".into()));
            }
            self.inner.upsert_record(record).await
        }

        async fn offenses_missing_embedding(
            &self,
            model_version: &str,
        ) -> Result<Vec<String>, StoreError> {
            self.inner.offenses_missing_embedding(model_version).await
        }

        async fn store_embedding(
            &self,
            offense: &str,
            model_version: &str,
            vector: &[f32],
        ) -> Result<(), StoreError> {
            self.inner.store_embedding(offense, model_version, vector).await
        }

        async fn offense_embeddings(
            &self,
            model_version: &str,
        ) -> Result<Vec<OffenseEmbedding>, StoreError> {
            self.inner.offense_embeddings(model_version).await
        }

        async fn offense_context(
            &self,
            offense: &str,
        ) -> Result<Option<OffenseContext>, StoreError> {
            self.inner.offense_context(offense).await
        }

        async fn stats(&self) -> Result<GraphStats, StoreError> {
            self.inner.stats().await
        }

        async fn ping(&self) -> Result<(), StoreError> {
            self.inner.ping().await
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
    async fn transient_failures_are_retried_then_committed() {
        let store = Arc::new(FlakyStore::new(2));
        let upserter = GraphUpserter::new(store.clone(), RetryPolicy::new(3, 1, 4));

        upserter.upsert(&record("Theft")).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.offenses, 1);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_the_error() {
        let store = Arc::new(FlakyStore::new(10));
        let upserter = GraphUpserter::new(store.clone(), RetryPolicy::new(2, 1, 2));

        let result = upserter.upsert(&record("Theft")).await;
        assert!(matches!(result, Err(StoreError::Transient(_))));
        assert_eq!(store.stats().await.unwrap().offenses, 0);
    }

    #[tokio::test]
    async fn concurrent_upserts_of_same_offense_do_not_duplicate() {
        let store = Arc::new(MemoryStore::new());
        let upserter = Arc::new(GraphUpserter::new(store.clone(), RetryPolicy::default()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let upserter = upserter.clone();
            handles.push(tokio::spawn(async move {
                upserter.upsert(&record("Robbery")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.offenses, 1);
        assert_eq!(stats.edges, 3);
    }
}
