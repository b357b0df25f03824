use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

pub struct Metrics {
    total_queries: AtomicUsize,
    successful_queries: AtomicUsize,
    failed_queries: AtomicUsize,
    low_confidence_matches: AtomicUsize,
    total_query_time_us: AtomicU64,

    indexing_runs: AtomicUsize,
    chunks_processed: AtomicUsize,
    records_upserted: AtomicUsize,
    embeddings_written: AtomicUsize,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_queries: AtomicUsize::new(0),
            successful_queries: AtomicUsize::new(0),
            failed_queries: AtomicUsize::new(0),
            low_confidence_matches: AtomicUsize::new(0),
            total_query_time_us: AtomicU64::new(0),
            indexing_runs: AtomicUsize::new(0),
            chunks_processed: AtomicUsize::new(0),
            records_upserted: AtomicUsize::new(0),
            embeddings_written: AtomicUsize::new(0),
        })
    }

    pub fn record_query(&self, success: bool, duration: std::time::Duration) {
        self.total_queries.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_queries.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_queries.fetch_add(1, Ordering::Relaxed);
        }
        self.total_query_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_low_confidence(&self) {
        self.low_confidence_matches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_indexing(&self, report: &index::IndexReport) {
        self.indexing_runs.fetch_add(1, Ordering::Relaxed);
        self.chunks_processed
            .fetch_add(report.chunks_processed, Ordering::Relaxed);
        self.records_upserted
            .fetch_add(report.records_upserted, Ordering::Relaxed);
        self.embeddings_written
            .fetch_add(report.embeddings_written, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.total_queries.load(Ordering::Relaxed);
        let total_us = self.total_query_time_us.load(Ordering::Relaxed);

        MetricsSnapshot {
            total_queries: total,
            successful_queries: self.successful_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            low_confidence_matches: self.low_confidence_matches.load(Ordering::Relaxed),
            avg_query_time_ms: if total > 0 {
                total_us as f64 / total as f64 / 1000.0
            } else {
                0.0
            },
            indexing_runs: self.indexing_runs.load(Ordering::Relaxed),
            chunks_processed: self.chunks_processed.load(Ordering::Relaxed),
            records_upserted: self.records_upserted.load(Ordering::Relaxed),
            embeddings_written: self.embeddings_written.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_queries: usize,
    pub successful_queries: usize,
    pub failed_queries: usize,
    pub low_confidence_matches: usize,
    pub avg_query_time_ms: f64,
    pub indexing_runs: usize,
    pub chunks_processed: usize,
    pub records_upserted: usize,
    pub embeddings_written: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn snapshot_reflects_recorded_queries() {
        let metrics = Metrics::new();
        metrics.record_query(true, Duration::from_millis(10));
        metrics.record_query(false, Duration::from_millis(30));
        metrics.record_low_confidence();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_queries, 2);
        assert_eq!(snapshot.successful_queries, 1);
        assert_eq!(snapshot.failed_queries, 1);
        assert_eq!(snapshot.low_confidence_matches, 1);
        assert!((snapshot.avg_query_time_ms - 20.0).abs() < 1.0);
    }
}
