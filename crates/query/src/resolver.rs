use std::sync::Arc;
use tracing::debug;

use index::{EmbeddingModel, GraphStore};

use crate::error::RetrievalError;

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMatch {
    pub offense: String,
    pub score: f32,
    pub low_confidence: bool,
}

/// Finds the offense node nearest to a query: embed the query with the
/// index's model version, rank every current-version offense embedding by
/// cosine similarity, take the maximum.
#[derive(Clone)]
pub struct QueryResolver {
    store: Arc<dyn GraphStore>,
    embedder: Arc<dyn EmbeddingModel>,
    similarity_threshold: f32,
}

impl QueryResolver {
    pub fn new(
        store: Arc<dyn GraphStore>,
        embedder: Arc<dyn EmbeddingModel>,
        similarity_threshold: f32,
    ) -> Self {
        Self {
            store,
            embedder,
            similarity_threshold,
        }
    }

    /// The best match is always returned; scoring below the threshold only
    /// flags it as low confidence for the caller to present as tentative.
    pub async fn resolve(&self, query: &str) -> Result<ResolvedMatch, RetrievalError> {
        let candidates = self
            .store
            .offense_embeddings(self.embedder.model_version())
            .await?;

        if candidates.is_empty() {
            return Err(RetrievalError::EmptyIndex);
        }

        let query_embedding = self.embedder.embed(query).await?;

        let mut best: Option<(&str, f32)> = None;
        for candidate in &candidates {
            let score = cosine_similarity(&query_embedding, &candidate.vector);
            if best.map(|(_, s)| score > s).unwrap_or(true) {
                best = Some((&candidate.offense, score));
            }
        }

        let (offense, score) = best.expect("candidates is non-empty");
        let low_confidence = score < self.similarity_threshold;

        debug!(
            offense,
            score,
            low_confidence,
            candidates = candidates.len(),
            "resolved query"
        );

        Ok(ResolvedMatch {
            offense: offense.to_string(),
            score,
            low_confidence,
        })
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.3, 0.4, 0.5];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn cosine_of_opposite_vectors_is_negative_one() {
        let score = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]);
        assert!((score + 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
