use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use extract::{ExtractionRecord, Provenance};

use crate::store::{GraphStats, GraphStore, OffenseContext, OffenseEmbedding, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Edge {
    BelongsToChapter(String, String),
    RefersToSection(String, (String, String)),
    HasPunishment(String, String),
}

#[derive(Debug, Clone)]
struct OffenseRow {
    display: String,
    embedding: Option<(String, Vec<f32>)>, // (model version, vector)
    #[allow(dead_code)]
    provenance: Option<Provenance>,
}

#[derive(Default)]
struct Inner {
    offenses: BTreeMap<String, OffenseRow>,
    chapters: BTreeSet<String>,
    sections: BTreeSet<(String, String)>,
    punishments: BTreeSet<String>,
    edges: BTreeSet<Edge>,
}

/// In-process graph store. The single write lock gives each upsert the same
/// atomic-visibility guarantee the Neo4j transaction does. Used by tests and
/// by store-less local runs.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn upsert_record(&self, record: &ExtractionRecord) -> Result<(), StoreError> {
        let key = record.offense_key();
        if key.is_empty() {
            return Err(StoreError::Permanent("offense name is empty".into()));
        }

        let mut inner = self.inner.write().unwrap();

        let embedding = inner.offenses.get(&key).and_then(|row| row.embedding.clone());
        inner.offenses.insert(
            key.clone(),
            OffenseRow {
                display: record.offense.trim().to_string(),
                embedding,
                provenance: record.provenance.clone(),
            },
        );

        if record.has_chapter() {
            let chapter = record.chapter.trim().to_string();
            inner.chapters.insert(chapter.clone());
            inner.edges.insert(Edge::BelongsToChapter(key.clone(), chapter));
        }

        if record.has_section() {
            let section = (
                record.chapter.trim().to_string(),
                record.section.trim().to_string(),
            );
            inner.sections.insert(section.clone());
            inner.edges.insert(Edge::RefersToSection(key.clone(), section));
        }

        if record.has_punishment() {
            let punishment = record.punishment.trim().to_string();
            inner.punishments.insert(punishment.clone());
            inner.edges.insert(Edge::HasPunishment(key, punishment));
        }

        Ok(())
    }

    async fn offenses_missing_embedding(
        &self,
        model_version: &str,
    ) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .offenses
            .iter()
            .filter(|(_, row)| {
                row.embedding
                    .as_ref()
                    .map(|(version, _)| version != model_version)
                    .unwrap_or(true)
            })
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn store_embedding(
        &self,
        offense: &str,
        model_version: &str,
        vector: &[f32],
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        let row = inner
            .offenses
            .get_mut(offense)
            .ok_or_else(|| StoreError::Permanent(format!("unknown offense: {offense}")))?;
        row.embedding = Some((model_version.to_string(), vector.to_vec()));
        Ok(())
    }

    async fn offense_embeddings(
        &self,
        model_version: &str,
    ) -> Result<Vec<OffenseEmbedding>, StoreError> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .offenses
            .iter()
            .filter_map(|(key, row)| {
                row.embedding
                    .as_ref()
                    .filter(|(version, _)| version == model_version)
                    .map(|(_, vector)| OffenseEmbedding {
                        offense: key.clone(),
                        vector: vector.clone(),
                    })
            })
            .collect())
    }

    async fn offense_context(&self, offense: &str) -> Result<Option<OffenseContext>, StoreError> {
        let inner = self.inner.read().unwrap();

        let Some(row) = inner.offenses.get(offense) else {
            return Ok(None);
        };

        let mut context = OffenseContext {
            offense: row.display.clone(),
            chapter: None,
            section: None,
            punishment: None,
        };

        for edge in &inner.edges {
            match edge {
                Edge::BelongsToChapter(key, chapter) if key == offense => {
                    context.chapter = Some(chapter.clone());
                }
                Edge::RefersToSection(key, (_, number)) if key == offense => {
                    context.section = Some(number.clone());
                }
                Edge::HasPunishment(key, punishment) if key == offense => {
                    context.punishment = Some(punishment.clone());
                }
                _ => {}
            }
        }

        Ok(Some(context))
    }

    async fn stats(&self) -> Result<GraphStats, StoreError> {
        let inner = self.inner.read().unwrap();
        Ok(GraphStats {
            offenses: inner.offenses.len(),
            chapters: inner.chapters.len(),
            sections: inner.sections.len(),
            punishments: inner.punishments.len(),
            edges: inner.edges.len(),
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
