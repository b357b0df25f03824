use std::sync::Arc;

use index::{GraphStore, OffenseContext, StoreError};

/// Builds the grounded context bundle for a matched offense by following its
/// chapter, section and punishment edges. Pure read.
#[derive(Clone)]
pub struct ContextAssembler {
    store: Arc<dyn GraphStore>,
    max_chars: usize,
}

impl ContextAssembler {
    pub fn new(store: Arc<dyn GraphStore>, max_chars: usize) -> Self {
        Self { store, max_chars }
    }

    pub async fn assemble(&self, offense: &str) -> Result<String, StoreError> {
        let Some(context) = self.store.offense_context(offense).await? else {
            return Ok(format!("No context found for: {offense}"));
        };

        Ok(self.format(&context))
    }

    /// Stable field order: chapter, section, offense description,
    /// punishment. Absent relationships are omitted, never blank-padded.
    fn format(&self, context: &OffenseContext) -> String {
        let mut parts = Vec::new();

        if let Some(chapter) = &context.chapter {
            parts.push(format!("Chapter: {chapter}"));
        }
        if let Some(section) = &context.section {
            parts.push(format!("Section: {section}"));
        }
        parts.push(format!("Offense: {}", context.offense));
        if let Some(punishment) = &context.punishment {
            parts.push(format!("Punishment: {punishment}"));
        }

        truncate_chars(&parts.join("\n"), self.max_chars)
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::ExtractionRecord;
    use index::MemoryStore;

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .upsert_record(&ExtractionRecord {
                offense: "Robbery".into(),
                chapter: "Of Offences Against Property".into(),
                section: "309".into(),
                punishment: "Rigorous imprisonment up to ten years".into(),
                provenance: None,
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn fields_appear_in_stable_order() {
        let assembler = ContextAssembler::new(seeded_store().await, 4096);
        let context = assembler.assemble("robbery").await.unwrap();

        let chapter = context.find("Chapter:").unwrap();
        let section = context.find("Section:").unwrap();
        let offense = context.find("Offense:").unwrap();
        let punishment = context.find("Punishment:").unwrap();

        assert!(chapter < section);
        assert!(section < offense);
        assert!(offense < punishment);
    }

    #[tokio::test]
    async fn missing_relationship_is_omitted_not_padded() {
        let store = Arc::new(MemoryStore::new());
        store
            .upsert_record(&ExtractionRecord {
                offense: "Mischief".into(),
                chapter: "Of Offences Against Property".into(),
                section: "324".into(),
                punishment: "unknown".into(),
                provenance: None,
            })
            .await
            .unwrap();

        let assembler = ContextAssembler::new(store, 4096);
        let context = assembler.assemble("mischief").await.unwrap();

        assert!(context.contains("Chapter:"));
        assert!(context.contains("Section:"));
        assert!(!context.contains("Punishment:"));
    }

    #[tokio::test]
    async fn unknown_offense_degrades_gracefully() {
        let assembler = ContextAssembler::new(Arc::new(MemoryStore::new()), 4096);
        let context = assembler.assemble("nonexistent").await.unwrap();
        assert_eq!(context, "No context found for: nonexistent");
    }

    #[tokio::test]
    async fn context_is_bounded() {
        let assembler = ContextAssembler::new(seeded_store().await, 24);
        let context = assembler.assemble("robbery").await.unwrap();
        assert!(context.chars().count() <= 24);
    }
}
