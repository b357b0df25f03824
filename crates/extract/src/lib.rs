pub mod error;
pub mod llm;
pub mod normalizer;
pub mod parser;
pub mod prompt;
pub mod record;

pub use error::{CompletionError, ExtractError, ParseError};
pub use llm::{CompletionModel, OllamaClient};
pub use normalizer::normalize_offense_name;
pub use record::{ExtractionRecord, Provenance, UNKNOWN};

use std::sync::Arc;
use tracing::{debug, warn};

/// Turns text chunks into structured offense tuples via the completion
/// capability. Parse failures are absorbed per chunk; only capability
/// failures propagate.
pub struct Extractor {
    llm: Arc<dyn CompletionModel>,
    parse_retries: usize,
}

impl Extractor {
    pub fn new(llm: Arc<dyn CompletionModel>) -> Self {
        Self {
            llm,
            parse_retries: 1,
        }
    }

    pub fn with_parse_retries(mut self, retries: usize) -> Self {
        self.parse_retries = retries;
        self
    }

    /// Extract zero or more offense records from one chunk.
    ///
    /// An empty chunk produces zero records without touching the model.
    /// Unparseable model output is retried once with a corrective prompt,
    /// then logged and dropped; it never fails the chunk.
    pub async fn extract_chunk(
        &self,
        chunk: &ingest::Chunk,
    ) -> Result<Vec<ExtractionRecord>, ExtractError> {
        if chunk.is_empty() {
            return Ok(Vec::new());
        }

        let prompt = prompt::build_extraction_prompt(&chunk.text);
        let mut raw = self.llm.complete(&prompt).await?;

        for attempt in 0..=self.parse_retries {
            match parser::parse_records(&raw) {
                Ok(mut records) => {
                    for record in &mut records {
                        record.provenance = Some(Provenance {
                            chunk_id: chunk.chunk_id.clone(),
                            span: chunk.span,
                        });
                    }
                    debug!(
                        chunk_id = %chunk.chunk_id,
                        records = records.len(),
                        "extracted offense records"
                    );
                    return Ok(records);
                }
                Err(parse_err) if attempt < self.parse_retries => {
                    warn!(
                        chunk_id = %chunk.chunk_id,
                        error = %parse_err,
                        "model output unparseable, retrying with correction prompt"
                    );
                    raw = self.llm.complete(&prompt::build_retry_prompt(&raw)).await?;
                }
                Err(parse_err) => {
                    warn!(
                        chunk_id = %chunk.chunk_id,
                        error = %parse_err,
                        "model output unparseable after retries, skipping chunk"
                    );
                    return Ok(Vec::new());
                }
            }
        }

        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedModel {
        responses: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(responses: Vec<&str>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into_iter().rev().map(String::from).collect()),
            })
        }
    }

    #[async_trait]
    impl CompletionModel for ScriptedModel {
        async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
            let mut responses = self.responses.lock().unwrap();
            responses
                .pop()
                .ok_or_else(|| CompletionError::Decode("script exhausted".into()))
        }
    }

    fn chunk(text: &str) -> ingest::Chunk {
        ingest::Chunk::new("doc".into(), text.into(), "code.txt".into(), (0, text.len()))
    }

    #[tokio::test]
    async fn empty_chunk_produces_zero_records() {
        let extractor = Extractor::new(ScriptedModel::new(vec![]));
        let records = extractor.extract_chunk(&chunk("   \n")).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn prose_output_yields_zero_records_not_an_error() {
        let extractor = Extractor::new(ScriptedModel::new(vec![
            "The passage talks about property offences in general.",
            "Still no JSON here, sorry.",
        ]));
        let records = extractor.extract_chunk(&chunk("CHAPTER XVII")).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn retry_prompt_recovers_from_invalid_first_output() {
        let extractor = Extractor::new(ScriptedModel::new(vec![
            "Sure! Here are the offenses you asked for.",
            r#"[{"offense": "Theft", "chapter": "XVII", "section": "303", "punishment": "Three years"}]"#,
        ]));
        let records = extractor.extract_chunk(&chunk("303. Theft...")).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].offense, "Theft");
        assert!(records[0].provenance.is_some());
    }
}
