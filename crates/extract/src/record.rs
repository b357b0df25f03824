use serde::{Deserialize, Serialize};

use crate::normalizer::normalize_offense_name;

/// Sentinel written into fields the model could not fill.
pub const UNKNOWN: &str = "unknown";

/// Where an extracted tuple came from in the source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub chunk_id: String,
    pub span: (usize, usize),
}

/// One structured offense tuple extracted from a text chunk. Ephemeral:
/// consumed by the upserter, never persisted on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub offense: String,
    pub chapter: String,
    pub section: String,
    pub punishment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

impl ExtractionRecord {
    /// Identity key for graph upserts: the normalized offense name.
    pub fn offense_key(&self) -> String {
        normalize_offense_name(&self.offense)
    }

    pub fn has_chapter(&self) -> bool {
        !is_unknown(&self.chapter)
    }

    pub fn has_section(&self) -> bool {
        !is_unknown(&self.section)
    }

    pub fn has_punishment(&self) -> bool {
        !is_unknown(&self.punishment)
    }
}

pub fn is_unknown(field: &str) -> bool {
    let trimmed = field.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(UNKNOWN)
}
