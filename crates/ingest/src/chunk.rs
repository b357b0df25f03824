use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One bounded slice of the source document, the unit fed to extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub doc_id: String,
    pub chunk_id: String,
    pub text: String,
    pub source: String,
    pub span: (usize, usize), // [start, end) character positions in the document
}

impl Chunk {
    pub fn new(doc_id: String, text: String, source: String, span: (usize, usize)) -> Self {
        let chunk_id = Self::generate_chunk_id(&doc_id, &text, span);

        Self {
            doc_id,
            chunk_id,
            text,
            source,
            span,
        }
    }

    fn generate_chunk_id(doc_id: &str, text: &str, span: (usize, usize)) -> String {
        let mut hasher = Sha256::new();
        hasher.update(doc_id.as_bytes());
        hasher.update(text.as_bytes());
        hasher.update(span.0.to_string().as_bytes());
        hasher.update(span.1.to_string().as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..16]) // first 16 bytes (32 hex chars)
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_id_is_stable() {
        let a = Chunk::new("doc".into(), "303. Theft.".into(), "bns.txt".into(), (0, 11));
        let b = Chunk::new("doc".into(), "303. Theft.".into(), "bns.txt".into(), (0, 11));
        assert_eq!(a.chunk_id, b.chunk_id);
    }

    #[test]
    fn chunk_id_depends_on_span() {
        let a = Chunk::new("doc".into(), "same text".into(), "bns.txt".into(), (0, 9));
        let b = Chunk::new("doc".into(), "same text".into(), "bns.txt".into(), (9, 18));
        assert_ne!(a.chunk_id, b.chunk_id);
    }
}
