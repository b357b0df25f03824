pub mod chunk;
pub mod chunker;
pub mod reader;

pub use chunk::Chunk;
pub use chunker::{Chunker, ChunkerConfig};
pub use reader::FileReader;

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Generate a stable document ID from the file path.
pub fn generate_doc_id(path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}

/// Read one document and split it into chunks.
pub async fn ingest_file(file_path: &Path, config: ChunkerConfig) -> Result<Vec<Chunk>> {
    let content = FileReader::read_file(file_path).await?;
    let path_str = file_path.to_string_lossy().to_string();
    let doc_id = generate_doc_id(&path_str);

    let chunker = Chunker::new(config);
    let chunks = chunker.chunk_text(&doc_id, &content, &path_str);

    Ok(chunks)
}

/// Read every supported file under a directory and chunk each one.
pub async fn ingest_directory(dir_path: &Path, config: ChunkerConfig) -> Result<Vec<Chunk>> {
    let files = FileReader::read_directory(dir_path).await?;
    let chunker = Chunker::new(config);

    let mut all_chunks = Vec::new();

    for (path, content) in files {
        let doc_id = generate_doc_id(&path);
        let chunks = chunker.chunk_text(&doc_id, &content, &path);
        all_chunks.extend(chunks);
    }

    Ok(all_chunks)
}
