use crate::chunk::Chunk;

pub struct ChunkerConfig {
    /// Upper bound on chunk length in characters.
    pub max_chars: usize,
    /// Tail of the previous chunk repeated at the start of the next one.
    pub overlap_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chars: 3000,
            overlap_chars: 300,
        }
    }
}

pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn chunk_text(&self, doc_id: &str, text: &str, source: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        // Split on chapter headings first so a chapter title stays attached
        // to the sections it governs.
        let sections = self.split_by_headings(text);

        let mut current_offset = 0;

        for section in sections {
            let section_start = current_offset;

            if section.chars().count() <= self.config.max_chars {
                if !section.trim().is_empty() {
                    chunks.push(Chunk::new(
                        doc_id.to_string(),
                        section.clone(),
                        source.to_string(),
                        (section_start, section_start + section.chars().count()),
                    ));
                }
                current_offset += section.chars().count();
                continue;
            }

            // Oversized chapter: pack paragraphs into bounded chunks.
            let paragraphs = self.split_by_paragraphs(&section);
            let mut buffer = String::new();
            let mut buffer_start = section_start;

            for para in paragraphs {
                let para_len = para.chars().count();
                let buffer_len = buffer.chars().count();

                if buffer_len + para_len > self.config.max_chars && !buffer.is_empty() {
                    chunks.push(Chunk::new(
                        doc_id.to_string(),
                        buffer.clone(),
                        source.to_string(),
                        (buffer_start, buffer_start + buffer_len),
                    ));

                    // Start the next buffer with an overlap tail.
                    buffer = self.overlap_tail(&buffer);
                    buffer_start = current_offset.saturating_sub(buffer.chars().count());
                }

                buffer.push_str(&para);
                buffer.push_str("\n\n");
                current_offset += para_len + 2;
            }

            if !buffer.trim().is_empty() {
                chunks.push(Chunk::new(
                    doc_id.to_string(),
                    buffer,
                    source.to_string(),
                    (buffer_start, current_offset),
                ));
            }
        }

        chunks
    }

    fn split_by_headings(&self, text: &str) -> Vec<String> {
        let mut sections = Vec::new();
        let mut current_section = String::new();

        for line in text.lines() {
            if is_chapter_heading(line) {
                if !current_section.is_empty() {
                    sections.push(current_section);
                    current_section = String::new();
                }
            }
            current_section.push_str(line);
            current_section.push('\n');
        }

        if !current_section.is_empty() {
            sections.push(current_section);
        }

        if sections.is_empty() {
            sections.push(text.to_string());
        }

        sections
    }

    fn split_by_paragraphs(&self, text: &str) -> Vec<String> {
        text.split("\n\n")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn overlap_tail(&self, text: &str) -> String {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= self.config.overlap_chars {
            return text.to_string();
        }
        chars[chars.len() - self.config.overlap_chars..]
            .iter()
            .collect()
    }
}

/// Penal codes mark chapters as "CHAPTER IV" / "Chapter 17 - Of Offences
/// Against Property"; markdown exports sometimes keep a leading '#'.
fn is_chapter_heading(line: &str) -> bool {
    let trimmed = line.trim_start().trim_start_matches('#').trim_start();
    let lower = trimmed.to_lowercase();
    lower.starts_with("chapter ") || lower.starts_with("chapter\t")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_chunking() {
        let chunker = Chunker::new(ChunkerConfig::default());
        let text = "This is a test paragraph.\n\nThis is another paragraph.";
        let chunks = chunker.chunk_text("test-doc", text, "test.txt");

        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].doc_id, "test-doc");
    }

    #[test]
    fn splits_on_chapter_headings() {
        let chunker = Chunker::new(ChunkerConfig::default());
        let text = "CHAPTER I\nPreliminary text.\n\nCHAPTER II\nOffences against the person.";
        let chunks = chunker.chunk_text("doc", text, "code.txt");

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.starts_with("CHAPTER I"));
        assert!(chunks[1].text.starts_with("CHAPTER II"));
    }

    #[test]
    fn oversized_chapter_is_packed_with_overlap() {
        let config = ChunkerConfig {
            max_chars: 200,
            overlap_chars: 40,
        };
        let chunker = Chunker::new(config);
        let para = "A sentence about an offence. ".repeat(4);
        let text = format!("CHAPTER III\n{}\n\n{}\n\n{}", para, para, para);
        let chunks = chunker.chunk_text("doc", &text, "code.txt");

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 200 + 64);
        }
    }
}
