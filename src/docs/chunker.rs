use super::types::{Chunk, Document};

pub const DEFAULT_MIN_CHUNK_CHARS: usize = 50;

/// Splits documents into paragraph chunks.
///
/// Paragraphs are separated by blank lines (empty or whitespace-only). A
/// paragraph whose trimmed text is shorter than `min_chars` characters is
/// dropped, so headings and one-liners never become chunks on their own.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    min_chars: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CHUNK_CHARS)
    }
}

impl Chunker {
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }

    pub fn chunk(&self, doc: &Document) -> Vec<Chunk> {
        paragraphs(&doc.content)
            .into_iter()
            .filter(|p| p.chars().count() >= self.min_chars)
            .enumerate()
            .map(|(ordinal, text)| Chunk {
                text,
                source_path: doc.path.clone(),
                source_url: doc.source_url.clone(),
                ordinal,
            })
            .collect()
    }

    /// Chunks of every document, in corpus order.
    pub fn chunk_all(&self, docs: &[Document]) -> Vec<Chunk> {
        docs.iter().flat_map(|d| self.chunk(d)).collect()
    }
}

/// Trimmed, non-empty paragraphs in document order.
fn paragraphs(content: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            flush(&mut current, &mut out);
        } else {
            current.push(line);
        }
    }
    flush(&mut current, &mut out);
    out
}

fn flush(current: &mut Vec<&str>, out: &mut Vec<String>) {
    if current.is_empty() {
        return;
    }
    let text = current.join("\n").trim().to_string();
    if !text.is_empty() {
        out.push(text);
    }
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(content: &str) -> Document {
        Document::new("guide.md", content, "https://example.com/guide.md")
    }

    const LONG_A: &str = "Clone the repository and install the toolchain before anything else.";
    const LONG_B: &str = "Run the build command from the workspace root to compile every crate.";

    #[test]
    fn test_splits_on_blank_lines() {
        let content = format!("{}\n\n{}", LONG_A, LONG_B);
        let chunks = Chunker::default().chunk(&doc(&content));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, LONG_A);
        assert_eq!(chunks[1].text, LONG_B);
        assert_eq!(chunks[1].source_path, "guide.md");
        assert_eq!(chunks[1].source_url, "https://example.com/guide.md");
    }

    #[test]
    fn test_drops_short_fragments_and_renumbers() {
        let content = format!("# Setup\n\n{}\n\nShort line.\n\n{}", LONG_A, LONG_B);
        let chunks = Chunker::default().chunk(&doc(&content));
        let ordinals: Vec<usize> = chunks.iter().map(|c| c.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1]);
        assert_eq!(chunks[0].text, LONG_A);
    }

    #[test]
    fn test_whitespace_only_lines_separate_paragraphs() {
        let content = format!("{}\n   \t\n{}\r\n\r\n", LONG_A, LONG_B);
        let chunks = Chunker::default().chunk(&doc(&content));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].text, LONG_B);
    }

    #[test]
    fn test_multiline_paragraph_kept_together() {
        let content = "First line of a paragraph that keeps going\nand continues on a second line.";
        let chunks = Chunker::default().chunk(&doc(content));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, content);
    }

    #[test]
    fn test_threshold_counts_characters_not_bytes() {
        // 49 two-byte characters: 98 bytes but still below the minimum
        let short: String = "é".repeat(49);
        assert!(Chunker::default().chunk(&doc(&short)).is_empty());
        let exact: String = "é".repeat(50);
        assert_eq!(Chunker::default().chunk(&doc(&exact)).len(), 1);
    }

    #[test]
    fn test_empty_document() {
        assert!(Chunker::default().chunk(&doc("")).is_empty());
        assert!(Chunker::default().chunk(&doc("\n\n\n")).is_empty());
    }

    #[test]
    fn test_chunk_all_keeps_corpus_order() {
        let docs = vec![
            Document::new("a.md", LONG_A, "u/a"),
            Document::new("b.md", format!("{}\n\n{}", LONG_B, LONG_A), "u/b"),
        ];
        let chunks = Chunker::default().chunk_all(&docs);
        let keys: Vec<(&str, usize)> = chunks
            .iter()
            .map(|c| (c.source_path.as_str(), c.ordinal))
            .collect();
        assert_eq!(keys, vec![("a.md", 0), ("b.md", 0), ("b.md", 1)]);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_chunks_meet_minimum_and_ordinals_are_contiguous(
            paras in prop::collection::vec("[a-z ]{0,120}", 0..12),
            min_chars in 1usize..80,
        ) {
            let content = paras.join("\n\n");
            let chunker = Chunker::new(min_chars);
            let chunks = chunker.chunk(&Document::new("p.md", content, "u"));

            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert!(chunk.text.trim().chars().count() >= min_chars);
                prop_assert_eq!(chunk.ordinal, i);
            }
        }
    }
}
