use std::collections::HashSet;

use serde::Serialize;

use crate::index::SearchResult;

/// A source document that contributed to an answer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Citation {
    pub path: String,
    pub url: String,
}

/// Collect citations from ranked results, keeping the first occurrence of
/// each source in rank order.
pub fn collect_citations(results: &[SearchResult]) -> Vec<Citation> {
    let mut seen = HashSet::new();
    results
        .iter()
        .filter(|r| seen.insert(r.chunk.source_path.as_str()))
        .map(|r| Citation {
            path: r.chunk.source_path.clone(),
            url: r.chunk.source_url.clone(),
        })
        .collect()
}

/// Markdown "Sources" footer, or an empty string when there is nothing to cite.
pub fn format_sources(citations: &[Citation]) -> String {
    if citations.is_empty() {
        return String::new();
    }
    let mut out = String::from("Sources:\n");
    for c in citations {
        // Short label from the last path segment
        let label = c.path.rsplit('/').find(|s| !s.is_empty()).unwrap_or(&c.path);
        out.push_str(&format!("- [{}]({})\n", label, c.url));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::Chunk;

    fn result(path: &str, ordinal: usize) -> SearchResult {
        SearchResult {
            chunk: Chunk {
                text: format!("chunk {} of {}", ordinal, path),
                source_path: path.to_string(),
                source_url: format!("https://github.com/owner/repo/blob/main/{}", path),
                ordinal,
            },
            score: 0.5,
        }
    }

    #[test]
    fn test_dedup_preserves_rank_order() {
        let citations = collect_citations(&[
            result("docs/guide.md", 2),
            result("README.md", 0),
            result("docs/guide.md", 0),
        ]);
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].path, "docs/guide.md");
        assert_eq!(citations[1].path, "README.md");
        assert_eq!(
            citations[1].url,
            "https://github.com/owner/repo/blob/main/README.md"
        );
    }

    #[test]
    fn test_no_results_no_citations() {
        assert!(collect_citations(&[]).is_empty());
        assert_eq!(format_sources(&[]), "");
    }

    #[test]
    fn test_format_sources_labels() {
        let citations = collect_citations(&[result("docs/guide.md", 0)]);
        assert_eq!(
            format_sources(&citations),
            "Sources:\n- [guide.md](https://github.com/owner/repo/blob/main/docs/guide.md)\n"
        );
    }
}
