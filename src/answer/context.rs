use crate::index::SearchResult;

/// Returned by [`format_context`] when retrieval found nothing.
pub const NO_CONTEXT_SENTINEL: &str = "No relevant documentation found.";

const SEPARATOR: &str = "\n\n---\n\n";

/// Render retrieved chunks as the grounding block of the system prompt.
pub fn format_context(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return NO_CONTEXT_SENTINEL.to_string();
    }
    results
        .iter()
        .map(|r| format!("From {}:\n{}", r.chunk.source_path, r.chunk.text))
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

pub fn is_no_context(context: &str) -> bool {
    context == NO_CONTEXT_SENTINEL
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::Chunk;

    fn result(path: &str, text: &str, score: f32) -> SearchResult {
        SearchResult {
            chunk: Chunk {
                text: text.to_string(),
                source_path: path.to_string(),
                source_url: format!("https://docs.example.com/{}", path),
                ordinal: 0,
            },
            score,
        }
    }

    #[test]
    fn test_empty_results_yield_sentinel() {
        let ctx = format_context(&[]);
        assert_eq!(ctx, "No relevant documentation found.");
        assert!(is_no_context(&ctx));
    }

    #[test]
    fn test_single_result() {
        let ctx = format_context(&[result("a.md", "Run the build.", 0.9)]);
        assert_eq!(ctx, "From a.md:\nRun the build.");
        assert!(!is_no_context(&ctx));
    }

    #[test]
    fn test_results_joined_in_rank_order() {
        let ctx = format_context(&[
            result("guide/setup.md", "Install first.", 0.8),
            result("README.md", "Then build.", 0.5),
        ]);
        assert_eq!(
            ctx,
            "From guide/setup.md:\nInstall first.\n\n---\n\nFrom README.md:\nThen build."
        );
    }
}
