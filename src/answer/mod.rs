pub mod citations;
pub mod context;
pub mod prompts;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::docs::DocumentSource;
use crate::error::{Error, Result};
use crate::index::{EmbeddingIndex, IndexCache, IndexEntry, SearchResult};
use crate::llm::{CompletionClient, Message, Usage};

pub use citations::{collect_citations, format_sources, Citation};
pub use context::{format_context, is_no_context, NO_CONTEXT_SENTINEL};

pub const MAX_QUESTION_CHARS: usize = 2000;
const MIN_QUESTION_CHARS: usize = 3;
const BLOCKED_PATTERNS: &[&str] = &["<script", "javascript:", "eval(", "exec("];

#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    /// The backend answered using retrieved documentation.
    Grounded {
        text: String,
        provider: String,
        model: String,
        usage: Usage,
        citations: Vec<Citation>,
    },
    /// Retrieval found nothing, so no backend was called.
    NoGrounding,
}

impl Answer {
    /// Text to show the person who asked.
    pub fn display_text(&self) -> String {
        match self {
            Answer::Grounded {
                text, citations, ..
            } => {
                let sources = format_sources(citations);
                if sources.is_empty() {
                    text.clone()
                } else {
                    format!("{}\n\n{}", text, sources)
                }
            }
            Answer::NoGrounding => prompts::NO_GROUNDING_REPLY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshReport {
    pub chunks: usize,
    pub from_cache: bool,
}

/// Trim, check and truncate a raw question.
pub fn validate_question(question: &str) -> Result<String> {
    let trimmed = question.trim();
    if trimmed.chars().count() < MIN_QUESTION_CHARS {
        return Err(Error::InvalidQuestion(format!(
            "questions need at least {} characters",
            MIN_QUESTION_CHARS
        )));
    }
    let lower = trimmed.to_lowercase();
    if let Some(pattern) = BLOCKED_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(Error::InvalidQuestion(format!(
            "question contains blocked pattern '{}'",
            pattern
        )));
    }
    Ok(trimmed.chars().take(MAX_QUESTION_CHARS).collect())
}

// Cache files can be large; keep their I/O off the async workers.
async fn load_cached(cache: &IndexCache) -> Option<Vec<IndexEntry>> {
    let cache = cache.clone();
    match tokio::task::spawn_blocking(move || cache.load_if_valid::<Vec<IndexEntry>>()).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cache load task failed: {}", e);
            None
        }
    }
}

async fn save_cached(cache: &IndexCache, snapshot: Arc<Vec<IndexEntry>>) -> Result<()> {
    let cache = cache.clone();
    tokio::task::spawn_blocking(move || cache.save(snapshot.as_ref()))
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))?
}

/// The retrieval-and-completion pipeline: index, cache and completion client
/// wired together.
pub struct DocsAssistant {
    index: Arc<EmbeddingIndex>,
    llm: Arc<CompletionClient>,
    cache: Option<IndexCache>,
    top_k: usize,
}

impl DocsAssistant {
    pub fn new(index: Arc<EmbeddingIndex>, llm: Arc<CompletionClient>, top_k: usize) -> Self {
        Self {
            index,
            llm,
            cache: None,
            top_k,
        }
    }

    pub fn with_cache(mut self, cache: IndexCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn index(&self) -> &EmbeddingIndex {
        &self.index
    }

    pub fn llm(&self) -> &CompletionClient {
        &self.llm
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Load the index from a valid cache, or fetch and embed the corpus.
    ///
    /// `force` skips the cache. A failed cache write is logged and ignored.
    pub async fn refresh(&self, source: &dyn DocumentSource, force: bool) -> Result<RefreshReport> {
        if !force {
            if let Some(cache) = &self.cache {
                if let Some(entries) = load_cached(cache).await {
                    match self.index.restore(entries).await {
                        Ok(chunks) => {
                            return Ok(RefreshReport {
                                chunks,
                                from_cache: true,
                            })
                        }
                        Err(e) => warn!("Cached index unusable, rebuilding: {}", e),
                    }
                }
            }
        }

        let documents = source.fetch_all().await?;
        info!(documents = documents.len(), force, "Rebuilding index from source");
        let chunks = self.index.build(documents).await?;

        if let Some(cache) = &self.cache {
            let snapshot = self.index.snapshot().await;
            if let Err(e) = save_cached(cache, snapshot).await {
                warn!(path = %cache.path().display(), "Failed to save index cache: {}", e);
            }
        }

        Ok(RefreshReport {
            chunks,
            from_cache: false,
        })
    }

    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        self.index.search(query, top_k).await
    }

    /// The validated question and the passages `answer` grounds it on.
    pub async fn retrieve(&self, question: &str) -> Result<(String, Vec<SearchResult>)> {
        let question = validate_question(question)?;
        let results = self.index.search(&question, self.top_k).await?;
        Ok((question, results))
    }

    /// Answer `question` from the indexed documentation.
    ///
    /// `provider` pins a single backend and disables fallback.
    pub async fn answer(&self, question: &str, provider: Option<&str>) -> Result<Answer> {
        let (question, results) = self.retrieve(question).await?;
        let context = format_context(&results);

        if is_no_context(&context) {
            info!("No relevant documentation for question");
            return Ok(Answer::NoGrounding);
        }

        debug!(
            results = results.len(),
            context_len = context.len(),
            "Context assembled"
        );

        let messages = vec![
            Message::system(prompts::build_system_prompt(&context)),
            Message::user(question),
        ];
        let response = self.llm.complete(&messages, provider).await?;

        info!(
            provider = %response.provider,
            model = %response.model,
            answer_len = response.content.len(),
            "Answer generated"
        );

        Ok(Answer::Grounded {
            text: response.content,
            provider: response.provider,
            model: response.model,
            usage: response.usage,
            citations: collect_citations(&results),
        })
    }
}
