use std::sync::Arc;

use tracing::info;

use crate::answer::DocsAssistant;
use crate::config::{EmbeddingBackend, Settings};
use crate::docs::{Chunker, DirectorySource, UrlTemplate};
use crate::error::Result;
use crate::index::{Embedder, EmbeddingIndex, HashEmbedder, HttpEmbedder, IndexCache};
use crate::llm::CompletionClient;

/// Everything a command needs, constructed once from settings.
pub struct AppState {
    pub settings: Settings,
    pub assistant: DocsAssistant,
    pub source: DirectorySource,
}

impl AppState {
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let embedder: Arc<dyn Embedder> = match settings.embedding.backend {
            EmbeddingBackend::Http => Arc::new(HttpEmbedder::new(
                settings.embedding.base_url.clone(),
                settings.embedding.model.clone(),
                settings.embedding.api_key.clone(),
                settings.request_timeout,
            )?),
            EmbeddingBackend::Hash => Arc::new(HashEmbedder::new(settings.embedding.dimensions)),
        };
        info!(model = %embedder.model_id(), "Embedder initialized");

        let cache = IndexCache::new(
            settings.index.cache_path.clone(),
            settings.index.cache_ttl,
            embedder.model_id(),
        );

        let index = EmbeddingIndex::new(embedder)
            .with_chunker(Chunker::new(settings.index.min_chunk_chars))
            .with_max_chunks(settings.index.max_chunks)
            .with_batch_size(settings.embedding.batch_size)
            .with_concurrency(settings.embedding.concurrency);

        let llm = CompletionClient::from_settings(&settings)?;

        let assistant = DocsAssistant::new(Arc::new(index), Arc::new(llm), settings.index.top_k)
            .with_cache(cache);

        let source = DirectorySource::new(settings.docs.root.clone())
            .with_path_prefix(settings.docs.path_prefix.clone())
            .with_extensions(settings.docs.extensions.clone())
            .with_url_template(
                settings
                    .docs
                    .url_template
                    .as_deref()
                    .and_then(UrlTemplate::parse),
            );

        Ok(Self {
            settings,
            assistant,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_from_settings_wires_hash_backend() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("cache.json");
        let vars: HashMap<&str, String> = HashMap::from([
            ("EMBEDDING_BACKEND", "hash".to_string()),
            ("EMBEDDING_DIMENSIONS", "256".to_string()),
            ("TOP_K", "5".to_string()),
            ("CACHE_PATH", cache_path.display().to_string()),
            ("DOCS_ROOT", dir.path().display().to_string()),
        ]);
        let settings = Settings::from_lookup(|k| vars.get(k).cloned()).unwrap();

        let state = AppState::from_settings(settings).unwrap();
        assert_eq!(state.assistant.index().model_id(), "hash:256");
        assert_eq!(state.assistant.top_k(), 5);
        assert_eq!(state.assistant.llm().primary(), "openai");
        assert_eq!(state.assistant.index().size().await, 0);
    }
}
