pub mod cache;
pub mod embed;
pub mod similarity;

use std::sync::Arc;

use futures::{StreamExt, TryStreamExt};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::docs::{Chunker, Document};
use crate::error::{Error, Result};

pub use cache::IndexCache;
pub use embed::{Embedder, HashEmbedder, HttpEmbedder};
pub use similarity::{cosine_similarity, IndexEntry, SearchResult};

pub const DEFAULT_MAX_CHUNKS: usize = 5000;
pub const DEFAULT_BATCH_SIZE: usize = 32;
pub const DEFAULT_EMBED_CONCURRENCY: usize = 1;

/// In-memory semantic index over document chunks.
///
/// The corpus is capped at `max_chunks`: when more chunks are produced, the
/// first `max_chunks` in corpus order are kept and the rest are dropped. This
/// is a resource bound, not a relevance filter.
///
/// Readers always see a complete index: a rebuild computes the new entries
/// without holding the lock and swaps them in at the end.
pub struct EmbeddingIndex {
    embedder: Arc<dyn Embedder>,
    chunker: Chunker,
    max_chunks: usize,
    batch_size: usize,
    /// Number of embedding batches in flight during a build.
    concurrency: usize,
    entries: RwLock<Arc<Vec<IndexEntry>>>,
}

impl EmbeddingIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            chunker: Chunker::default(),
            max_chunks: DEFAULT_MAX_CHUNKS,
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_EMBED_CONCURRENCY,
            entries: RwLock::new(Arc::new(Vec::new())),
        }
    }

    pub fn with_chunker(mut self, chunker: Chunker) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn with_max_chunks(mut self, max_chunks: usize) -> Self {
        self.max_chunks = max_chunks;
        self
    }

    /// Batch size only affects request sizes, never the vectors.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Number of embedding batches in flight at once. Results keep corpus
    /// order regardless.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn model_id(&self) -> &str {
        self.embedder.model_id()
    }

    pub async fn size(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Current entries; cheap to clone and stable across later rebuilds.
    pub async fn snapshot(&self) -> Arc<Vec<IndexEntry>> {
        self.entries.read().await.clone()
    }

    /// Replace the whole index with freshly embedded `documents`.
    ///
    /// Returns the number of indexed chunks. On failure the index is left
    /// empty, never partially rebuilt.
    pub async fn build(&self, documents: Vec<Document>) -> Result<usize> {
        let mut chunks = self.chunker.chunk_all(&documents);
        if chunks.len() > self.max_chunks {
            warn!(
                total = chunks.len(),
                kept = self.max_chunks,
                dropped = chunks.len() - self.max_chunks,
                "Chunk count exceeds max_chunks, truncating"
            );
            chunks.truncate(self.max_chunks);
        }

        info!(
            documents = documents.len(),
            chunks = chunks.len(),
            model = %self.embedder.model_id(),
            "Building embedding index"
        );

        match self.embed_chunks(chunks).await {
            Ok(entries) => {
                let count = entries.len();
                *self.entries.write().await = Arc::new(entries);
                info!(count, "Embedding index ready");
                Ok(count)
            }
            Err(e) => {
                *self.entries.write().await = Arc::new(Vec::new());
                Err(e)
            }
        }
    }

    async fn embed_chunks(&self, chunks: Vec<crate::docs::Chunk>) -> Result<Vec<IndexEntry>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embedder = &self.embedder;
        let batches: Vec<Vec<Vec<f32>>> = futures::stream::iter(texts.chunks(self.batch_size))
            .map(|batch| async move {
                let vectors = embedder.encode_batch(batch).await?;
                if vectors.len() != batch.len() {
                    return Err(Error::Decode(format!(
                        "embedder returned {} vectors for {} texts",
                        vectors.len(),
                        batch.len()
                    )));
                }
                debug!(batch = batch.len(), "batch embedded");
                Ok::<_, Error>(vectors)
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let vectors: Vec<Vec<f32>> = batches.into_iter().flatten().collect();
        check_dimensions(&vectors)?;

        Ok(chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry { chunk, vector })
            .collect())
    }

    /// Install previously computed entries, e.g. from the on-disk cache.
    pub async fn restore(&self, mut entries: Vec<IndexEntry>) -> Result<usize> {
        let vectors: Vec<&[f32]> = entries.iter().map(|e| e.vector.as_slice()).collect();
        check_dimensions(&vectors)?;
        entries.truncate(self.max_chunks);
        let count = entries.len();
        *self.entries.write().await = Arc::new(entries);
        info!(count, "Embedding index restored");
        Ok(count)
    }

    /// Up to `top_k` chunks ranked by cosine similarity to `query`.
    ///
    /// Ties are broken by corpus order. An empty index or `top_k == 0` gives
    /// an empty result without contacting the embedder.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        let entries = self.snapshot().await;
        if top_k == 0 || entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.encode(query).await?;
        let results = similarity::rank(&entries, &query_vector, top_k);
        debug!(
            top_k,
            returned = results.len(),
            best = ?results.first().map(|r| r.score),
            "search complete"
        );
        Ok(results)
    }
}

fn check_dimensions<V: AsRef<[f32]>>(vectors: &[V]) -> Result<()> {
    let Some(first) = vectors.first() else {
        return Ok(());
    };
    let dims = first.as_ref().len();
    if dims == 0 {
        return Err(Error::Decode("embedding vectors are empty".to_string()));
    }
    if let Some(bad) = vectors.iter().find(|v| v.as_ref().len() != dims) {
        return Err(Error::Decode(format!(
            "inconsistent embedding dimensions: {} vs {}",
            dims,
            bad.as_ref().len()
        )));
    }
    Ok(())
}
