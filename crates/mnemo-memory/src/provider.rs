//! Facade orchestrating filter, scoring, embedding, eviction, and
//! persistence behind a single reader/writer lock.

use chrono::Utc;
use mnemo_embed::{EmbedError, EmbeddingProvider};
use tokio::sync::RwLock;

use crate::config::MemoryConfig;
use crate::error::MemoryError;
use crate::eviction;
use crate::filter::MemoryFilter;
use crate::importance;
use crate::record::{MemoryMessage, QueryHit, RecordDraft, build_memory_text};
use crate::store::MemoryStore;

pub struct MemoryProvider<P: EmbeddingProvider> {
    store: RwLock<MemoryStore>,
    embedder: P,
    filter: MemoryFilter,
    config: MemoryConfig,
}

impl<P: EmbeddingProvider> std::fmt::Debug for MemoryProvider<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryProvider")
            .field("embedder", &self.embedder.name())
            .finish_non_exhaustive()
    }
}

impl<P: EmbeddingProvider> MemoryProvider<P> {
    /// Open the provider, loading persisted state when present.
    ///
    /// A missing pair starts empty; an unreadable or mismatched pair is
    /// logged and replaced by an empty store rather than failing startup.
    pub fn open(config: MemoryConfig, embedder: P) -> Self {
        let store = match MemoryStore::load(
            &config.storage.index_path,
            &config.storage.metadata_path,
            config.dimension,
            config.metric,
        ) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!("persisted memory unusable, starting empty: {e}");
                MemoryStore::new(config.dimension, config.metric)
            }
        };
        if !store.is_empty() {
            tracing::info!(records = store.len(), "loaded persisted memories");
        }

        let filter = MemoryFilter::new(&config.memory_filter);
        Self {
            store: RwLock::new(store),
            embedder,
            filter,
            config,
        }
    }

    /// Remember the given messages.
    ///
    /// Each message is filtered, scored, and embedded (batched across the
    /// whole call); records are then inserted under one write lock, eviction
    /// runs if the count crossed the clean threshold, and the pair is
    /// persisted. Returns the number of records stored.
    ///
    /// A message rejected by the filter is skipped without an embedding
    /// call. A failed embedding batch is skipped with a warning and does not
    /// block the others.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingUnavailable` when every accepted message failed to
    /// embed, `CapacityInvariantViolation` if the store still exceeds
    /// capacity after eviction, or an I/O error from persistence.
    pub async fn save_memory(&self, messages: &[MemoryMessage]) -> Result<usize, MemoryError> {
        let now = Utc::now();

        let mut drafts: Vec<RecordDraft> = Vec::new();
        for message in messages {
            if !self.filter.accept(&message.content) {
                continue;
            }
            drafts.push(RecordDraft {
                text: build_memory_text(message, now),
                importance: importance::score(&message.content),
                timestamp: message.timestamp.unwrap_or(now),
                role: Some(message.role.clone()),
                tool_name: message.tool_name.clone(),
                tool_call_id: message.tool_call_id.clone(),
            });
        }
        if drafts.is_empty() {
            return Ok(0);
        }

        // Embedding completion is a prerequisite for insertion; it happens
        // outside the write lock so readers keep flowing.
        let mut embedded: Vec<(RecordDraft, Vec<f32>)> = Vec::with_capacity(drafts.len());
        let mut last_embed_error: Option<EmbedError> = None;
        for chunk in drafts.chunks(self.config.embedding.max_batch_size.max(1)) {
            let texts: Vec<String> = chunk.iter().map(|d| d.text.clone()).collect();
            match self.embedder.embed_batch(&texts).await {
                Ok(vectors) if vectors.len() == chunk.len() => {
                    embedded.extend(chunk.iter().cloned().zip(vectors));
                }
                Ok(vectors) => {
                    tracing::warn!(
                        expected = chunk.len(),
                        got = vectors.len(),
                        "embedding batch came back misshapen, skipping it"
                    );
                    last_embed_error = Some(EmbedError::BatchShape {
                        expected: chunk.len(),
                        got: vectors.len(),
                    });
                }
                Err(e) => {
                    tracing::warn!("embedding batch failed, skipping {} messages: {e}", chunk.len());
                    last_embed_error = Some(e);
                }
            }
        }

        if embedded.is_empty() {
            return match last_embed_error {
                Some(e) => Err(MemoryError::EmbeddingUnavailable(e)),
                None => Ok(0),
            };
        }

        let mut stored = 0usize;
        let mut store = self.store.write().await;
        for (draft, vector) in embedded {
            match store.insert(draft, vector) {
                Ok(_) => stored += 1,
                Err(MemoryError::DimensionMismatch { expected, got }) => {
                    tracing::warn!(expected, got, "rejecting embedding with wrong dimension");
                }
                Err(e) => return Err(e),
            }
        }

        if eviction::due(store.len(), self.config.max_memories, self.config.clean_threshold) {
            let plan = eviction::plan(
                &store.eviction_view(),
                self.config.max_memories,
                self.config.retain_floor(),
            );
            if !plan.evicted.is_empty() {
                tracing::info!(
                    evicted = plan.evicted.len(),
                    remaining = store.len() - plan.evicted.len(),
                    "evicting memories past the clean threshold"
                );
                store.remove(&plan.evicted);
            }
        }

        if store.len() > self.config.max_memories {
            return Err(MemoryError::CapacityInvariantViolation {
                count: store.len(),
                max: self.config.max_memories,
            });
        }

        store.save(
            &self.config.storage.index_path,
            &self.config.storage.metadata_path,
        )?;
        Ok(stored)
    }

    /// Retrieve the most relevant memories for a query, ordered by
    /// descending similarity.
    ///
    /// An empty store returns an empty result without touching the
    /// embedder, as does a query where nothing clears the similarity
    /// threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding the query fails.
    pub async fn query_memory(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<QueryHit>, MemoryError> {
        {
            let store = self.store.read().await;
            if store.is_empty() {
                return Ok(Vec::new());
            }
        }

        let texts = [query.to_owned()];
        let query_vector = self
            .embedder
            .embed_batch(&texts)
            .await?
            .into_iter()
            .next()
            .ok_or(MemoryError::Embed(EmbedError::EmptyResponse {
                provider: "query",
            }))?;

        let store = self.store.read().await;
        store.search(&query_vector, limit, self.config.similarity_threshold)
    }

    /// Forget everything and persist the empty pair.
    ///
    /// # Errors
    ///
    /// Returns an error if persistence fails.
    pub async fn reset(&self) -> Result<(), MemoryError> {
        let mut store = self.store.write().await;
        store.clear();
        store.save(
            &self.config.storage.index_path,
            &self.config.storage.metadata_path,
        )?;
        tracing::info!("memory store reset");
        Ok(())
    }

    /// Number of records currently stored.
    pub async fn count(&self) -> usize {
        self.store.read().await.len()
    }
}
