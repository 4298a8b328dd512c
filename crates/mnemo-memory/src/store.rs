//! The owning pair of vector index and record metadata.
//!
//! The two substructures are never exposed independently: every mutation
//! goes through `MemoryStore`, so index and metadata membership cannot
//! diverge while the process is running. On disk they become two files, an
//! index snapshot and a human-inspectable record map, reconciled on load.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MemoryError;
use crate::eviction::EvictionCandidate;
use crate::index::{SimilarityMetric, VectorIndex};
use crate::record::{MemoryId, MemoryRecord, QueryHit, RecordDraft};

pub struct MemoryStore {
    index: VectorIndex,
    records: BTreeMap<MemoryId, MemoryRecord>,
    next_id: u64,
}

/// On-disk form of the vector index.
#[derive(Serialize, Deserialize)]
struct IndexSnapshot {
    dimension: usize,
    metric: SimilarityMetric,
    next_id: u64,
    vectors: Vec<VectorEntry>,
}

#[derive(Serialize, Deserialize)]
struct VectorEntry {
    id: MemoryId,
    vector: Vec<f32>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("records", &self.records.len())
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new(dimension: usize, metric: SimilarityMetric) -> Self {
        Self {
            index: VectorIndex::new(dimension, metric),
            records: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Insert a record and its embedding under a freshly assigned id.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` when the embedding has the wrong length;
    /// neither side of the pair is touched and no id is consumed.
    pub fn insert(
        &mut self,
        draft: RecordDraft,
        embedding: Vec<f32>,
    ) -> Result<MemoryId, MemoryError> {
        let id = MemoryId(self.next_id);
        self.index.insert(id, embedding)?;
        self.next_id += 1;
        self.records.insert(
            id,
            MemoryRecord {
                id,
                text: draft.text,
                importance: draft.importance,
                timestamp: draft.timestamp,
                role: draft.role,
                tool_name: draft.tool_name,
                tool_call_id: draft.tool_call_id,
            },
        );
        Ok(id)
    }

    /// Remove the given ids from both the index and the metadata map.
    pub fn remove(&mut self, ids: &HashSet<MemoryId>) {
        if ids.is_empty() {
            return;
        }
        self.index.remove(ids);
        self.records.retain(|id, _| !ids.contains(id));
    }

    /// Search the index and hydrate the hits from metadata, ordered by
    /// descending similarity.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` when the query vector has the wrong
    /// length.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        threshold: f32,
    ) -> Result<Vec<QueryHit>, MemoryError> {
        let hits = self.index.search(query, k, threshold)?;
        Ok(hits
            .into_iter()
            .filter_map(|(id, similarity)| {
                self.records.get(&id).map(|record| QueryHit {
                    record: record.clone(),
                    similarity,
                })
            })
            .collect())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: MemoryId) -> Option<&MemoryRecord> {
        self.records.get(&id)
    }

    /// Id/importance/timestamp triples for the eviction planner.
    #[must_use]
    pub fn eviction_view(&self) -> Vec<EvictionCandidate> {
        self.records
            .values()
            .map(|r| EvictionCandidate {
                id: r.id,
                importance: r.importance,
                timestamp: r.timestamp,
            })
            .collect()
    }

    /// Drop everything and restart the id counter.
    pub fn clear(&mut self) {
        self.index = VectorIndex::new(self.index.dimension(), self.index.metric());
        self.records.clear();
        self.next_id = 1;
    }

    /// Persist the index/metadata pair.
    ///
    /// Each file is written to a temporary sibling and atomically renamed
    /// over the destination, so a crash never leaves a torn file; a crash
    /// between the two renames leaves a mismatched pair that load heals by
    /// intersection.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any file operation fails.
    pub fn save(&self, index_path: &Path, metadata_path: &Path) -> Result<(), MemoryError> {
        let snapshot = IndexSnapshot {
            dimension: self.index.dimension(),
            metric: self.index.metric(),
            next_id: self.next_id,
            vectors: self
                .index
                .entries()
                .iter()
                .map(|(id, vector)| VectorEntry {
                    id: *id,
                    vector: vector.clone(),
                })
                .collect(),
        };

        write_atomic(index_path, &serde_json::to_vec(&snapshot)?)?;
        write_atomic(metadata_path, &serde_json::to_vec_pretty(&self.records)?)?;
        tracing::debug!(records = self.records.len(), "persisted memory store");
        Ok(())
    }

    /// Load a store from the persisted pair.
    ///
    /// A fully missing pair starts empty. Ids present in only one file are
    /// dropped with a warning and the index is rebuilt from the
    /// intersection.
    ///
    /// # Errors
    ///
    /// Returns `StorageCorrupt` when a file fails to parse or the persisted
    /// dimension/metric disagree with the configured ones, and `Io` when a
    /// present file cannot be read.
    pub fn load(
        index_path: &Path,
        metadata_path: &Path,
        dimension: usize,
        metric: SimilarityMetric,
    ) -> Result<Self, MemoryError> {
        let snapshot: Option<IndexSnapshot> = read_json(index_path)?;
        let metadata: Option<BTreeMap<MemoryId, MemoryRecord>> = read_json(metadata_path)?;

        let (snapshot, mut records) = match (snapshot, metadata) {
            (None, None) => return Ok(Self::new(dimension, metric)),
            (Some(snapshot), None) => {
                tracing::warn!(
                    vectors = snapshot.vectors.len(),
                    "metadata file missing, dropping unmatched vectors"
                );
                let mut store = Self::new(dimension, metric);
                store.next_id = snapshot.next_id.max(1);
                return Ok(store);
            }
            (None, Some(records)) => {
                tracing::warn!(
                    records = records.len(),
                    "index file missing, dropping unmatched metadata"
                );
                let mut store = Self::new(dimension, metric);
                store.next_id = records.keys().next_back().map_or(1, |id| id.0 + 1);
                return Ok(store);
            }
            (Some(snapshot), Some(records)) => (snapshot, records),
        };

        if snapshot.dimension != dimension || snapshot.metric != metric {
            return Err(MemoryError::StorageCorrupt(format!(
                "persisted index is {}-dimensional {:?}, store configured as {}-dimensional {:?}",
                snapshot.dimension, snapshot.metric, dimension, metric
            )));
        }

        let vector_ids: HashSet<MemoryId> = snapshot.vectors.iter().map(|e| e.id).collect();
        let record_ids: HashSet<MemoryId> = records.keys().copied().collect();
        let dropped = vector_ids.symmetric_difference(&record_ids).count();
        if dropped > 0 {
            tracing::warn!(dropped, "index/metadata id mismatch, keeping the intersection");
        }

        records.retain(|id, _| vector_ids.contains(id));
        let entries: Vec<(MemoryId, Vec<f32>)> = snapshot
            .vectors
            .into_iter()
            .filter(|e| record_ids.contains(&e.id))
            .map(|e| (e.id, e.vector))
            .collect();

        let mut store = Self::new(dimension, metric);
        store.index.rebuild(entries)?;
        let max_id = records.keys().next_back().map_or(0, |id| id.0);
        store.next_id = snapshot.next_id.max(max_id + 1);
        store.records = records;
        Ok(store)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, MemoryError> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(path)?;
    let value = serde_json::from_slice(&bytes)
        .map_err(|e| MemoryError::StorageCorrupt(format!("{}: {e}", path.display())))?;
    Ok(Some(value))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), MemoryError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| MemoryError::Io(e.error))?;
    Ok(())
}
