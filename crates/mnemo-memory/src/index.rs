//! Exact nearest-neighbor index over fixed-dimension vectors.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::MemoryError;
use crate::record::MemoryId;

/// Similarity metric, fixed for the lifetime of one store instance since
/// mixing metrics invalidates score comparisons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    Dot,
}

/// Flat exact index: linear scan with deterministic ordering. The corpus is
/// bounded by `max_memories`, which keeps exhaustive search viable.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimension: usize,
    metric: SimilarityMetric,
    entries: Vec<(MemoryId, Vec<f32>)>,
}

impl VectorIndex {
    #[must_use]
    pub fn new(dimension: usize, metric: SimilarityMetric) -> Self {
        Self {
            dimension,
            metric,
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a vector under `id`.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` when the vector length disagrees with the
    /// index dimension; nothing is stored in that case.
    pub fn insert(&mut self, id: MemoryId, embedding: Vec<f32>) -> Result<(), MemoryError> {
        if embedding.len() != self.dimension {
            return Err(MemoryError::DimensionMismatch {
                expected: self.dimension,
                got: embedding.len(),
            });
        }
        self.entries.push((id, embedding));
        Ok(())
    }

    /// Delete the vectors for the given ids; absent ids are no-ops.
    pub fn remove(&mut self, ids: &HashSet<MemoryId>) {
        if ids.is_empty() {
            return;
        }
        self.entries.retain(|(id, _)| !ids.contains(id));
    }

    /// Reconstruct the index from scratch with the given entries.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` when any entry has the wrong length; the
    /// previous contents are left untouched in that case.
    pub fn rebuild(&mut self, entries: Vec<(MemoryId, Vec<f32>)>) -> Result<(), MemoryError> {
        for (_, vector) in &entries {
            if vector.len() != self.dimension {
                return Err(MemoryError::DimensionMismatch {
                    expected: self.dimension,
                    got: vector.len(),
                });
            }
        }
        self.entries = entries;
        Ok(())
    }

    /// Return up to `k` entries ranked by descending similarity to `query`.
    ///
    /// Entries scoring below `threshold` are excluded even when among the
    /// top `k`; equal scores resolve toward the lower id.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` when the query vector length disagrees
    /// with the index dimension.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        threshold: f32,
    ) -> Result<Vec<(MemoryId, f32)>, MemoryError> {
        if query.len() != self.dimension {
            return Err(MemoryError::DimensionMismatch {
                expected: self.dimension,
                got: query.len(),
            });
        }

        let mut scored: Vec<(MemoryId, f32)> = self
            .entries
            .iter()
            .map(|(id, vector)| (*id, self.similarity(query, vector)))
            .filter(|(_, score)| *score >= threshold)
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);
        Ok(scored)
    }

    pub(crate) fn entries(&self) -> &[(MemoryId, Vec<f32>)] {
        &self.entries
    }

    fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.metric {
            SimilarityMetric::Cosine => cosine_similarity(a, b),
            SimilarityMetric::Dot => dot_product(a, b),
        }
    }
}

fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = dot_product(a, b);
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(entries: &[(u64, [f32; 3])]) -> VectorIndex {
        let mut index = VectorIndex::new(3, SimilarityMetric::Cosine);
        for (id, vector) in entries {
            index.insert(MemoryId(*id), vector.to_vec()).unwrap();
        }
        index
    }

    #[test]
    fn insert_rejects_wrong_dimension() {
        let mut index = VectorIndex::new(3, SimilarityMetric::Cosine);
        let err = index.insert(MemoryId(1), vec![1.0, 0.0]).unwrap_err();
        assert!(matches!(
            err,
            MemoryError::DimensionMismatch {
                expected: 3,
                got: 2
            }
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn search_ranks_by_descending_similarity() {
        let index = index_with(&[
            (1, [0.0, 1.0, 0.0]),
            (2, [1.0, 0.0, 0.0]),
            (3, [0.7, 0.7, 0.0]),
        ]);
        let hits = index.search(&[1.0, 0.0, 0.0], 3, 0.0).unwrap();
        let ids: Vec<u64> = hits.iter().map(|(id, _)| id.0).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert!((hits[0].1 - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn search_excludes_hits_below_threshold() {
        let index = index_with(&[(1, [1.0, 0.0, 0.0]), (2, [0.0, 1.0, 0.0])]);
        let hits = index.search(&[1.0, 0.0, 0.0], 10, 0.5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, MemoryId(1));
        assert!(hits.iter().all(|(_, score)| *score >= 0.5));
    }

    #[test]
    fn search_breaks_ties_toward_lower_id() {
        let index = index_with(&[(7, [1.0, 0.0, 0.0]), (2, [1.0, 0.0, 0.0])]);
        let hits = index.search(&[1.0, 0.0, 0.0], 2, 0.0).unwrap();
        assert_eq!(hits[0].0, MemoryId(2));
        assert_eq!(hits[1].0, MemoryId(7));
    }

    #[test]
    fn search_caps_results_at_k() {
        let index = index_with(&[
            (1, [1.0, 0.0, 0.0]),
            (2, [0.9, 0.1, 0.0]),
            (3, [0.8, 0.2, 0.0]),
        ]);
        let hits = index.search(&[1.0, 0.0, 0.0], 2, 0.0).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn search_empty_index_returns_empty() {
        let index = VectorIndex::new(3, SimilarityMetric::Cosine);
        assert!(index.search(&[1.0, 0.0, 0.0], 5, 0.0).unwrap().is_empty());
    }

    #[test]
    fn search_rejects_wrong_query_dimension() {
        let index = index_with(&[(1, [1.0, 0.0, 0.0])]);
        assert!(index.search(&[1.0, 0.0], 5, 0.0).is_err());
    }

    #[test]
    fn remove_deletes_only_named_ids() {
        let mut index = index_with(&[(1, [1.0, 0.0, 0.0]), (2, [0.0, 1.0, 0.0])]);
        let ids: HashSet<MemoryId> = [MemoryId(2), MemoryId(99)].into_iter().collect();
        index.remove(&ids);
        assert_eq!(index.len(), 1);
        let hits = index.search(&[0.0, 1.0, 0.0], 5, 0.0).unwrap();
        assert!(hits.iter().all(|(id, _)| *id != MemoryId(2)));
    }

    #[test]
    fn rebuild_replaces_contents() {
        let mut index = index_with(&[(1, [1.0, 0.0, 0.0])]);
        index
            .rebuild(vec![(MemoryId(5), vec![0.0, 1.0, 0.0])])
            .unwrap();
        assert_eq!(index.len(), 1);
        let hits = index.search(&[0.0, 1.0, 0.0], 1, 0.0).unwrap();
        assert_eq!(hits[0].0, MemoryId(5));
    }

    #[test]
    fn rebuild_rejects_wrong_dimension_and_keeps_previous() {
        let mut index = index_with(&[(1, [1.0, 0.0, 0.0])]);
        assert!(index.rebuild(vec![(MemoryId(5), vec![0.0, 1.0])]).is_err());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn dot_metric_skips_normalization() {
        let mut index = VectorIndex::new(2, SimilarityMetric::Dot);
        index.insert(MemoryId(1), vec![2.0, 0.0]).unwrap();
        let hits = index.search(&[3.0, 0.0], 1, 0.0).unwrap();
        assert!((hits[0].1 - 6.0).abs() < f32::EPSILON);
    }

    #[test]
    fn cosine_zero_vector_scores_zero() {
        assert!((cosine_similarity(&[0.0, 0.0], &[1.0, 0.0])).abs() < f32::EPSILON);
    }
}
