//! In-memory flat vector store with exact inner-product search.

use lookalike_core::{AppError, AppResult};

/// Flat, append-only store of L2-normalized embedding vectors.
///
/// Vectors live in one row-major buffer; a row's index is assigned at
/// append time and stays valid until the next `rebuild_from`. There is no
/// per-row delete: removal happens only through the rebuild protocol driven
/// by the lifecycle manager, which is the documented O(N) cost of
/// supporting deletion on an append-only structure.
#[derive(Debug, Clone)]
pub struct VectorStore {
    dimension: usize,
    data: Vec<f32>,
}

impl VectorStore {
    /// Create an empty store for vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// The fixed vector dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of vectors currently stored.
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    /// Whether the store holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a vector, returning its assigned row index.
    ///
    /// The only failure mode is a dimension mismatch.
    pub fn append(&mut self, vector: &[f32]) -> AppResult<usize> {
        if vector.len() != self.dimension {
            return Err(AppError::Dimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        let row = self.len();
        self.data.extend_from_slice(vector);
        Ok(row)
    }

    /// The vector stored at a row index, if present.
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        if index >= self.len() {
            return None;
        }
        let start = index * self.dimension;
        Some(&self.data[start..start + self.dimension])
    }

    /// Exact inner-product search.
    ///
    /// Returns up to `top_k` `(row_index, score)` pairs ordered by
    /// descending score, ties broken by lower row index. An empty store
    /// yields an empty result, not an error.
    pub fn search(&self, query: &[f32], top_k: usize) -> AppResult<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(AppError::Dimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension.max(1))
            .map(|row| row.iter().zip(query).map(|(a, b)| a * b).sum::<f32>())
            .enumerate()
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(top_k);

        Ok(scored)
    }

    /// Replace the entire backing array with a new ordered vector sequence.
    ///
    /// Used exclusively by the delete-rebuild protocol. Validation happens
    /// before any mutation, so a failed rebuild leaves the store untouched;
    /// the lifecycle manager performs the actual reader-visible swap under
    /// its write lock.
    pub fn rebuild_from(&mut self, vectors: Vec<Vec<f32>>) -> AppResult<()> {
        for vector in &vectors {
            if vector.len() != self.dimension {
                return Err(AppError::Dimension {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
        }

        let mut data = Vec::with_capacity(vectors.len() * self.dimension);
        for vector in &vectors {
            data.extend_from_slice(vector);
        }
        self.data = data;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_assigns_contiguous_rows() {
        let mut store = VectorStore::new(2);
        assert_eq!(store.append(&[1.0, 0.0]).unwrap(), 0);
        assert_eq!(store.append(&[0.0, 1.0]).unwrap(), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.row(0).unwrap(), &[1.0, 0.0]);
        assert_eq!(store.row(1).unwrap(), &[0.0, 1.0]);
        assert!(store.row(2).is_none());
    }

    #[test]
    fn test_append_dimension_mismatch() {
        let mut store = VectorStore::new(3);
        let result = store.append(&[1.0, 0.0]);
        assert!(matches!(
            result,
            Err(AppError::Dimension {
                expected: 3,
                actual: 2
            })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_search_orders_by_score_descending() {
        let mut store = VectorStore::new(2);
        store.append(&[0.0, 1.0]).unwrap();
        store.append(&[1.0, 0.0]).unwrap();
        store.append(&[0.7071, 0.7071]).unwrap();

        let results = store.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, 1);
        assert_eq!(results[1].0, 2);
        assert_eq!(results[2].0, 0);
        assert!(results[0].1 > results[1].1);
        assert!(results[1].1 > results[2].1);
    }

    #[test]
    fn test_search_ties_prefer_lower_row() {
        let mut store = VectorStore::new(2);
        store.append(&[1.0, 0.0]).unwrap();
        store.append(&[1.0, 0.0]).unwrap();

        let results = store.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(results[0].0, 0);
        assert_eq!(results[1].0, 1);
    }

    #[test]
    fn test_search_truncates_to_top_k() {
        let mut store = VectorStore::new(2);
        for _ in 0..5 {
            store.append(&[1.0, 0.0]).unwrap();
        }
        let results = store.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_search_fewer_than_top_k() {
        let mut store = VectorStore::new(2);
        store.append(&[1.0, 0.0]).unwrap();
        let results = store.search(&[1.0, 0.0], 10).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_search_empty_store() {
        let store = VectorStore::new(4);
        let results = store.search(&[0.5, 0.5, 0.5, 0.5], 5).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_rebuild_from_replaces_contents() {
        let mut store = VectorStore::new(2);
        store.append(&[1.0, 0.0]).unwrap();
        store.append(&[0.0, 1.0]).unwrap();

        store
            .rebuild_from(vec![vec![0.0, 1.0], vec![0.6, 0.8]])
            .unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.row(0).unwrap(), &[0.0, 1.0]);
        assert_eq!(store.row(1).unwrap(), &[0.6, 0.8]);
    }

    #[test]
    fn test_rebuild_from_rejects_bad_dimension_without_mutating() {
        let mut store = VectorStore::new(2);
        store.append(&[1.0, 0.0]).unwrap();

        let result = store.rebuild_from(vec![vec![0.0, 1.0], vec![1.0, 2.0, 3.0]]);
        assert!(result.is_err());
        // Failed rebuild leaves the previous contents intact
        assert_eq!(store.len(), 1);
        assert_eq!(store.row(0).unwrap(), &[1.0, 0.0]);
    }

    #[test]
    fn test_rebuild_from_empty_clears() {
        let mut store = VectorStore::new(2);
        store.append(&[1.0, 0.0]).unwrap();
        store.rebuild_from(Vec::new()).unwrap();
        assert!(store.is_empty());
    }
}
