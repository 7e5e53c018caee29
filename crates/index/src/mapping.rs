//! Row-index to product mapping, kept in lockstep with the vector store.

use std::collections::HashMap;

use lookalike_core::{AppError, AppResult};

use crate::product::ProductRecord;

/// Ordered mapping from vector-store row index to product snapshot, with a
/// reverse product-id lookup.
///
/// Row indices are contiguous `0..len` with no gaps and mirror the vector
/// store's assignment exactly; the lifecycle manager appends to both under
/// one critical section so they can never diverge. Removal exists only as
/// part of the delete-rebuild protocol; a standalone remove would shift
/// every later row out from under the store.
#[derive(Debug, Clone, Default)]
pub struct IdMapping {
    entries: Vec<ProductRecord>,
    rows_by_id: HashMap<u64, usize>,
}

impl IdMapping {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mapping from an ordered snapshot sequence.
    ///
    /// Fails when the sequence repeats a product id.
    pub fn from_entries(entries: Vec<ProductRecord>) -> AppResult<Self> {
        let mut mapping = Self::new();
        for entry in entries {
            mapping.append(entry)?;
        }
        Ok(mapping)
    }

    /// Number of mapped rows.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the mapping holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a snapshot, returning its assigned row index.
    ///
    /// Mirrors `VectorStore::append`: the caller pairs the two calls.
    /// Rejects ids already present; replacement goes through the
    /// delete-rebuild protocol instead.
    pub fn append(&mut self, product: ProductRecord) -> AppResult<usize> {
        if self.rows_by_id.contains_key(&product.id) {
            return Err(AppError::Source(format!(
                "product {} is already mapped",
                product.id
            )));
        }
        let row = self.entries.len();
        self.rows_by_id.insert(product.id, row);
        self.entries.push(product);
        Ok(row)
    }

    /// The snapshot at a row index.
    pub fn get(&self, row: usize) -> Option<&ProductRecord> {
        self.entries.get(row)
    }

    /// The row index holding a product id.
    pub fn row_of(&self, product_id: u64) -> Option<usize> {
        self.rows_by_id.get(&product_id).copied()
    }

    /// Whether a product id is mapped.
    pub fn contains(&self, product_id: u64) -> bool {
        self.rows_by_id.contains_key(&product_id)
    }

    /// Row-ordered view of all snapshots.
    pub fn entries(&self) -> &[ProductRecord] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: u64, name: &str) -> ProductRecord {
        ProductRecord {
            id,
            name: name.to_string(),
            description: String::new(),
            image_urls: vec![],
            is_deleted: false,
        }
    }

    #[test]
    fn test_append_assigns_contiguous_rows() {
        let mut mapping = IdMapping::new();
        assert_eq!(mapping.append(product(10, "a")).unwrap(), 0);
        assert_eq!(mapping.append(product(20, "b")).unwrap(), 1);
        assert_eq!(mapping.len(), 2);
    }

    #[test]
    fn test_bidirectional_lookup() {
        let mut mapping = IdMapping::new();
        mapping.append(product(10, "a")).unwrap();
        mapping.append(product(20, "b")).unwrap();

        assert_eq!(mapping.row_of(20), Some(1));
        assert_eq!(mapping.get(1).unwrap().id, 20);
        assert_eq!(mapping.get(1).unwrap().name, "b");
        assert_eq!(mapping.row_of(99), None);
        assert!(mapping.get(2).is_none());
    }

    #[test]
    fn test_append_rejects_duplicate_id() {
        let mut mapping = IdMapping::new();
        mapping.append(product(10, "a")).unwrap();
        let result = mapping.append(product(10, "again"));
        assert!(result.is_err());
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn test_from_entries_preserves_order() {
        let mapping =
            IdMapping::from_entries(vec![product(3, "c"), product(1, "a"), product(2, "b")])
                .unwrap();
        assert_eq!(mapping.get(0).unwrap().id, 3);
        assert_eq!(mapping.get(1).unwrap().id, 1);
        assert_eq!(mapping.get(2).unwrap().id, 2);
        assert_eq!(mapping.row_of(1), Some(1));
    }

    #[test]
    fn test_from_entries_rejects_duplicates() {
        let result = IdMapping::from_entries(vec![product(1, "a"), product(1, "b")]);
        assert!(result.is_err());
    }
}
