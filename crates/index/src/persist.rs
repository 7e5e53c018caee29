//! Durable persistence of the (vector store, id mapping) pair.
//!
//! Two artifacts are written together and read together: a binary
//! vector-store blob and a JSON mapping document. Either one missing, or
//! any incompatibility between them (or with the active embedding model),
//! forces a full rebuild.

use std::fs;
use std::path::{Path, PathBuf};

use lookalike_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::mapping::IdMapping;
use crate::product::ProductRecord;
use crate::store::VectorStore;

/// Leading bytes of the vector blob.
const MAGIC: &[u8; 4] = b"LKVS";

/// Blob format version; bumped on incompatible layout changes.
const FORMAT_VERSION: u32 = 1;

/// Locations of the two persisted artifacts.
#[derive(Debug, Clone)]
pub struct PersistPaths {
    pub index_path: PathBuf,
    pub mapping_path: PathBuf,
}

impl PersistPaths {
    /// Artifact paths under a data directory, using the conventional file
    /// names.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self {
            index_path: data_dir.join("products_index.bin"),
            mapping_path: data_dir.join("mapping.json"),
        }
    }
}

/// On-disk mapping document: the model identity the vectors were produced
/// with, plus the row-ordered product snapshots.
#[derive(Debug, Serialize, Deserialize)]
struct MappingDocument {
    model: String,
    dimension: usize,
    products: Vec<ProductRecord>,
}

/// Persist the pair. The blob and the document are each written to a
/// temporary file and renamed into place, so a crash mid-write never
/// leaves a truncated artifact behind.
pub fn save(
    store: &VectorStore,
    mapping: &IdMapping,
    model_name: &str,
    paths: &PersistPaths,
) -> AppResult<()> {
    if let Some(parent) = paths.index_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::Persistence(format!("Failed to create data dir: {}", e)))?;
    }

    let blob = encode_blob(store);
    write_atomic(&paths.index_path, &blob)?;

    let document = MappingDocument {
        model: model_name.to_string(),
        dimension: store.dimension(),
        products: mapping.entries().to_vec(),
    };
    let json = serde_json::to_vec(&document)
        .map_err(|e| AppError::Persistence(format!("Failed to serialize mapping: {}", e)))?;
    write_atomic(&paths.mapping_path, &json)?;

    debug!(
        "Persisted index: {} vectors, dimension {}",
        store.len(),
        store.dimension()
    );

    Ok(())
}

/// Load the persisted pair, if present and compatible.
///
/// Returns `Ok(None)` when either artifact is absent. Corrupt artifacts
/// surface as `Persistence` errors and a dimension that disagrees with the
/// active model as `Dimension`; the lifecycle manager treats both as
/// "rebuild from source".
pub fn load(paths: &PersistPaths, expected_dimension: usize) -> AppResult<Option<(VectorStore, IdMapping)>> {
    if !paths.index_path.exists() || !paths.mapping_path.exists() {
        return Ok(None);
    }

    let blob = fs::read(&paths.index_path)
        .map_err(|e| AppError::Persistence(format!("Failed to read vector blob: {}", e)))?;
    let store = decode_blob(&blob)?;

    if store.dimension() != expected_dimension {
        return Err(AppError::Dimension {
            expected: expected_dimension,
            actual: store.dimension(),
        });
    }

    let json = fs::read(&paths.mapping_path)
        .map_err(|e| AppError::Persistence(format!("Failed to read mapping document: {}", e)))?;
    let document: MappingDocument = serde_json::from_slice(&json)
        .map_err(|e| AppError::Persistence(format!("Failed to parse mapping document: {}", e)))?;

    if document.dimension != store.dimension() {
        return Err(AppError::Persistence(format!(
            "Mapping document dimension {} disagrees with vector blob dimension {}",
            document.dimension,
            store.dimension()
        )));
    }

    if document.products.len() != store.len() {
        return Err(AppError::Persistence(format!(
            "Mapping document holds {} products but vector blob holds {} rows",
            document.products.len(),
            store.len()
        )));
    }

    let mapping = IdMapping::from_entries(document.products)
        .map_err(|e| AppError::Persistence(format!("Invalid mapping document: {}", e)))?;

    debug!(
        "Loaded persisted index: {} vectors, dimension {} (model '{}')",
        store.len(),
        store.dimension(),
        document.model
    );

    Ok(Some((store, mapping)))
}

fn encode_blob(store: &VectorStore) -> Vec<u8> {
    let count = store.len();
    let dimension = store.dimension();

    let mut blob = Vec::with_capacity(20 + count * dimension * 4);
    blob.extend_from_slice(MAGIC);
    blob.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    blob.extend_from_slice(&(dimension as u32).to_le_bytes());
    blob.extend_from_slice(&(count as u64).to_le_bytes());

    for row in 0..count {
        // row() is Some for every index below len
        if let Some(vector) = store.row(row) {
            for value in vector {
                blob.extend_from_slice(&value.to_le_bytes());
            }
        }
    }

    blob
}

fn decode_blob(blob: &[u8]) -> AppResult<VectorStore> {
    if blob.len() < 20 {
        return Err(AppError::Persistence(
            "Vector blob too short for header".to_string(),
        ));
    }

    if &blob[0..4] != MAGIC {
        return Err(AppError::Persistence(
            "Vector blob has unknown magic".to_string(),
        ));
    }

    let version = u32::from_le_bytes([blob[4], blob[5], blob[6], blob[7]]);
    if version != FORMAT_VERSION {
        return Err(AppError::Persistence(format!(
            "Unsupported vector blob version {}",
            version
        )));
    }

    let dimension = u32::from_le_bytes([blob[8], blob[9], blob[10], blob[11]]) as usize;
    let count = u64::from_le_bytes([
        blob[12], blob[13], blob[14], blob[15], blob[16], blob[17], blob[18], blob[19],
    ]) as usize;

    let payload = &blob[20..];
    let expected_bytes = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| AppError::Persistence("Vector blob header overflow".to_string()))?;

    if payload.len() != expected_bytes {
        return Err(AppError::Persistence(format!(
            "Vector blob payload is {} bytes, header implies {}",
            payload.len(),
            expected_bytes
        )));
    }

    let mut store = VectorStore::new(dimension);
    let mut vector = Vec::with_capacity(dimension);
    for chunk in payload.chunks_exact(4) {
        vector.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        if vector.len() == dimension {
            store.append(&vector)?;
            vector.clear();
        }
    }

    Ok(store)
}

/// Write bytes to a sibling temp file and rename it into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> AppResult<()> {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes)
        .map_err(|e| AppError::Persistence(format!("Failed to write {:?}: {}", tmp, e)))?;
    fs::rename(&tmp, path)
        .map_err(|e| AppError::Persistence(format!("Failed to move {:?} into place: {}", tmp, e)))?;

    Ok(())
}
