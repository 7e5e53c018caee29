//! Index lifecycle and consistency management for the Lookalike service.
//!
//! This crate owns the consistency-critical pieces of the system: the flat
//! vector store, the product-id-to-row mapping that must never diverge from
//! it, the build pipeline that populates both from a product source, the
//! persistence of the pair, and the lifecycle manager that serializes
//! structural mutations against concurrent search traffic.

pub mod build;
pub mod lifecycle;
pub mod mapping;
pub mod persist;
pub mod product;
pub mod source;
pub mod status;
pub mod store;

// Re-export commonly used types
pub use lifecycle::{SearchHit, SearchIndex};
pub use mapping::IdMapping;
pub use persist::PersistPaths;
pub use product::ProductRecord;
pub use source::{DumpSource, MySqlSource, ProductSource, SourceRouter};
pub use status::{HealthReport, IndexPhase, IndexStatus};
pub use store::VectorStore;
