//! Semantic retrieval over the movie catalog.
//!
//! This module builds a dense-vector index of the catalog using fastembed-rs
//! and answers free-text and similar-movie queries with cosine ranking.
//!
//! # Architecture
//!
//! - `embeddings`: `Encoder` seam and the fastembed implementation
//! - `corpus`: Quality filter and sentence rendering for embedding input
//! - `index`: Immutable generation (matrix, ids, metadata) and ranking
//! - `storage`: Binary file I/O for vectors.bin persistence
//! - `controller`: Lazy, single-flight index build and atomic publish
//! - `filter`: Fail-open attribute predicates
//! - `search`: Query engine used by the serving layer

mod controller;
pub mod corpus;
pub mod embeddings;
pub mod filter;
mod index;
mod search;
mod storage;

pub use controller::{BuildOutcome, IndexController, SemanticSearchError};
pub use embeddings::{EmbeddingModel, EncoderLoader};
pub use filter::SearchFilters;
pub use search::{SearchHit, SemanticSearchService};
pub use storage::VectorStorage;
