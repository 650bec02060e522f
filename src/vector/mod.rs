//! Vector search functionality for occupation classification.
//!
//! This module provides the embedding and approximate nearest-neighbor
//! building blocks used by the index store: text embedding generation,
//! memory-mapped vector storage, and K-means clustering.
//!
//! # Architecture
//! Search uses IVFFlat (Inverted File with Flat vectors) indexing with
//! K-means clustering to achieve sub-linear search performance. Vectors
//! are stored in memory-mapped files for instant loading and minimal
//! memory overhead.

mod clustering;
mod embedding;
mod storage;
mod types;

// Re-export core types for public API
pub use clustering::{
    ClusteringError, KMeansResult, assign_to_nearest_centroid, cosine_similarity,
    kmeans_clustering, rank_clusters_by_similarity,
};
#[cfg(test)]
pub use embedding::MockEmbeddingGenerator;
pub use embedding::{EmbeddingGenerator, FastEmbedGenerator};
pub use storage::{MmapVectorStorage, VectorStorageError};
pub use types::{
    ClusterId, Score, VECTOR_DIMENSION_768, VectorDimension, VectorError, VectorId,
};
