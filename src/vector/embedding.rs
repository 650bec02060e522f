//! Embedding generation for occupation titles and user queries.
//!
//! This module provides the trait and implementations for generating
//! vector embeddings from text. The production implementation uses
//! fastembed with a multilingual sentence-transformer model so that
//! queries phrased in everyday language (and in languages other than
//! English) can still match catalog titles.

use crate::vector::{VECTOR_DIMENSION_768, VectorDimension, VectorError};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::Path;
use std::sync::Mutex;

/// Trait for generating embeddings from text.
///
/// Implementations of this trait should be thread-safe and
/// capable of handling batch processing efficiently.
pub trait EmbeddingGenerator: Send + Sync {
    /// Generate embeddings for multiple texts.
    ///
    /// Returns one embedding per input text, in input order.
    fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError>;

    /// Get the dimension of embeddings produced by this generator.
    #[must_use]
    fn dimension(&self) -> VectorDimension;

    /// Model identifier recorded in index metadata.
    ///
    /// An index built with one model must not be queried with another.
    fn model_name(&self) -> &str;
}

/// Resolves a configured model name to a fastembed model and its dimension.
///
/// Only multilingual models (plus the small English baseline) are
/// supported, since catalog queries arrive in multiple languages.
fn resolve_model(name: &str) -> Result<(EmbeddingModel, usize), VectorError> {
    match name {
        "ParaphraseMLMpnetBaseV2" => Ok((EmbeddingModel::ParaphraseMLMpnetBaseV2, 768)),
        "ParaphraseMLMiniLML12V2" => Ok((EmbeddingModel::ParaphraseMLMiniLML12V2, 384)),
        "ParaphraseMLMiniLML12V2Q" => Ok((EmbeddingModel::ParaphraseMLMiniLML12V2Q, 384)),
        "MultilingualE5Small" => Ok((EmbeddingModel::MultilingualE5Small, 384)),
        "AllMiniLML6V2" => Ok((EmbeddingModel::AllMiniLML6V2, 384)),
        other => Err(VectorError::EmbeddingFailed(format!(
            "Unknown embedding model: {other}. Supported: ParaphraseMLMpnetBaseV2, ParaphraseMLMiniLML12V2, ParaphraseMLMiniLML12V2Q, MultilingualE5Small, AllMiniLML6V2"
        ))),
    }
}

/// FastEmbed implementation, defaulting to the multilingual
/// paraphrase-multilingual-mpnet-base-v2 model (768 dimensions).
pub struct FastEmbedGenerator {
    model: Mutex<TextEmbedding>,
    model_name: String,
    dimension: VectorDimension,
}

impl FastEmbedGenerator {
    /// Create a generator for the named model, caching model files under
    /// `cache_dir`.
    ///
    /// # Errors
    /// Returns an error if the model name is unknown or the model fails
    /// to initialize or download.
    pub fn new(model_name: &str, cache_dir: &Path) -> Result<Self, VectorError> {
        Self::with_progress(model_name, cache_dir, false)
    }

    /// Create a generator, optionally showing download progress for
    /// first-time model fetches.
    pub fn with_progress(
        model_name: &str,
        cache_dir: &Path,
        show_progress: bool,
    ) -> Result<Self, VectorError> {
        let (model_id, dim) = resolve_model(model_name)?;

        let model = TextEmbedding::try_new(
            InitOptions::new(model_id)
                .with_cache_dir(cache_dir.to_path_buf())
                .with_show_download_progress(show_progress),
        )
        .map_err(|e| VectorError::EmbeddingFailed(
            format!("Failed to initialize embedding model: {e}. Ensure you have internet connection for first-time model download")
        ))?;

        Ok(Self {
            model: Mutex::new(model),
            model_name: model_name.to_string(),
            dimension: VectorDimension::new(dim)?,
        })
    }
}

impl EmbeddingGenerator for FastEmbedGenerator {
    fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // fastembed expects Vec<String> for the embed method
        let text_strings: Vec<String> = texts.iter().map(|&s| s.to_string()).collect();

        let embeddings = self
            .model
            .lock()
            .map_err(|_| {
                VectorError::EmbeddingFailed(
                    "Failed to acquire embedding model lock - model may be poisoned".to_string(),
                )
            })?
            .embed(text_strings, None)
            .map_err(|e| {
                VectorError::EmbeddingFailed(format!("Failed to generate embeddings: {e}"))
            })?;

        let expected = self.dimension.get();
        for embedding in embeddings.iter() {
            if embedding.len() != expected {
                return Err(VectorError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Mock embedding generator for testing.
///
/// Generates deterministic embeddings based on text content, useful for
/// unit tests that must not download a model.
#[cfg(test)]
pub struct MockEmbeddingGenerator {
    dimension: VectorDimension,
}

#[cfg(test)]
impl Default for MockEmbeddingGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl MockEmbeddingGenerator {
    /// Create a new mock generator with the standard 768 dimensions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dimension: VectorDimension::dimension_768(),
        }
    }

    /// Create a generator with custom dimension for testing.
    #[must_use]
    pub fn with_dimension(dimension: VectorDimension) -> Self {
        Self { dimension }
    }
}

#[cfg(test)]
impl EmbeddingGenerator for MockEmbeddingGenerator {
    fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError> {
        let dim = self.dimension.get();
        let mut embeddings = Vec::new();

        for text in texts {
            let lower = text.to_lowercase();
            let mut embedding = vec![0.1; dim];

            // Keyword patterns loosely mirroring occupation families
            if (lower.contains("tailor") || lower.contains("sew")) && dim > 1 {
                embedding[0] = 0.9;
                embedding[1] = 0.8;
            }
            if (lower.contains("weld") || lower.contains("metal")) && dim > 3 {
                embedding[2] = 0.85;
                embedding[3] = 0.75;
            }
            if (lower.contains("teach") || lower.contains("school")) && dim > 5 {
                embedding[4] = 0.8;
                embedding[5] = 0.7;
            }
            if lower.contains("farm") && dim > 7 {
                embedding[6] = 0.9;
                embedding[7] = 0.85;
            }

            // Normalize to unit length (like real embeddings)
            let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            if magnitude > 0.0 {
                for val in &mut embedding {
                    *val /= magnitude;
                }
            }

            embeddings.push(embedding);
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_embedding_generator() {
        let generator = MockEmbeddingGenerator::new();

        let texts = vec!["Tailor, General"];
        let embeddings = generator.generate_embeddings(&texts).unwrap();

        assert_eq!(embeddings.len(), 1);
        assert_eq!(embeddings[0].len(), VECTOR_DIMENSION_768);

        // Verify normalization
        let magnitude: f32 = embeddings[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_mock_batch_embeddings() {
        let generator = MockEmbeddingGenerator::new();

        let texts = vec!["Tailor, General", "Welder, Gas", "School Teacher, Primary"];
        let embeddings = generator.generate_embeddings(&texts).unwrap();

        assert_eq!(embeddings.len(), 3);
        for embedding in &embeddings {
            assert_eq!(embedding.len(), VECTOR_DIMENSION_768);
        }
    }

    #[test]
    fn test_mock_determinism() {
        let generator = MockEmbeddingGenerator::new();

        let a = generator.generate_embeddings(&["sewing machine"]).unwrap();
        let b = generator.generate_embeddings(&["sewing machine"]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_resolve_model_names() {
        assert!(resolve_model("ParaphraseMLMpnetBaseV2").is_ok());
        assert_eq!(resolve_model("ParaphraseMLMpnetBaseV2").unwrap().1, 768);
        assert!(resolve_model("nonsense-model").is_err());
    }

    #[test]
    fn test_quantized_model_resolves_separately() {
        let (full, _) = resolve_model("ParaphraseMLMiniLML12V2").unwrap();
        let (quantized, _) = resolve_model("ParaphraseMLMiniLML12V2Q").unwrap();
        assert!(matches!(full, EmbeddingModel::ParaphraseMLMiniLML12V2));
        assert!(matches!(quantized, EmbeddingModel::ParaphraseMLMiniLML12V2Q));
    }
}
