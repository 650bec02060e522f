//! Query-side service: encode, probe the index, attach hierarchy.
//!
//! One search encodes the free-text query, runs an approximate
//! nearest-neighbor probe against the committed index generation, and
//! decorates each hit with the taxonomy ancestors resolved from its
//! classification code. The index is opened per query, so a rebuild
//! that commits between queries is picked up without restarting.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::hierarchy::HierarchyResolver;
use crate::index::IndexStore;
use crate::types::{QueryResponse, SearchResult};
use crate::vector::EmbeddingGenerator;

/// Stateless facade over the embedder, index store, and hierarchy tables.
pub struct SearchService {
    embedder: Arc<dyn EmbeddingGenerator>,
    store: Arc<IndexStore>,
    resolver: Arc<HierarchyResolver>,
    num_candidates: usize,
}

impl SearchService {
    /// Creates a service probing `num_candidates` vectors per query.
    pub fn new(
        embedder: Arc<dyn EmbeddingGenerator>,
        store: Arc<IndexStore>,
        resolver: Arc<HierarchyResolver>,
        num_candidates: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            resolver,
            num_candidates,
        }
    }

    /// Runs one query and returns up to `k` ranked matches.
    ///
    /// `embedding_time` covers only query encoding, in seconds rounded to
    /// three decimals. Confidence scores are rounded to four decimals.
    pub fn search(&self, query: &str, k: usize) -> EngineResult<QueryResponse> {
        let encode_start = Instant::now();
        let embeddings = self.embedder.generate_embeddings(&[query])?;
        let embedding_time = round(encode_start.elapsed().as_secs_f64(), 3);

        let query_vector = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::Embedding("Encoder returned no embedding".to_string()))?;

        let index = self.store.open()?;
        let hits = index.knn_query(&query_vector, k, self.num_candidates.max(k))?;

        debug!(
            query,
            k,
            candidates = self.num_candidates.max(k),
            hits = hits.len(),
            "search complete"
        );

        let results = hits
            .into_iter()
            .map(|hit| SearchResult {
                title: hit.document.title,
                hierarchy: self.resolver.resolve(&hit.document.code2015),
                code2015: hit.document.code2015,
                code2004: hit.document.code2004,
                confidence: round(f64::from(hit.score.get()), 4) as f32,
            })
            .collect();

        Ok(QueryResponse {
            query: query.to_string(),
            embedding_time,
            results,
        })
    }
}

fn round(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
