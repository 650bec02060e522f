//! On-disk index store with generation-based rebuilds.
//!
//! Each named index is a directory holding numbered generation
//! subdirectories (`gen-1`, `gen-2`, ...) and a `CURRENT` pointer file
//! naming the committed generation. A rebuild writes a fresh generation
//! off to the side and flips `CURRENT` with an atomic rename, so readers
//! either see the old complete index or the new complete index, never a
//! half-built one. Old generations are pruned after cutover.
//!
//! A generation contains four files:
//! - `vectors.vec` - memory-mapped embedding rows
//! - `documents.json` - document payloads, ordered by vector ID
//! - `clusters.json` - IVFFlat centroids and posting lists
//! - `metadata.json` - model name, dimension, counts, timestamps

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::types::DocumentRecord;
use crate::vector::{
    ClusterId, MmapVectorStorage, Score, VectorDimension, VectorError, VectorId,
    cosine_similarity, kmeans_clustering, rank_clusters_by_similarity,
};

/// Name of the pointer file that marks the committed generation.
const CURRENT_FILE: &str = "CURRENT";

/// Current metadata format version.
const METADATA_VERSION: u32 = 1;

/// Upper bound on IVFFlat cluster count.
const MAX_CLUSTERS: usize = 100;

/// Metadata persisted with every committed generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Name of the embedding model used to build the generation
    pub model_name: String,

    /// Dimension of stored embeddings
    pub dimension: usize,

    /// Number of documents in the generation
    pub document_count: usize,

    /// Unix timestamp when the generation was committed
    pub created_at: u64,

    /// Version of the metadata format
    pub version: u32,
}

impl IndexMetadata {
    fn new(model_name: String, dimension: usize, document_count: usize) -> Self {
        Self {
            model_name,
            dimension,
            document_count,
            created_at: utc_timestamp(),
            version: METADATA_VERSION,
        }
    }

    fn save(&self, dir: &Path) -> EngineResult<()> {
        let path = dir.join("metadata.json");
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::General(format!("Failed to serialize metadata: {e}")))?;
        fs::write(&path, json).map_err(|e| EngineError::PersistenceError {
            path,
            source: Box::new(e),
        })?;
        Ok(())
    }

    fn load(dir: &Path) -> EngineResult<Self> {
        let path = dir.join("metadata.json");
        let json = fs::read_to_string(&path).map_err(|e| EngineError::LoadError {
            path: path.clone(),
            source: Box::new(e),
        })?;
        let metadata: Self = serde_json::from_str(&json)
            .map_err(|e| EngineError::General(format!("Failed to parse metadata: {e}")))?;

        if metadata.version > METADATA_VERSION {
            return Err(EngineError::General(format!(
                "Index metadata version {} is newer than supported version {METADATA_VERSION}",
                metadata.version
            )));
        }

        Ok(metadata)
    }
}

/// IVFFlat cluster layout: centroids plus one posting list per cluster.
///
/// Posting list `i` holds the vector IDs assigned to `ClusterId(i + 1)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ClusterIndex {
    centroids: Vec<Vec<f32>>,
    posting_lists: Vec<Vec<u32>>,
}

impl ClusterIndex {
    fn save(&self, dir: &Path) -> EngineResult<()> {
        let path = dir.join("clusters.json");
        let json = serde_json::to_string(self)
            .map_err(|e| EngineError::General(format!("Failed to serialize clusters: {e}")))?;
        fs::write(&path, json).map_err(|e| EngineError::PersistenceError {
            path,
            source: Box::new(e),
        })?;
        Ok(())
    }

    fn load(dir: &Path) -> EngineResult<Self> {
        let path = dir.join("clusters.json");
        let json = fs::read_to_string(&path).map_err(|e| EngineError::LoadError {
            path: path.clone(),
            source: Box::new(e),
        })?;
        serde_json::from_str(&json)
            .map_err(|e| EngineError::General(format!("Failed to parse clusters: {e}")))
    }
}

/// Handle to one named index on disk.
pub struct IndexStore {
    name: String,
    dir: PathBuf,
}

impl IndexStore {
    /// Creates a handle for the index `name` under `index_root`.
    ///
    /// No filesystem access happens until a rebuild or open.
    pub fn new(index_root: impl AsRef<Path>, name: &str) -> Self {
        Self {
            name: name.to_string(),
            dir: index_root.as_ref().join(name),
        }
    }

    /// Returns the index name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the index directory on disk.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Starts a rebuild, creating the next uncommitted generation.
    ///
    /// The running index (if any) stays fully queryable until `commit`
    /// flips the `CURRENT` pointer. An uncommitted builder removes its
    /// generation directory on drop.
    pub fn begin_rebuild(
        &self,
        model_name: &str,
        dimension: VectorDimension,
    ) -> EngineResult<IndexBuilder> {
        fs::create_dir_all(&self.dir)?;

        let generation = self.latest_generation()?.map_or(1, |g| g + 1);
        let gen_dir = self.generation_dir(generation);

        if gen_dir.exists() {
            // Leftover from an interrupted rebuild, start clean
            warn!(path = %gen_dir.display(), "removing stale uncommitted generation");
            fs::remove_dir_all(&gen_dir)?;
        }
        fs::create_dir_all(&gen_dir)?;

        let storage = MmapVectorStorage::create(gen_dir.join("vectors.vec"), dimension)?;

        debug!(index = %self.name, generation, "started index rebuild");

        Ok(IndexBuilder {
            index_dir: self.dir.clone(),
            gen_dir,
            generation,
            storage,
            documents: Vec::new(),
            model_name: model_name.to_string(),
            dimension,
            committed: false,
        })
    }

    /// Opens the committed generation for querying.
    ///
    /// Fails with `IndexUnavailable` when no generation has ever been
    /// committed for this index.
    pub fn open(&self) -> EngineResult<OpenIndex> {
        let Some(current) = self.read_current()? else {
            return Err(EngineError::IndexUnavailable {
                name: self.name.clone(),
            });
        };

        let gen_dir = self.dir.join(&current);
        if !gen_dir.is_dir() {
            return Err(EngineError::IndexUnavailable {
                name: self.name.clone(),
            });
        }

        let metadata = IndexMetadata::load(&gen_dir)?;
        let clusters = ClusterIndex::load(&gen_dir)?;

        let documents_path = gen_dir.join("documents.json");
        let json = fs::read_to_string(&documents_path).map_err(|e| EngineError::LoadError {
            path: documents_path,
            source: Box::new(e),
        })?;
        let documents: Vec<DocumentRecord> = serde_json::from_str(&json)
            .map_err(|e| EngineError::General(format!("Failed to parse documents: {e}")))?;

        let storage = if metadata.document_count > 0 {
            Some(MmapVectorStorage::open(gen_dir.join("vectors.vec"))?)
        } else {
            None
        };

        Ok(OpenIndex {
            metadata,
            documents,
            clusters,
            storage: RwLock::new(storage),
        })
    }

    /// Returns true if a committed generation exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        matches!(self.read_current(), Ok(Some(_)))
    }

    fn generation_dir(&self, generation: u64) -> PathBuf {
        self.dir.join(format!("gen-{generation}"))
    }

    fn read_current(&self) -> EngineResult<Option<String>> {
        let path = self.dir.join(CURRENT_FILE);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(EngineError::Io(e)),
        }
    }

    /// Highest generation number on disk, committed or not.
    fn latest_generation(&self) -> EngineResult<Option<u64>> {
        let mut latest = None;

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(EngineError::Io(e)),
        };

        for entry in entries {
            let entry = entry?;
            if let Some(generation) = parse_generation_name(&entry.file_name().to_string_lossy()) {
                latest = Some(latest.map_or(generation, |l: u64| l.max(generation)));
            }
        }

        Ok(latest)
    }
}

fn parse_generation_name(name: &str) -> Option<u64> {
    name.strip_prefix("gen-")?.parse().ok()
}

fn utc_timestamp() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// Write-side handle for one uncommitted generation.
///
/// Vector IDs are assigned densely in insertion order, so document `i`
/// (zero-based) in `documents.json` corresponds to `VectorId(i + 1)`.
pub struct IndexBuilder {
    index_dir: PathBuf,
    gen_dir: PathBuf,
    generation: u64,
    storage: MmapVectorStorage,
    documents: Vec<DocumentRecord>,
    model_name: String,
    dimension: VectorDimension,
    committed: bool,
}

impl IndexBuilder {
    /// Appends a batch of documents with their embeddings.
    ///
    /// Every vector must match the generation's dimension.
    pub fn insert_batch(&mut self, batch: Vec<DocumentRecord>) -> EngineResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let rows: Vec<(VectorId, &[f32])> = batch
            .iter()
            .enumerate()
            .map(|(i, doc)| {
                (
                    VectorId::new_unchecked((self.documents.len() + i + 1) as u32),
                    doc.vector.as_slice(),
                )
            })
            .collect();

        self.storage.write_batch(&rows)?;

        self.documents.extend(batch);
        Ok(())
    }

    /// Number of documents inserted so far.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Clusters the inserted vectors, persists the generation, and flips
    /// the `CURRENT` pointer to it.
    ///
    /// The pointer update goes through a temp file and rename, so a crash
    /// mid-commit leaves the previous generation in place. Older
    /// generations are pruned after the flip.
    pub fn commit(mut self) -> EngineResult<()> {
        let clusters = self.build_clusters()?;
        clusters.save(&self.gen_dir)?;

        let documents_path = self.gen_dir.join("documents.json");
        let json = serde_json::to_string(&self.documents)
            .map_err(|e| EngineError::General(format!("Failed to serialize documents: {e}")))?;
        fs::write(&documents_path, json).map_err(|e| EngineError::PersistenceError {
            path: documents_path,
            source: Box::new(e),
        })?;

        let metadata = IndexMetadata::new(
            self.model_name.clone(),
            self.dimension.get(),
            self.documents.len(),
        );
        metadata.save(&self.gen_dir)?;

        // Atomic cutover: write the pointer aside, then rename over CURRENT
        let gen_name = format!("gen-{}", self.generation);
        let tmp_path = self.index_dir.join(".CURRENT.tmp");
        let current_path = self.index_dir.join(CURRENT_FILE);
        fs::write(&tmp_path, &gen_name)?;
        fs::rename(&tmp_path, &current_path)?;

        self.committed = true;

        info!(
            generation = self.generation,
            documents = self.documents.len(),
            clusters = clusters.centroids.len(),
            "committed index generation"
        );

        self.prune_old_generations();
        Ok(())
    }

    fn build_clusters(&mut self) -> EngineResult<ClusterIndex> {
        if self.documents.is_empty() {
            return Ok(ClusterIndex::default());
        }

        let vectors: Vec<Vec<f32>> = self.documents.iter().map(|d| d.vector.clone()).collect();

        let k = (vectors.len() as f64).sqrt().ceil() as usize;
        let k = k.clamp(1, MAX_CLUSTERS).min(vectors.len());

        let result = kmeans_clustering(&vectors, k)
            .map_err(|e| EngineError::General(format!("Clustering failed: {e}")))?;

        let mut posting_lists = vec![Vec::new(); result.centroids.len()];
        for (i, cluster_id) in result.assignments.iter().enumerate() {
            let vector_id = (i + 1) as u32;
            posting_lists[(cluster_id.get() - 1) as usize].push(vector_id);
        }

        debug!(
            vectors = vectors.len(),
            clusters = k,
            iterations = result.iterations,
            "clustered index vectors"
        );

        Ok(ClusterIndex {
            centroids: result.centroids,
            posting_lists,
        })
    }

    fn prune_old_generations(&self) {
        let Ok(entries) = fs::read_dir(&self.index_dir) else {
            return;
        };

        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(generation) = parse_generation_name(&name)
                && generation < self.generation
                && let Err(e) = fs::remove_dir_all(entry.path())
            {
                warn!(generation, error = %e, "failed to prune old index generation");
            }
        }
    }
}

impl Drop for IndexBuilder {
    fn drop(&mut self) {
        if !self.committed {
            // Abandoned rebuild, leave no partial generation behind
            let _ = fs::remove_dir_all(&self.gen_dir);
        }
    }
}

/// A single query hit: the stored document and its similarity score.
#[derive(Debug, Clone)]
pub struct Hit {
    pub document: DocumentRecord,
    pub score: Score,
}

/// Read-side handle to one committed generation.
///
/// Cheap to share behind an `Arc`; vector reads take a short write lock
/// because the memory map is re-established lazily.
#[derive(Debug)]
pub struct OpenIndex {
    metadata: IndexMetadata,
    documents: Vec<DocumentRecord>,
    clusters: ClusterIndex,
    storage: RwLock<Option<MmapVectorStorage>>,
}

impl OpenIndex {
    /// Generation metadata (model, dimension, counts).
    #[must_use]
    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    /// Number of documents in this generation.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Approximate k-nearest-neighbor query by cosine similarity.
    ///
    /// Probes clusters in decreasing centroid similarity until at least
    /// `num_candidates` vectors are gathered, scores the candidates
    /// exactly, and returns up to `k` hits sorted by descending score.
    /// An empty index yields an empty result rather than an error.
    pub fn knn_query(
        &self,
        query: &[f32],
        k: usize,
        num_candidates: usize,
    ) -> EngineResult<Vec<Hit>> {
        if self.documents.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let dimension = VectorDimension::new(self.metadata.dimension)?;
        dimension.validate_vector(query)?;

        let candidates = self.gather_candidates(query, num_candidates.max(k));

        let mut hits = Vec::with_capacity(candidates.len());
        {
            let mut guard = self.storage.write();
            let storage = guard
                .as_mut()
                .ok_or_else(|| EngineError::General("Index storage missing".to_string()))?;

            for vector_id in candidates {
                let id = VectorId::new(vector_id)
                    .ok_or(VectorError::VectorNotFound(vector_id))?;
                let vector = storage
                    .read_vector(id)
                    .ok_or(VectorError::VectorNotFound(vector_id))?;

                let similarity = cosine_similarity(query, &vector);
                let score = Score::from_cosine(similarity)?;

                let document = self
                    .documents
                    .get((vector_id - 1) as usize)
                    .cloned()
                    .ok_or(VectorError::VectorNotFound(vector_id))?;

                hits.push(Hit { document, score });
            }
        }

        hits.sort_by(|a, b| b.score.cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }

    /// Collects candidate vector IDs from the most similar clusters.
    fn gather_candidates(&self, query: &[f32], num_candidates: usize) -> Vec<u32> {
        if self.clusters.centroids.is_empty() {
            // Degenerate layout, fall back to scanning everything
            return (1..=self.documents.len() as u32).collect();
        }

        let ranked: Vec<ClusterId> = rank_clusters_by_similarity(query, &self.clusters.centroids);

        let mut candidates = Vec::new();
        for cluster_id in ranked {
            let list = &self.clusters.posting_lists[(cluster_id.get() - 1) as usize];
            candidates.extend_from_slice(list);

            if candidates.len() >= num_candidates {
                break;
            }
        }

        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn doc(code: &str, title: &str, vector: Vec<f32>) -> DocumentRecord {
        DocumentRecord {
            code2015: code.to_string(),
            title: title.to_string(),
            code2004: String::new(),
            vector,
        }
    }

    fn axis(dim: usize, axis: usize, scale: f32) -> Vec<f32> {
        let mut v = vec![0.01; dim];
        v[axis] = scale;
        v
    }

    fn build_sample_index(store: &IndexStore) {
        let dim = VectorDimension::new(4).unwrap();
        let mut builder = store.begin_rebuild("mock", dim).unwrap();
        builder
            .insert_batch(vec![
                doc("8524.10", "Tailor", axis(4, 0, 1.0)),
                doc("7212.20", "Welder", axis(4, 1, 1.0)),
                doc("2330.05", "Teacher", axis(4, 2, 1.0)),
                doc("8524.20", "Sewing Machinist", axis(4, 0, 0.9)),
            ])
            .unwrap();
        builder.commit().unwrap();
    }

    #[test]
    fn test_open_without_commit_is_unavailable() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path(), "nco2015");

        assert!(!store.exists());
        match store.open() {
            Err(EngineError::IndexUnavailable { name }) => assert_eq!(name, "nco2015"),
            other => panic!("expected IndexUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_build_and_query() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path(), "nco2015");
        build_sample_index(&store);

        let index = store.open().unwrap();
        assert_eq!(index.document_count(), 4);
        assert_eq!(index.metadata().model_name, "mock");

        let hits = index.knn_query(&axis(4, 0, 1.0), 2, 50).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document.code2015, "8524.10");
        assert_eq!(hits[1].document.code2015, "8524.20");
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn test_results_sorted_and_truncated() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path(), "nco2015");
        build_sample_index(&store);

        let index = store.open().unwrap();
        let hits = index.knn_query(&axis(4, 1, 1.0), 10, 50).unwrap();

        // k larger than candidate pool returns what exists, sorted
        assert!(hits.len() <= 4);
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(hits[0].document.title, "Welder");
    }

    #[test]
    fn test_rebuild_replaces_generation() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path(), "nco2015");
        build_sample_index(&store);

        let dim = VectorDimension::new(4).unwrap();
        let mut builder = store.begin_rebuild("mock", dim).unwrap();
        builder
            .insert_batch(vec![doc("1111.10", "Director", axis(4, 3, 1.0))])
            .unwrap();
        builder.commit().unwrap();

        let index = store.open().unwrap();
        assert_eq!(index.document_count(), 1);

        // Old generation is pruned after cutover
        assert!(!temp.path().join("nco2015").join("gen-1").exists());
        assert!(temp.path().join("nco2015").join("gen-2").exists());
    }

    #[test]
    fn test_abandoned_rebuild_leaves_committed_index() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path(), "nco2015");
        build_sample_index(&store);

        {
            let dim = VectorDimension::new(4).unwrap();
            let mut builder = store.begin_rebuild("mock", dim).unwrap();
            builder
                .insert_batch(vec![doc("9999.99", "Ghost", axis(4, 3, 1.0))])
                .unwrap();
            // Dropped without commit
        }

        let index = store.open().unwrap();
        assert_eq!(index.document_count(), 4);
        assert!(!temp.path().join("nco2015").join("gen-2").exists());
    }

    #[test]
    fn test_empty_index_returns_no_hits() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path(), "nco2015");

        let dim = VectorDimension::new(4).unwrap();
        let builder = store.begin_rebuild("mock", dim).unwrap();
        builder.commit().unwrap();

        let index = store.open().unwrap();
        assert_eq!(index.document_count(), 0);
        let hits = index.knn_query(&axis(4, 0, 1.0), 5, 50).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path(), "nco2015");
        build_sample_index(&store);

        let index = store.open().unwrap();
        assert!(index.knn_query(&[1.0, 0.0], 5, 50).is_err());
    }
}
