//! End-to-end indexing pipeline: CSV catalog to committed index.
//!
//! The pipeline reads the occupation catalog, deduplicates on the
//! classification code, then encodes titles in fixed-size batches and
//! streams each batch into a fresh index generation. The whole run holds
//! the per-index rebuild lock, and the previous generation keeps serving
//! queries until the new one commits.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::dataset::load_occupations;
use crate::error::EngineResult;
use crate::index::lock::IndexLock;
use crate::index::store::IndexStore;
use crate::types::{DocumentRecord, OccupationRecord};
use crate::vector::EmbeddingGenerator;

/// Summary of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReindexReport {
    /// Documents inserted into the new generation
    pub indexed: usize,

    /// Source rows rejected for missing code or title
    pub skipped: usize,

    /// Rows dropped because a later row carried the same code
    pub deduplicated: usize,

    /// Number of encode-and-insert round-trips
    pub batches: usize,

    /// Wall-clock duration of the run in seconds
    pub elapsed_secs: f64,
}

/// Builds an index generation from a catalog CSV.
pub struct IndexingPipeline {
    embedder: Arc<dyn EmbeddingGenerator>,
    batch_size: usize,
}

impl IndexingPipeline {
    /// Creates a pipeline encoding `batch_size` titles per round-trip.
    ///
    /// A zero batch size is treated as 1.
    pub fn new(embedder: Arc<dyn EmbeddingGenerator>, batch_size: usize) -> Self {
        Self {
            embedder,
            batch_size: batch_size.max(1),
        }
    }

    /// Rebuilds `store` from the catalog at `dataset_path`.
    ///
    /// Duplicate codes resolve last-write-wins: the final occurrence in
    /// file order is indexed and earlier ones are dropped with a warning.
    pub fn reindex(&self, store: &IndexStore, dataset_path: &Path) -> EngineResult<ReindexReport> {
        let started = Instant::now();

        let index_root = store_root(store);
        let _lock = IndexLock::acquire(&index_root, store.name())?;

        let (records, skipped) = load_occupations(dataset_path)?;
        let (records, deduplicated) = dedup_by_code(records);

        info!(
            index = store.name(),
            documents = records.len(),
            skipped,
            deduplicated,
            "starting index rebuild"
        );

        let mut builder = store.begin_rebuild(self.embedder.model_name(), self.embedder.dimension())?;
        let mut batches = 0usize;

        for chunk in records.chunks(self.batch_size) {
            let titles: Vec<&str> = chunk.iter().map(|r| r.title.as_str()).collect();
            let embeddings = self.embedder.generate_embeddings(&titles)?;

            let documents: Vec<DocumentRecord> = chunk
                .iter()
                .zip(embeddings)
                .map(|(record, vector)| DocumentRecord::from_record(record.clone(), vector))
                .collect();

            builder.insert_batch(documents)?;
            batches += 1;
        }

        let indexed = builder.document_count();
        builder.commit()?;

        let elapsed_secs = started.elapsed().as_secs_f64();
        info!(
            index = store.name(),
            indexed, batches, elapsed_secs, "index rebuild complete"
        );

        Ok(ReindexReport {
            indexed,
            skipped,
            deduplicated,
            batches,
            elapsed_secs,
        })
    }
}

/// Resolves duplicate codes last-write-wins, preserving file order of the
/// surviving rows.
fn dedup_by_code(records: Vec<OccupationRecord>) -> (Vec<OccupationRecord>, usize) {
    let mut last_occurrence: HashMap<String, usize> = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        last_occurrence.insert(record.code2015.clone(), i);
    }

    let total = records.len();
    let kept: Vec<OccupationRecord> = records
        .into_iter()
        .enumerate()
        .filter_map(|(i, record)| {
            if last_occurrence.get(&record.code2015) == Some(&i) {
                Some(record)
            } else {
                warn!(
                    code = %record.code2015,
                    "dropping duplicate occupation code, keeping last occurrence"
                );
                None
            }
        })
        .collect();

    let deduplicated = total - kept.len();
    (kept, deduplicated)
}

/// Parent directory of the store's index directory, where lock files live.
fn store_root(store: &IndexStore) -> std::path::PathBuf {
    store
        .dir()
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| store.dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::MockEmbeddingGenerator;
    use std::fs;
    use tempfile::TempDir;

    fn record(code: &str, title: &str) -> OccupationRecord {
        OccupationRecord::new(code, title, "")
    }

    #[test]
    fn test_dedup_last_write_wins() {
        let records = vec![
            record("8524.10", "Tailor (old)"),
            record("7212.20", "Welder"),
            record("8524.10", "Tailor"),
        ];

        let (kept, deduplicated) = dedup_by_code(records);
        assert_eq!(deduplicated, 1);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].code2015, "7212.20");
        assert_eq!(kept[1].title, "Tailor");
    }

    #[test]
    fn test_dedup_no_duplicates() {
        let records = vec![record("1111.10", "Director"), record("2222.20", "Analyst")];
        let (kept, deduplicated) = dedup_by_code(records);
        assert_eq!(deduplicated, 0);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_reindex_from_csv() {
        let temp = TempDir::new().unwrap();
        let csv_path = temp.path().join("catalog.csv");
        fs::write(
            &csv_path,
            "NCO2015_Code,Title,NCO2004_Code\n\
             8524.10,Tailor,743.20\n\
             7212.20,Welder,\n\
             2330.05,School Teacher,\n\
             8524.10,Tailor General,743.20\n\
             ,Broken Row,\n",
        )
        .unwrap();

        let index_root = temp.path().join("index");
        let store = IndexStore::new(&index_root, "nco2015");
        let pipeline = IndexingPipeline::new(Arc::new(MockEmbeddingGenerator::new()), 2);

        let report = pipeline.reindex(&store, &csv_path).unwrap();
        assert_eq!(report.indexed, 3);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.deduplicated, 1);
        assert_eq!(report.batches, 2);

        let index = store.open().unwrap();
        assert_eq!(index.document_count(), 3);
        assert_eq!(index.metadata().model_name, "mock");
    }

    #[test]
    fn test_reindex_is_repeatable() {
        let temp = TempDir::new().unwrap();
        let csv_path = temp.path().join("catalog.csv");
        fs::write(
            &csv_path,
            "NCO2015_Code,Title,NCO2004_Code\n8524.10,Tailor,743.20\n",
        )
        .unwrap();

        let index_root = temp.path().join("index");
        let store = IndexStore::new(&index_root, "nco2015");
        let pipeline = IndexingPipeline::new(Arc::new(MockEmbeddingGenerator::new()), 200);

        pipeline.reindex(&store, &csv_path).unwrap();
        let report = pipeline.reindex(&store, &csv_path).unwrap();

        assert_eq!(report.indexed, 1);
        assert_eq!(store.open().unwrap().document_count(), 1);
    }
}
