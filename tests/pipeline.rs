//! End-to-end tests: catalog CSV through indexing to ranked search results.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use ncofind::vector::{EmbeddingGenerator, VectorDimension, VectorError};
use ncofind::{HierarchyResolver, IndexStore, IndexingPipeline, SearchService};

/// Deterministic keyword embedder standing in for the sentence model.
///
/// Texts sharing a keyword land on the same axis, so similarity ranking
/// behaves predictably without downloading model weights.
struct KeywordEmbedder {
    dimension: VectorDimension,
}

impl KeywordEmbedder {
    fn new() -> Self {
        Self {
            dimension: VectorDimension::new(16).expect("nonzero dimension"),
        }
    }
}

impl EmbeddingGenerator for KeywordEmbedder {
    fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError> {
        let keywords = [
            "tailor", "sew", "weld", "metal", "teach", "school", "farm", "crop", "drive",
            "vehicle", "cook", "food",
        ];

        let embeddings = texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                let mut v = vec![0.05f32; self.dimension.get()];
                for (axis, keyword) in keywords.iter().enumerate() {
                    if lower.contains(keyword) {
                        v[axis] = 1.0;
                    }
                }
                let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
                v.iter().map(|x| x / norm).collect()
            })
            .collect();

        Ok(embeddings)
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "keyword-test"
    }
}

const CATALOG: &str = "\
NCO2015_Code,Title,NCO2004_Code
8524.10,Tailor General,743.20
8524.20,Sewing Machine Operator,743.25
7212.20,Welder Gas,
2330.05,School Teacher Primary,331.10
9211.10,Farm Labourer Crop,
";

fn write_catalog(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("catalog.csv");
    fs::write(&path, CATALOG).expect("write catalog");
    path
}

fn sample_resolver() -> HierarchyResolver {
    let mut division = HashMap::new();
    division.insert("8".to_string(), "Plant and Machine Operators".to_string());
    division.insert("7".to_string(), "Craft Workers".to_string());
    let mut subdivision = HashMap::new();
    subdivision.insert("85".to_string(), "Stationary Plant Operators".to_string());
    let mut group = HashMap::new();
    group.insert("852".to_string(), "Textile Machine Operators".to_string());
    let mut family = HashMap::new();
    family.insert("8524".to_string(), "Sewing Machine Operators".to_string());
    HierarchyResolver::from_tables(division, subdivision, group, family)
}

fn build_service(temp: &TempDir) -> (SearchService, Arc<IndexStore>) {
    let catalog = write_catalog(temp.path());
    let embedder: Arc<dyn EmbeddingGenerator> = Arc::new(KeywordEmbedder::new());

    let store = Arc::new(IndexStore::new(temp.path().join("index"), "nco2015"));
    let pipeline = IndexingPipeline::new(embedder.clone(), 2);
    let report = pipeline.reindex(&store, &catalog).expect("reindex");
    assert_eq!(report.indexed, 5);
    assert_eq!(report.batches, 3);

    let service = SearchService::new(embedder, store.clone(), Arc::new(sample_resolver()), 50);
    (service, store)
}

#[test]
fn search_resolves_description_to_code_with_hierarchy() {
    let temp = TempDir::new().unwrap();
    let (service, _store) = build_service(&temp);

    let response = service
        .search("person who tailors and sews clothes", 5)
        .unwrap();

    assert_eq!(response.query, "person who tailors and sews clothes");
    assert!(response.embedding_time >= 0.0);
    assert!(!response.results.is_empty());
    assert!(response.results.len() <= 5);

    // Both tailoring occupations outrank the unrelated ones
    let top = &response.results[0];
    assert!(top.code2015.starts_with("8524"));
    assert_eq!(top.hierarchy.division, "Plant and Machine Operators");
    assert_eq!(top.hierarchy.subdivision, "Stationary Plant Operators");
    assert_eq!(top.hierarchy.group, "Textile Machine Operators");
    assert_eq!(top.hierarchy.family, "Sewing Machine Operators");
}

#[test]
fn results_are_sorted_by_descending_confidence() {
    let temp = TempDir::new().unwrap();
    let (service, _store) = build_service(&temp);

    let response = service.search("teaching at a school", 5).unwrap();
    assert_eq!(response.results[0].code2015, "2330.05");
    for pair in response.results.windows(2) {
        assert!(pair[0].confidence >= pair[1].confidence);
    }
    for result in &response.results {
        assert!((0.0..=1.0).contains(&result.confidence));
    }
}

#[test]
fn hierarchy_falls_back_to_unknown_for_unmapped_codes() {
    let temp = TempDir::new().unwrap();
    let (service, _store) = build_service(&temp);

    let response = service.search("farm crop work", 1).unwrap();
    let top = &response.results[0];
    assert_eq!(top.code2015, "9211.10");
    assert_eq!(top.hierarchy.division, "Unknown");
    assert_eq!(top.hierarchy.family, "Unknown");
}

#[test]
fn missing_legacy_code_serializes_as_empty_string() {
    let temp = TempDir::new().unwrap();
    let (service, _store) = build_service(&temp);

    let response = service.search("gas welding of metal", 1).unwrap();
    let top = &response.results[0];
    assert_eq!(top.code2015, "7212.20");
    assert_eq!(top.code2004, "");

    let json = serde_json::to_value(&response).unwrap();
    let first = &json["results"][0];
    assert_eq!(first["NCO2015"], "7212.20");
    assert_eq!(first["NCO2004"], "");
    assert!(first["hierarchy"]["division"].is_string());
}

#[test]
fn reindex_is_idempotent_and_replaces_the_generation() {
    let temp = TempDir::new().unwrap();
    let (service, store) = build_service(&temp);

    let before = service.search("person who tailors and sews clothes", 3).unwrap();
    assert!(!before.results.is_empty());

    let catalog = temp.path().join("catalog.csv");
    let embedder: Arc<dyn EmbeddingGenerator> = Arc::new(KeywordEmbedder::new());
    let pipeline = IndexingPipeline::new(embedder, 200);
    let report = pipeline.reindex(&store, &catalog).unwrap();

    assert_eq!(report.indexed, 5);
    assert_eq!(report.deduplicated, 0);
    assert_eq!(store.open().unwrap().document_count(), 5);

    // The new generation answers the same query the same way
    let after = service.search("person who tailors and sews clothes", 3).unwrap();
    assert_eq!(before.results[0].code2015, after.results[0].code2015);
    assert_eq!(before.results[0].confidence, after.results[0].confidence);
}

#[test]
fn querying_an_unbuilt_index_is_a_retryable_error() {
    let temp = TempDir::new().unwrap();
    let embedder: Arc<dyn EmbeddingGenerator> = Arc::new(KeywordEmbedder::new());
    let store = Arc::new(IndexStore::new(temp.path().join("index"), "nco2015"));
    let service = SearchService::new(
        embedder,
        store,
        Arc::new(HierarchyResolver::from_tables(
            HashMap::new(),
            HashMap::new(),
            HashMap::new(),
            HashMap::new(),
        )),
        50,
    );

    let err = service.search("anything", 5).unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.status_code(), "INDEX_UNAVAILABLE");
}

#[test]
fn batch_and_single_encoding_agree() {
    let embedder = KeywordEmbedder::new();

    let batch = embedder
        .generate_embeddings(&["Tailor General", "Welder Gas"])
        .unwrap();
    let single_a = embedder.generate_embeddings(&["Tailor General"]).unwrap();
    let single_b = embedder.generate_embeddings(&["Welder Gas"]).unwrap();

    assert_eq!(batch[0], single_a[0]);
    assert_eq!(batch[1], single_b[0]);
}
