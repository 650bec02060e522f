//! Core domain types for occupation records and search responses.
//!
//! The NCO-2015 code is the business key throughout: it identifies an
//! occupation, addresses its vector in the index, and encodes the taxonomy
//! hierarchy in its leading digits (division, subdivision, group, family).

use serde::{Deserialize, Serialize};

/// One row of the authoritative occupation dataset.
///
/// Deserialized straight from the CSV with header-driven column mapping, so
/// column order does not matter. `NCO2004_Code` is optional in the source
/// data and defaults to the empty string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OccupationRecord {
    #[serde(rename = "NCO2015_Code")]
    pub code2015: String,

    #[serde(rename = "Title")]
    pub title: String,

    #[serde(rename = "NCO2004_Code", default)]
    pub code2004: String,
}

impl OccupationRecord {
    pub fn new(
        code2015: impl Into<String>,
        title: impl Into<String>,
        code2004: impl Into<String>,
    ) -> Self {
        Self {
            code2015: code2015.into(),
            title: title.into(),
            code2004: code2004.into(),
        }
    }

    /// A record is indexable only with a non-empty business key and title.
    /// A missing 2004 code is tolerated.
    pub fn is_indexable(&self) -> bool {
        !self.code2015.trim().is_empty() && !self.title.trim().is_empty()
    }
}

/// An occupation record paired with its title embedding, ready for insertion
/// into the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub code2015: String,
    pub title: String,
    pub code2004: String,
    pub vector: Vec<f32>,
}

impl DocumentRecord {
    pub fn from_record(record: OccupationRecord, vector: Vec<f32>) -> Self {
        Self {
            code2015: record.code2015,
            title: record.title,
            code2004: record.code2004,
            vector,
        }
    }
}

/// Display names for the four ancestor levels of an occupation code.
///
/// Derived, never stored: each level is resolved from a fixed-width prefix
/// of the NCO-2015 code. Levels with no matching lookup entry carry the
/// sentinel `"Unknown"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodeHierarchy {
    pub division: String,
    pub subdivision: String,
    pub group: String,
    pub family: String,
}

impl CodeHierarchy {
    /// Sentinel for levels the lookup tables cannot resolve.
    pub const UNKNOWN: &'static str = "Unknown";
}

/// A single ranked search hit.
///
/// `confidence` is the raw similarity score from the index, rounded to four
/// decimal places. It is a ranking signal, not a calibrated probability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,

    #[serde(rename = "NCO2015")]
    pub code2015: String,

    #[serde(rename = "NCO2004")]
    pub code2004: String,

    pub confidence: f32,

    pub hierarchy: CodeHierarchy,
}

/// The full response for one search invocation.
///
/// Results are ordered by descending confidence and capped at the requested
/// k. `embedding_time` is the query encode time in seconds, rounded to three
/// decimal places.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub embedding_time: f64,
    pub results: Vec<SearchResult>,
}
