//! Semantic search over the NCO-2015 occupation catalog.
//!
//! Occupation titles are encoded as multilingual sentence embeddings and
//! stored in a memory-mapped IVFFlat index. Free-text job descriptions
//! resolve to ranked classification codes, each decorated with its
//! division, subdivision, group, and family ancestors.

// Debug macro for consistent debug output
#[macro_export]
macro_rules! debug_print {
    ($($arg:tt)*) => {
        if $crate::config::is_global_debug_enabled() {
            eprintln!("DEBUG: {}", format!($($arg)*));
        }
    };
}

pub mod config;
pub mod dataset;
pub mod error;
pub mod hierarchy;
pub mod index;
pub mod io;
pub mod search;
pub mod types;
pub mod vector;

// Explicit exports for better API clarity
pub use config::Settings;
pub use error::{EngineError, EngineResult, ErrorContext};
pub use hierarchy::HierarchyResolver;
pub use index::{IndexStore, IndexingPipeline, ReindexReport};
pub use search::SearchService;
pub use types::{CodeHierarchy, DocumentRecord, OccupationRecord, QueryResponse, SearchResult};
