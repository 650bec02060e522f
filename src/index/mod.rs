//! Index lifecycle: rebuild locking, generation storage, and the
//! CSV-to-index pipeline.

mod lock;
mod pipeline;
mod store;

pub use lock::IndexLock;
pub use pipeline::{IndexingPipeline, ReindexReport};
pub use store::{Hit, IndexBuilder, IndexMetadata, IndexStore, OpenIndex};
