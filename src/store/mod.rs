//! Diagram persistence.
//!
//! A [`DiagramStore`] keeps whole diagrams by id. The nested block tree is
//! stored as one opaque document per diagram; stores never look inside it
//! beyond validating it on load.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::model::{Block, Diagram, DiagramSummary, next_id};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("diagram `{id}` not found")]
    NotFound { id: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("stored diagram `{id}` is invalid: {message}")]
    Corrupt { id: String, message: String },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// CRUD access to diagrams by id.
///
/// Saves are not coordinated: the last `update` of an id wins.
pub trait DiagramStore {
    fn list(&self) -> StoreResult<Vec<DiagramSummary>>;

    fn get(&self, id: &str) -> StoreResult<Diagram>;

    /// Store a new diagram under a store-assigned id (`d<n>`).
    fn create(&mut self, name: &str, blocks: Vec<Block>) -> StoreResult<Diagram>;

    /// Replace an existing diagram. The stored copy always carries `id`.
    fn update(&mut self, id: &str, diagram: Diagram) -> StoreResult<Diagram>;

    fn remove(&mut self, id: &str) -> StoreResult<()>;
}

/// Next free store id given the ids already in use.
pub(crate) fn next_diagram_id<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
    next_id("d", existing)
}

/// Validate a loaded diagram, mapping structural errors to [`StoreError::Corrupt`].
pub(crate) fn check_loaded(id: &str, diagram: &Diagram) -> StoreResult<()> {
    diagram.validate().map_err(|e| StoreError::Corrupt {
        id: id.to_string(),
        message: e.to_string(),
    })
}
