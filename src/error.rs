//! Error types for diagram editing, import and persistence.

use thiserror::Error;

use crate::store::StoreError;

/// What kind of entity a [`DiagramError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Diagram,
    Block,
    Port,
    Requirement,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EntityKind::Diagram => "diagram",
            EntityKind::Block => "block",
            EntityKind::Port => "port",
            EntityKind::Requirement => "requirement",
        })
    }
}

/// Errors raised by the block-tree model and the editing session.
///
/// Every variant except [`DiagramError::Store`] is raised before any mutation
/// takes place, so the session stays usable after it is reported.
#[derive(Debug, Error)]
pub enum DiagramError {
    #[error("{kind} `{id}` not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("grouping needs at least 2 selected blocks, got {selected}")]
    InsufficientSelection { selected: usize },

    #[error("block `{id}` has no subblocks to enter")]
    NoSubblocks { id: String },

    #[error("block id `{id}` is used more than once")]
    DuplicateBlockId { id: String },

    #[error("port id `{port_id}` is used more than once on block `{block_id}`")]
    DuplicatePortId { block_id: String, port_id: String },

    #[error("block `{id}` is nested inside itself")]
    CyclicNesting { id: String },

    #[error("malformed {format} import: {message}")]
    MalformedImport {
        format: &'static str,
        message: String,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl DiagramError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DiagramError>;
