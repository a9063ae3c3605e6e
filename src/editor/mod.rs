//! Diagram editing.
//!
//! - [`state`] – The editing session: diagram, view stack, selection, drag
//! - [`operations`] – Block, port, connection and requirement edits
//! - [`grouping`] – Group sibling blocks behind synthesized proxy ports
//! - [`selection`] – Primary and multi-selection tracking

pub mod grouping;
pub mod operations;
pub mod selection;
pub mod state;

pub use grouping::{DEFAULT_GROUP_NAME, GroupOutcome, group_blocks};
pub use operations::{
    PortEdit, PortMove, add_block, add_port, add_requirement, connect, delete_block, disconnect,
    edit_port, edit_requirement, move_block, move_port, remove_port, remove_requirement,
    rename_block,
};
pub use selection::Selection;
pub use state::{DragState, EditorSession};
