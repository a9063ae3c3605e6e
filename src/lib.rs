//! Nested block diagrams.
//!
//! This crate models diagrams as a tree of blocks with directional ports and
//! port-to-port connections, and provides the editing engine around it:
//! navigation into nested groups, the connection resolver for the active
//! view, grouping of sibling blocks behind synthesized proxy ports, XML and
//! JSON interchange, and diagram stores.
//!
//! The binary `blocknest` exposes conversion, grouping and store management on
//! the command line.

pub mod config;
pub mod editor;
pub mod error;
pub mod generator;
pub mod model;
pub mod parser;
pub mod resolver;
pub mod store;
pub mod view;

pub use error::{DiagramError, EntityKind};
