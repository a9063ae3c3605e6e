//! Multi-level view navigation and view geometry.
//!
//! The active view is one frame of a stack rooted at the diagram's top-level
//! blocks. Entering a group pushes a frame exposing its subblocks; leaving pops
//! it. Geometry computes block sizes, port anchors and the inset box used when
//! the view is nested.

pub mod geometry;
pub mod navigation;

pub use geometry::{Point, Rect, ViewBox, block_rect, port_anchor_pos, resolve_port_pos};
pub use navigation::{ViewFrame, ViewStack, collect_group_paths, resolve_frame, resolve_frame_mut};
