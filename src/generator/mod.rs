//! Diagram XML generator.
//!
//! - [`diagram_xml`] – Generate interchange XML text from a [`Diagram`](crate::model::Diagram).

pub mod diagram_xml;

pub use diagram_xml::generate_diagram_xml;
