//! Diagram XML parser.
//!
//! Provides [`parse_diagram_xml`] for in-memory text and [`DiagramParser`] to
//! load diagram files through a [`ContentSource`]. Sub-modules:
//!
//! - [`source`] – File I/O abstraction
//! - [`helpers`] – Attribute and child-element access

pub mod helpers;
pub mod source;

pub use source::*;

use anyhow::{Context, Result};
use camino::Utf8Path;
use roxmltree::{Document, Node};

use crate::error::DiagramError;
use crate::model::{Block, Diagram, Port, PortRef, Requirement, Side};
use helpers::{child_element, child_elements, non_empty_attr, parse_coord, required_attr};

/// Name given to imported diagrams without a `name` attribute.
pub const DEFAULT_DIAGRAM_NAME: &str = "Imported Diagram";
/// Name given to imported blocks without a `name` attribute.
pub const DEFAULT_BLOCK_NAME: &str = "Unnamed";

fn malformed(message: impl Into<String>) -> DiagramError {
    DiagramError::MalformedImport {
        format: "XML",
        message: message.into(),
    }
}

/// Parse diagram XML text and validate the resulting tree.
///
/// The diagram id comes from the root's `id` attribute, or `fallback_id` when
/// it has none.
pub fn parse_diagram_xml(text: &str, fallback_id: &str) -> std::result::Result<Diagram, DiagramError> {
    let doc = Document::parse(text).map_err(|e| malformed(e.to_string()))?;
    let root = doc.root_element();
    if !root.has_tag_name("diagram") {
        return Err(malformed(format!(
            "expected <diagram> root, found <{}>",
            root.tag_name().name()
        )));
    }
    let mut diagram = Diagram::new(
        root.attribute("id").unwrap_or(fallback_id),
        root.attribute("name").unwrap_or(DEFAULT_DIAGRAM_NAME),
    );
    for node in child_elements(root, "block") {
        diagram.blocks.push(parse_block(node).map_err(malformed)?);
    }
    diagram.validate()?;
    log::debug!(
        "parsed diagram {} with {} blocks",
        diagram.id,
        diagram.block_ids().len()
    );
    Ok(diagram)
}

fn parse_block(node: Node<'_, '_>) -> std::result::Result<Block, String> {
    let mut block = Block::new(
        required_attr(node, "id")?,
        node.attribute("name").unwrap_or(DEFAULT_BLOCK_NAME),
    );
    block.x = parse_coord(node, "x")?;
    block.y = parse_coord(node, "y")?;

    if let Some(ports) = child_element(node, "ports") {
        for p in child_elements(ports, "port") {
            block.ports.push(parse_port(p)?);
        }
    }
    if let Some(reqs) = child_element(node, "requirements") {
        for r in child_elements(reqs, "requirement") {
            block.requirements.push(Requirement {
                id: required_attr(r, "id")?.to_string(),
                text: r.attribute("text").unwrap_or_default().to_string(),
                port_id: non_empty_attr(r, "port"),
            });
        }
    }
    if let Some(sub) = child_element(node, "subblocks") {
        let children = child_elements(sub, "block")
            .map(parse_block)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        block.subblocks = Some(children).filter(|c| !c.is_empty());
    }
    Ok(block)
}

fn parse_port(node: Node<'_, '_>) -> std::result::Result<Port, String> {
    let side = match node.attribute("side") {
        None | Some("") => Side::default(),
        Some(s) => s.parse::<Side>()?,
    };
    let target = match (
        non_empty_attr(node, "target-block"),
        non_empty_attr(node, "target-port"),
    ) {
        (Some(b), Some(p)) => Some(PortRef::new(b, p)),
        _ => None,
    };
    Ok(Port {
        id: required_attr(node, "id")?.to_string(),
        name: non_empty_attr(node, "name"),
        side,
        target,
    })
}

/// Loads diagram XML files through a [`ContentSource`].
pub struct DiagramParser<S: ContentSource> {
    source: S,
}

impl<S: ContentSource> DiagramParser<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Parse one diagram file. The file stem is the fallback id.
    pub fn parse_file(&mut self, path: impl AsRef<Utf8Path>) -> Result<Diagram> {
        let path = path.as_ref();
        let text = self.source.read_to_string(path)?;
        let stem = path.file_stem().unwrap_or("diagram");
        parse_diagram_xml(&text, stem).with_context(|| format!("Failed to import {}", path))
    }

    /// Parse every `.xml` file of a directory, in path order.
    pub fn parse_dir(&mut self, dir: impl AsRef<Utf8Path>) -> Result<Vec<Diagram>> {
        let dir = dir.as_ref();
        let mut out = Vec::new();
        for path in self.source.list_dir(dir)? {
            if path.extension() == Some("xml") {
                out.push(self.parse_file(&path)?);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_attributes_stay_unset() {
        let xml = r#"<diagram name="D">
            <block id="a"><ports><port id="p"/></ports></block>
        </diagram>"#;
        let d = parse_diagram_xml(xml, "fallback").unwrap();
        assert_eq!(d.id, "fallback");
        let a = &d.blocks[0];
        assert_eq!(a.name, DEFAULT_BLOCK_NAME);
        assert_eq!((a.x, a.y), (None, None));
        assert_eq!(a.ports[0].side, Side::Right);
        assert_eq!(a.ports[0].name, None);
        assert!(a.subblocks.is_none());
    }

    #[test]
    fn test_half_target_is_ignored() {
        let xml = r#"<diagram id="d" name="D">
            <block id="a" x="0" y="-3.5">
              <ports><port id="p" side="left" target-block="b"/></ports>
              <subblocks></subblocks>
            </block>
        </diagram>"#;
        let d = parse_diagram_xml(xml, "x").unwrap();
        assert_eq!(d.id, "d");
        assert_eq!(d.blocks[0].y, Some(-3.5));
        assert_eq!(d.blocks[0].ports[0].target, None);
        assert!(d.blocks[0].subblocks.is_none());
    }

    #[test]
    fn test_malformed_inputs() {
        for xml in [
            "<diagram><block id=\"a\">",
            "<graph/>",
            "<diagram><block name=\"no id\"/></diagram>",
            "<diagram><block id=\"a\" x=\"wide\"/></diagram>",
            "<diagram><block id=\"a\"><ports><port id=\"p\" side=\"up\"/></ports></block></diagram>",
        ] {
            assert!(
                matches!(parse_diagram_xml(xml, "x"), Err(DiagramError::MalformedImport { .. })),
                "{xml}"
            );
        }
    }

    #[test]
    fn test_duplicate_ids_fail_validation() {
        let xml = r#"<diagram><block id="a"/><block id="a"/></diagram>"#;
        assert!(matches!(
            parse_diagram_xml(xml, "x"),
            Err(DiagramError::DuplicateBlockId { .. })
        ));
    }
}
