//! Generate diagram XML text from a [`Diagram`].
//!
//! Layout: one `<block>` element per block with `<ports>`, `<requirements>`
//! and `<subblocks>` children in that order, each omitted when empty.
//! Unset coordinates are omitted so they import back as unset.

use crate::model::{Block, Diagram, Port, Requirement};

/// Generate the XML text for a diagram, with the XML declaration and 2-space
/// indentation.
pub fn generate_diagram_xml(diagram: &Diagram) -> String {
    let mut out = String::with_capacity(1024);
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(&format!(
        "<diagram id=\"{}\" name=\"{}\">\n",
        xml_escape_attr(&diagram.id),
        xml_escape_attr(&diagram.name)
    ));
    for block in &diagram.blocks {
        write_block(&mut out, block, 1);
    }
    out.push_str("</diagram>\n");
    out
}

fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str("  ");
    }
}

/// Escape an attribute value. Whitespace other than the plain space is encoded
/// as character references so it survives attribute-value normalization.
fn xml_escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            '\t' => out.push_str("&#x9;"),
            _ => out.push(ch),
        }
    }
    out
}

fn write_block(out: &mut String, block: &Block, level: usize) {
    indent(out, level);
    out.push_str(&format!(
        "<block id=\"{}\" name=\"{}\"",
        xml_escape_attr(&block.id),
        xml_escape_attr(&block.name)
    ));
    if let Some(x) = block.x {
        out.push_str(&format!(" x=\"{}\"", x));
    }
    if let Some(y) = block.y {
        out.push_str(&format!(" y=\"{}\"", y));
    }

    let subblocks = block.subblocks.as_deref().unwrap_or(&[]);
    if block.ports.is_empty() && block.requirements.is_empty() && subblocks.is_empty() {
        out.push_str("/>\n");
        return;
    }
    out.push_str(">\n");

    if !block.ports.is_empty() {
        indent(out, level + 1);
        out.push_str("<ports>\n");
        for port in &block.ports {
            write_port(out, port, level + 2);
        }
        indent(out, level + 1);
        out.push_str("</ports>\n");
    }

    if !block.requirements.is_empty() {
        indent(out, level + 1);
        out.push_str("<requirements>\n");
        for req in &block.requirements {
            write_requirement(out, req, level + 2);
        }
        indent(out, level + 1);
        out.push_str("</requirements>\n");
    }

    if !subblocks.is_empty() {
        indent(out, level + 1);
        out.push_str("<subblocks>\n");
        for sub in subblocks {
            write_block(out, sub, level + 2);
        }
        indent(out, level + 1);
        out.push_str("</subblocks>\n");
    }

    indent(out, level);
    out.push_str("</block>\n");
}

fn write_port(out: &mut String, port: &Port, level: usize) {
    indent(out, level);
    out.push_str(&format!(
        "<port id=\"{}\" name=\"{}\" side=\"{}\"",
        xml_escape_attr(&port.id),
        xml_escape_attr(port.name.as_deref().unwrap_or("")),
        port.side.as_str()
    ));
    if let Some(t) = &port.target {
        out.push_str(&format!(
            " target-block=\"{}\" target-port=\"{}\"",
            xml_escape_attr(&t.block_id),
            xml_escape_attr(&t.port_id)
        ));
    }
    out.push_str("/>\n");
}

fn write_requirement(out: &mut String, req: &Requirement, level: usize) {
    indent(out, level);
    out.push_str(&format!(
        "<requirement id=\"{}\" text=\"{}\"",
        xml_escape_attr(&req.id),
        xml_escape_attr(&req.text)
    ));
    if let Some(port) = &req.port_id {
        out.push_str(&format!(" port=\"{}\"", xml_escape_attr(port)));
    }
    out.push_str("/>\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Side;

    #[test]
    fn test_escape_attr() {
        assert_eq!(
            xml_escape_attr("a<b & \"c\"\n'd'"),
            "a&lt;b &amp; &quot;c&quot;&#xA;&apos;d&apos;"
        );
        assert_eq!(xml_escape_attr("x\ty\r"), "x&#x9;y&#xD;");
    }

    #[test]
    fn test_block_layout() {
        let mut g = Block::new("g1", "Group").at(40.0, 12.5);
        g.ports.push(Port::new("g1-in-0", "x", Side::Left).targeting("a", "i"));
        g.requirements.push(Requirement {
            id: "req1".into(),
            text: "fast".into(),
            port_id: Some("g1-in-0".into()),
        });
        g.subblocks = Some(vec![Block::new("a", "A")]);
        let mut d = Diagram::new("d1", "Demo & Co");
        d.blocks.push(g);

        let xml = generate_diagram_xml(&d);
        let expected = "\
<?xml version=\"1.0\" encoding=\"UTF-8\"?>
<diagram id=\"d1\" name=\"Demo &amp; Co\">
  <block id=\"g1\" name=\"Group\" x=\"40\" y=\"12.5\">
    <ports>
      <port id=\"g1-in-0\" name=\"x\" side=\"left\" target-block=\"a\" target-port=\"i\"/>
    </ports>
    <requirements>
      <requirement id=\"req1\" text=\"fast\" port=\"g1-in-0\"/>
    </requirements>
    <subblocks>
      <block id=\"a\" name=\"A\"/>
    </subblocks>
  </block>
</diagram>
";
        assert_eq!(xml, expected);
    }
}
