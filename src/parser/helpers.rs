//! Attribute helpers for the diagram XML parser.

use roxmltree::Node;

/// A required attribute, or a message naming the element and attribute.
pub fn required_attr<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str, String> {
    node.attribute(name).ok_or_else(|| {
        format!(
            "<{}> at byte {} is missing `{}`",
            node.tag_name().name(),
            node.range().start,
            name
        )
    })
}

/// Optional numeric attribute. Absent means unset, never zero.
pub fn parse_coord(node: Node<'_, '_>, name: &str) -> Result<Option<f64>, String> {
    match node.attribute(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| format!("`{}` is not a number: {:?}", name, raw)),
    }
}

/// Optional text attribute where an empty value counts as absent.
pub fn non_empty_attr(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.attribute(name)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// First child element with the given tag name.
pub fn child_element<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.is_element() && n.has_tag_name(tag))
}

/// Child elements with the given tag name, in document order.
pub fn child_elements<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.has_tag_name(tag))
}
