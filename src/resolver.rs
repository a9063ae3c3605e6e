//! Cross-level connection resolution.
//!
//! [`visible_connections`] produces the edges to draw for the active view, with
//! both endpoints positioned by [`resolve_port_pos`]. [`flattened_connections`]
//! ignores views entirely and traces every edge through group proxy ports to
//! the port that finally receives it.

use std::collections::{BTreeSet, HashSet};

use crate::model::{Block, Diagram, PortRef, subtree_ids};
use crate::view::{Point, ViewBox, ViewStack, resolve_port_pos};

/// An edge of the active view with its rendered endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedConnection {
    pub source: PortRef,
    pub target: PortRef,
    pub from: Point,
    pub to: Point,
}

/// Edges to render for the active view.
///
/// Edges leaving a block of the active frame come first, in block then port
/// order. Then come edges whose source lies outside the active frame (and
/// outside the groups it contains) but whose target is a block of the frame,
/// which surfaces the inward proxies of the enclosing group. At the root frame
/// only edges between two top-level blocks are kept.
pub fn visible_connections(
    diagram: &Diagram,
    stack: &ViewStack,
    view_box: &ViewBox,
) -> Vec<RenderedConnection> {
    let frame = stack.blocks(diagram);
    let in_frame: HashSet<&str> = frame.iter().map(|b| b.id.as_str()).collect();
    let top_level: HashSet<&str> = diagram.blocks.iter().map(|b| b.id.as_str()).collect();
    let hidden: BTreeSet<String> = frame.iter().flat_map(|b| subtree_ids(b.children())).collect();

    let mut out = Vec::new();
    let mut push = |source: PortRef, target: &PortRef| {
        if stack.is_root()
            && !(top_level.contains(source.block_id.as_str())
                && top_level.contains(target.block_id.as_str()))
        {
            return;
        }
        let from = resolve_port_pos(diagram, stack, view_box, &source);
        let to = resolve_port_pos(diagram, stack, view_box, target);
        match (from, to) {
            (Some(from), Some(to)) => out.push(RenderedConnection {
                source,
                target: target.clone(),
                from,
                to,
            }),
            _ => log::debug!("skipping unresolvable edge {} -> {}", source, target),
        }
    };

    for b in frame {
        for p in &b.ports {
            if let Some(t) = &p.target {
                push(PortRef::new(&b.id, &p.id), t);
            }
        }
    }

    diagram.walk_blocks(&mut |_, b| {
        if in_frame.contains(b.id.as_str()) || hidden.contains(&b.id) {
            return;
        }
        for p in &b.ports {
            if let Some(t) = p.target.as_ref().filter(|t| in_frame.contains(t.block_id.as_str())) {
                push(PortRef::new(&b.id, &p.id), t);
            }
        }
    });

    out
}

/// Ports that only relay an edge across a group boundary.
///
/// A port of a group is a proxy when its target lies inside the group's
/// subtree (inward) or when a block of that subtree targets it (outward).
pub fn proxy_ports(diagram: &Diagram) -> BTreeSet<PortRef> {
    let mut proxies = BTreeSet::new();
    diagram.walk_blocks(&mut |_, g| {
        let Some(sub) = g.subblocks.as_deref() else {
            return;
        };
        let inside = subtree_ids(sub);
        for p in &g.ports {
            if p.target.as_ref().is_some_and(|t| inside.contains(&t.block_id)) {
                proxies.insert(PortRef::new(&g.id, &p.id));
            }
        }
        collect_outward(sub, &g.id, &mut proxies);
    });
    proxies
}

fn collect_outward(blocks: &[Block], group_id: &str, out: &mut BTreeSet<PortRef>) {
    for b in blocks {
        for t in b.ports.iter().filter_map(|p| p.target.as_ref()) {
            if t.block_id == group_id {
                out.insert(t.clone());
            }
        }
        if let Some(sub) = &b.subblocks {
            collect_outward(sub, group_id, out);
        }
    }
}

/// Every edge of the tree with proxy hops collapsed, as `(source, terminal)`.
///
/// Edges are only started from non-proxy ports. A chain that ends on a proxy
/// without a target, or loops back on itself, is dropped.
pub fn flattened_connections(diagram: &Diagram) -> Vec<(PortRef, PortRef)> {
    let proxies = proxy_ports(diagram);
    let mut out = Vec::new();
    for (source, first) in diagram.edges() {
        if proxies.contains(&source) {
            continue;
        }
        let mut seen = BTreeSet::new();
        let mut cur = Some(first);
        while let Some(t) = cur.take() {
            if !proxies.contains(&t) {
                out.push((source.clone(), t));
                break;
            }
            if !seen.insert(t.clone()) {
                log::warn!("proxy loop through {} from {}", t, source);
                break;
            }
            cur = diagram.lookup_port(&t).and_then(|p| p.target.clone());
        }
    }
    out
}
