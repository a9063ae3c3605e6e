//! Group a selection of sibling blocks into a new composite block.
//!
//! Every edge crossing the new group's boundary is routed through a proxy
//! port synthesized on the group: a left-side proxy for each internal port
//! fed from outside, a right-side proxy for each internal port feeding
//! outside. The grouped blocks become the group's subblocks, rebased to the
//! group's origin.

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;

use crate::error::{DiagramError, EntityKind, Result};
use crate::model::{Block, Diagram, Port, PortRef, Side, duplicate_port_id, subtree_ids};
use crate::view::{resolve_frame, resolve_frame_mut};

pub const DEFAULT_GROUP_NAME: &str = "Group";

/// Result of a successful [`group_blocks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOutcome {
    pub group_id: String,
    /// Number of left-side (inward) proxies.
    pub inputs: usize,
    /// Number of right-side (outward) proxies.
    pub outputs: usize,
}

/// Boundary role of one internal port.
#[derive(Debug, Default)]
struct Crossing {
    /// Original external target, when the port feeds outside.
    out_target: Option<PortRef>,
    /// External ports feeding this port, in tree order.
    sources: Vec<PortRef>,
}

fn named(diagram: &Diagram, r: &PortRef) -> Option<String> {
    diagram
        .lookup_port(r)
        .and_then(|p| p.name.clone())
        .filter(|n| !n.is_empty())
}

/// Replace the blocks `ids` of the frame at `path` with a new group.
///
/// Fails without touching the tree when fewer than two distinct blocks are
/// selected, when an id is not a block of the frame, or when a selected block
/// repeats a port id.
pub fn group_blocks(
    diagram: &mut Diagram,
    path: &[String],
    ids: &[String],
    name: &str,
) -> Result<GroupOutcome> {
    let mut selected: Vec<&str> = Vec::new();
    for id in ids {
        if !selected.contains(&id.as_str()) {
            selected.push(id);
        }
    }
    if selected.len() < 2 {
        return Err(DiagramError::InsufficientSelection {
            selected: selected.len(),
        });
    }

    let frame = resolve_frame(diagram, path).ok_or_else(|| {
        DiagramError::not_found(EntityKind::Block, path.last().cloned().unwrap_or_default())
    })?;
    for id in &selected {
        let block = frame
            .iter()
            .find(|b| b.id == *id)
            .ok_or_else(|| DiagramError::not_found(EntityKind::Block, *id))?;
        if let Some(port_id) = duplicate_port_id(block) {
            return Err(DiagramError::DuplicatePortId {
                block_id: block.id.clone(),
                port_id: port_id.to_string(),
            });
        }
    }
    let to_group: Vec<&Block> = frame
        .iter()
        .filter(|b| selected.contains(&b.id.as_str()))
        .collect();

    let mut internal = BTreeSet::new();
    for b in &to_group {
        internal.extend(subtree_ids(std::slice::from_ref(*b)));
    }

    // Classify boundary ports: outgoing crossings first, then incoming.
    // Dangling targets cross nothing and are left as they are.
    let mut crossings: IndexMap<PortRef, Crossing> = IndexMap::new();
    diagram.walk_blocks(&mut |_, b| {
        if !internal.contains(&b.id) {
            return;
        }
        for p in &b.ports {
            let external = p
                .target
                .as_ref()
                .filter(|t| !internal.contains(&t.block_id) && diagram.lookup_port(t).is_some());
            if let Some(t) = external {
                crossings.entry(PortRef::new(&b.id, &p.id)).or_default().out_target = Some(t.clone());
            }
        }
    });
    diagram.walk_blocks(&mut |_, b| {
        if internal.contains(&b.id) {
            return;
        }
        for p in &b.ports {
            let inbound = p
                .target
                .as_ref()
                .filter(|t| internal.contains(&t.block_id) && diagram.lookup_port(t).is_some());
            if let Some(t) = inbound {
                crossings
                    .entry(t.clone())
                    .or_default()
                    .sources
                    .push(PortRef::new(&b.id, &p.id));
            }
        }
    });

    let group_id = diagram.next_block_id("g");
    let mut proxies = Vec::new();
    let mut inward: HashMap<PortRef, String> = HashMap::new();
    let mut outward: HashMap<PortRef, String> = HashMap::new();
    let mut counter = 0usize;
    for (key, crossing) in &crossings {
        let internal_label = diagram
            .lookup(&key.block_id)
            .map(|b| b.port_label(&key.port_id))
            .unwrap_or_else(|| key.to_string());
        if let Some(first) = crossing.sources.first() {
            let id = format!("{}-in-{}", group_id, counter);
            counter += 1;
            let label = named(diagram, first).unwrap_or_else(|| internal_label.clone());
            proxies.push(Port::new(&id, label, Side::Left).targeting(&key.block_id, &key.port_id));
            inward.insert(key.clone(), id);
        }
        if let Some(target) = &crossing.out_target {
            let id = format!("{}-out-{}", group_id, counter);
            counter += 1;
            let label = named(diagram, target).unwrap_or_else(|| internal_label.clone());
            let mut proxy = Port::new(&id, label, Side::Right);
            proxy.target = Some(target.clone());
            proxies.push(proxy);
            outward.insert(key.clone(), id);
        }
    }

    let (gx, gy) = to_group
        .iter()
        .map(|b| b.origin())
        .fold((f64::INFINITY, f64::INFINITY), |(mx, my), (x, y)| (mx.min(x), my.min(y)));

    // Everything is validated; rewire, then restructure the frame.
    diagram.walk_blocks_mut(&mut |b| {
        let is_internal = internal.contains(&b.id);
        for p in &mut b.ports {
            let key = PortRef::new(&b.id, &p.id);
            let proxy = if is_internal {
                outward.get(&key)
            } else {
                p.target.as_ref().and_then(|t| inward.get(t))
            };
            if let Some(proxy) = proxy {
                p.target = Some(PortRef::new(&group_id, proxy));
            }
        }
    });

    let frame = resolve_frame_mut(diagram, path).ok_or_else(|| {
        DiagramError::not_found(EntityKind::Block, path.last().cloned().unwrap_or_default())
    })?;
    let (mut grouped, remaining): (Vec<Block>, Vec<Block>) = std::mem::take(frame)
        .into_iter()
        .partition(|b| selected.contains(&b.id.as_str()));
    for b in &mut grouped {
        let (x, y) = b.origin();
        b.x = Some(x - gx);
        b.y = Some(y - gy);
    }

    let outcome = GroupOutcome {
        group_id: group_id.clone(),
        inputs: inward.len(),
        outputs: outward.len(),
    };
    let mut group = Block::new(group_id, name).at(gx, gy);
    group.ports = proxies;
    group.subblocks = Some(grouped);
    *frame = remaining;
    frame.push(group);

    log::info!(
        "grouped {} blocks into {} ({} in, {} out)",
        selected.len(),
        outcome.group_id,
        outcome.inputs,
        outcome.outputs
    );
    Ok(outcome)
}
