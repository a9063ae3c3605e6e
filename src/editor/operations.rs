//! Editing operations on the block tree.
//!
//! Every operation is a plain function that mutates the [`Diagram`] in place.
//! Operations scoped to a view take the view path (enclosing block ids from
//! the root down, see [`ViewStack::path`](crate::view::ViewStack::path)) and
//! only touch blocks of that frame. Validation happens before the first
//! mutation, so an `Err` always leaves the tree unchanged.

use crate::error::{DiagramError, EntityKind, Result};
use crate::model::{
    Block, DEFAULT_X, DEFAULT_Y, Diagram, Port, PortRef, Requirement, Side, next_id, subtree_ids,
};
use crate::view::resolve_frame_mut;

pub const DEFAULT_BLOCK_NAME: &str = "New Block";
pub const DEFAULT_PORT_NAME: &str = "port";
pub const DEFAULT_REQUIREMENT_TEXT: &str = "New requirement";

/// Vertical distance reserved per block when stacking new blocks.
const STACK_STEP: f64 = 70.0;
const STACK_GAP: f64 = 20.0;

// ────────────────────────────────────────────────────────────────────────────
// Frame access
// ────────────────────────────────────────────────────────────────────────────

pub(crate) fn frame_mut<'a>(diagram: &'a mut Diagram, path: &[String]) -> Result<&'a mut Vec<Block>> {
    let missing = path.last().cloned().unwrap_or_default();
    resolve_frame_mut(diagram, path).ok_or_else(|| DiagramError::not_found(EntityKind::Block, missing))
}

fn frame_block_mut<'a>(diagram: &'a mut Diagram, path: &[String], id: &str) -> Result<&'a mut Block> {
    frame_mut(diagram, path)?
        .iter_mut()
        .find(|b| b.id == id)
        .ok_or_else(|| DiagramError::not_found(EntityKind::Block, id))
}

fn port_not_found(block_id: &str, port_id: &str) -> DiagramError {
    DiagramError::not_found(EntityKind::Port, PortRef::new(block_id, port_id).to_string())
}

// ────────────────────────────────────────────────────────────────────────────
// Blocks
// ────────────────────────────────────────────────────────────────────────────

/// Append a new block to the frame, stacked below the lowest existing one.
/// Returns the new block's id.
pub fn add_block(diagram: &mut Diagram, path: &[String], name: &str) -> Result<String> {
    let id = diagram.next_block_id("b");
    let frame = frame_mut(diagram, path)?;
    let below = frame
        .iter()
        .map(|b| b.y.unwrap_or(DEFAULT_Y) + STACK_STEP)
        .reduce(f64::max)
        .unwrap_or(DEFAULT_Y);
    frame.push(Block::new(&id, name).at(DEFAULT_X, below + STACK_GAP));
    log::debug!("added block {}", id);
    Ok(id)
}

/// Remove a block of the frame and clear every target in the tree that
/// pointed into it or into any of its descendants.
pub fn delete_block(diagram: &mut Diagram, path: &[String], id: &str) -> Result<Block> {
    let frame = frame_mut(diagram, path)?;
    let idx = frame
        .iter()
        .position(|b| b.id == id)
        .ok_or_else(|| DiagramError::not_found(EntityKind::Block, id))?;
    let removed = frame.remove(idx);
    let gone = subtree_ids(std::slice::from_ref(&removed));
    let cleared = diagram.clear_targets_into(&gone);
    log::debug!("deleted block {} ({} blocks, {} dangling edges cleared)", id, gone.len(), cleared);
    Ok(removed)
}

pub fn rename_block(diagram: &mut Diagram, path: &[String], id: &str, name: &str) -> Result<()> {
    frame_block_mut(diagram, path, id)?.name = name.to_string();
    Ok(())
}

/// Set a block's stored, frame-relative position.
pub fn move_block(diagram: &mut Diagram, path: &[String], id: &str, x: f64, y: f64) -> Result<()> {
    let block = frame_block_mut(diagram, path, id)?;
    block.x = Some(x);
    block.y = Some(y);
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Ports
// ────────────────────────────────────────────────────────────────────────────

/// Direction for [`move_port`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortMove {
    Up,
    Down,
}

/// Changes applied by [`edit_port`]. `None` leaves a field as is; an empty
/// name clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortEdit {
    pub name: Option<String>,
    pub side: Option<Side>,
}

/// Append a port to a block. Returns the new port id, `<blockId>-p<n>`.
pub fn add_port(
    diagram: &mut Diagram,
    path: &[String],
    block_id: &str,
    side: Side,
    name: &str,
) -> Result<String> {
    let block = frame_block_mut(diagram, path, block_id)?;
    let id = next_id(&format!("{}-p", block_id), block.ports.iter().map(|p| p.id.as_str()));
    block.ports.push(Port::new(&id, name, side));
    Ok(id)
}

/// Remove a port, clearing every target that pointed at it and dropping the
/// block's requirements linked to it.
pub fn remove_port(diagram: &mut Diagram, path: &[String], block_id: &str, port_id: &str) -> Result<Port> {
    let block = frame_block_mut(diagram, path, block_id)?;
    let idx = block
        .ports
        .iter()
        .position(|p| p.id == port_id)
        .ok_or_else(|| port_not_found(block_id, port_id))?;
    let removed = block.ports.remove(idx);
    block.requirements.retain(|r| r.port_id.as_deref() != Some(port_id));

    let gone = PortRef::new(block_id, port_id);
    diagram.walk_blocks_mut(&mut |b| {
        for p in &mut b.ports {
            if p.target.as_ref() == Some(&gone) {
                p.target = None;
            }
        }
    });
    Ok(removed)
}

pub fn edit_port(
    diagram: &mut Diagram,
    path: &[String],
    block_id: &str,
    port_id: &str,
    edit: PortEdit,
) -> Result<()> {
    let port = frame_block_mut(diagram, path, block_id)?
        .port_mut(port_id)
        .ok_or_else(|| port_not_found(block_id, port_id))?;
    if let Some(name) = edit.name {
        port.name = Some(name).filter(|n| !n.is_empty());
    }
    if let Some(side) = edit.side {
        port.side = side;
    }
    Ok(())
}

/// Swap a port with its neighbour in declaration order. Returns `false` when
/// the port is already at that end.
pub fn move_port(
    diagram: &mut Diagram,
    path: &[String],
    block_id: &str,
    port_id: &str,
    dir: PortMove,
) -> Result<bool> {
    let block = frame_block_mut(diagram, path, block_id)?;
    let idx = block
        .ports
        .iter()
        .position(|p| p.id == port_id)
        .ok_or_else(|| port_not_found(block_id, port_id))?;
    let other = match dir {
        PortMove::Up => idx.checked_sub(1),
        PortMove::Down => Some(idx + 1).filter(|i| *i < block.ports.len()),
    };
    match other {
        Some(other) => {
            block.ports.swap(idx, other);
            Ok(true)
        }
        None => Ok(false),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Connections
// ────────────────────────────────────────────────────────────────────────────

/// Point `source` at `target`, replacing any previous target. Both ports may
/// live anywhere in the tree. Connecting a port to itself does nothing and
/// returns `false`.
pub fn connect(diagram: &mut Diagram, source: &PortRef, target: &PortRef) -> Result<bool> {
    if source == target {
        return Ok(false);
    }
    diagram.require(&target.block_id)?;
    if diagram.lookup_port(target).is_none() {
        return Err(port_not_found(&target.block_id, &target.port_id));
    }
    let port = diagram
        .require_mut(&source.block_id)?
        .port_mut(&source.port_id)
        .ok_or_else(|| port_not_found(&source.block_id, &source.port_id))?;
    port.target = Some(target.clone());
    log::debug!("connected {} -> {}", source, target);
    Ok(true)
}

/// Clear the target of `source`, returning the previous one.
pub fn disconnect(diagram: &mut Diagram, source: &PortRef) -> Result<Option<PortRef>> {
    let port = diagram
        .require_mut(&source.block_id)?
        .port_mut(&source.port_id)
        .ok_or_else(|| port_not_found(&source.block_id, &source.port_id))?;
    Ok(port.target.take())
}

// ────────────────────────────────────────────────────────────────────────────
// Requirements
// ────────────────────────────────────────────────────────────────────────────

/// Attach a requirement to a block, optionally linked to one of its ports.
/// Returns the new requirement id.
pub fn add_requirement(
    diagram: &mut Diagram,
    path: &[String],
    block_id: &str,
    text: &str,
    port_id: Option<&str>,
) -> Result<String> {
    let id = diagram.next_requirement_id();
    let block = frame_block_mut(diagram, path, block_id)?;
    if let Some(pid) = port_id {
        if block.port(pid).is_none() {
            return Err(port_not_found(block_id, pid));
        }
    }
    block.requirements.push(Requirement {
        id: id.clone(),
        text: text.to_string(),
        port_id: port_id.map(str::to_string),
    });
    Ok(id)
}

fn requirement_mut<'a>(block: &'a mut Block, req_id: &str) -> Result<&'a mut Requirement> {
    block
        .requirements
        .iter_mut()
        .find(|r| r.id == req_id)
        .ok_or_else(|| DiagramError::not_found(EntityKind::Requirement, req_id))
}

pub fn edit_requirement(
    diagram: &mut Diagram,
    path: &[String],
    block_id: &str,
    req_id: &str,
    text: &str,
) -> Result<()> {
    let block = frame_block_mut(diagram, path, block_id)?;
    requirement_mut(block, req_id)?.text = text.to_string();
    Ok(())
}

pub fn remove_requirement(
    diagram: &mut Diagram,
    path: &[String],
    block_id: &str,
    req_id: &str,
) -> Result<Requirement> {
    let block = frame_block_mut(diagram, path, block_id)?;
    let idx = block
        .requirements
        .iter()
        .position(|r| r.id == req_id)
        .ok_or_else(|| DiagramError::not_found(EntityKind::Requirement, req_id))?;
    Ok(block.requirements.remove(idx))
}
