//! Editing session state.
//!
//! [`EditorSession`] owns one diagram together with everything an editor
//! needs around it: the view stack, the selection, an in-progress drag or
//! connection, and the dirty flag. Every operation goes through the session;
//! there is no ambient state.

use crate::config::EditorConfig;
use crate::error::{DiagramError, EntityKind, Result};
use crate::generator::generate_diagram_xml;
use crate::model::{Diagram, PortRef, Side, subtree_ids};
use crate::parser::parse_diagram_xml;
use crate::resolver::{RenderedConnection, visible_connections};
use crate::store::DiagramStore;
use crate::view::{Point, ViewBox, ViewStack};

use super::grouping::{GroupOutcome, group_blocks};
use super::operations::{self, PortEdit, PortMove};
use super::selection::Selection;

// ────────────────────────────────────────────────────────────────────────────
// Drag state
// ────────────────────────────────────────────────────────────────────────────

/// A block being dragged with the pointer held down.
#[derive(Debug, Clone, PartialEq)]
pub struct DragState {
    pub block_id: String,
    /// Pointer position relative to the block's rendered origin, captured on
    /// pointer-down.
    pub offset: Point,
}

// ────────────────────────────────────────────────────────────────────────────
// EditorSession
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct EditorSession {
    pub diagram: Diagram,
    pub view: ViewStack,
    pub selection: Selection,
    pub drag: Option<DragState>,
    /// Source port of a connection waiting for its target.
    pub pending_connection: Option<PortRef>,
    config: EditorConfig,
    view_box: ViewBox,
    /// Whether the diagram has been modified since it was last saved.
    pub dirty: bool,
}

impl EditorSession {
    pub fn new(diagram: Diagram, config: EditorConfig) -> Self {
        let view_box = ViewBox::from_config(&config);
        Self {
            diagram,
            view: ViewStack::new(),
            selection: Selection::new(),
            drag: None,
            pending_connection: None,
            config,
            view_box,
            dirty: false,
        }
    }

    /// Open a stored diagram.
    pub fn load(store: &dyn DiagramStore, id: &str, config: EditorConfig) -> Result<Self> {
        let diagram = store.get(id)?;
        log::info!("opened diagram {} ({})", diagram.id, diagram.name);
        Ok(Self::new(diagram, config))
    }

    /// Write the diagram back to the store. On failure the session keeps its
    /// edits and stays dirty, so the save can be retried.
    pub fn save(&mut self, store: &mut dyn DiagramStore) -> Result<()> {
        match store.update(&self.diagram.id, self.diagram.clone()) {
            Ok(_) => {
                self.dirty = false;
                log::info!("saved diagram {}", self.diagram.id);
                Ok(())
            }
            Err(e) => {
                log::warn!("saving diagram {} failed: {}", self.diagram.id, e);
                Err(e.into())
            }
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn view_box(&self) -> &ViewBox {
        &self.view_box
    }

    /// Edges to render for the active view.
    pub fn connections(&self) -> Vec<RenderedConnection> {
        visible_connections(&self.diagram, &self.view, &self.view_box)
    }

    fn edited<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_ok() {
            self.dirty = true;
        }
        result
    }

    // ── Navigation ──────────────────────────────────────────────────────────

    /// Enter the interior of a group of the active view.
    pub fn enter(&mut self, block_id: &str) -> Result<()> {
        self.view.enter(&self.diagram, block_id)?;
        self.selection.clear();
        self.drag = None;
        Ok(())
    }

    /// Leave the active group. Returns `false` at the root.
    pub fn exit(&mut self) -> bool {
        let left = self.view.exit();
        if left {
            self.selection.clear();
            self.drag = None;
        }
        left
    }

    // ── Selection ───────────────────────────────────────────────────────────

    pub fn select(&mut self, block_id: &str) -> Result<()> {
        self.require_in_view(block_id)?;
        self.selection.select(block_id);
        Ok(())
    }

    pub fn toggle_selection(&mut self, block_id: &str) -> Result<()> {
        self.require_in_view(block_id)?;
        self.selection.toggle(block_id);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    fn require_in_view(&self, block_id: &str) -> Result<()> {
        if self.view.contains(&self.diagram, block_id) {
            Ok(())
        } else {
            Err(DiagramError::not_found(EntityKind::Block, block_id))
        }
    }

    // ── Block and port editing ──────────────────────────────────────────────

    pub fn add_block(&mut self, name: &str) -> Result<String> {
        let r = operations::add_block(&mut self.diagram, self.view.path(), name);
        let id = self.edited(r)?;
        self.selection.select(&id);
        Ok(id)
    }

    pub fn delete_block(&mut self, block_id: &str) -> Result<()> {
        let r = operations::delete_block(&mut self.diagram, self.view.path(), block_id);
        let removed = self.edited(r)?;
        self.selection.forget(block_id);
        if self.drag.as_ref().is_some_and(|d| d.block_id == block_id) {
            self.drag = None;
        }
        let gone = subtree_ids(std::slice::from_ref(&removed));
        if self
            .pending_connection
            .as_ref()
            .is_some_and(|p| gone.contains(&p.block_id))
        {
            self.pending_connection = None;
        }
        Ok(())
    }

    pub fn rename_block(&mut self, block_id: &str, name: &str) -> Result<()> {
        let r = operations::rename_block(&mut self.diagram, self.view.path(), block_id, name);
        self.edited(r)
    }

    pub fn add_port(&mut self, block_id: &str, side: Side, name: &str) -> Result<String> {
        let r = operations::add_port(&mut self.diagram, self.view.path(), block_id, side, name);
        self.edited(r)
    }

    pub fn remove_port(&mut self, block_id: &str, port_id: &str) -> Result<()> {
        let r = operations::remove_port(&mut self.diagram, self.view.path(), block_id, port_id);
        self.edited(r)?;
        let removed = PortRef::new(block_id, port_id);
        if self.pending_connection.as_ref() == Some(&removed) {
            self.pending_connection = None;
        }
        Ok(())
    }

    pub fn edit_port(&mut self, block_id: &str, port_id: &str, edit: PortEdit) -> Result<()> {
        let r = operations::edit_port(&mut self.diagram, self.view.path(), block_id, port_id, edit);
        self.edited(r)
    }

    pub fn move_port(&mut self, block_id: &str, port_id: &str, dir: PortMove) -> Result<bool> {
        let r = operations::move_port(&mut self.diagram, self.view.path(), block_id, port_id, dir);
        self.edited(r)
    }

    // ── Connections ─────────────────────────────────────────────────────────

    pub fn connect(&mut self, source: &PortRef, target: &PortRef) -> Result<bool> {
        let r = operations::connect(&mut self.diagram, source, target);
        self.edited(r)
    }

    pub fn disconnect(&mut self, source: &PortRef) -> Result<Option<PortRef>> {
        let r = operations::disconnect(&mut self.diagram, source);
        self.edited(r)
    }

    /// Remember `source` as the start of a connection.
    pub fn start_connection(&mut self, source: PortRef) -> Result<()> {
        if self.diagram.lookup_port(&source).is_none() {
            return Err(DiagramError::not_found(EntityKind::Port, source.to_string()));
        }
        self.pending_connection = Some(source);
        Ok(())
    }

    /// Connect the pending source to `target`. Does nothing without a pending
    /// source. The pending source is cleared either way.
    pub fn finish_connection(&mut self, target: &PortRef) -> Result<bool> {
        match self.pending_connection.take() {
            Some(source) => self.connect(&source, target),
            None => Ok(false),
        }
    }

    // ── Requirements ────────────────────────────────────────────────────────

    pub fn add_requirement(&mut self, block_id: &str, text: &str, port_id: Option<&str>) -> Result<String> {
        let r = operations::add_requirement(&mut self.diagram, self.view.path(), block_id, text, port_id);
        self.edited(r)
    }

    pub fn edit_requirement(&mut self, block_id: &str, req_id: &str, text: &str) -> Result<()> {
        let r = operations::edit_requirement(&mut self.diagram, self.view.path(), block_id, req_id, text);
        self.edited(r)
    }

    pub fn remove_requirement(&mut self, block_id: &str, req_id: &str) -> Result<()> {
        let r = operations::remove_requirement(&mut self.diagram, self.view.path(), block_id, req_id);
        self.edited(r).map(|_| ())
    }

    // ── Grouping ────────────────────────────────────────────────────────────

    /// Group the multi-selection. The new group becomes the primary selection.
    pub fn group_selection(&mut self, name: &str) -> Result<GroupOutcome> {
        let ids = self.selection.multi.clone();
        let r = group_blocks(&mut self.diagram, self.view.path(), &ids, name);
        let outcome = self.edited(r)?;
        self.selection.select(&outcome.group_id);
        Ok(outcome)
    }

    // ── Dragging ────────────────────────────────────────────────────────────

    /// Start dragging a block of the active view grabbed at `pointer`.
    pub fn pointer_down(&mut self, block_id: &str, pointer: Point) -> Result<()> {
        let block = self
            .view
            .blocks(&self.diagram)
            .iter()
            .find(|b| b.id == block_id)
            .ok_or_else(|| DiagramError::not_found(EntityKind::Block, block_id))?;
        let inset = self.view_box.inset(!self.view.is_root());
        let (x, y) = block.origin();
        self.drag = Some(DragState {
            block_id: block_id.to_string(),
            offset: Point::new(pointer.x - (x + inset.x), pointer.y - (y + inset.y)),
        });
        Ok(())
    }

    /// Move the dragged block under the pointer, clamped to the canvas.
    /// Returns the new frame-relative position, or `None` without a drag.
    pub fn pointer_move(&mut self, pointer: Point) -> Result<Option<(f64, f64)>> {
        let Some(drag) = &self.drag else {
            return Ok(None);
        };
        let nested = !self.view.is_root();
        let inset = self.view_box.inset(nested);
        let block = self
            .view
            .blocks(&self.diagram)
            .iter()
            .find(|b| b.id == drag.block_id)
            .ok_or_else(|| DiagramError::not_found(EntityKind::Block, &drag.block_id))?;
        let (x, y) = self.view_box.clamp_block_pos(
            nested,
            pointer.x - drag.offset.x - inset.x,
            pointer.y - drag.offset.y - inset.y,
            block.width(),
            block.height(),
        );
        let id = drag.block_id.clone();
        let r = operations::move_block(&mut self.diagram, self.view.path(), &id, x, y);
        self.edited(r)?;
        Ok(Some((x, y)))
    }

    /// Release the drag. Returns whether one was active.
    pub fn pointer_up(&mut self) -> bool {
        self.drag.take().is_some()
    }

    // ── Interchange ─────────────────────────────────────────────────────────

    pub fn export_xml(&self) -> String {
        generate_diagram_xml(&self.diagram)
    }

    pub fn export_json(&self) -> serde_json::Result<String> {
        self.diagram.to_json_pretty()
    }

    /// Replace the diagram's content with imported XML. The session keeps its
    /// diagram id; on error nothing changes.
    pub fn import_xml(&mut self, text: &str) -> Result<()> {
        let imported = parse_diagram_xml(text, &self.diagram.id)?;
        self.replace_content(imported);
        Ok(())
    }

    /// JSON counterpart of [`EditorSession::import_xml`].
    pub fn import_json(&mut self, text: &str) -> Result<()> {
        let imported = Diagram::from_json(text)?;
        self.replace_content(imported);
        Ok(())
    }

    fn replace_content(&mut self, mut imported: Diagram) {
        imported.id = self.diagram.id.clone();
        log::info!(
            "imported {} top-level blocks into {}",
            imported.blocks.len(),
            imported.id
        );
        self.diagram = imported;
        self.view.reset();
        self.selection.clear();
        self.drag = None;
        self.pending_connection = None;
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, Port};

    fn session() -> EditorSession {
        let mut g = Block::new("g", "G").at(100.0, 100.0);
        g.subblocks = Some(vec![Block::new("c", "C").at(10.0, 10.0)]);
        let mut d = Diagram::new("d1", "Demo");
        d.blocks = vec![
            Block::new("a", "A")
                .at(40.0, 20.0)
                .with_port(Port::new("o", "out", Side::Right)),
            g,
        ];
        EditorSession::new(d, EditorConfig::default())
    }

    #[test]
    fn test_drag_is_idempotent_and_clamped() {
        let mut s = session();
        s.pointer_down("a", Point::new(50.0, 30.0)).unwrap();
        assert_eq!(s.pointer_move(Point::new(110.0, 90.0)).unwrap(), Some((100.0, 80.0)));
        assert_eq!(s.pointer_move(Point::new(110.0, 90.0)).unwrap(), Some((100.0, 80.0)));
        // root canvas: max_x = 780, max_y = 400, block 160 x 60
        assert_eq!(s.pointer_move(Point::new(5000.0, 5000.0)).unwrap(), Some((620.0, 340.0)));
        assert_eq!(s.pointer_move(Point::new(-500.0, -500.0)).unwrap(), Some((0.0, 0.0)));
        assert!(s.pointer_up());
        assert!(!s.pointer_up());
        assert_eq!(s.pointer_move(Point::new(1.0, 1.0)).unwrap(), None);
        assert!(s.dirty);
    }

    #[test]
    fn test_drag_inside_group_subtracts_inset() {
        let mut s = session();
        s.enter("g").unwrap();
        // c rendered at (10 + 56, 10 + 56)
        s.pointer_down("c", Point::new(70.0, 70.0)).unwrap();
        assert_eq!(s.drag.as_ref().unwrap().offset, Point::new(4.0, 4.0));
        assert_eq!(s.pointer_move(Point::new(100.0, 80.0)).unwrap(), Some((40.0, 20.0)));
        assert_eq!(s.diagram.lookup("c").unwrap().x, Some(40.0));
    }

    #[test]
    fn test_enter_exit_clear_selection() {
        let mut s = session();
        s.select("a").unwrap();
        s.enter("g").unwrap();
        assert!(s.selection.is_empty());
        assert!(s.select("a").is_err());
        s.select("c").unwrap();
        assert!(s.exit());
        assert!(s.selection.is_empty());
        assert!(!s.exit());
    }

    #[test]
    fn test_pending_connection() {
        let mut s = session();
        assert!(!s.finish_connection(&PortRef::new("a", "o")).unwrap());
        let p = s.add_port("a", Side::Left, "in").unwrap();
        s.start_connection(PortRef::new("a", "o")).unwrap();
        assert!(s.finish_connection(&PortRef::new("a", &p)).unwrap());
        assert!(s.pending_connection.is_none());
        assert_eq!(
            s.diagram.lookup("a").unwrap().ports[0].target,
            Some(PortRef::new("a", p))
        );
    }

    #[test]
    fn test_removed_source_drops_pending_connection() {
        let mut s = session();
        s.start_connection(PortRef::new("c", "missing")).unwrap_err();
        let p = s.add_port("a", Side::Left, "in").unwrap();

        s.diagram.lookup_mut("c").unwrap().ports.push(Port::new("o", "out", Side::Right));
        s.start_connection(PortRef::new("c", "o")).unwrap();
        s.delete_block("g").unwrap();
        assert!(s.pending_connection.is_none());
        assert!(!s.finish_connection(&PortRef::new("a", &p)).unwrap());

        s.start_connection(PortRef::new("a", &p)).unwrap();
        s.remove_port("a", &p).unwrap();
        assert!(s.pending_connection.is_none());
    }

    #[test]
    fn test_failed_import_leaves_session_untouched() {
        let mut s = session();
        s.enter("g").unwrap();
        let before = s.diagram.clone();
        assert!(s.import_xml("<diagram><block").is_err());
        assert!(s.import_json("{ not json").is_err());
        assert_eq!(s.diagram, before);
        assert_eq!(s.view.enclosing(), Some("g"));
        assert!(!s.dirty);

        s.import_xml(r#"<diagram id="other" name="New"><block id="z"/></diagram>"#)
            .unwrap();
        assert_eq!(s.diagram.id, "d1");
        assert_eq!(s.diagram.name, "New");
        assert!(s.view.is_root());
        assert!(s.dirty);
    }
}
