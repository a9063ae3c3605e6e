use crate::error::{DiagramError, EntityKind};
use crate::model::{Block, Diagram};

/// Resolve the blocks shown by a frame, given the ids of the enclosing blocks
/// from the root down. An empty path is the root frame.
pub fn resolve_frame<'a>(diagram: &'a Diagram, path: &[String]) -> Option<&'a [Block]> {
    let mut cur: &[Block] = &diagram.blocks;
    for id in path {
        let block = cur.iter().find(|b| &b.id == id)?;
        cur = block.subblocks.as_deref()?;
    }
    Some(cur)
}

/// Mutable variant of [`resolve_frame`].
pub fn resolve_frame_mut<'a>(diagram: &'a mut Diagram, path: &[String]) -> Option<&'a mut Vec<Block>> {
    let mut cur = &mut diagram.blocks;
    for id in path {
        let block = cur.iter_mut().find(|b| &b.id == id)?;
        cur = block.subblocks.as_mut()?;
    }
    Some(cur)
}

/// Collect the id path of every group in the tree, depth-first.
pub fn collect_group_paths(diagram: &Diagram) -> Vec<Vec<String>> {
    fn rec(blocks: &[Block], path: &mut Vec<String>, out: &mut Vec<Vec<String>>) {
        for b in blocks {
            if let Some(sub) = &b.subblocks {
                path.push(b.id.clone());
                out.push(path.clone());
                rec(sub, path, out);
                path.pop();
            }
        }
    }
    let mut out = Vec::new();
    let mut p = Vec::new();
    rec(&diagram.blocks, &mut p, &mut out);
    out
}

/// One level of the navigation stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewFrame {
    /// Block whose interior this frame shows; `None` for the root frame.
    pub enclosing_block_id: Option<String>,
}

/// Stack of entered groups.
///
/// The stack stores the chain of enclosing block ids rather than copies of the
/// blocks: a frame's blocks are resolved from the tree on demand, so edits
/// made inside a frame land in the tree directly and popping a frame needs no
/// write-back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewStack {
    path: Vec<String>,
}

impl ViewStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames, including the root frame.
    pub fn depth(&self) -> usize {
        self.path.len() + 1
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Enclosing block ids from the outermost group to the active one.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Id of the block whose interior is active, if any.
    pub fn enclosing(&self) -> Option<&str> {
        self.path.last().map(String::as_str)
    }

    /// All frames, root first.
    pub fn frames(&self) -> Vec<ViewFrame> {
        std::iter::once(None)
            .chain(self.path.iter().cloned().map(Some))
            .map(|enclosing_block_id| ViewFrame { enclosing_block_id })
            .collect()
    }

    /// Blocks of the active frame. Empty if the path no longer resolves.
    pub fn blocks<'a>(&self, diagram: &'a Diagram) -> &'a [Block] {
        resolve_frame(diagram, &self.path).unwrap_or(&[])
    }

    pub fn blocks_mut<'a>(&self, diagram: &'a mut Diagram) -> Option<&'a mut Vec<Block>> {
        resolve_frame_mut(diagram, &self.path)
    }

    pub fn contains(&self, diagram: &Diagram, block_id: &str) -> bool {
        self.blocks(diagram).iter().any(|b| b.id == block_id)
    }

    /// Push a frame exposing the interior of `block_id`, which must be a
    /// block of the active frame with at least one subblock.
    pub fn enter(&mut self, diagram: &Diagram, block_id: &str) -> Result<(), DiagramError> {
        let block = self
            .blocks(diagram)
            .iter()
            .find(|b| b.id == block_id)
            .ok_or_else(|| DiagramError::not_found(EntityKind::Block, block_id))?;
        if !block.has_subblocks() {
            return Err(DiagramError::NoSubblocks {
                id: block_id.to_string(),
            });
        }
        self.path.push(block_id.to_string());
        log::debug!("entered group {} (depth {})", block_id, self.depth());
        Ok(())
    }

    /// Pop the active frame. Returns `false` at the root frame.
    pub fn exit(&mut self) -> bool {
        match self.path.pop() {
            Some(id) => {
                log::debug!("left group {} (depth {})", id, self.depth());
                true
            }
            None => false,
        }
    }

    /// Open the interior of any group in the tree, rebuilding the stack from
    /// its ancestors.
    pub fn open(&mut self, diagram: &Diagram, block_id: &str) -> Result<(), DiagramError> {
        let mut path = diagram
            .path_to(block_id)
            .ok_or_else(|| DiagramError::not_found(EntityKind::Block, block_id))?;
        let block = diagram.require(block_id)?;
        if !block.has_subblocks() {
            return Err(DiagramError::NoSubblocks {
                id: block_id.to_string(),
            });
        }
        path.push(block_id.to_string());
        self.path = path;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.path.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_level() -> Diagram {
        let mut inner = Block::new("h", "H");
        inner.subblocks = Some(vec![Block::new("x", "X")]);
        let mut group = Block::new("g", "G");
        group.subblocks = Some(vec![inner, Block::new("y", "Y")]);
        let mut empty = Block::new("e", "E");
        empty.subblocks = Some(vec![]);
        let mut d = Diagram::new("d", "D");
        d.blocks = vec![Block::new("a", "A"), group, empty];
        d
    }

    #[test]
    fn test_enter_and_exit() {
        let d = two_level();
        let mut stack = ViewStack::new();
        assert!(stack.is_root());
        assert_eq!(stack.blocks(&d).len(), 3);

        stack.enter(&d, "g").unwrap();
        assert_eq!(stack.enclosing(), Some("g"));
        assert_eq!(stack.blocks(&d).len(), 2);

        stack.enter(&d, "h").unwrap();
        assert_eq!(stack.depth(), 3);
        assert_eq!(stack.blocks(&d)[0].id, "x");

        assert!(stack.exit());
        assert!(stack.exit());
        assert!(!stack.exit());
        assert!(stack.is_root());
    }

    #[test]
    fn test_enter_failures_leave_stack_untouched() {
        let d = two_level();
        let mut stack = ViewStack::new();
        assert!(matches!(stack.enter(&d, "a"), Err(DiagramError::NoSubblocks { .. })));
        assert!(matches!(stack.enter(&d, "e"), Err(DiagramError::NoSubblocks { .. })));
        // not in the active frame
        assert!(matches!(stack.enter(&d, "h"), Err(DiagramError::NotFound { .. })));
        assert!(stack.is_root());
    }

    #[test]
    fn test_open_rebuilds_ancestors() {
        let d = two_level();
        let mut stack = ViewStack::new();
        stack.open(&d, "h").unwrap();
        assert_eq!(stack.path(), &["g".to_string(), "h".to_string()]);
        let frames = stack.frames();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].enclosing_block_id, None);
        assert_eq!(frames[2].enclosing_block_id.as_deref(), Some("h"));
    }

    #[test]
    fn test_collect_group_paths() {
        let d = two_level();
        let paths = collect_group_paths(&d);
        assert_eq!(
            paths,
            vec![
                vec!["g".to_string()],
                vec!["g".to_string(), "h".to_string()],
                vec!["e".to_string()],
            ]
        );
    }
}
