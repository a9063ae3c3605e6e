use crate::config::EditorConfig;
use crate::model::{Block, Diagram, PortRef, Side};

use super::navigation::ViewStack;

/// Vertical margin above the first and below the last port on a block edge.
pub const PORT_MARGIN: f64 = 10.0;
/// Distance a port glyph sits outside its block edge.
pub const PORT_OUTSET: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, by: Point) -> Point {
        Point::new(self.x + by.x, self.y + by.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Block rectangle in the block's own (group-relative) frame.
pub fn block_rect(b: &Block) -> Rect {
    let (x, y) = b.origin();
    Rect {
        x,
        y,
        w: b.width(),
        h: b.height(),
    }
}

/// Spacing between consecutive ports on one side.
fn side_spacing(available: f64, count: usize) -> f64 {
    if count > 1 {
        available / (count - 1) as f64
    } else {
        available / 2.0
    }
}

/// Index of `port_id` among the ports on its side, with the side's size.
fn side_slot(b: &Block, port_id: &str) -> Option<(Side, usize, usize)> {
    let side = b.port(port_id)?.side;
    let same_side: Vec<&str> = b
        .ports
        .iter()
        .filter(|p| p.side == side)
        .map(|p| p.id.as_str())
        .collect();
    let idx = same_side.iter().position(|id| *id == port_id)?;
    Some((side, idx, same_side.len()))
}

/// Port anchor on a block's edge in the block's native frame. Left ports sit
/// just outside the left edge, right ports just outside the right edge, each
/// side spread independently.
pub fn port_anchor_pos(b: &Block, port_id: &str) -> Option<Point> {
    let (side, idx, count) = side_slot(b, port_id)?;
    let r = block_rect(b);
    let available = (r.h - 2.0 * PORT_MARGIN).max(20.0);
    let y = r.y + PORT_MARGIN + idx as f64 * side_spacing(available, count);
    let x = match side {
        Side::Left => r.x - PORT_OUTSET,
        Side::Right => r.x + r.w + PORT_OUTSET,
    };
    Some(Point::new(x, y))
}

// ────────────────────────────────────────────────────────────────────────────
// View box
// ────────────────────────────────────────────────────────────────────────────

/// Layout of the box drawn around the interior of an entered group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub canvas_w: f64,
    pub canvas_h: f64,
    /// The group box itself.
    pub frame: Rect,
    pub padding: f64,
    /// Offset applied to every block of a nested view.
    pub inner: Point,
}

impl ViewBox {
    pub fn from_config(cfg: &EditorConfig) -> Self {
        let (canvas_w, canvas_h) = cfg.canvas.bounds();
        let sv = &cfg.sub_view;
        Self {
            canvas_w,
            canvas_h,
            frame: Rect {
                x: sv.x,
                y: sv.y,
                w: canvas_w - sv.x * 2.0,
                h: canvas_h - sv.y * 2.0,
            },
            padding: sv.padding,
            inner: Point::new(sv.x + sv.padding, sv.y + sv.padding),
        }
    }

    /// Offset for the active frame: one fixed inset whenever the view is
    /// nested, independent of how deep.
    pub fn inset(&self, nested: bool) -> Point {
        if nested { self.inner } else { Point::ZERO }
    }

    /// Position of a port of the enclosing group, pinned to the inner edge of
    /// the box.
    pub fn boundary_port_pos(&self, enclosing: &Block, port_id: &str) -> Option<Point> {
        let (side, idx, count) = side_slot(enclosing, port_id)?;
        let available = (self.frame.h - self.padding * 2.0).max(40.0);
        let y = self.inner.y + idx as f64 * side_spacing(available, count);
        let x = match side {
            Side::Left => self.inner.x,
            Side::Right => self.inner.x + self.frame.w - self.padding * 2.0,
        };
        Some(Point::new(x, y))
    }

    /// Clamp a frame-relative block position so the block stays on the canvas.
    pub fn clamp_block_pos(&self, nested: bool, x: f64, y: f64, w: f64, h: f64) -> (f64, f64) {
        let inset = self.inset(nested);
        let max_x = (self.canvas_w - inset.x - 20.0).max(100.0);
        let max_y = (self.canvas_h - inset.y - 20.0).max(100.0);
        (x.min(max_x - w).max(0.0), y.min(max_y - h).max(0.0))
    }
}

/// Rendered position of any port for the active view.
///
/// Ports of the enclosing group are pinned to the box edge; ports of blocks
/// in the view are shifted by the view inset; any other port is resolved in
/// its own block's unshifted frame.
pub fn resolve_port_pos(
    diagram: &Diagram,
    stack: &ViewStack,
    view_box: &ViewBox,
    port: &PortRef,
) -> Option<Point> {
    if let Some(enclosing) = stack.enclosing().filter(|id| *id == port.block_id) {
        let block = diagram.lookup(enclosing)?;
        return view_box.boundary_port_pos(block, &port.port_id);
    }
    if let Some(block) = stack.blocks(diagram).iter().find(|b| b.id == port.block_id) {
        let p = port_anchor_pos(block, &port.port_id)?;
        return Some(p.offset(view_box.inset(!stack.is_root())));
    }
    let block = diagram.lookup(&port.block_id)?;
    port_anchor_pos(block, &port.port_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Port;

    fn block_with_ports() -> Block {
        Block::new("a", "A")
            .at(100.0, 50.0)
            .with_port(Port::new("l1", "in1", Side::Left))
            .with_port(Port::new("l2", "in2", Side::Left))
            .with_port(Port::new("r1", "out", Side::Right))
    }

    #[test]
    fn test_port_anchor_positions() {
        let b = block_with_ports();
        // height = max(16 + 2 * 18, 60) = 60, available = 40
        let l1 = port_anchor_pos(&b, "l1").unwrap();
        let l2 = port_anchor_pos(&b, "l2").unwrap();
        let r1 = port_anchor_pos(&b, "r1").unwrap();
        assert_eq!(l1, Point::new(92.0, 60.0));
        assert_eq!(l2, Point::new(92.0, 100.0));
        assert_eq!(r1, Point::new(268.0, 60.0));
        assert!(port_anchor_pos(&b, "missing").is_none());
    }

    #[test]
    fn test_view_box_defaults() {
        let vb = ViewBox::from_config(&EditorConfig::default());
        assert_eq!(vb.inner, Point::new(56.0, 56.0));
        assert_eq!(vb.frame.w, 720.0);
        assert_eq!(vb.frame.h, 340.0);
        assert_eq!(vb.inset(false), Point::ZERO);
    }

    #[test]
    fn test_boundary_ports_pinned_to_box() {
        let vb = ViewBox::from_config(&EditorConfig::default());
        let g = block_with_ports();
        // available = max(40, 340 - 32) = 308, two left ports -> spacing 308
        assert_eq!(vb.boundary_port_pos(&g, "l1"), Some(Point::new(56.0, 56.0)));
        assert_eq!(vb.boundary_port_pos(&g, "l2"), Some(Point::new(56.0, 364.0)));
        assert_eq!(vb.boundary_port_pos(&g, "r1"), Some(Point::new(744.0, 56.0)));
    }

    #[test]
    fn test_clamp_block_pos() {
        let vb = ViewBox::from_config(&EditorConfig::default());
        // root: max_x = 780, max_y = 400
        assert_eq!(vb.clamp_block_pos(false, -5.0, -5.0, 160.0, 60.0), (0.0, 0.0));
        assert_eq!(vb.clamp_block_pos(false, 9999.0, 9999.0, 160.0, 60.0), (620.0, 340.0));
        // nested: max_x = 724, max_y = 344
        assert_eq!(vb.clamp_block_pos(true, 9999.0, 9999.0, 160.0, 60.0), (564.0, 284.0));
        assert_eq!(vb.clamp_block_pos(true, 10.0, 20.0, 160.0, 60.0), (10.0, 20.0));
    }
}
