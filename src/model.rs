use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::error::{DiagramError, EntityKind};

/// Fixed rendered width of every block.
pub const BLOCK_WIDTH: f64 = 160.0;
/// Origin used for blocks whose `x` is unset.
pub const DEFAULT_X: f64 = 40.0;
/// Origin used for blocks whose `y` is unset.
pub const DEFAULT_Y: f64 = 20.0;

// ────────────────────────────────────────────────────────────────────────────
// Diagram
// ────────────────────────────────────────────────────────────────────────────

/// A named diagram holding the top-level blocks of a block tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

/// Listing entry returned by a diagram store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramSummary {
    pub id: String,
    pub name: String,
}

impl Diagram {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            blocks: Vec::new(),
        }
    }

    pub fn summary(&self) -> DiagramSummary {
        DiagramSummary {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a diagram from JSON and validate its structure.
    pub fn from_json(text: &str) -> Result<Self, DiagramError> {
        let diagram: Diagram =
            serde_json::from_str(text).map_err(|e| DiagramError::MalformedImport {
                format: "JSON",
                message: e.to_string(),
            })?;
        diagram.validate()?;
        Ok(diagram)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Block
// ────────────────────────────────────────────────────────────────────────────

/// A node of the block tree.
///
/// `x`/`y` are relative to the origin of the immediately enclosing group (or
/// the canvas for top-level blocks). Either may be unset; see
/// [`Block::origin`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default)]
    pub ports: Vec<Port>,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    /// Interior of a group. `None` for plain blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subblocks: Option<Vec<Block>>,
}

impl Block {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            x: None,
            y: None,
            ports: Vec::new(),
            requirements: Vec::new(),
            subblocks: None,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn with_port(mut self, port: Port) -> Self {
        self.ports.push(port);
        self
    }

    /// Stored position with unset coordinates replaced by the defaults.
    pub fn origin(&self) -> (f64, f64) {
        (self.x.unwrap_or(DEFAULT_X), self.y.unwrap_or(DEFAULT_Y))
    }

    pub fn port(&self, port_id: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.id == port_id)
    }

    pub fn port_mut(&mut self, port_id: &str) -> Option<&mut Port> {
        self.ports.iter_mut().find(|p| p.id == port_id)
    }

    /// True when the block has a non-empty interior that can be entered.
    pub fn has_subblocks(&self) -> bool {
        self.subblocks.as_ref().is_some_and(|s| !s.is_empty())
    }

    pub fn children(&self) -> &[Block] {
        self.subblocks.as_deref().unwrap_or(&[])
    }

    pub fn side_count(&self, side: Side) -> usize {
        self.ports.iter().filter(|p| p.side == side).count()
    }

    /// Rendered height, derived from the busier port side. Never persisted.
    pub fn height(&self) -> f64 {
        let max_ports = self
            .side_count(Side::Left)
            .max(self.side_count(Side::Right))
            .max(1);
        (16.0 + 18.0 * max_ports as f64).max(60.0)
    }

    pub fn width(&self) -> f64 {
        BLOCK_WIDTH
    }

    /// `"<block name>.<port name or id>"`, used when no better label exists.
    pub fn port_label(&self, port_id: &str) -> String {
        let port_name = self
            .port(port_id)
            .and_then(|p| p.name.as_deref())
            .filter(|n| !n.is_empty())
            .unwrap_or(port_id);
        format!("{}.{}", self.name, port_name)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Ports and requirements
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    #[default]
    Right,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "left" => Ok(Side::Left),
            "right" => Ok(Side::Right),
            other => Err(format!("unknown port side `{other}`")),
        }
    }
}

/// Address of a port anywhere in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRef {
    pub block_id: String,
    pub port_id: String,
}

impl PortRef {
    pub fn new(block_id: impl Into<String>, port_id: impl Into<String>) -> Self {
        Self {
            block_id: block_id.into(),
            port_id: port_id.into(),
        }
    }
}

impl std::fmt::Display for PortRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.block_id, self.port_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub side: Side,
    /// The single outgoing edge of this port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<PortRef>,
}

impl Port {
    /// An empty `name` leaves the port unnamed.
    pub fn new(id: impl Into<String>, name: impl Into<String>, side: Side) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()).filter(|n| !n.is_empty()),
            side,
            target: None,
        }
    }

    pub fn targeting(mut self, block_id: &str, port_id: &str) -> Self {
        self.target = Some(PortRef::new(block_id, port_id));
        self
    }
}

/// A free-text requirement attached to a block, or to one of its ports when
/// `port_id` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_id: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Tree walk and lookup
// ────────────────────────────────────────────────────────────────────────────

fn walk_rec<'a, F>(blocks: &'a [Block], path: &mut Vec<&'a str>, cb: &mut F)
where
    F: FnMut(&[&'a str], &'a Block),
{
    for blk in blocks {
        cb(path, blk);
        if let Some(sub) = &blk.subblocks {
            path.push(blk.id.as_str());
            walk_rec(sub, path, cb);
            path.pop();
        }
    }
}

fn walk_rec_mut<F>(blocks: &mut [Block], cb: &mut F)
where
    F: FnMut(&mut Block),
{
    for blk in blocks.iter_mut() {
        cb(blk);
        if let Some(sub) = &mut blk.subblocks {
            walk_rec_mut(sub, cb);
        }
    }
}

fn find_in<'a>(blocks: &'a [Block], id: &str) -> Option<&'a Block> {
    for b in blocks {
        if b.id == id {
            return Some(b);
        }
        if let Some(found) = b.subblocks.as_deref().and_then(|s| find_in(s, id)) {
            return Some(found);
        }
    }
    None
}

fn find_in_mut<'a>(blocks: &'a mut [Block], id: &str) -> Option<&'a mut Block> {
    for b in blocks.iter_mut() {
        if b.id == id {
            return Some(b);
        }
        if let Some(found) = b.subblocks.as_deref_mut().and_then(|s| find_in_mut(s, id)) {
            return Some(found);
        }
    }
    None
}

impl Diagram {
    /// Walk every block depth-first, passing the ids of its ancestors.
    pub fn walk_blocks<'a, F>(&'a self, cb: &mut F)
    where
        F: FnMut(&[&'a str], &'a Block),
    {
        let mut path = Vec::new();
        walk_rec(&self.blocks, &mut path, cb);
    }

    pub fn walk_blocks_mut<F>(&mut self, cb: &mut F)
    where
        F: FnMut(&mut Block),
    {
        walk_rec_mut(&mut self.blocks, cb);
    }

    /// Depth-first lookup over the whole tree, including unopened groups.
    pub fn lookup(&self, id: &str) -> Option<&Block> {
        find_in(&self.blocks, id)
    }

    pub fn lookup_mut(&mut self, id: &str) -> Option<&mut Block> {
        find_in_mut(&mut self.blocks, id)
    }

    pub fn require(&self, id: &str) -> Result<&Block, DiagramError> {
        self.lookup(id)
            .ok_or_else(|| DiagramError::not_found(EntityKind::Block, id))
    }

    pub fn require_mut(&mut self, id: &str) -> Result<&mut Block, DiagramError> {
        self.lookup_mut(id)
            .ok_or_else(|| DiagramError::not_found(EntityKind::Block, id))
    }

    pub fn lookup_port(&self, r: &PortRef) -> Option<&Port> {
        self.lookup(&r.block_id).and_then(|b| b.port(&r.port_id))
    }

    /// Ids of the ancestors of `id`, outermost first. `None` if absent.
    pub fn path_to(&self, id: &str) -> Option<Vec<String>> {
        let mut result = None;
        self.walk_blocks(&mut |path, b| {
            if result.is_none() && b.id == id {
                result = Some(path.iter().map(|s| s.to_string()).collect());
            }
        });
        result
    }

    pub fn contains_block(&self, id: &str) -> bool {
        self.lookup(id).is_some()
    }

    /// All block ids in depth-first order.
    pub fn block_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        self.walk_blocks(&mut |_, b| ids.push(b.id.as_str()));
        ids
    }

    /// Every directed edge in the tree as `(source, target)`, depth-first
    /// by source block then port order.
    pub fn edges(&self) -> Vec<(PortRef, PortRef)> {
        let mut out = Vec::new();
        self.walk_blocks(&mut |_, b| {
            for p in &b.ports {
                if let Some(t) = &p.target {
                    out.push((PortRef::new(&b.id, &p.id), t.clone()));
                }
            }
        });
        out
    }

    /// Clear every port target that points at a block in `block_ids`.
    /// Returns the number of edges removed.
    pub fn clear_targets_into(&mut self, block_ids: &BTreeSet<String>) -> usize {
        let mut cleared = 0;
        self.walk_blocks_mut(&mut |b| {
            for p in &mut b.ports {
                if p.target.as_ref().is_some_and(|t| block_ids.contains(&t.block_id)) {
                    p.target = None;
                    cleared += 1;
                }
            }
        });
        cleared
    }

    /// Check the structural invariants: unique block ids across the tree, no
    /// block nested inside a block with the same id, unique port ids per block.
    pub fn validate(&self) -> Result<(), DiagramError> {
        let mut seen: HashMap<&str, ()> = HashMap::new();
        let mut err: Option<DiagramError> = None;
        self.walk_blocks(&mut |path, b| {
            if err.is_some() {
                return;
            }
            if path.contains(&b.id.as_str()) {
                err = Some(DiagramError::CyclicNesting { id: b.id.clone() });
                return;
            }
            if seen.insert(b.id.as_str(), ()).is_some() {
                err = Some(DiagramError::DuplicateBlockId { id: b.id.clone() });
                return;
            }
            if let Some(port_id) = duplicate_port_id(b) {
                err = Some(DiagramError::DuplicatePortId {
                    block_id: b.id.clone(),
                    port_id: port_id.to_string(),
                });
            }
        });
        match err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

pub(crate) fn duplicate_port_id(block: &Block) -> Option<&str> {
    let mut ids = BTreeSet::new();
    block
        .ports
        .iter()
        .find(|p| !ids.insert(p.id.as_str()))
        .map(|p| p.id.as_str())
}

/// Collect the ids of `blocks` and of all their descendants.
pub fn subtree_ids(blocks: &[Block]) -> BTreeSet<String> {
    let mut ids = BTreeSet::new();
    let mut path = Vec::new();
    walk_rec(blocks, &mut path, &mut |_, b| {
        ids.insert(b.id.clone());
    });
    ids
}

// ────────────────────────────────────────────────────────────────────────────
// Id allocation
// ────────────────────────────────────────────────────────────────────────────

/// Next id of the form `<prefix><n>` that is larger than every existing id
/// with the same prefix and numeric suffix. When the largest suffix is
/// `u64::MAX`, the smallest unused suffix is taken instead.
pub fn next_id<'a>(prefix: &str, existing: impl IntoIterator<Item = &'a str>) -> String {
    let used: BTreeSet<u64> = existing
        .into_iter()
        .filter_map(|id| id.strip_prefix(prefix))
        .filter_map(|rest| rest.parse::<u64>().ok())
        .collect();
    let n = match used.last() {
        None => 1,
        Some(max) => max
            .checked_add(1)
            .or_else(|| (1..u64::MAX).find(|n| !used.contains(n)))
            .unwrap_or(0),
    };
    format!("{}{}", prefix, n)
}

impl Diagram {
    /// Fresh block id with the given prefix, unique across the whole tree.
    pub fn next_block_id(&self, prefix: &str) -> String {
        next_id(prefix, self.block_ids())
    }

    /// Fresh requirement id, unique across the whole tree.
    pub fn next_requirement_id(&self) -> String {
        let mut ids = Vec::new();
        self.walk_blocks(&mut |_, b| {
            ids.extend(b.requirements.iter().map(|r| r.id.as_str()));
        });
        next_id("req", ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested() -> Diagram {
        let inner = Block::new("c", "C").at(5.0, 5.0);
        let mut group = Block::new("g", "G").at(100.0, 100.0);
        group.subblocks = Some(vec![inner]);
        let mut d = Diagram::new("d1", "Test");
        d.blocks = vec![Block::new("a", "A"), group];
        d
    }

    #[test]
    fn test_lookup_reaches_unopened_groups() {
        let d = nested();
        assert_eq!(d.lookup("c").map(|b| b.name.as_str()), Some("C"));
        assert!(d.lookup("zzz").is_none());
        assert_eq!(d.path_to("c"), Some(vec!["g".to_string()]));
        assert_eq!(d.path_to("a"), Some(vec![]));
    }

    #[test]
    fn test_height_grows_with_ports() {
        let mut b = Block::new("a", "A");
        assert_eq!(b.height(), 60.0);
        for i in 0..4 {
            b.ports.push(Port::new(format!("p{i}"), "p", Side::Left));
        }
        assert_eq!(b.height(), 88.0);
        assert_eq!(b.width(), BLOCK_WIDTH);
    }

    #[test]
    fn test_next_id_skips_existing() {
        assert_eq!(next_id("b", ["b1", "b7", "x9", "bogus"]), "b8");
        assert_eq!(next_id("g", Vec::<&str>::new()), "g1");
    }

    #[test]
    fn test_next_id_at_suffix_limit() {
        assert_eq!(next_id("g", ["g18446744073709551615"]), "g1");
        assert_eq!(next_id("g", ["g1", "g2", "g18446744073709551615"]), "g3");
    }

    #[test]
    fn test_validate_duplicate_and_cycle() {
        let mut d = nested();
        assert!(d.validate().is_ok());

        d.blocks.push(Block::new("c", "Again"));
        assert!(matches!(d.validate(), Err(DiagramError::DuplicateBlockId { .. })));

        let mut d = nested();
        d.blocks[1]
            .subblocks
            .as_mut()
            .unwrap()
            .push(Block::new("g", "Self"));
        assert!(matches!(d.validate(), Err(DiagramError::CyclicNesting { .. })));
    }

    #[test]
    fn test_absent_sequences_default_to_empty() {
        let d = Diagram::from_json(r#"{"id":"d","name":"n","blocks":[{"id":"a","name":"A"}]}"#)
            .unwrap();
        assert!(d.blocks[0].ports.is_empty());
        assert!(d.blocks[0].requirements.is_empty());
        assert!(d.blocks[0].subblocks.is_none());
        assert!(d.blocks[0].x.is_none());
    }
}
