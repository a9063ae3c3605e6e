//! Selection state for the editing session.
//!
//! A primary selection (the block shown in the inspector) and an ordered
//! multi-selection (the blocks a grouping acts on) are tracked separately:
//! a plain click replaces both, a toggle only touches the multi-selection.

/// Tracks the selected blocks of the active view by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Block shown in the inspector.
    pub primary: Option<String>,
    /// Blocks toggled for grouping, in the order they were added.
    pub multi: Vec<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all selections.
    pub fn clear(&mut self) {
        self.primary = None;
        self.multi.clear();
    }

    /// Returns true if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.multi.is_empty()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.primary.as_deref() == Some(id) || self.multi.iter().any(|s| s == id)
    }

    /// Toggle `id` in the multi-selection (add if absent, remove if present).
    pub fn toggle(&mut self, id: &str) {
        if let Some(pos) = self.multi.iter().position(|s| s == id) {
            self.multi.remove(pos);
        } else {
            self.multi.push(id.to_string());
        }
    }

    /// Make `id` the primary selection, clearing the multi-selection.
    pub fn select(&mut self, id: &str) {
        self.multi.clear();
        self.primary = Some(id.to_string());
    }

    /// Forget a block that no longer exists.
    pub fn forget(&mut self, id: &str) {
        if self.primary.as_deref() == Some(id) {
            self.primary = None;
        }
        self.multi.retain(|s| s != id);
    }

    pub fn count(&self) -> usize {
        self.multi.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_new_is_empty() {
        let sel = Selection::new();
        assert!(sel.is_empty());
        assert_eq!(sel.count(), 0);
    }

    #[test]
    fn test_selection_toggle() {
        let mut sel = Selection::new();
        sel.toggle("a");
        sel.toggle("b");
        assert_eq!(sel.multi, vec!["a", "b"]);
        sel.toggle("a");
        assert_eq!(sel.multi, vec!["b"]);
        assert!(sel.primary.is_none());
    }

    #[test]
    fn test_selection_select_clears_multi() {
        let mut sel = Selection::new();
        sel.toggle("a");
        sel.toggle("b");
        sel.select("c");
        assert_eq!(sel.count(), 0);
        assert!(sel.is_selected("c"));
        assert!(!sel.is_selected("a"));
    }

    #[test]
    fn test_selection_forget() {
        let mut sel = Selection::new();
        sel.toggle("a");
        sel.select("a");
        sel.toggle("b");
        sel.forget("a");
        assert!(sel.primary.is_none());
        assert_eq!(sel.multi, vec!["b"]);
        sel.clear();
        assert!(sel.is_empty());
    }
}
