use indexmap::IndexMap;

use super::{DiagramStore, StoreError, StoreResult, check_loaded, next_diagram_id};
use crate::model::{Block, Diagram, DiagramSummary};

/// In-process store keeping diagrams in creation order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    diagrams: IndexMap<String, Diagram>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.diagrams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagrams.is_empty()
    }
}

impl DiagramStore for MemoryStore {
    fn list(&self) -> StoreResult<Vec<DiagramSummary>> {
        Ok(self.diagrams.values().map(Diagram::summary).collect())
    }

    fn get(&self, id: &str) -> StoreResult<Diagram> {
        let diagram = self
            .diagrams
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        check_loaded(id, &diagram)?;
        Ok(diagram)
    }

    fn create(&mut self, name: &str, blocks: Vec<Block>) -> StoreResult<Diagram> {
        let id = next_diagram_id(self.diagrams.keys().map(String::as_str));
        let mut diagram = Diagram::new(&id, name);
        diagram.blocks = blocks;
        self.diagrams.insert(id, diagram.clone());
        Ok(diagram)
    }

    fn update(&mut self, id: &str, mut diagram: Diagram) -> StoreResult<Diagram> {
        let slot = self
            .diagrams
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        diagram.id = id.to_string();
        *slot = diagram.clone();
        Ok(diagram)
    }

    fn remove(&mut self, id: &str) -> StoreResult<()> {
        self.diagrams
            .shift_remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }
}
