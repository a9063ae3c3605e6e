use camino::{Utf8Path, Utf8PathBuf};
use walkdir::WalkDir;

use super::{DiagramStore, StoreError, StoreResult, check_loaded, next_diagram_id};
use crate::model::{Block, Diagram, DiagramSummary};

/// Store keeping one pretty-printed JSON document per diagram at
/// `<dir>/<id>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: Utf8PathBuf,
}

fn io_err(path: &Utf8Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_owned(),
        source,
    }
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<Utf8PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(io_err(&dir))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// File backing `id`. `None` for ids that cannot name a file in the store.
    fn path_for(&self, id: &str) -> Option<Utf8PathBuf> {
        let valid = !id.is_empty()
            && !id.starts_with('.')
            && !id.contains(['/', '\\']);
        valid.then(|| self.dir.join(format!("{}.json", id)))
    }

    fn existing_path(&self, id: &str) -> StoreResult<Utf8PathBuf> {
        self.path_for(id)
            .filter(|p| p.is_file())
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    /// Ids of every stored diagram, by file name.
    fn ids(&self) -> StoreResult<Vec<String>> {
        let mut ids = Vec::new();
        for entry in WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| StoreError::Io {
                path: self.dir.clone(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if let Some(id) = name.strip_suffix(".json") {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }

    fn read(&self, id: &str, path: &Utf8Path) -> StoreResult<Diagram> {
        let text = std::fs::read_to_string(path).map_err(io_err(path))?;
        let diagram: Diagram = serde_json::from_str(&text).map_err(|source| StoreError::Json {
            path: path.to_owned(),
            source,
        })?;
        check_loaded(id, &diagram)?;
        Ok(diagram)
    }

    fn write(&self, path: &Utf8Path, diagram: &Diagram) -> StoreResult<()> {
        let json = diagram.to_json_pretty().map_err(|source| StoreError::Json {
            path: path.to_owned(),
            source,
        })?;
        std::fs::write(path, json).map_err(io_err(path))?;
        log::debug!("wrote {}", path);
        Ok(())
    }
}

impl DiagramStore for FileStore {
    fn list(&self) -> StoreResult<Vec<DiagramSummary>> {
        let mut out = Vec::new();
        for id in self.ids()? {
            let path = self.dir.join(format!("{}.json", id));
            match self.read(&id, &path) {
                Ok(d) => out.push(DiagramSummary { id, name: d.name }),
                Err(e) => log::warn!("skipping {}: {}", path, e),
            }
        }
        Ok(out)
    }

    fn get(&self, id: &str) -> StoreResult<Diagram> {
        let path = self.existing_path(id)?;
        let mut diagram = self.read(id, &path)?;
        diagram.id = id.to_string();
        Ok(diagram)
    }

    fn create(&mut self, name: &str, blocks: Vec<Block>) -> StoreResult<Diagram> {
        let ids = self.ids()?;
        let id = next_diagram_id(ids.iter().map(String::as_str));
        let mut diagram = Diagram::new(&id, name);
        diagram.blocks = blocks;
        let path = self.dir.join(format!("{}.json", id));
        self.write(&path, &diagram)?;
        log::info!("created diagram {} ({})", id, name);
        Ok(diagram)
    }

    fn update(&mut self, id: &str, mut diagram: Diagram) -> StoreResult<Diagram> {
        let path = self.existing_path(id)?;
        diagram.id = id.to_string();
        self.write(&path, &diagram)?;
        Ok(diagram)
    }

    fn remove(&mut self, id: &str) -> StoreResult<()> {
        let path = self.existing_path(id)?;
        std::fs::remove_file(&path).map_err(io_err(&path))?;
        log::info!("removed diagram {}", id);
        Ok(())
    }
}
