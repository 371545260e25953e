use super::types::{Notebook, SectionContent};
use super::StoreError;
use crate::hierarchy::{parse_hierarchy, render_hierarchy};
use crate::utils::location_path;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// Hierarchy document inside a notebook directory
pub const HIERARCHY_FILE: &str = "hierarchy.xml";

/// Directory holding one `<section id>.json` per section
pub const SECTIONS_DIR: &str = "sections";

/// Where notebooks live between `synchronize` calls
#[async_trait]
pub trait NotebookBacking: Send + Sync {
    async fn exists(&self, location: &str) -> bool;

    async fn load(&self, location: &str) -> Result<Notebook, StoreError>;

    async fn save(&self, location: &str, notebook: &Notebook) -> Result<(), StoreError>;
}

/// Keeps saved notebooks in a map, keyed by location
#[derive(Default)]
pub struct MemoryBacking {
    notebooks: Mutex<HashMap<String, Notebook>>,
}

impl MemoryBacking {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotebookBacking for MemoryBacking {
    async fn exists(&self, location: &str) -> bool {
        self.notebooks.lock().await.contains_key(location)
    }

    async fn load(&self, location: &str) -> Result<Notebook, StoreError> {
        self.notebooks
            .lock()
            .await
            .get(location)
            .cloned()
            .ok_or_else(|| StoreError::CollaboratorUnavailable(format!("no notebook at {}", location)))
    }

    async fn save(&self, location: &str, notebook: &Notebook) -> Result<(), StoreError> {
        self.notebooks
            .lock()
            .await
            .insert(location.to_string(), notebook.clone());
        Ok(())
    }
}

/// Stores each notebook as a directory: `hierarchy.xml` plus `sections/<id>.json`
pub struct DirectoryBacking {
    namespace: String,
}

impl DirectoryBacking {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }
}

#[async_trait]
impl NotebookBacking for DirectoryBacking {
    async fn exists(&self, location: &str) -> bool {
        location_path(location).join(HIERARCHY_FILE).exists()
    }

    async fn load(&self, location: &str) -> Result<Notebook, StoreError> {
        let root = location_path(location);
        let hierarchy_path = root.join(HIERARCHY_FILE);

        if !hierarchy_path.exists() {
            return Err(StoreError::CollaboratorUnavailable(format!(
                "{} does not contain a notebook",
                root.display()
            )));
        }

        let xml = fs::read_to_string(&hierarchy_path).await?;
        let tree = parse_hierarchy(&xml, &self.namespace)?;
        let mut notebook = Notebook::new(tree);

        let sections_path = root.join(SECTIONS_DIR);
        if sections_path.exists() {
            let mut entries = fs::read_dir(&sections_path).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().map(|e| e == "json") != Some(true) {
                    continue;
                }
                let Some(id) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                    continue;
                };
                let content = fs::read_to_string(&path).await?;
                let section: SectionContent = serde_json::from_str(&content)?;
                notebook.sections.insert(id, section);
            }
        }

        debug!(location, sections = notebook.sections.len(), "Loaded notebook");
        Ok(notebook)
    }

    async fn save(&self, location: &str, notebook: &Notebook) -> Result<(), StoreError> {
        let root = location_path(location);
        let sections_path = root.join(SECTIONS_DIR);
        fs::create_dir_all(&sections_path).await?;

        // Write atomically using temp file + rename
        let xml = render_hierarchy(&notebook.tree, &self.namespace)?;
        let hierarchy_path = root.join(HIERARCHY_FILE);
        let temp_path = hierarchy_path.with_extension("xml.tmp");
        fs::write(&temp_path, xml).await?;
        fs::rename(&temp_path, &hierarchy_path).await?;

        for (id, section) in &notebook.sections {
            let content = serde_json::to_string_pretty(section)?;
            fs::write(sections_path.join(format!("{}.json", id)), content).await?;
        }

        // Sections moved to another notebook leave their files behind
        let live: HashSet<String> = notebook.sections.keys().map(|id| format!("{}.json", id)).collect();
        let mut entries = fs::read_dir(&sections_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().to_string();
            if file_name.ends_with(".json") && !live.contains(&file_name) {
                fs::remove_file(entry.path()).await?;
            }
        }

        debug!(location, sections = notebook.sections.len(), "Saved notebook");
        Ok(())
    }
}
