//! The store collaborator: the automation surface the reconciler drives.
//!
//! `Store` is the seam. `LocalStore` is the concrete application, holding
//! open notebooks in memory and persisting them through a `NotebookBacking`.

mod backing;
mod local;
mod types;

pub use backing::{DirectoryBacking, MemoryBacking, NotebookBacking, HIERARCHY_FILE, SECTIONS_DIR};
pub use local::LocalStore;
pub use types::{CreateKind, Notebook, Opened, Page, SectionContent, StoreRef};

use crate::hierarchy::{HierarchyError, HierarchyScope, Tree};
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Stale snapshot: {0}")]
    StaleSnapshot(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Hierarchy error: {0}")]
    HierarchyError(#[from] HierarchyError),
}

/// Operations the reconciler and the migration driver need from a store.
///
/// Every call completes before the next one is issued; implementations are
/// free to block inside a call.
#[async_trait]
pub trait Store: Send + Sync {
    /// Open the object named `name` under `parent`, creating it as `kind` when missing.
    ///
    /// With no parent, `name` is a notebook location. Opening is by name, so
    /// calling this twice returns the same object.
    async fn open_or_create(
        &self,
        name: &str,
        parent: Option<&StoreRef>,
        kind: CreateKind,
    ) -> Result<Opened, StoreError>;

    /// Snapshot of the object behind `target`.
    async fn fetch_hierarchy(
        &self,
        target: &StoreRef,
        scope: HierarchyScope,
    ) -> Result<Tree, StoreError>;

    /// Write the content of a section to `destination` and return the written bytes.
    async fn publish_section(
        &self,
        section_id: &str,
        destination: &Path,
    ) -> Result<Vec<u8>, StoreError>;

    /// Add the pages of one section to another. Never removes target pages.
    async fn merge_content(
        &self,
        source_section_id: &str,
        target_section_id: &str,
    ) -> Result<(), StoreError>;

    /// Apply an edited snapshot back to the store.
    async fn update_hierarchy(&self, tree: &Tree) -> Result<(), StoreError>;

    /// Flush pending writes for the notebook owning `target`.
    async fn synchronize(&self, target: &StoreRef) -> Result<(), StoreError>;

    /// Release the notebook owning `target`.
    async fn close(&self, target: &StoreRef) -> Result<(), StoreError>;
}
