//! Shared test utilities for integration tests.

#![allow(dead_code)]

use notebook_migrate::{
    CreateKind, HierarchyScope, LocalStore, Node, NotebookBacking, Page, Store, StoreRef, Tree,
};
use tempfile::TempDir;

/// Create a temporary directory for testing
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// A new section; the store assigns the id
pub fn section(name: &str) -> Node {
    Node::section("", name)
}

/// A new section group; the store assigns the id
pub fn group(name: &str, children: Vec<Node>) -> Node {
    Node::group("", name, children)
}

/// A new recycle bin; the store assigns the id
pub fn recycle_bin(name: &str, children: Vec<Node>) -> Node {
    Node::recycle_bin("", name, children)
}

/// Create (or open) the notebook at `location`, add `children` and synchronize
pub async fn seed_notebook<B: NotebookBacking>(
    store: &LocalStore<B>,
    location: &str,
    children: Vec<Node>,
) -> StoreRef {
    let notebook = store
        .open_or_create(location, None, CreateKind::Notebook)
        .await
        .expect("Should open notebook")
        .target;

    if !children.is_empty() {
        store
            .update_hierarchy(&Tree::notebook(notebook.id.clone(), "", children))
            .await
            .expect("Should seed hierarchy");
    }
    store.synchronize(&notebook).await.expect("Should synchronize");
    notebook
}

/// Append a page to the section at `path` (slash-separated names)
pub async fn add_page<B: NotebookBacking>(
    store: &LocalStore<B>,
    notebook: &StoreRef,
    path: &str,
    title: &str,
    body: &str,
) {
    let section_id = node_id(store, notebook, path).await;
    store
        .append_page(&section_id, Page::new(title, body))
        .await
        .expect("Should append page");
    store.synchronize(notebook).await.expect("Should synchronize");
}

/// Id of the node at `path`
pub async fn node_id<S: Store + ?Sized>(store: &S, notebook: &StoreRef, path: &str) -> String {
    snapshot(store, notebook)
        .await
        .find_by_path(path)
        .unwrap_or_else(|| panic!("No node at {}", path))
        .id
        .clone()
}

/// Full snapshot of a notebook
pub async fn snapshot<S: Store + ?Sized>(store: &S, notebook: &StoreRef) -> Tree {
    store
        .fetch_hierarchy(notebook, HierarchyScope::Subtree)
        .await
        .expect("Should fetch hierarchy")
}

/// Page titles of the section at `path`
pub async fn page_titles<B: NotebookBacking>(
    store: &LocalStore<B>,
    notebook: &StoreRef,
    path: &str,
) -> Vec<String> {
    let section_id = node_id(store, notebook, path).await;
    store
        .section_content(&section_id)
        .await
        .expect("Should read section")
        .pages
        .into_iter()
        .map(|p| p.title)
        .collect()
}
