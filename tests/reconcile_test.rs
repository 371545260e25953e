mod common;

use async_trait::async_trait;
use common::{add_page, group, page_titles, recycle_bin, section, seed_notebook, snapshot};
use notebook_migrate::{
    build_reconciliation_plan, reconcile, CreateKind, HierarchyScope, LocalStore, MemoryBacking, Node,
    ObjectKind, Opened, ReconcileError, Store, StoreError, StoreRef, Tree,
};
use std::path::Path;

async fn local_and_remote(
    source: Vec<Node>,
    target: Vec<Node>,
) -> (LocalStore<MemoryBacking>, StoreRef, StoreRef) {
    let store = LocalStore::in_memory();
    let local = seed_notebook(&store, "local/Notes", source).await;
    let remote = seed_notebook(&store, "remote/Notes - Remote", target).await;
    (store, local, remote)
}

// ============ Structure Tests ============

#[tokio::test]
async fn test_reconcile_into_empty_target_is_isomorphic() {
    let (store, local, remote) = local_and_remote(
        vec![
            section("A"),
            group("B", vec![section("C"), group("D", vec![section("E")])]),
            group("F", vec![]),
        ],
        vec![],
    )
    .await;

    let source = snapshot(&store, &local).await;
    let result = reconcile(&store, &source, &remote)
        .await
        .expect("Should reconcile");

    let target = snapshot(&store, &remote).await;
    assert_eq!(target.outline(), source.outline());
    assert_eq!(result.created, vec!["A", "B", "B/C", "B/D", "B/D/E", "F"]);
    assert!(result.opened.is_empty());
    assert_eq!(result.merged, vec!["A", "B/C", "B/D/E"]);
    assert_eq!(result.synchronized, vec!["B/D", "B", "F", "/"]);
}

#[tokio::test]
async fn test_reconcile_section_and_group() {
    let (store, local, remote) =
        local_and_remote(vec![section("A"), group("B", vec![section("C")])], vec![]).await;

    let source = snapshot(&store, &local).await;
    reconcile(&store, &source, &remote)
        .await
        .expect("Should reconcile");

    assert_eq!(snapshot(&store, &remote).await.outline(), "A\nB/\n  C\n");
}

#[tokio::test]
async fn test_reconcile_target_ids_are_new() {
    let (store, local, remote) = local_and_remote(vec![section("A")], vec![]).await;

    let source = snapshot(&store, &local).await;
    reconcile(&store, &source, &remote)
        .await
        .expect("Should reconcile");

    let target = snapshot(&store, &remote).await;
    assert_ne!(target.children[0].id, source.children[0].id);
}

// ============ Recycle Bin Tests ============

#[tokio::test]
async fn test_reconcile_skips_root_recycle_bin() {
    let (store, local, remote) =
        local_and_remote(vec![recycle_bin("Trash", vec![section("X")])], vec![]).await;

    let source = snapshot(&store, &local).await;
    let result = reconcile(&store, &source, &remote)
        .await
        .expect("Should reconcile");

    let target = snapshot(&store, &remote).await;
    assert!(target.children.is_empty());
    assert_eq!(result.skipped, vec!["Trash"]);
    assert!(result.created.is_empty());
}

#[tokio::test]
async fn test_reconcile_skips_nested_recycle_bin() {
    let (store, local, remote) = local_and_remote(
        vec![group(
            "G",
            vec![
                section("S"),
                group("H", vec![recycle_bin("Deleted", vec![section("X"), group("Y", vec![])])]),
            ],
        )],
        vec![],
    )
    .await;

    let source = snapshot(&store, &local).await;
    let result = reconcile(&store, &source, &remote)
        .await
        .expect("Should reconcile");

    assert_eq!(snapshot(&store, &remote).await.outline(), "G/\n  S\n  H/\n");
    assert_eq!(result.skipped, vec!["G/H/Deleted"]);
}

// ============ Merge Tests ============

#[tokio::test]
async fn test_reconcile_twice_is_idempotent() {
    let (store, local, remote) = local_and_remote(
        vec![section("A"), group("B", vec![section("C")])],
        vec![],
    )
    .await;
    add_page(&store, &local, "A", "First", "one").await;

    let source = snapshot(&store, &local).await;
    reconcile(&store, &source, &remote)
        .await
        .expect("First run should succeed");
    let after_first = snapshot(&store, &remote).await;

    let second = reconcile(&store, &source, &remote)
        .await
        .expect("Second run should succeed");
    let after_second = snapshot(&store, &remote).await;

    assert_eq!(after_second, after_first);
    assert!(second.created.is_empty());
    assert_eq!(second.opened, vec!["A", "B", "B/C"]);
    assert_eq!(page_titles(&store, &remote, "A").await, vec!["First"]);
}

#[tokio::test]
async fn test_reconcile_merges_into_existing_target() {
    let (store, local, remote) = local_and_remote(
        vec![section("A"), group("B", vec![section("C")])],
        vec![section("A"), section("Z"), group("B", vec![section("Q")])],
    )
    .await;
    add_page(&store, &local, "A", "Local page", "from local").await;
    add_page(&store, &remote, "A", "Remote page", "from remote").await;

    let source = snapshot(&store, &local).await;
    let result = reconcile(&store, &source, &remote)
        .await
        .expect("Should reconcile");

    assert_eq!(
        snapshot(&store, &remote).await.outline(),
        "A\nZ\nB/\n  Q\n  C\n"
    );
    assert_eq!(result.opened, vec!["A", "B"]);
    assert_eq!(result.created, vec!["B/C"]);
    assert_eq!(
        page_titles(&store, &remote, "A").await,
        vec!["Remote page", "Local page"]
    );
}

#[tokio::test]
async fn test_reconcile_page_union_without_duplicates() {
    let (store, local, remote) = local_and_remote(vec![section("A")], vec![]).await;
    add_page(&store, &local, "A", "Shared", "same body").await;

    let source = snapshot(&store, &local).await;
    reconcile(&store, &source, &remote)
        .await
        .expect("First run should succeed");

    add_page(&store, &remote, "A", "Remote only", "edited remotely").await;
    add_page(&store, &local, "A", "Local only", "edited locally").await;

    let source = snapshot(&store, &local).await;
    reconcile(&store, &source, &remote)
        .await
        .expect("Second run should succeed");

    assert_eq!(
        page_titles(&store, &remote, "A").await,
        vec!["Shared", "Remote only", "Local only"]
    );
}

// ============ Plan Tests ============

#[tokio::test]
async fn test_plan_matches_reconcile() {
    let (store, local, remote) = local_and_remote(
        vec![
            section("A"),
            group("B", vec![section("C"), section("D")]),
            recycle_bin("Trash", vec![section("X")]),
        ],
        vec![group("B", vec![section("C")])],
    )
    .await;

    let source = snapshot(&store, &local).await;
    let plan = build_reconciliation_plan(&source, &snapshot(&store, &remote).await);
    let result = reconcile(&store, &source, &remote)
        .await
        .expect("Should reconcile");

    let planned: Vec<&str> = plan.to_create.iter().map(|n| n.path.as_str()).collect();
    let existing: Vec<&str> = plan.existing.iter().map(|n| n.path.as_str()).collect();
    let skipped: Vec<&str> = plan.skipped.iter().map(|n| n.path.as_str()).collect();
    assert_eq!(planned, result.created);
    assert_eq!(existing, result.opened);
    assert_eq!(skipped, result.skipped);
}

// ============ Failure Tests ============

#[tokio::test]
async fn test_reconcile_into_section_fails() {
    let (store, local, remote) = local_and_remote(vec![section("A")], vec![section("S")]).await;

    let source = snapshot(&store, &local).await;
    let target = snapshot(&store, &remote).await;
    let section_ref = StoreRef::new(target.children[0].id.clone(), ObjectKind::Section);

    let result = reconcile(&store, &source, &section_ref).await;
    assert!(matches!(result, Err(ReconcileError::TargetIsSection(_))));
}

/// Delegates to a `LocalStore` but refuses to create anything named `fail_on`
struct FailingStore {
    inner: LocalStore<MemoryBacking>,
    fail_on: String,
}

#[async_trait]
impl Store for FailingStore {
    async fn open_or_create(
        &self,
        name: &str,
        parent: Option<&StoreRef>,
        kind: CreateKind,
    ) -> Result<Opened, StoreError> {
        if name == self.fail_on {
            return Err(StoreError::CollaboratorUnavailable(format!("cannot open {}", name)));
        }
        self.inner.open_or_create(name, parent, kind).await
    }

    async fn fetch_hierarchy(&self, target: &StoreRef, scope: HierarchyScope) -> Result<Tree, StoreError> {
        self.inner.fetch_hierarchy(target, scope).await
    }

    async fn publish_section(&self, section_id: &str, destination: &Path) -> Result<Vec<u8>, StoreError> {
        self.inner.publish_section(section_id, destination).await
    }

    async fn merge_content(&self, source: &str, target: &str) -> Result<(), StoreError> {
        self.inner.merge_content(source, target).await
    }

    async fn update_hierarchy(&self, tree: &Tree) -> Result<(), StoreError> {
        self.inner.update_hierarchy(tree).await
    }

    async fn synchronize(&self, target: &StoreRef) -> Result<(), StoreError> {
        self.inner.synchronize(target).await
    }

    async fn close(&self, target: &StoreRef) -> Result<(), StoreError> {
        self.inner.close(target).await
    }
}

#[tokio::test]
async fn test_store_failure_aborts_without_rollback() {
    let (inner, local, remote) = local_and_remote(
        vec![
            section("A"),
            group("B", vec![section("C")]),
            group("Broken", vec![section("Never")]),
        ],
        vec![],
    )
    .await;
    let store = FailingStore {
        inner,
        fail_on: "Broken".to_string(),
    };

    let source = snapshot(&store, &local).await;
    let result = reconcile(&store, &source, &remote).await;

    assert!(matches!(
        result,
        Err(ReconcileError::StoreError(StoreError::CollaboratorUnavailable(_)))
    ));
    // Work done before the failure stays
    assert_eq!(snapshot(&store, &remote).await.outline(), "A\nB/\n  C\n");
}
