//! Migration executor for running a notebook migration end to end.

use super::settle::wait_for_settle;
use super::types::{MigrateError, MigrateOptions, MigrationReport};
use crate::hierarchy::{HierarchyScope, Tree};
use crate::reconciliation::{
    build_reconciliation_plan, build_splice_plan, reconcile_with, verify_migration, ReconcileStrategy,
};
use crate::store::{CreateKind, Store, StoreError, StoreRef};
use crate::utils::{copy_dir_recursive, join_location, location_path, remove_dir_if_exists, resolve_path};
use std::path::Path;
use tracing::{info, warn};

/// Executor for migrating a local notebook into a remote one.
///
/// The source notebook is never modified. It is copied to a disposable
/// working copy first, and the copy is what gets reconciled (a splice moves
/// nodes out of it).
pub struct MigrationExecutor<'s, S: Store + ?Sized> {
    store: &'s S,
}

impl<'s, S: Store + ?Sized> MigrationExecutor<'s, S> {
    /// Create a new executor driving the given store.
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Run a migration.
    ///
    /// This method:
    /// 1. Opens the source notebook and reads its name
    /// 2. Copies it to a working copy under `work_dir` and waits for the copy to settle
    /// 3. Opens or creates the remote notebook `<name><remote_suffix>` under `destination`
    /// 4. Reconciles the working copy into the remote notebook and synchronizes it
    /// 5. Verifies the result, logging a warning on mismatch
    /// 6. Closes and deletes the working copy
    ///
    /// Any store failure ends the run with the error. Nothing is rolled back
    /// and the working copy is left in place.
    pub async fn migrate(&self, options: &MigrateOptions) -> Result<MigrationReport, MigrateError> {
        if options.dry_run {
            return self.plan(options).await;
        }

        let (source, source_tree) = self.open_source(options).await?;
        let notebook = source_tree.name.clone();

        info!(
            source = %options.source,
            destination = %options.destination,
            strategy = %options.strategy,
            "Starting migration"
        );

        let source_dir = location_path(source_tree.path.as_deref().unwrap_or(&options.source));
        let working_dir = options.work_dir.join(&notebook);
        self.make_working_copy(&source_dir, &working_dir).await?;

        let copy_location = working_dir.to_string_lossy().to_string();
        let copy = self
            .store
            .open_or_create(&copy_location, None, CreateKind::None)
            .await?
            .target;
        self.store.synchronize(&copy).await?;

        let nodes = wait_for_settle(self.store, &copy, &options.settle).await?;
        info!(location = %copy_location, nodes, "Working copy ready");

        let copy_tree = self.store.fetch_hierarchy(&copy, HierarchyScope::Subtree).await?;

        let remote_location = join_location(&options.destination, &remote_name(&notebook, options));
        let opened = self
            .store
            .open_or_create(&remote_location, None, CreateKind::Notebook)
            .await?;
        let remote = opened.target;
        self.store.synchronize(&remote).await?;
        info!(location = %remote_location, created = opened.created, "Opened remote notebook");

        let result = reconcile_with(self.store, options.strategy, &copy, &remote).await?;
        self.store.synchronize(&remote).await?;

        info!(
            created = result.created.len(),
            opened = result.opened.len(),
            merged = result.merged.len(),
            skipped = result.skipped.len(),
            "Reconciliation finished"
        );

        let remote_tree = self.store.fetch_hierarchy(&remote, HierarchyScope::Subtree).await?;
        let verification = verify_migration(&copy_tree, &remote_tree);
        if verification.is_consistent() {
            info!(
                sections = verification.source_sections,
                groups = verification.source_groups,
                "Remote notebook holds every source node"
            );
        } else {
            warn!(
                missing = ?verification.missing,
                source_sections = verification.source_sections,
                target_sections = verification.target_sections,
                "Remote notebook is missing source nodes"
            );
        }

        self.store.close(&copy).await?;
        remove_dir_if_exists(&working_dir).await?;
        self.store.close(&remote).await?;
        self.store.close(&source).await?;

        info!(notebook = %notebook, remote = %remote_location, "Migration completed");

        Ok(MigrationReport {
            notebook,
            remote: remote_location,
            remote_created: opened.created,
            plan: None,
            result: Some(result),
            verification: Some(verification),
        })
    }

    /// Work out what a migration would do without writing anything.
    ///
    /// A missing remote notebook is treated as empty.
    pub async fn plan(&self, options: &MigrateOptions) -> Result<MigrationReport, MigrateError> {
        let (source, _) = self.open_source(options).await?;
        let source_tree = self.store.fetch_hierarchy(&source, HierarchyScope::Subtree).await?;
        let notebook = source_tree.name.clone();
        let remote_location = join_location(&options.destination, &remote_name(&notebook, options));

        let (remote, remote_tree) = match self
            .store
            .open_or_create(&remote_location, None, CreateKind::None)
            .await
        {
            Ok(opened) => {
                let tree = self
                    .store
                    .fetch_hierarchy(&opened.target, HierarchyScope::Subtree)
                    .await?;
                (Some(opened.target), tree)
            }
            Err(StoreError::CollaboratorUnavailable(_)) => {
                (None, Tree::notebook(String::new(), remote_name(&notebook, options), Vec::new()))
            }
            Err(e) => return Err(e.into()),
        };

        let plan = match options.strategy {
            ReconcileStrategy::PerNode => build_reconciliation_plan(&source_tree, &remote_tree),
            ReconcileStrategy::Splice => build_splice_plan(&source_tree),
        };

        info!(
            create = plan.to_create.len(),
            existing = plan.existing.len(),
            skipped = plan.skipped.len(),
            remote_exists = remote.is_some(),
            "Dry run, nothing written"
        );

        if let Some(remote) = remote {
            self.store.close(&remote).await?;
        }
        self.store.close(&source).await?;

        Ok(MigrationReport {
            notebook,
            remote: remote_location,
            remote_created: false,
            plan: Some(plan),
            result: None,
            verification: None,
        })
    }

    async fn open_source(&self, options: &MigrateOptions) -> Result<(StoreRef, Tree), MigrateError> {
        let source = self
            .store
            .open_or_create(&options.source, None, CreateKind::None)
            .await?
            .target;
        self.store.synchronize(&source).await?;
        let tree = self.store.fetch_hierarchy(&source, HierarchyScope::SelfOnly).await?;
        Ok((source, tree))
    }

    async fn make_working_copy(&self, source_dir: &Path, working_dir: &Path) -> Result<(), MigrateError> {
        // The stale copy is deleted below, so it must not share any directory with the source.
        let resolved_source = resolve_path(source_dir).await?;
        let resolved_working = resolve_path(working_dir).await?;
        if resolved_working.starts_with(&resolved_source) || resolved_source.starts_with(&resolved_working) {
            return Err(MigrateError::WorkingCopyOverlapsSource(
                resolved_working,
                resolved_source,
            ));
        }
        if remove_dir_if_exists(working_dir).await? {
            warn!(path = %working_dir.display(), "Replaced stale working copy");
        }
        let files = copy_dir_recursive(source_dir, working_dir).await?;
        info!(
            from = %source_dir.display(),
            to = %working_dir.display(),
            files,
            "Copied source notebook"
        );
        Ok(())
    }
}

fn remote_name(notebook: &str, options: &MigrateOptions) -> String {
    format!("{}{}", notebook, options.remote_suffix)
}
