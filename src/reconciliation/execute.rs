use super::{child_path, display_path, ensure_container, ReconcileError, ReconciliationResult};
use crate::hierarchy::{Node, Tree};
use crate::store::{CreateKind, Store, StoreRef};
use tracing::{debug, info};

/// Pending work while walking the source tree
enum Step<'a> {
    /// Copy the sections of a folder, then schedule its groups
    Folder {
        nodes: &'a [Node],
        target: StoreRef,
        path: String,
    },
    /// Open or create one group, then walk it
    Group {
        node: &'a Node,
        parent: StoreRef,
        path: String,
    },
    /// Flush a folder once everything below it is done
    Sync { target: StoreRef, path: String },
}

/// Copy the tree below `source` into `target`, node by node.
///
/// Depth-first, pre-order, source order kept. Sections are opened or created
/// by name and get the source pages merged in; groups are opened or created
/// by name and walked; recycle bins are skipped with their subtree. Each
/// target folder is synchronized once its subtree is done.
///
/// The first store failure ends the walk. Nothing already written is undone.
pub async fn reconcile<S: Store + ?Sized>(
    store: &S,
    source: &Tree,
    target: &StoreRef,
) -> Result<ReconciliationResult, ReconcileError> {
    ensure_container(target)?;

    let mut result = ReconciliationResult::default();
    let mut steps = vec![Step::Folder {
        nodes: &source.children,
        target: target.clone(),
        path: String::new(),
    }];

    while let Some(step) = steps.pop() {
        match step {
            Step::Folder { nodes, target, path } => {
                for section in nodes.iter().filter(|n| n.is_section()) {
                    let section_path = child_path(&path, &section.name);
                    let opened = store
                        .open_or_create(&section.name, Some(&target), CreateKind::Section)
                        .await?;

                    info!(path = %section_path, created = opened.created, "Copying section");
                    store.merge_content(&section.id, &opened.target.id).await?;

                    if opened.created {
                        result.created.push(section_path.clone());
                    } else {
                        result.opened.push(section_path.clone());
                    }
                    result.merged.push(section_path);
                }

                // Stack order: groups first (in source order), then this folder's sync
                steps.push(Step::Sync {
                    target: target.clone(),
                    path: path.clone(),
                });
                for group in nodes.iter().filter(|n| n.is_group()).rev() {
                    steps.push(Step::Group {
                        node: group,
                        parent: target.clone(),
                        path: child_path(&path, &group.name),
                    });
                }
            }
            Step::Group { node, parent, path } => {
                if node.is_recycle_bin {
                    info!(path = %path, "Skipping recycle bin");
                    result.skipped.push(path);
                    continue;
                }

                let opened = store
                    .open_or_create(&node.name, Some(&parent), CreateKind::Group)
                    .await?;
                info!(path = %path, created = opened.created, "Copying group");

                if opened.created {
                    result.created.push(path.clone());
                } else {
                    result.opened.push(path.clone());
                }

                steps.push(Step::Folder {
                    nodes: &node.children,
                    target: opened.target,
                    path,
                });
            }
            Step::Sync { target, path } => {
                store.synchronize(&target).await?;
                debug!(path = %display_path(&path), "Synchronized folder");
                result.synchronized.push(display_path(&path));
            }
        }
    }

    Ok(result)
}
