use super::{child_path, ensure_container, ReconcileError, ReconciliationResult};
use crate::hierarchy::{HierarchyScope, Node};
use crate::store::{Store, StoreRef};
use tracing::info;

/// Where a spliced batch goes: before the first group, or at the end
pub fn splice_position(children: &[Node]) -> usize {
    children
        .iter()
        .position(Node::is_group)
        .unwrap_or(children.len())
}

/// Insert `batch` into `children` at `splice_position`, keeping batch order.
///
/// Returns the insertion index.
pub fn splice_children(children: &mut Vec<Node>, batch: Vec<Node>) -> usize {
    let at = splice_position(children);
    children.splice(at..at, batch);
    at
}

/// Drop every recycle bin below `node`, returning their paths in visit order
pub fn prune_recycle_bins(node: &mut Node, path: &str) -> Vec<String> {
    let mut pruned = Vec::new();
    let children = std::mem::take(&mut node.children);
    for mut child in children {
        let nested = child_path(path, &child.name);
        if child.is_recycle_bin {
            pruned.push(nested);
            continue;
        }
        pruned.extend(prune_recycle_bins(&mut child, &nested));
        node.children.push(child);
    }
    pruned
}

/// Move the top-level sections and groups of `source` into `target` in one
/// hierarchy update.
///
/// Recycle bins at any depth are left out. A bin nested in a moved group is
/// discarded with the source copy of that group. Existing target nodes are
/// left as they are and are not matched by name.
pub async fn splice<S: Store + ?Sized>(
    store: &S,
    source: &StoreRef,
    target: &StoreRef,
) -> Result<ReconciliationResult, ReconcileError> {
    ensure_container(target)?;

    let source_tree = store.fetch_hierarchy(source, HierarchyScope::Subtree).await?;
    let mut result = ReconciliationResult::default();

    let mut batch = Vec::new();
    for mut node in source_tree.children {
        if node.is_recycle_bin {
            info!(path = %node.name, "Skipping recycle bin");
            result.skipped.push(node.name);
            continue;
        }
        let path = node.name.clone();
        for pruned in prune_recycle_bins(&mut node, &path) {
            info!(path = %pruned, "Skipping recycle bin");
            result.skipped.push(pruned);
        }
        result.created.push(path);
        batch.push(node);
    }

    if !batch.is_empty() {
        let mut target_tree = store.fetch_hierarchy(target, HierarchyScope::Subtree).await?;
        let count = batch.len();
        let at = splice_children(&mut target_tree.children, batch);

        info!(count, position = at, "Splicing top-level nodes into target");
        store.update_hierarchy(&target_tree).await?;
    }

    store.synchronize(target).await?;
    result.synchronized.push("/".to_string());

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(nodes: &[Node]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn test_splice_before_first_group() {
        let mut children = vec![Node::section("1", "Old"), Node::group("2", "Existing", vec![])];
        let at = splice_children(
            &mut children,
            vec![Node::section("3", "A"), Node::group("4", "B", vec![])],
        );

        assert_eq!(at, 1);
        assert_eq!(names(&children), vec!["Old", "A", "B", "Existing"]);
    }

    #[test]
    fn test_splice_appends_without_groups() {
        let mut children = vec![Node::section("1", "Old")];
        let at = splice_children(&mut children, vec![Node::section("2", "A")]);

        assert_eq!(at, 1);
        assert_eq!(names(&children), vec!["Old", "A"]);
    }

    #[test]
    fn test_prune_nested_recycle_bins() {
        let mut node = Node::group(
            "1",
            "G",
            vec![
                Node::section("2", "S"),
                Node::recycle_bin("3", "Trash", vec![Node::section("4", "X")]),
                Node::group("5", "H", vec![Node::recycle_bin("6", "Bin", vec![])]),
            ],
        );

        let pruned = prune_recycle_bins(&mut node, "G");

        assert_eq!(pruned, vec!["G/Trash", "G/H/Bin"]);
        assert_eq!(names(&node.children), vec!["S", "H"]);
        assert!(node.children[1].children.is_empty());
    }

    #[test]
    fn test_splice_into_empty() {
        let mut children = Vec::new();
        assert_eq!(splice_children(&mut children, vec![Node::section("1", "A")]), 0);
        assert_eq!(names(&children), vec!["A"]);
    }
}
