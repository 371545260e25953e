use super::{child_path, prune_recycle_bins};
use crate::hierarchy::{Node, NodeKind, Tree};

/// A source node and where it would land in the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedNode {
    pub path: String,
    pub kind: NodeKind,
}

/// What a reconciliation would do, worked out from two snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    /// Source nodes with no same-named counterpart in the target
    pub to_create: Vec<PlannedNode>,

    /// Source nodes matched by name to a target node (sections get their pages merged)
    pub existing: Vec<PlannedNode>,

    /// Recycle bins, left out together with their subtree
    pub skipped: Vec<PlannedNode>,
}

impl ReconciliationPlan {
    /// Check if the target would gain new nodes
    pub fn creates_nodes(&self) -> bool {
        !self.to_create.is_empty()
    }
}

/// Plan a node-by-node reconciliation of `source` into `target`.
///
/// Entries appear in the order the reconciler visits them.
pub fn build_reconciliation_plan(source: &Tree, target: &Tree) -> ReconciliationPlan {
    let mut plan = ReconciliationPlan::default();
    plan_folder(&source.children, Some(&target.children), "", &mut plan);
    plan
}

/// Plan a top-level splice of `source` into `target`
pub fn build_splice_plan(source: &Tree) -> ReconciliationPlan {
    let mut plan = ReconciliationPlan::default();
    for node in &source.children {
        let planned = PlannedNode {
            path: node.name.clone(),
            kind: node.kind,
        };
        if node.is_recycle_bin {
            plan.skipped.push(planned);
            continue;
        }
        plan.to_create.push(planned);

        let mut pruned = node.clone();
        plan.skipped.extend(
            prune_recycle_bins(&mut pruned, &node.name)
                .into_iter()
                .map(|path| PlannedNode {
                    path,
                    kind: NodeKind::Group,
                }),
        );
    }
    plan
}

fn plan_folder(nodes: &[Node], target: Option<&[Node]>, path: &str, plan: &mut ReconciliationPlan) {
    for section in nodes.iter().filter(|n| n.is_section()) {
        let planned = PlannedNode {
            path: child_path(path, &section.name),
            kind: NodeKind::Section,
        };
        if find_named(target, section).is_some() {
            plan.existing.push(planned);
        } else {
            plan.to_create.push(planned);
        }
    }

    for group in nodes.iter().filter(|n| n.is_group()) {
        let group_path = child_path(path, &group.name);
        let planned = PlannedNode {
            path: group_path.clone(),
            kind: NodeKind::Group,
        };

        if group.is_recycle_bin {
            plan.skipped.push(planned);
            continue;
        }

        let matched = find_named(target, group);
        if matched.is_some() {
            plan.existing.push(planned);
        } else {
            plan.to_create.push(planned);
        }

        plan_folder(
            &group.children,
            matched.map(|m| m.children.as_slice()),
            &group_path,
            plan,
        );
    }
}

fn find_named<'a>(target: Option<&'a [Node]>, node: &Node) -> Option<&'a Node> {
    target?
        .iter()
        .find(|candidate| candidate.kind == node.kind && candidate.name == node.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(nodes: &[PlannedNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.path.as_str()).collect()
    }

    fn source() -> Tree {
        Tree::notebook(
            "src",
            "Local",
            vec![
                Node::section("s1", "A"),
                Node::group("g1", "B", vec![Node::section("s2", "C"), Node::section("s3", "D")]),
                Node::recycle_bin("rb", "Trash", vec![Node::section("s4", "X")]),
            ],
        )
    }

    #[test]
    fn test_plan_against_empty_target() {
        let plan = build_reconciliation_plan(&source(), &Tree::notebook("dst", "Remote", vec![]));

        assert_eq!(paths(&plan.to_create), vec!["A", "B", "B/C", "B/D"]);
        assert!(plan.existing.is_empty());
        assert_eq!(paths(&plan.skipped), vec!["Trash"]);
        assert!(plan.creates_nodes());
    }

    #[test]
    fn test_plan_against_partial_target() {
        let target = Tree::notebook(
            "dst",
            "Remote",
            vec![
                Node::section("t1", "A"),
                Node::group("t2", "B", vec![Node::section("t3", "C")]),
            ],
        );
        let plan = build_reconciliation_plan(&source(), &target);

        assert_eq!(paths(&plan.existing), vec!["A", "B", "B/C"]);
        assert_eq!(paths(&plan.to_create), vec!["B/D"]);
    }

    #[test]
    fn test_plan_matches_on_kind() {
        let target = Tree::notebook("dst", "Remote", vec![Node::group("t1", "A", vec![])]);
        let plan = build_reconciliation_plan(&source(), &target);

        assert_eq!(plan.to_create[0].path, "A");
        assert_eq!(plan.to_create[0].kind, NodeKind::Section);
    }

    #[test]
    fn test_splice_plan() {
        let plan = build_splice_plan(&source());
        assert_eq!(paths(&plan.to_create), vec!["A", "B"]);
        assert_eq!(paths(&plan.skipped), vec!["Trash"]);
    }

    #[test]
    fn test_splice_plan_skips_nested_recycle_bins() {
        let source = Tree::notebook(
            "src",
            "Local",
            vec![Node::group(
                "g1",
                "G",
                vec![Node::section("s1", "S"), Node::recycle_bin("rb", "Trash", vec![])],
            )],
        );
        let plan = build_splice_plan(&source);
        assert_eq!(paths(&plan.to_create), vec!["G"]);
        assert_eq!(paths(&plan.skipped), vec!["G/Trash"]);
    }
}
