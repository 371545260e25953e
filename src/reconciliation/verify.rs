use super::child_path;
use crate::hierarchy::{Node, NodeKind, Tree};
use std::collections::HashSet;

/// Post-migration comparison of source and target snapshots.
///
/// Recycle bins are left out on both sides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    pub source_sections: usize,
    pub source_groups: usize,
    pub target_sections: usize,
    pub target_groups: usize,
    /// Source paths with no node of the same kind at the same path in the target
    pub missing: Vec<String>,
}

impl VerificationReport {
    pub fn is_consistent(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Compare what the source holds with what the target ended up with
pub fn verify_migration(source: &Tree, target: &Tree) -> VerificationReport {
    let mut source_paths = Vec::new();
    collect_paths(&source.children, "", &mut source_paths);

    let mut target_paths = Vec::new();
    collect_paths(&target.children, "", &mut target_paths);

    let count = |paths: &[(String, NodeKind)], kind: NodeKind| paths.iter().filter(|(_, k)| *k == kind).count();
    let present: HashSet<&(String, NodeKind)> = target_paths.iter().collect();

    VerificationReport {
        source_sections: count(&source_paths, NodeKind::Section),
        source_groups: count(&source_paths, NodeKind::Group),
        target_sections: count(&target_paths, NodeKind::Section),
        target_groups: count(&target_paths, NodeKind::Group),
        missing: source_paths
            .iter()
            .filter(|entry| !present.contains(entry))
            .map(|(path, _)| path.clone())
            .collect(),
    }
}

fn collect_paths(nodes: &[Node], prefix: &str, out: &mut Vec<(String, NodeKind)>) {
    for node in nodes {
        if node.is_recycle_bin {
            continue;
        }
        let path = child_path(prefix, &node.name);
        collect_paths(&node.children, &path, out);
        out.push((path, node.kind));
    }
}
