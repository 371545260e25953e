//! Copying a section/group tree from one store object into another.
//!
//! Two strategies exist and give different results on a target that
//! already has content:
//!
//! - `PerNode` walks the source depth-first, opening (or creating) each
//!   section and group by name under the target and merging section pages.
//!   Re-running it never duplicates siblings.
//! - `Splice` moves the source's top-level nodes into the target in one
//!   hierarchy update, placed before the target's first group. Same-named
//!   nodes already in the target are not matched.

mod execute;
mod plan;
mod splice;
mod verify;

pub use execute::reconcile;
pub use plan::{build_reconciliation_plan, build_splice_plan, PlannedNode, ReconciliationPlan};
pub use splice::{prune_recycle_bins, splice, splice_children, splice_position};
pub use verify::{verify_migration, VerificationReport};

use crate::hierarchy::{HierarchyScope, ObjectKind};
use crate::store::{Store, StoreError, StoreRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("Cannot reconcile into section {0}")]
    TargetIsSection(String),

    #[error("Unknown strategy '{0}', expected 'per-node' or 'splice'")]
    UnknownStrategy(String),
}

/// How the source tree is brought into the target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReconcileStrategy {
    #[default]
    PerNode,
    Splice,
}

impl fmt::Display for ReconcileStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileStrategy::PerNode => write!(f, "per-node"),
            ReconcileStrategy::Splice => write!(f, "splice"),
        }
    }
}

impl FromStr for ReconcileStrategy {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per-node" => Ok(ReconcileStrategy::PerNode),
            "splice" => Ok(ReconcileStrategy::Splice),
            other => Err(ReconcileError::UnknownStrategy(other.to_string())),
        }
    }
}

/// What a reconciliation did, as slash-joined node paths in visit order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationResult {
    /// Target nodes that did not exist before
    pub created: Vec<String>,
    /// Existing target nodes reused by name
    pub opened: Vec<String>,
    /// Sections whose pages were merged into the target
    pub merged: Vec<String>,
    /// Recycle bins left behind
    pub skipped: Vec<String>,
    /// Target folders synchronized, innermost first
    pub synchronized: Vec<String>,
}

/// Run `strategy` from `source` into `target`
pub async fn reconcile_with<S: Store + ?Sized>(
    store: &S,
    strategy: ReconcileStrategy,
    source: &StoreRef,
    target: &StoreRef,
) -> Result<ReconciliationResult, ReconcileError> {
    match strategy {
        ReconcileStrategy::PerNode => {
            let tree = store.fetch_hierarchy(source, HierarchyScope::Subtree).await?;
            reconcile(store, &tree, target).await
        }
        ReconcileStrategy::Splice => splice(store, source, target).await,
    }
}

fn ensure_container(target: &StoreRef) -> Result<(), ReconcileError> {
    if target.kind == ObjectKind::Section {
        return Err(ReconcileError::TargetIsSection(target.id.clone()));
    }
    Ok(())
}

fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parse_and_display() {
        assert_eq!("per-node".parse::<ReconcileStrategy>().unwrap(), ReconcileStrategy::PerNode);
        assert_eq!("splice".parse::<ReconcileStrategy>().unwrap(), ReconcileStrategy::Splice);
        assert!(matches!(
            "bulk".parse::<ReconcileStrategy>(),
            Err(ReconcileError::UnknownStrategy(_))
        ));
        assert_eq!(ReconcileStrategy::default().to_string(), "per-node");
    }

    #[test]
    fn test_child_path() {
        assert_eq!(child_path("", "A"), "A");
        assert_eq!(child_path("A/B", "C"), "A/B/C");
        assert_eq!(display_path(""), "/");
    }
}
