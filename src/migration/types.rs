//! Types for the migration driver.

use crate::config::MigrateConfig;
use crate::reconciliation::{
    ReconcileError, ReconcileStrategy, ReconciliationPlan, ReconciliationResult, VerificationReport,
};
use crate::store::StoreError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Error types for migration runs.
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("Reconcile error: {0}")]
    ReconcileError(#[from] ReconcileError),

    #[error("Working copy at {0} overlaps the source notebook at {1}")]
    WorkingCopyOverlapsSource(PathBuf, PathBuf),
}

/// Polling bounds for `wait_for_settle`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleConfig {
    /// Delay between two hierarchy fetches
    pub interval: Duration,
    /// Fail with a stale snapshot after this long
    pub timeout: Duration,
}

impl Default for SettleConfig {
    fn default() -> Self {
        MigrateConfig::default().settle()
    }
}

/// Everything a single migration run needs to know
#[derive(Debug, Clone)]
pub struct MigrateOptions {
    /// Location of the local notebook
    pub source: String,
    /// Folder location the remote notebook lives in
    pub destination: String,
    pub strategy: ReconcileStrategy,
    /// Compute the plan only, touching nothing
    pub dry_run: bool,
    pub remote_suffix: String,
    /// Parent directory of the disposable working copy
    pub work_dir: PathBuf,
    pub settle: SettleConfig,
}

impl MigrateOptions {
    pub fn new(source: impl Into<String>, destination: impl Into<String>, config: &MigrateConfig) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            strategy: config.strategy,
            dry_run: false,
            remote_suffix: config.remote_suffix.clone(),
            work_dir: config.work_dir(),
            settle: config.settle(),
        }
    }
}

/// Outcome of a migration run.
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    /// Display name of the source notebook
    pub notebook: String,
    /// Location of the remote notebook
    pub remote: String,
    /// Whether the remote notebook was created by this run
    pub remote_created: bool,
    /// Planned changes, filled for dry runs only
    pub plan: Option<ReconciliationPlan>,
    /// What reconciliation did, absent for dry runs
    pub result: Option<ReconciliationResult>,
    pub verification: Option<VerificationReport>,
}

impl MigrationReport {
    /// Check if the remote notebook now holds everything from the source
    pub fn is_verified(&self) -> bool {
        self.verification
            .as_ref()
            .map(VerificationReport::is_consistent)
            .unwrap_or(false)
    }
}
