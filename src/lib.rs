pub mod config;
pub mod hierarchy;
pub mod migration;
pub mod reconciliation;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::{read_config, write_config, ConfigError, MigrateConfig, DEFAULT_NAMESPACE};
pub use hierarchy::{
    parse_hierarchy, render_hierarchy, HierarchyError, HierarchyScope, Node, NodeKind, ObjectKind, Tree,
};
pub use migration::{
    wait_for_settle, MigrateError, MigrateOptions, MigrationExecutor, MigrationReport, SettleConfig,
};
pub use reconciliation::{
    build_reconciliation_plan, build_splice_plan, reconcile, reconcile_with, splice, verify_migration,
    PlannedNode, ReconcileError, ReconcileStrategy, ReconciliationPlan, ReconciliationResult,
    VerificationReport,
};
pub use store::{
    CreateKind, DirectoryBacking, LocalStore, MemoryBacking, NotebookBacking, Opened, Page,
    SectionContent, Store, StoreError, StoreRef,
};
