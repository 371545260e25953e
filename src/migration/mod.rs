//! Local-to-remote notebook migration.
//!
//! # Overview
//!
//! - The source notebook is copied to a disposable working copy
//! - `wait_for_settle` polls the copy until its hierarchy stops changing
//! - The remote notebook is opened, or created as `<name> - Remote`
//! - The copy is reconciled into the remote notebook with the configured strategy
//! - Verification compares both trees and only logs what it finds
//!
//! # Usage
//!
//! ```ignore
//! let store = LocalStore::on_disk(config.namespace.clone());
//! let options = MigrateOptions::new(source, destination, &config);
//! let report = MigrationExecutor::new(&store).migrate(&options).await?;
//! ```

mod executor;
mod settle;
mod types;

pub use executor::MigrationExecutor;
pub use settle::wait_for_settle;
pub use types::{MigrateError, MigrateOptions, MigrationReport, SettleConfig};
