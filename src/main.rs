use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use notebook_migrate::{
    read_config, render_hierarchy, CreateKind, HierarchyScope, LocalStore, MigrateConfig,
    MigrateOptions, MigrationExecutor, MigrationReport, ReconcileStrategy, Store, StoreError,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Migrate a local notebook into a remote notebook folder
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Location of the local notebook
    source: Option<String>,

    /// Folder the remote notebook is created in
    destination: Option<String>,

    /// How the local tree is brought into the remote notebook: per-node or splice
    #[arg(long, env = "NOTEBOOK_MIGRATE_STRATEGY")]
    strategy: Option<ReconcileStrategy>,

    /// Show what would be created without writing anything
    #[arg(long)]
    dry_run: bool,

    /// JSON configuration file
    #[arg(long, env = "NOTEBOOK_MIGRATE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for the temporary working copy
    #[arg(long, env = "NOTEBOOK_MIGRATE_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Increase log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the hierarchy document of a notebook
    Inspect {
        location: String,
    },
    /// Write the content of a section to a file
    Publish {
        location: String,
        /// Slash-separated path of the section inside the notebook
        section: String,
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &cli.config {
        Some(path) => read_config(path).await?.unwrap_or_default(),
        None => MigrateConfig::default(),
    };
    if let Some(strategy) = cli.strategy {
        config.strategy = strategy;
    }
    if let Some(work_dir) = &cli.work_dir {
        config.work_dir = Some(work_dir.clone());
    }

    let store = LocalStore::on_disk(config.namespace.clone());

    match cli.command {
        Some(Command::Inspect { location }) => {
            let notebook = store.open_or_create(&location, None, CreateKind::None).await?.target;
            let tree = store.fetch_hierarchy(&notebook, HierarchyScope::Subtree).await?;
            println!("{}", render_hierarchy(&tree, &config.namespace)?);
            store.close(&notebook).await?;
        }
        Some(Command::Publish { location, section, out }) => {
            let notebook = store.open_or_create(&location, None, CreateKind::None).await?.target;
            let tree = store.fetch_hierarchy(&notebook, HierarchyScope::Subtree).await?;
            let node = tree
                .find_by_path(&section)
                .filter(|n| n.is_section())
                .ok_or_else(|| StoreError::NotFound(format!("section '{}' in {}", section, location)))?;
            let bytes = store.publish_section(&node.id, &out).await?;
            info!(section = %section, out = %out.display(), bytes = bytes.len(), "Published section");
            store.close(&notebook).await?;
        }
        None => {
            let (Some(source), Some(destination)) = (cli.source, cli.destination) else {
                Cli::command().print_help()?;
                return Ok(());
            };

            let mut options = MigrateOptions::new(source, destination, &config);
            options.dry_run = cli.dry_run;

            let report = MigrationExecutor::new(&store).migrate(&options).await?;
            print_report(&report);
        }
    }

    Ok(())
}

fn print_report(report: &MigrationReport) {
    if let Some(plan) = &report.plan {
        println!("Dry run for {} -> {}", report.notebook, report.remote);
        for node in &plan.to_create {
            println!("  create   {} ({})", node.path, node.kind);
        }
        for node in &plan.existing {
            println!("  existing {} ({})", node.path, node.kind);
        }
        for node in &plan.skipped {
            println!("  skip     {} ({})", node.path, node.kind);
        }
        return;
    }

    println!("Migrated {} -> {}", report.notebook, report.remote);
    if let Some(result) = &report.result {
        println!(
            "  {} created, {} reused, {} sections merged, {} skipped",
            result.created.len(),
            result.opened.len(),
            result.merged.len(),
            result.skipped.len()
        );
    }
    if let Some(verification) = &report.verification {
        if !verification.is_consistent() {
            println!("  missing in remote: {}", verification.missing.join(", "));
        }
    }
}
