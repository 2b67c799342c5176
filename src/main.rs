// src/main.rs

use anyhow::Result;
use clap::Parser;
use pgbackup::cli::command;
use pgbackup::cli::{Cli, Commands};
use pgbackup::config::get_all_config;
use pgbackup::database::postgresql::PostgreSql;
use pgbackup::database::process::SystemRunner;
use pgbackup::database::tools::BinDirResolver;
use pgbackup::database::ScopeFilter;
use pgbackup::orchestrator::{BackupSettings, Orchestrator};
use pgbackup::reporter::TracingReporter;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // .env values fill in whatever the process environment leaves unset
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    if let Commands::Version = cli.command {
        println!("pgbackup v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = match get_all_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            anyhow::bail!(e);
        }
    };

    let db = PostgreSql::with_collaborators(
        config.connection(),
        Box::new(BinDirResolver::new(config.pg_bin_dir())),
        Box::new(SystemRunner),
    );
    let reporter = TracingReporter;
    let orch = Orchestrator::new(&db, &reporter, BackupSettings::from(&config));

    match cli.command {
        Commands::Backup {
            schemas,
            tables,
            prefix,
        } => {
            info!("Starting backup for database: {}", config.database.name);
            command::backup_database(&orch, &config, ScopeFilter::new(schemas, tables), &prefix)
                .await
        }
        Commands::Restore {
            backup_file,
            schemas,
            tables,
        } => {
            info!("Starting restore for database: {}", config.database.name);
            command::restore_database(
                &orch,
                &config,
                &backup_file,
                ScopeFilter::new(schemas, tables),
            )
            .await
        }
        Commands::ExportCsv { tables, output_dir } => {
            command::export_csv(&orch, &config, tables, output_dir).await
        }
        Commands::ImportCsv {
            csv_files,
            input_dir,
            truncate,
        } => command::import_csv(&orch, &config, csv_files, input_dir, truncate).await,
        Commands::Tables => command::list_tables(&orch).await,
        Commands::List => command::list_backups(&orch.settings().backup_dir),
        Commands::Version => Ok(()),
    }
}
