use crate::batch::BatchReport;
use crate::config::AppConfig;
use crate::database::ScopeFilter;
use crate::orchestrator::{CsvSource, Orchestrator};
use crate::storage::LocalStorage;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tabled::builder::Builder;
use tabled::settings::{Panel, Style};
use tabled::Table;
use tracing::info;

fn join_or(values: &[String], fallback: &str) -> String {
    if values.is_empty() {
        fallback.to_string()
    } else {
        values.join(", ")
    }
}

/// Key/value summary printed before an operation starts.
fn print_panel(title: &str, config: &AppConfig, rows: &[(&str, String)]) {
    let mut builder = Builder::default();
    builder.push_record(["Database".to_string(), config.database.name.clone()]);
    builder.push_record(["Host".to_string(), config.database.host.clone()]);
    for (key, value) in rows {
        builder.push_record([key.to_string(), value.clone()]);
    }
    let mut table = builder.build();
    table.with(Style::rounded()).with(Panel::header(title));
    println!("{}", table);
}

fn print_report(report: &BatchReport) {
    let mut table = Table::new(report.rows());
    table.with(Style::rounded());
    println!("{}", table);
}

pub async fn backup_database(
    orch: &Orchestrator<'_>,
    config: &AppConfig,
    scope: ScopeFilter,
    prefix: &str,
) -> Result<()> {
    print_panel(
        "Backup Information",
        config,
        &[
            ("Schemas", join_or(&scope.schemas, "All")),
            ("Tables", join_or(&scope.tables, "All")),
        ],
    );

    let artifact = orch.backup(&scope, prefix).await?;
    println!("Backup completed successfully: {}", artifact.display());
    Ok(())
}

pub async fn restore_database(
    orch: &Orchestrator<'_>,
    config: &AppConfig,
    backup_file: &Path,
    scope: ScopeFilter,
) -> Result<()> {
    print_panel(
        "Restore Information",
        config,
        &[
            ("Backup file", backup_file.display().to_string()),
            ("Schemas", join_or(&scope.schemas, "All")),
            ("Tables", join_or(&scope.tables, "All")),
        ],
    );

    orch.restore(backup_file, &scope).await?;
    println!("Restore completed successfully!");
    Ok(())
}

pub async fn export_csv(
    orch: &Orchestrator<'_>,
    config: &AppConfig,
    tables: Vec<String>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let target = output_dir
        .clone()
        .unwrap_or_else(|| orch.settings().backup_dir.clone());
    print_panel(
        "CSV Export Information",
        config,
        &[
            ("Tables", join_or(&tables, "All")),
            ("Output directory", target.display().to_string()),
        ],
    );

    let report = orch.export_csv(&tables, output_dir.as_deref()).await?;
    print_report(&report);
    report.into_result()?;
    println!("CSV export completed successfully!");
    Ok(())
}

pub async fn import_csv(
    orch: &Orchestrator<'_>,
    config: &AppConfig,
    csv_files: Vec<PathBuf>,
    input_dir: Option<PathBuf>,
    truncate: bool,
) -> Result<()> {
    let source = match input_dir {
        Some(dir) if csv_files.is_empty() => CsvSource::Directory(dir),
        _ if !csv_files.is_empty() => CsvSource::Files(csv_files),
        _ => anyhow::bail!("Either --csv-files or --input-dir must be specified"),
    };

    let files = match &source {
        CsvSource::Files(files) => files
            .iter()
            .map(|f| f.display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
        CsvSource::Directory(dir) => format!("All files in {}", dir.display()),
    };
    print_panel(
        "CSV Import Information",
        config,
        &[
            ("Files", files),
            ("Truncate tables", if truncate { "Yes" } else { "No" }.to_string()),
        ],
    );

    let report = orch.import_csv(&source, truncate).await?;
    print_report(&report);
    report.into_result()?;
    println!("CSV import completed successfully!");
    Ok(())
}

pub async fn list_tables(orch: &Orchestrator<'_>) -> Result<()> {
    let tables = orch.list_tables().await?;
    if tables.is_empty() {
        anyhow::bail!("No tables found");
    }

    let mut builder = Builder::default();
    builder.push_record(["Schema", "Table"]);
    for table in &tables {
        builder.push_record([table.schema.as_str(), table.table.as_str()]);
    }
    let mut output = builder.build();
    output.with(Style::rounded());
    println!("{}", output);
    info!("Found {} tables", tables.len());
    Ok(())
}

pub fn list_backups(backup_dir: &Path) -> Result<()> {
    let storage = LocalStorage::new(backup_dir.to_path_buf());
    let items = storage.list_backups().map_err(anyhow::Error::msg)?;
    if items.is_empty() {
        println!("No backups found in {}", backup_dir.display());
        return Ok(());
    }

    let mut table = Table::new(&items);
    table.with(Style::rounded());
    println!("{}", table);
    Ok(())
}
