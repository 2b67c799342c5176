//! Backup, restore and CSV transfer workflows.
//!
//! Backup runs `version check -> dump -> compress -> verify`; restore runs
//! `version check -> artifact exists -> streaming apply`. Every failure is terminal for
//! the invocation and is reported through the [`Reporter`] before being returned.

use crate::batch::{BatchReport, ItemOutcome};
use crate::compression;
use crate::config::AppConfig;
use crate::database::version::{check_compatibility, major_version, Compatibility};
use crate::database::{Database, ScopeFilter};
use crate::error::{OpError, OpResult};
use crate::reporter::Reporter;
use crate::table::TableName;
use crate::utils;
use chrono::Local;
use std::path::{Path, PathBuf};

pub const DEFAULT_PREFIX: &str = "backup";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSettings {
    pub backup_dir: PathBuf,
    pub compression_level: u32,
}

impl From<&AppConfig> for BackupSettings {
    fn from(config: &AppConfig) -> Self {
        BackupSettings {
            backup_dir: config.get_backup_dir(),
            compression_level: config.compression_level(),
        }
    }
}

/// Where CSV files for an import come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsvSource {
    Files(Vec<PathBuf>),
    /// Every `*.csv` file directly inside the directory.
    Directory(PathBuf),
}

pub struct Orchestrator<'a> {
    db: &'a dyn Database,
    reporter: &'a dyn Reporter,
    settings: BackupSettings,
}

impl<'a> Orchestrator<'a> {
    pub fn new(db: &'a dyn Database, reporter: &'a dyn Reporter, settings: BackupSettings) -> Self {
        Orchestrator {
            db,
            reporter,
            settings,
        }
    }

    pub fn settings(&self) -> &BackupSettings {
        &self.settings
    }

    fn fail(&self, err: OpError) -> OpError {
        self.reporter.error(&err.to_string());
        err
    }

    fn create_dir(&self, dir: &Path) -> OpResult<()> {
        std::fs::create_dir_all(dir).map_err(|source| {
            self.fail(OpError::Io {
                context: format!("cannot create directory {}", dir.display()),
                source,
            })
        })
    }

    /// Fails closed: an unknown version on either side blocks the operation.
    pub async fn check_version(&self) -> OpResult<()> {
        let server = self
            .db
            .server_version()
            .await
            .map_err(|e| self.fail(gate_failure("server", e)))?;
        let tool = self
            .db
            .dump_tool_version()
            .await
            .map_err(|e| self.fail(gate_failure("pg_dump", e)))?;

        let server_major = major_version(&server).ok_or_else(|| {
            self.fail(OpError::VersionIncompatible(format!(
                "unparseable server version '{}'",
                server
            )))
        })?;
        let tool_major = major_version(&tool).ok_or_else(|| {
            self.fail(OpError::VersionIncompatible(format!(
                "unparseable pg_dump version '{}'",
                tool
            )))
        })?;

        match check_compatibility(server_major, tool_major) {
            Compatibility::Compatible => Ok(()),
            Compatibility::ToolTooOld { server: major, .. } => {
                Err(self.fail(OpError::VersionIncompatible(format!(
                    "PostgreSQL server version ({}) is newer than pg_dump version ({}); \
                     update pg_dump to version {} or newer",
                    server, tool, major
                ))))
            }
        }
    }

    /// Creates a verified `<prefix>_<YYYYMMDD_HHMMSS>.sql.gz` artifact and returns its path.
    pub async fn backup(&self, scope: &ScopeFilter, prefix: &str) -> OpResult<PathBuf> {
        self.check_version().await?;
        self.create_dir(&self.settings.backup_dir)?;

        let artifact = self
            .settings
            .backup_dir
            .join(utils::backup_file_name(prefix, &Local::now()));
        let raw = artifact.with_extension("");

        self.reporter
            .info(&format!("Starting backup to {}", artifact.display()));
        if let Err(e) = self.db.dump(&raw, scope).await {
            let _ = std::fs::remove_file(&raw);
            return Err(self.fail(e));
        }

        compression::compress_into_artifact(&raw, &artifact, self.settings.compression_level)
            .map_err(|e| {
                let _ = std::fs::remove_file(&raw);
                self.fail(OpError::Compression(e))
            })?;

        compression::verify_artifact(&artifact).map_err(|e| self.fail(e))?;

        self.reporter
            .info(&format!("Backup completed successfully: {}", artifact.display()));
        Ok(artifact)
    }

    pub async fn restore(&self, artifact: &Path, scope: &ScopeFilter) -> OpResult<()> {
        self.check_version().await?;

        if !artifact.exists() {
            return Err(self.fail(OpError::ArtifactMissing(artifact.to_path_buf())));
        }

        let sql = compression::decompress_to_vec(artifact).map_err(|e| {
            self.fail(OpError::ArtifactInvalid {
                path: artifact.to_path_buf(),
                reason: e.to_string(),
            })
        })?;

        if !scope.is_empty() {
            self.reporter.warn(
                "schema/table selectors are forwarded to psql as given; a plain SQL dump is applied as a whole",
            );
        }

        self.reporter
            .info(&format!("Starting restore from {}", artifact.display()));
        self.db.apply_sql(sql, scope).await.map_err(|e| self.fail(e))?;
        self.reporter.info("Restore completed successfully");
        Ok(())
    }

    /// User tables ordered by schema then name. Rows that are not `schema.table` are skipped.
    pub async fn list_tables(&self) -> OpResult<Vec<TableName>> {
        let rows = self.db.list_tables().await.map_err(|e| self.fail(e))?;
        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            match row.parse::<TableName>() {
                Ok(table) => tables.push(table),
                Err(e) => self.reporter.warn(&format!("Skipping catalog entry: {}", e)),
            }
        }
        Ok(tables)
    }

    /// Exports each table to `<schema>.<table>.csv`. With no tables given, every user table
    /// is exported. Individual failures do not stop the batch.
    pub async fn export_csv(
        &self,
        tables: &[String],
        output_dir: Option<&Path>,
    ) -> OpResult<BatchReport> {
        let output_dir = output_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.settings.backup_dir.clone());
        self.create_dir(&output_dir)?;

        let names: Vec<String> = if tables.is_empty() {
            let found = self.list_tables().await?;
            if found.is_empty() {
                return Err(self.fail(OpError::NothingToDo("no tables found to export".into())));
            }
            self.reporter
                .info(&format!("Found {} tables to export", found.len()));
            found.iter().map(ToString::to_string).collect()
        } else {
            tables.to_vec()
        };

        let mut report = BatchReport::default();
        for name in names {
            let table = match name.parse::<TableName>() {
                Ok(table) => table,
                Err(e) => {
                    self.reporter
                        .error(&format!("Failed to export {}: {}", name, e));
                    report.push(ItemOutcome::failed(name, None, &e));
                    continue;
                }
            };

            let file = output_dir.join(table.csv_file_name());
            self.reporter
                .info(&format!("Exporting {} to {}", table, file.display()));
            match self.db.copy_to_csv(&table, &file).await {
                Ok(()) => {
                    self.reporter
                        .info(&format!("Successfully exported {} to {}", table, file.display()));
                    report.push(ItemOutcome::ok(name, table));
                }
                Err(e) => {
                    self.reporter
                        .error(&format!("Failed to export {}: {}", table, e));
                    report.push(ItemOutcome::failed(name, Some(table), &e));
                }
            }
        }

        self.summarize("export", &report);
        Ok(report)
    }

    /// Loads each `<schema>.<table>.csv` file into its table, optionally truncating first.
    /// Individual failures do not stop the batch.
    pub async fn import_csv(&self, source: &CsvSource, truncate: bool) -> OpResult<BatchReport> {
        let files = match source {
            CsvSource::Files(files) if files.is_empty() => {
                return Err(self.fail(OpError::NothingToDo("no CSV files given".into())));
            }
            CsvSource::Files(files) => files.clone(),
            CsvSource::Directory(dir) => {
                if !dir.is_dir() {
                    return Err(self.fail(OpError::InputMissing(dir.clone())));
                }
                let found = utils::files_matching(dir, "*.csv").map_err(|e| {
                    self.fail(OpError::Io {
                        context: format!("cannot list {}", dir.display()),
                        source: std::io::Error::other(e),
                    })
                })?;
                if found.is_empty() {
                    return Err(self.fail(OpError::NothingToDo(format!(
                        "no CSV files found in {}",
                        dir.display()
                    ))));
                }
                self.reporter
                    .info(&format!("Found {} CSV files to import", found.len()));
                found
            }
        };

        let mut report = BatchReport::default();
        for file in files {
            let item = file.display().to_string();
            if !file.is_file() {
                let e = OpError::InputMissing(file.clone());
                self.reporter.error(&e.to_string());
                report.push(ItemOutcome::failed(item, None, &e));
                continue;
            }

            let table = match TableName::from_csv_path(&file) {
                Ok(table) => table,
                Err(e) => {
                    self.reporter
                        .error(&format!("Failed to import {}: {}", item, e));
                    report.push(ItemOutcome::failed(item, None, &e));
                    continue;
                }
            };

            if truncate {
                self.reporter.info(&format!("Truncating table {}", table));
                if let Err(e) = self.db.truncate(&table).await {
                    self.reporter
                        .error(&format!("Failed to truncate {}: {}", table, e));
                    report.push(ItemOutcome::failed(item, Some(table), &e));
                    continue;
                }
            }

            self.reporter
                .info(&format!("Importing data from {} to {}", item, table));
            match self.db.copy_from_csv(&table, &file).await {
                Ok(()) => {
                    self.reporter
                        .info(&format!("Successfully imported data from {} to {}", item, table));
                    report.push(ItemOutcome::ok(item, table));
                }
                Err(e) => {
                    self.reporter
                        .error(&format!("Failed to import {}: {}", item, e));
                    report.push(ItemOutcome::failed(item, Some(table), &e));
                }
            }
        }

        self.summarize("import", &report);
        Ok(report)
    }

    fn summarize(&self, operation: &str, report: &BatchReport) {
        if report.succeeded() {
            self.reporter.info(&format!(
                "CSV {} finished: {} items succeeded",
                operation,
                report.total()
            ));
        } else {
            self.reporter.error(&format!(
                "CSV {} finished with failures: {} of {} items failed",
                operation,
                report.failed_count(),
                report.total()
            ));
        }
    }
}

fn gate_failure(side: &str, err: OpError) -> OpError {
    match err {
        OpError::VersionIncompatible(_) => err,
        other => OpError::VersionIncompatible(format!(
            "could not determine {} version: {}",
            side, other
        )),
    }
}
