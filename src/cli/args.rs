// src/cli/args.rs
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pgbackup")]
#[command(about = "PostgreSQL database backup and restore tool", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    /// Optional TOML configuration file; environment variables take precedence
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a compressed database backup
    Backup {
        /// Specific schemas to backup
        #[arg(short, long)]
        schemas: Vec<String>,

        /// Specific tables to backup (format: schema.table)
        #[arg(short, long)]
        tables: Vec<String>,

        /// File name prefix for the backup artifact
        #[arg(long, default_value = crate::orchestrator::DEFAULT_PREFIX)]
        prefix: String,
    },

    /// Restore database from a backup file
    Restore {
        /// Backup file (.sql.gz) to restore
        backup_file: PathBuf,

        /// Specific schemas to restore
        #[arg(short, long)]
        schemas: Vec<String>,

        /// Specific tables to restore (format: schema.table)
        #[arg(short, long)]
        tables: Vec<String>,
    },

    /// Export tables to CSV files; exports every table when none are given
    #[command(alias = "export_csv")]
    ExportCsv {
        /// Specific tables to export (format: schema.table)
        #[arg(short, long)]
        tables: Vec<String>,

        /// Directory to save CSV files (defaults to the backup directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Import data from schema.table.csv files into the matching tables
    #[command(alias = "import_csv")]
    ImportCsv {
        /// Specific CSV files to import
        #[arg(short = 'f', long, required_unless_present = "input_dir")]
        csv_files: Vec<PathBuf>,

        /// Directory containing CSV files to import
        #[arg(short, long, conflicts_with = "csv_files")]
        input_dir: Option<PathBuf>,

        /// Truncate tables before importing
        #[arg(short, long, default_value_t = false)]
        truncate: bool,
    },

    /// List user tables in the database
    Tables,

    /// List backup files in the backup directory
    List,

    /// Show tool version
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backup_with_scope() {
        let cli = Cli::try_parse_from([
            "pgbackup", "backup", "-s", "public", "-s", "sales", "-t", "public.users",
        ])
        .unwrap();
        match cli.command {
            Commands::Backup {
                schemas,
                tables,
                prefix,
            } => {
                assert_eq!(schemas, vec!["public", "sales"]);
                assert_eq!(tables, vec!["public.users"]);
                assert_eq!(prefix, "backup");
            }
            _ => panic!("expected backup"),
        }
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_import_requires_source() {
        assert!(Cli::try_parse_from(["pgbackup", "import-csv"]).is_err());
        assert!(Cli::try_parse_from([
            "pgbackup", "import-csv", "-f", "a.b.csv", "-i", "dir"
        ])
        .is_err());

        let cli = Cli::try_parse_from(["pgbackup", "import_csv", "-i", "dump", "-t"]).unwrap();
        match cli.command {
            Commands::ImportCsv {
                csv_files,
                input_dir,
                truncate,
            } => {
                assert!(csv_files.is_empty());
                assert_eq!(input_dir, Some(PathBuf::from("dump")));
                assert!(truncate);
            }
            _ => panic!("expected import"),
        }
    }

    #[test]
    fn test_parse_restore_and_global_config() {
        let cli = Cli::try_parse_from([
            "pgbackup",
            "restore",
            "backups/backup_20240101_000000.sql.gz",
            "--config",
            "prod.toml",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some("prod.toml"));
        assert!(matches!(cli.command, Commands::Restore { .. }));
    }
}
