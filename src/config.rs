use crate::database::ConnectionProfile;
use crate::utils::resolve_path;
use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variables that override file settings, paired with their config keys.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("DB_NAME", "database.name"),
    ("DB_USER", "database.user"),
    ("DB_PASSWORD", "database.password"),
    ("BACKUP_DIR", "backup.dir"),
    ("COMPRESSION_LEVEL", "backup.compression_level"),
    ("PG_BIN_DIR", "backup.pg_bin_dir"),
];

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub backup: BackupConfig,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackupConfig {
    pub dir: String,
    pub compression_level: u32,
    pub pg_bin_dir: Option<String>,
}

fn default_backup_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("~"))
        .join(".dbbackup")
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database: DatabaseConfig {
                host: "localhost".into(),
                port: 5432,
                name: "postgres".into(),
                user: "postgres".into(),
                password: String::new(),
            },
            backup: BackupConfig {
                dir: default_backup_dir().display().to_string(),
                compression_level: 6,
                pg_bin_dir: None,
            },
        }
    }
}

impl AppConfig {
    pub fn get_backup_dir(&self) -> PathBuf {
        match resolve_path(&self.backup.dir) {
            Ok(p) => p,
            Err(_) => default_backup_dir(),
        }
    }

    pub fn pg_bin_dir(&self) -> Option<PathBuf> {
        self.backup
            .pg_bin_dir
            .as_deref()
            .filter(|dir| !dir.trim().is_empty())
            .and_then(|dir| resolve_path(dir).ok())
    }

    /// gzip level, clamped to 0..=9.
    pub fn compression_level(&self) -> u32 {
        self.backup.compression_level.min(9)
    }

    pub fn connection(&self) -> ConnectionProfile {
        ConnectionProfile {
            host: self.database.host.clone(),
            port: self.database.port,
            database: self.database.name.clone(),
            user: self.database.user.clone(),
            password: self.database.password.clone(),
        }
    }
}

/// Loads configuration from defaults, an optional TOML file and the process environment.
pub fn get_all_config(config_path: Option<&str>) -> Result<AppConfig, ConfigError> {
    load_config(config_path, |key| std::env::var(key).ok())
}

/// Same as [`get_all_config`] but with an injectable environment lookup.
pub fn load_config<F>(config_path: Option<&str>, env: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = AppConfig::default();
    let mut builder = Config::builder()
        .set_default("database.host", defaults.database.host)?
        .set_default("database.port", i64::from(defaults.database.port))?
        .set_default("database.name", defaults.database.name)?
        .set_default("database.user", defaults.database.user)?
        .set_default("database.password", defaults.database.password)?
        .set_default("backup.dir", defaults.backup.dir)?
        .set_default("backup.compression_level", i64::from(defaults.backup.compression_level))?;

    if let Some(path) = config_path {
        builder = builder.add_source(File::with_name(path));
    }

    for (var, key) in ENV_OVERRIDES {
        builder = builder.set_override_option(*key, env(var))?;
    }

    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs::File as StdFile;
    use std::io::Write;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let config = load_config(None, no_env).unwrap();
        assert_eq!(config.database.host, "localhost");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.name, "postgres");
        assert_eq!(config.database.user, "postgres");
        assert_eq!(config.database.password, "");
        assert_eq!(config.backup.compression_level, 6);
        assert!(config.backup.pg_bin_dir.is_none());
        assert!(config.backup.dir.ends_with(".dbbackup"));
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test_config.toml");

        let config_content = r#"
            [database]
            host = "db.internal"
            port = 6543
            name = "keap_db"
            user = "backup"
            password = "pass"

            [backup]
            dir = "/tmp/dbbackup"
            compression_level = 9
            pg_bin_dir = "/usr/lib/postgresql/16/bin"
        "#;

        let mut file = StdFile::create(&file_path).unwrap();
        file.write_all(config_content.as_bytes()).unwrap();

        let config = load_config(Some(file_path.to_str().unwrap()), no_env).unwrap();

        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, 6543);
        assert_eq!(config.database.name, "keap_db");
        assert_eq!(config.database.user, "backup");
        assert_eq!(config.database.password, "pass");
        assert_eq!(config.backup.dir, "/tmp/dbbackup");
        assert_eq!(config.backup.compression_level, 9);
        assert_eq!(
            config.backup.pg_bin_dir.as_deref(),
            Some("/usr/lib/postgresql/16/bin")
        );
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("partial.toml");
        std::fs::write(&file_path, "[database]\nhost = \"from-file\"\nport = 5000\n").unwrap();

        let env: HashMap<&str, &str> = [
            ("DB_HOST", "from-env"),
            ("DB_PASSWORD", "secret"),
            ("COMPRESSION_LEVEL", "1"),
        ]
        .into_iter()
        .collect();

        let config = load_config(Some(file_path.to_str().unwrap()), |key| {
            env.get(key).map(|v| v.to_string())
        })
        .unwrap();

        assert_eq!(config.database.host, "from-env");
        assert_eq!(config.database.port, 5000);
        assert_eq!(config.database.password, "secret");
        assert_eq!(config.backup.compression_level, 1);
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_config(Some(missing.to_str().unwrap()), no_env).is_err());
    }

    #[test]
    fn test_connection_and_helpers() {
        let mut config = AppConfig::default();
        config.database.password = "hunter2".into();
        config.backup.compression_level = 42;
        config.backup.pg_bin_dir = Some("   ".into());

        let profile = config.connection();
        assert_eq!(profile.host, "localhost");
        assert_eq!(profile.password, "hunter2");
        assert_eq!(config.compression_level(), 9);
        assert!(config.pg_bin_dir().is_none());
        assert!(!format!("{:?}", config.database).contains("hunter2"));
    }
}
