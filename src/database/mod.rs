pub mod postgresql;
pub mod process;
pub mod tools;
pub mod version;

use crate::error::OpResult;
use crate::table::TableName;
use std::fmt;
use std::path::Path;

#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionProfile {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Allow-list of schemas and tables. Every entry becomes its own selection flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeFilter {
    pub schemas: Vec<String>,
    pub tables: Vec<String>,
}

impl ScopeFilter {
    pub fn new(schemas: Vec<String>, tables: Vec<String>) -> Self {
        ScopeFilter { schemas, tables }
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty() && self.tables.is_empty()
    }
}

/// Dump producer and query/restore executor for one database.
#[async_trait::async_trait]
pub trait Database: Send + Sync {
    /// Version string reported by the server, e.g. `16.2`.
    async fn server_version(&self) -> OpResult<String>;

    /// Version string reported by the installed dump tool.
    async fn dump_tool_version(&self) -> OpResult<String>;

    /// Writes a plain-text dump to `destination`.
    async fn dump(&self, destination: &Path, scope: &ScopeFilter) -> OpResult<()>;

    /// Executes `sql`, stopping at the first error.
    async fn apply_sql(&self, sql: Vec<u8>, scope: &ScopeFilter) -> OpResult<()>;

    /// `schema.table` names outside system schemas, ordered by schema then table.
    async fn list_tables(&self) -> OpResult<Vec<String>>;

    async fn copy_to_csv(&self, table: &TableName, file: &Path) -> OpResult<()>;

    async fn copy_from_csv(&self, table: &TableName, file: &Path) -> OpResult<()>;

    async fn truncate(&self, table: &TableName) -> OpResult<()>;
}
