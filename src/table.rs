use crate::error::OpError;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableName {
    pub schema: String,
    pub table: String,
}

impl TableName {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        TableName {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Derives the target table from a `schema.table.csv` file name.
    pub fn from_csv_path(path: &Path) -> Result<Self, OpError> {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .ok_or_else(|| OpError::MalformedIdentifier(path.display().to_string()))?;
        stem.parse()
    }

    pub fn csv_file_name(&self) -> String {
        format!("{}.{}.csv", self.schema, self.table)
    }
}

impl FromStr for TableName {
    type Err = OpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        match parts.as_slice() {
            [schema, table] if !schema.is_empty() && !table.is_empty() => {
                Ok(TableName::new(*schema, *table))
            }
            _ => Err(OpError::MalformedIdentifier(s.to_string())),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}
