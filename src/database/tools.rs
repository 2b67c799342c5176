use std::path::PathBuf;

pub const PG_DUMP: &str = "pg_dump";
pub const PSQL: &str = "psql";

/// Maps a client tool name to the executable that should be launched.
pub trait ToolResolver: Send + Sync {
    fn resolve(&self, tool: &str) -> PathBuf;
}

/// Resolves tools inside an optional installation directory, otherwise leaves lookup to `PATH`.
#[derive(Debug, Clone, Default)]
pub struct BinDirResolver {
    bin_dir: Option<PathBuf>,
}

impl BinDirResolver {
    pub fn new(bin_dir: Option<PathBuf>) -> Self {
        BinDirResolver { bin_dir }
    }
}

impl ToolResolver for BinDirResolver {
    fn resolve(&self, tool: &str) -> PathBuf {
        match &self.bin_dir {
            Some(dir) => dir.join(format!("{}{}", tool, std::env::consts::EXE_SUFFIX)),
            None => PathBuf::from(tool),
        }
    }
}
