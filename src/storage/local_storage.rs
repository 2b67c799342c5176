use super::BackupItem;
use crate::utils::{files_matching, human_size};
use chrono::{DateTime, Local};
use std::cmp::Reverse;
use std::fs;
use std::path::PathBuf;

pub const ARTIFACT_PATTERN: &str = "*.sql.gz";

/// Backup artifacts kept in a local directory.
pub struct LocalStorage {
    pub base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: PathBuf) -> Self {
        LocalStorage { base_path }
    }

    /// Files matching `pattern`, newest first. A missing directory yields an empty list.
    pub fn list(&self, pattern: &str) -> Result<Vec<BackupItem>, String> {
        if !self.base_path.is_dir() {
            return Ok(Vec::new());
        }

        let mut items = Vec::new();
        for path in files_matching(&self.base_path, pattern)? {
            let metadata = fs::metadata(&path).map_err(|e| e.to_string())?;
            let last_modified: DateTime<Local> = metadata
                .modified()
                .map_err(|e| format!("Failed to get modification time: {}", e))?
                .into();

            let file_name = path
                .file_name()
                .ok_or_else(|| format!("Invalid file path: {}", path.display()))?
                .to_string_lossy();

            items.push(BackupItem {
                key: file_name.to_string(),
                last_modified,
                size: metadata.len(),
                human_size: human_size(metadata.len()),
            });
        }

        items.sort_by_key(|item| Reverse(item.last_modified));
        Ok(items)
    }

    pub fn list_backups(&self) -> Result<Vec<BackupItem>, String> {
        self.list(ARTIFACT_PATTERN)
    }
}
