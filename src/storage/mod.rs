use chrono::{DateTime, Local};
use tabled::Tabled;

pub mod local_storage;

pub use local_storage::LocalStorage;

/// A backup artifact found in the backup directory.
#[derive(Debug, Tabled, Clone, PartialEq, Eq)]
pub struct BackupItem {
    #[tabled(rename = "File")]
    pub key: String,
    #[tabled(rename = "Modified", display_with = "display_time")]
    pub last_modified: DateTime<Local>,
    #[tabled(skip)]
    pub size: u64,
    #[tabled(rename = "Size")]
    pub human_size: String,
}

fn display_time(time: &DateTime<Local>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}
