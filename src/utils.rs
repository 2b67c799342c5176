use chrono::{DateTime, TimeZone};
use glob::glob;
use std::fs;
use std::path::{Path, PathBuf};

pub fn resolve_path(path_str: &str) -> Result<PathBuf, String> {
    let resolved_path = if path_str.starts_with("~") {
        let expanded_str = shellexpand::tilde(path_str);
        PathBuf::from(expanded_str.to_string())
    } else {
        PathBuf::from(path_str)
    };

    if resolved_path.exists() {
        fs::canonicalize(&resolved_path).map_err(|e| format!("Could not canonicalize path: {}", e))
    } else {
        Ok(resolved_path)
    }
}

/// `<prefix>_<YYYYMMDD_HHMMSS>.sql.gz`
pub fn backup_file_name<Tz>(prefix: &str, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("{}_{}.sql.gz", prefix, at.format("%Y%m%d_%H%M%S"))
}

/// Files in `dir` matching `pattern` (e.g. `*.csv`), sorted by path.
pub fn files_matching(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, String> {
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let full = Path::new(&escaped).join(pattern);
    let mut files: Vec<PathBuf> = glob(&full.to_string_lossy())
        .map_err(|e| e.to_string())?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    Ok(files)
}

pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
