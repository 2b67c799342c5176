//! Version strings reported by the server and by `pg_dump`.

/// `SELECT version();` yields e.g. `PostgreSQL 16.2 on x86_64-pc-linux-gnu, ...`.
pub fn server_version_token(output: &str) -> Option<String> {
    output.split_whitespace().nth(1).map(str::to_string)
}

/// `pg_dump --version` yields e.g. `pg_dump (PostgreSQL) 16.2`.
pub fn dump_tool_version_token(output: &str) -> Option<String> {
    output.split_whitespace().nth(2).map(str::to_string)
}

/// Leading integer of a version string: `16.2` -> 16, `17beta1` -> 17.
pub fn major_version(version: &str) -> Option<u32> {
    let head = version.split('.').next()?;
    let digits: String = head.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Outcome of comparing the dump tool against the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    Compatible,
    /// The tool is older than the server.
    ToolTooOld { server: u32, tool: u32 },
}

pub fn check_compatibility(server_major: u32, tool_major: u32) -> Compatibility {
    if tool_major < server_major {
        Compatibility::ToolTooOld {
            server: server_major,
            tool: tool_major,
        }
    } else {
        Compatibility::Compatible
    }
}
