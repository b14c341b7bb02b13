//! Runtime tool path resolution
//!
//! For each tool (e.g., `pg_dump`), we:
//! 1. Check for an environment variable `{TOOL}_BIN` (e.g., `PG_DUMP_BIN`)
//! 2. Otherwise look the tool up on PATH
//! 3. Fall back to the bare tool name, so a missing binary is reported
//!    when the process is spawned
//!
//! The override lets hosts with several PostgreSQL client versions pin the
//! one matching the server.

use std::path::PathBuf;

/// Tool names
pub const PG_DUMP: &str = "pg_dump";
pub const PSQL: &str = "psql";

/// Environment variable checked for a tool override
pub fn tool_env_var(tool: &str) -> String {
    format!("{}_BIN", tool.to_uppercase())
}

/// Get the path to an external tool
///
/// `lookup` resolves environment variables; production code passes
/// `std::env::var(..).ok()`.
pub fn get_tool_path<F>(tool: &str, lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = lookup(&tool_env_var(tool)).filter(|p| !p.trim().is_empty()) {
        return PathBuf::from(path);
    }

    which::which(tool).unwrap_or_else(|_| PathBuf::from(tool))
}
