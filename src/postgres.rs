//! PostgreSQL operations through the `psql` and `pg_dump` clients
//!
//! Nothing here speaks the wire protocol. Every function builds a
//! connection URL from [`PostgresSettings`] and hands it to one of the
//! command-line clients via [`run_logged`].

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use crate::config::PostgresSettings;
use crate::error::{ArtifactError, DeptoolsError};
use crate::process::run_logged;
use crate::validation::read_secret_file;

/// Database targeted when no schema is given
pub const DEFAULT_DATABASE: &str = "postgres";

/// Compose a PostgreSQL connection URL
///
/// `postgresql://{user}:{password}@{host}:{port}/{schema}`. User and
/// password are percent-encoded so credentials containing `@`, `:` or `/`
/// survive intact.
pub fn format_url(user: &str, password: &str, host: &str, port: u16, schema: &str) -> String {
    format!(
        "postgresql://{}:{}@{}:{}/{}",
        urlencoding::encode(user),
        urlencoding::encode(password),
        host,
        port,
        schema
    )
}

/// Connection URL for `schema`, reading the password from `POSTGRES_PASSWORD_FILE`
pub fn connection_url(pg: &PostgresSettings, schema: &str) -> Result<String, DeptoolsError> {
    let password = read_secret_file(&pg.password_file, "PostgreSQL password")?;
    Ok(format_url(&pg.user, &password, &pg.host, pg.port, schema))
}

/// Outcome of `CREATE SCHEMA IF NOT EXISTS`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaCreation {
    Created,
    AlreadyExists,
}

/// Create `schema` in the default database if it does not exist (idempotent)
///
/// `schema` must already be a validated identifier. It is sent unquoted, so
/// PostgreSQL folds it to lower case.
pub fn create_schema(pg: &PostgresSettings, schema: &str) -> Result<SchemaCreation, DeptoolsError> {
    let url = connection_url(pg, DEFAULT_DATABASE)?;
    let sql = format!("CREATE SCHEMA IF NOT EXISTS {};", schema);

    let output = run_logged(
        "schema creation",
        Command::new(&pg.psql)
            .arg(&url)
            .args(["-v", "ON_ERROR_STOP=1", "-c"])
            .arg(&sql),
    )?;

    // psql reports the skip as a NOTICE on stderr
    if output.stderr.contains("already exists") || !output.stdout.contains("CREATE SCHEMA") {
        Ok(SchemaCreation::AlreadyExists)
    } else {
        Ok(SchemaCreation::Created)
    }
}

/// Load a SQL file into `schema` with `psql -f`
pub fn load_sql_file(pg: &PostgresSettings, schema: &str, sql_file: &Path) -> Result<(), DeptoolsError> {
    let url = connection_url(pg, schema)?;

    run_logged(
        "SQL file load",
        Command::new(&pg.psql)
            .arg(&url)
            .args(["-v", "ON_ERROR_STOP=1", "-f"])
            .arg(sql_file),
    )?;

    Ok(())
}

/// Install a required schema file; a missing file is fatal
pub fn install_schema_file(
    pg: &PostgresSettings,
    schema: &str,
    sql_file: &Path,
) -> Result<(), DeptoolsError> {
    if !sql_file.is_file() {
        return Err(ArtifactError::NotFound {
            what: "IIQ schema SQL file",
            path: sql_file.to_path_buf(),
        }
        .into());
    }

    info!("Loading schema file... {}", sql_file.display());
    load_sql_file(pg, schema, sql_file)
}

/// Install every file matching `pattern`, in sorted order
///
/// Returns the files loaded; no match is not an error.
pub fn install_schema_files_matching(
    pg: &PostgresSettings,
    schema: &str,
    pattern: &Path,
) -> Result<Vec<PathBuf>, DeptoolsError> {
    let files = matching_files(pattern)?;

    for file in &files {
        install_schema_file(pg, schema, file)?;
    }

    Ok(files)
}

fn matching_files(pattern: &Path) -> Result<Vec<PathBuf>, ArtifactError> {
    let pattern = pattern.to_string_lossy();
    let entries = glob::glob(&pattern).map_err(|e| ArtifactError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    // Unreadable directory entries are skipped, like the shell would
    let mut files: Vec<PathBuf> = entries.filter_map(Result::ok).filter(|p| p.is_file()).collect();
    files.sort();
    Ok(files)
}

/// Path of the custom-format dump for `schema`
pub fn backup_path(backup_home: &Path, schema: &str) -> PathBuf {
    backup_home.join(format!("{}_backup.dump", schema))
}

/// Dump `schema` with `pg_dump -F c`, overwriting any previous dump
pub fn backup_schema(
    pg: &PostgresSettings,
    backup_home: &Path,
    schema: &str,
) -> Result<PathBuf, DeptoolsError> {
    let url = connection_url(pg, schema)?;
    let dump = backup_path(backup_home, schema);

    run_logged(
        "database backup",
        Command::new(&pg.pg_dump)
            .arg(&url)
            .args(["-F", "c", "-f"])
            .arg(&dump),
    )?;

    Ok(dump)
}
