//! Validation utilities for schema names and credentials
//!
//! Schema names are interpolated into SQL and into backup file names, so
//! they are checked against PostgreSQL identifier rules before use.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::ConfigError;

/// Maximum length for PostgreSQL identifiers (standard limit)
pub const PG_IDENTIFIER_MAX_LENGTH: usize = 63;

/// Characters allowed in PostgreSQL identifiers (alphanumeric, underscore, dollar)
const IDENTIFIER_ALLOWED_CHARS: &[char] = &['_', '$'];

/// Validate PostgreSQL identifier to prevent SQL injection
///
/// PostgreSQL identifiers must:
/// - Not be empty
/// - Not exceed 63 characters
/// - Start with a letter or underscore
/// - Contain only alphanumeric, underscore, or dollar sign
pub fn validate_pg_identifier(name: &str, field_name: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        field: field_name.to_string(),
        value: name.to_string(),
        reason,
    };

    let Some(first_char) = name.chars().next() else {
        return Err(invalid("cannot be empty".to_string()));
    };

    if name.len() > PG_IDENTIFIER_MAX_LENGTH {
        return Err(invalid(format!(
            "exceeds PostgreSQL maximum identifier length ({} > {})",
            name.len(),
            PG_IDENTIFIER_MAX_LENGTH
        )));
    }

    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(invalid(format!(
            "must start with a letter or underscore, got '{}'",
            first_char
        )));
    }

    let invalid_chars: Vec<char> = name
        .chars()
        .filter(|c| !c.is_ascii_alphanumeric() && !IDENTIFIER_ALLOWED_CHARS.contains(c))
        .collect();

    if !invalid_chars.is_empty() {
        return Err(invalid(format!(
            "contains invalid characters {:?} (allowed: a-z, A-Z, 0-9, _, $)",
            invalid_chars
        )));
    }

    Ok(())
}

/// Read a single-credential secret file
///
/// The content is trimmed; a missing file and an empty file are distinct
/// errors so the log says which one to fix.
pub fn read_secret_file(path: &Path, what: &'static str) -> Result<String, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            ConfigError::SecretNotFound {
                what,
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::SecretUnreadable {
                what,
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let secret = content.trim();
    if secret.is_empty() {
        return Err(ConfigError::EmptySecret {
            what,
            path: path.to_path_buf(),
        });
    }

    Ok(secret.to_string())
}
