//! Centralized error types for deptools
//!
//! Uses thiserror for typed errors that can be matched on,
//! while still being compatible with anyhow for propagation.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Top-level error type for deptools operations
#[derive(Error, Debug)]
pub enum DeptoolsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Artifact(#[from] ArtifactError),

    #[error("External process error: {0}")]
    Process(#[from] ProcessError),

    #[error("Tomcat manager error: {0}")]
    Manager(#[from] ManagerError),
}

impl DeptoolsError {
    /// True for every "file not found" flavour: missing secret files and
    /// missing build or deployment artifacts.
    #[cfg(test)]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DeptoolsError::Config(ConfigError::SecretNotFound { .. })
                | DeptoolsError::Artifact(ArtifactError::NotFound { .. })
        )
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Missing variables, plus any invalid values found while looking for them
    #[error("Required environment variable(s) not set: {}{}", .vars.join(", "), format_invalid(.invalid))]
    MissingVars {
        vars: Vec<&'static str>,
        invalid: Vec<ConfigError>,
    },

    #[error("Invalid value for {field}: {value:?} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("{what} file not found: {}", .path.display())]
    SecretNotFound { what: &'static str, path: PathBuf },

    #[error("{what} file is empty: {}", .path.display())]
    EmptySecret { what: &'static str, path: PathBuf },

    #[error("Failed to read {what} file {}: {source}", .path.display())]
    SecretUnreadable {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Build and deployment artifact errors
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("{what} not found: {}", .path.display())]
    NotFound { what: &'static str, path: PathBuf },

    #[error("Failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid glob pattern {pattern}: {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// External process errors
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("{program} not found. Is it installed and on PATH?")]
    NotFound { program: String },

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{step} failed ({status}){}", format_streams(.stdout, .stderr))]
    Failed {
        step: String,
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
}

/// Tomcat manager API errors
#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Manager returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Manager rejected the command: {body}")]
    Rejected { body: String },
}

fn format_invalid(invalid: &[ConfigError]) -> String {
    invalid.iter().map(|e| format!("; {}", e)).collect()
}

fn format_streams(stdout: &str, stderr: &str) -> String {
    let mut out = String::new();
    if !stderr.trim().is_empty() {
        out.push_str("\n  stderr: ");
        out.push_str(stderr.trim());
    }
    if !stdout.trim().is_empty() {
        out.push_str("\n  stdout: ");
        out.push_str(stdout.trim());
    }
    out
}
