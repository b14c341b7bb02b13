//! External process execution
//!
//! Every external tool (build script, `psql`, `pg_dump`) runs through
//! [`run_logged`]: it blocks until the process exits, captures both
//! streams, writes them to the log, and fails on a non-zero exit status.
//! Output on stderr alone is not a failure; `psql` and the build script
//! both print notices there.

use std::io::ErrorKind;
use std::process::Command;

use tracing::{debug, error, info, warn};

use crate::error::ProcessError;

/// Captured output of a successful process
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run a prepared command to completion and log its output
///
/// `step` names the operation in log lines and errors ("Schema creation",
/// "IIQ build"). Arguments are not logged since connection URLs carry the
/// database password.
pub fn run_logged(step: &str, cmd: &mut Command) -> Result<CommandOutput, ProcessError> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    debug!("{}: running {}", step, program);

    let output = cmd.output().map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            ProcessError::NotFound {
                program: program.clone(),
            }
        } else {
            ProcessError::Spawn {
                program: program.clone(),
                source,
            }
        }
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        error!("Error during {}... ({})", step, output.status);
        if !stderr.trim().is_empty() {
            error!("{}", stderr.trim_end());
        }
        if !stdout.trim().is_empty() {
            error!("{}", stdout.trim_end());
        }
        return Err(ProcessError::Failed {
            step: step.to_string(),
            status: output.status,
            stdout,
            stderr,
        });
    }

    if !stdout.trim().is_empty() {
        info!("{}", stdout.trim_end());
    }
    if !stderr.trim().is_empty() {
        warn!("{} wrote to stderr:", step);
        warn!("{}", stderr.trim_end());
    }

    Ok(CommandOutput { stdout, stderr })
}
