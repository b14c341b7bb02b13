//! Instance property files
//!
//! The SSB checkout ships `sandbox.iiq.properties` and
//! `sandbox.log4j2.properties`. Each instance gets its own copy
//! (`{instance}.iiq.properties`, `{instance}.log4j2.properties`) with one
//! substitution applied. A copy is created at most once: an existing
//! instance file is never overwritten or patched again, so hand edits
//! survive repeated initialization.

use std::borrow::Cow;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use regex::Regex;
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::ArtifactError;

/// Template prefix in the SSB checkout
pub const SANDBOX_PREFIX: &str = "sandbox";

/// Hostname the sandbox IIQ properties point their JDBC URL at
const SANDBOX_DB_PATTERN: &str = r"devsrv(:5432)";

/// Tomcat instance reference in the sandbox log4j2 properties
const SANDBOX_LOG4J2_PATTERN: &str = r"env:TC_INSTANCE";
const INSTANCE_LOG4J2_REPLACEMENT: &str = "INSTANCE_NAME";

/// Property file kinds derived from sandbox templates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Iiq,
    Log4j2,
}

impl PropertyKind {
    pub fn suffix(self) -> &'static str {
        match self {
            PropertyKind::Iiq => "iiq.properties",
            PropertyKind::Log4j2 => "log4j2.properties",
        }
    }

    pub fn file_name(self, prefix: &str) -> String {
        format!("{}.{}", prefix, self.suffix())
    }
}

/// A single regex substitution applied to a whole file
#[derive(Debug, Clone)]
pub struct Patch {
    pattern: Regex,
    replacement: String,
}

impl Patch {
    /// Point the JDBC URL at `db_host`, keeping the port
    pub fn db_host(db_host: &str) -> Self {
        Self {
            pattern: Regex::new(SANDBOX_DB_PATTERN).expect("static pattern is valid"),
            // `$` in a hostname must not be read as a group reference
            replacement: format!("{}${{1}}", db_host.replace('$', "$$")),
        }
    }

    /// Replace the Tomcat instance lookup with the literal `INSTANCE_NAME`
    pub fn log4j2_instance() -> Self {
        Self {
            pattern: Regex::new(SANDBOX_LOG4J2_PATTERN).expect("static pattern is valid"),
            replacement: INSTANCE_LOG4J2_REPLACEMENT.to_string(),
        }
    }

    pub fn for_kind(kind: PropertyKind, db_host: &str) -> Self {
        match kind {
            PropertyKind::Iiq => Self::db_host(db_host),
            PropertyKind::Log4j2 => Self::log4j2_instance(),
        }
    }

    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        self.pattern.replace_all(text, self.replacement.as_str())
    }
}

/// What happened to one instance property file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    Created(PathBuf),
    Skipped(PathBuf),
}

/// Create both instance property files from the sandbox templates
pub fn install_instance_properties(
    ssb_home: &Path,
    instance: &str,
    db_host: &str,
) -> Result<Vec<CopyOutcome>, ArtifactError> {
    [PropertyKind::Iiq, PropertyKind::Log4j2]
        .into_iter()
        .map(|kind| {
            let src = ssb_home.join(kind.file_name(SANDBOX_PREFIX));
            let dest = ssb_home.join(kind.file_name(instance));
            copy_and_patch(&src, &dest, &Patch::for_kind(kind, db_host))
        })
        .collect()
}

/// Copy `src` to `dest` with `patch` applied, unless `dest` already exists
///
/// The patched content is written to a temp file next to `dest` and moved
/// into place without clobbering, so a crash never leaves a half-written
/// or unpatched instance file behind.
pub fn copy_and_patch(src: &Path, dest: &Path, patch: &Patch) -> Result<CopyOutcome, ArtifactError> {
    if dest.exists() {
        info!("{} already exists, leaving it unchanged", dest.display());
        return Ok(CopyOutcome::Skipped(dest.to_path_buf()));
    }

    let template = fs::read_to_string(src).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            ArtifactError::NotFound {
                what: "Sandbox property template",
                path: src.to_path_buf(),
            }
        } else {
            io_error("read", src, source)
        }
    })?;

    info!("Copying {} to {}", src.display(), dest.display());
    let patched = patch.apply(&template);
    match write_new_file(dest, patched.as_bytes()) {
        Ok(()) => Ok(CopyOutcome::Created(dest.to_path_buf())),
        // Another run created it between the check and the rename
        Err(ArtifactError::Io { source, .. }) if source.kind() == ErrorKind::AlreadyExists => {
            Ok(CopyOutcome::Skipped(dest.to_path_buf()))
        }
        Err(e) => Err(e),
    }
}

fn write_new_file(dest: &Path, content: &[u8]) -> Result<(), ArtifactError> {
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| io_error("create temp file in", dir, e))?;
    tmp.write_all(content)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| io_error("write", tmp.path(), e))?;
    tmp.persist_noclobber(dest)
        .map_err(|e| io_error("create", dest, e.error))?;

    Ok(())
}

fn io_error(action: &'static str, path: &Path, source: std::io::Error) -> ArtifactError {
    ArtifactError::Io {
        action,
        path: path.to_path_buf(),
        source,
    }
}
