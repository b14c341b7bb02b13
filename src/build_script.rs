//! SSB build script invocation
//!
//! The services standard build (SSB) checkout at `SSB_HOME` contains
//! `build.sh`. Without an argument it extracts the IIQ web application
//! into `build/extract`; with `war` it also packages
//! `build/deploy/identityiq.war`. `clean` removes previous output.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use crate::config::BuildSettings;
use crate::error::{ArtifactError, DeptoolsError};
use crate::process::run_logged;

pub const BUILD_SCRIPT: &str = "build.sh";
pub const WAR_FILE: &str = "identityiq.war";

/// What the build should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Default target: extract application files only
    Extract,
    /// Extract and package the WAR
    War,
}

impl BuildMode {
    fn args(self) -> &'static [&'static str] {
        match self {
            BuildMode::Extract => &[],
            BuildMode::War => &["war"],
        }
    }
}

pub struct BuildScript<'a> {
    settings: &'a BuildSettings,
}

impl<'a> BuildScript<'a> {
    pub fn new(settings: &'a BuildSettings) -> Self {
        Self { settings }
    }

    pub fn script_path(&self) -> PathBuf {
        self.settings.ssb_home.join(BUILD_SCRIPT)
    }

    pub fn extract_dir(&self) -> PathBuf {
        self.settings.ssb_home.join("build").join("extract")
    }

    /// Schema SQL files shipped inside the extracted application
    pub fn database_dir(&self) -> PathBuf {
        self.extract_dir().join("WEB-INF").join("database")
    }

    pub fn war_path(&self) -> PathBuf {
        self.settings
            .ssb_home
            .join("build")
            .join("deploy")
            .join(WAR_FILE)
    }

    /// Run `build.sh clean` if a previous build left an extract directory
    pub fn clean_if_built(&self) -> Result<bool, DeptoolsError> {
        if !self.extract_dir().exists() {
            return Ok(false);
        }

        info!("Cleaning previous build...");
        self.run("build clean", &["clean"])?;
        Ok(true)
    }

    pub fn build(&self, mode: BuildMode) -> Result<(), DeptoolsError> {
        info!("Building IIQ ({:?})...", mode);
        self.run("build", mode.args())
    }

    fn run(&self, step: &str, args: &[&str]) -> Result<(), DeptoolsError> {
        let script = self.script_path();
        if !script.is_file() {
            return Err(ArtifactError::NotFound {
                what: "SSB build script",
                path: script,
            }
            .into());
        }

        run_logged(
            step,
            Command::new(&script)
                .args(args)
                .current_dir(&self.settings.ssb_home)
                .env("SPTARGET", &self.settings.instance_name),
        )?;

        Ok(())
    }
}

/// Ensure `path` exists, or fail with a not-found naming `what`
pub fn require_exists(path: &Path, what: &'static str) -> Result<(), ArtifactError> {
    if path.exists() {
        Ok(())
    } else {
        Err(ArtifactError::NotFound {
            what,
            path: path.to_path_buf(),
        })
    }
}
