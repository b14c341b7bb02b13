//! Build the IIQ WAR and drop it into Tomcat's webapps directory

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::build_script::{require_exists, BuildMode, BuildScript, WAR_FILE};
use crate::config::DeploySettings;
use crate::error::{ArtifactError, DeptoolsError};

pub fn execute(settings: &DeploySettings) -> Result<()> {
    info!("Deploying IIQ...");

    let build = BuildScript::new(&settings.build);
    build.clean_if_built().context("Build clean failed")?;
    build.build(BuildMode::War).context("IIQ WAR build failed")?;

    let webapps = settings.catalina_base.join("webapps");
    let deployed = copy_war(&build.war_path(), &webapps).context("WAR deployment failed")?;

    info!("✓ Deployed {}", deployed.display());
    Ok(())
}

/// Copy the WAR into `webapps`, replacing any previous deployment
///
/// Both must already exist; nothing is copied otherwise.
pub fn copy_war(war: &Path, webapps: &Path) -> Result<PathBuf, DeptoolsError> {
    require_exists(war, "IIQ WAR file")?;
    if !webapps.is_dir() {
        return Err(ArtifactError::NotFound {
            what: "Tomcat webapps deployment path",
            path: webapps.to_path_buf(),
        }
        .into());
    }

    let dest = webapps.join(WAR_FILE);
    fs::copy(war, &dest).map_err(|source| ArtifactError::Io {
        action: "copy WAR to",
        path: dest.clone(),
        source,
    })?;

    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildSettings;
    use crate::test_support::{self, write_script};

    fn settings(root: &Path) -> DeploySettings {
        DeploySettings {
            build: BuildSettings {
                ssb_home: root.join("ssb"),
                instance_name: "iiq_dev".to_string(),
            },
            catalina_base: root.join("tomcat"),
        }
    }

    #[test]
    fn test_deploy_copies_war() {
        let _guard = test_support::lock();
        let root = tempfile::tempdir().unwrap();
        let settings = settings(root.path());
        fs::create_dir_all(settings.catalina_base.join("webapps")).unwrap();
        fs::create_dir_all(&settings.build.ssb_home).unwrap();
        write_script(
            &settings.build.ssb_home,
            "build.sh",
            "[ \"$1\" = war ] || exit 1\nmkdir -p build/deploy\nprintf 'PK' > build/deploy/identityiq.war\n",
        );

        execute(&settings).unwrap();

        let deployed = settings.catalina_base.join("webapps/identityiq.war");
        assert_eq!(fs::read_to_string(deployed).unwrap(), "PK");
    }

    #[test]
    fn test_missing_war_is_not_found_and_nothing_copied() {
        let _guard = test_support::lock();
        let root = tempfile::tempdir().unwrap();
        let settings = settings(root.path());
        let webapps = settings.catalina_base.join("webapps");
        fs::create_dir_all(&webapps).unwrap();
        fs::create_dir_all(&settings.build.ssb_home).unwrap();
        // Build "succeeds" without producing a WAR
        write_script(&settings.build.ssb_home, "build.sh", "exit 0\n");

        let err = execute(&settings).unwrap_err();

        let cause = err.downcast_ref::<DeptoolsError>().expect("typed error");
        assert!(cause.is_not_found());
        assert!(cause.to_string().starts_with("IIQ WAR file not found"));
        assert_eq!(fs::read_dir(&webapps).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_webapps_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let war = root.path().join("identityiq.war");
        fs::write(&war, "PK").unwrap();

        let err = copy_war(&war, &root.path().join("tomcat/webapps")).unwrap_err();
        assert!(err.is_not_found());
        assert!(err
            .to_string()
            .starts_with("Tomcat webapps deployment path not found"));
    }

    #[test]
    fn test_copy_war_replaces_previous_deployment() {
        let root = tempfile::tempdir().unwrap();
        let war = root.path().join("identityiq.war");
        let webapps = root.path().join("webapps");
        fs::create_dir(&webapps).unwrap();
        fs::write(&war, "new").unwrap();
        fs::write(webapps.join("identityiq.war"), "old").unwrap();

        let dest = copy_war(&war, &webapps).unwrap();
        assert_eq!(fs::read_to_string(dest).unwrap(), "new");
    }
}
