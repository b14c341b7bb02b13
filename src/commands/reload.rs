use anyhow::{Context, Result};
use tracing::info;

use crate::config::ReloadSettings;
use crate::tomcat::{self, IIQ_CONTEXT_PATH};

pub fn execute(settings: &ReloadSettings) -> Result<()> {
    info!("Reloading IIQ...");

    let response = tomcat::reload_webapp(&settings.tomcat, IIQ_CONTEXT_PATH)
        .with_context(|| format!("Reload of {} failed", IIQ_CONTEXT_PATH))?;

    info!("✓ {}", response);
    Ok(())
}
