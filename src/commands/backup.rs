use anyhow::{Context, Result};
use tracing::info;

use crate::config::BackupSettings;
use crate::postgres;

pub fn execute(settings: &BackupSettings) -> Result<()> {
    info!("Backup database...");
    info!("Schema: {}", settings.schema);

    let dump = postgres::backup_schema(&settings.postgres, &settings.backup_home, &settings.schema)
        .with_context(|| format!("Backup of schema '{}' failed", settings.schema))?;

    info!("✓ Backup written to {}", dump.display());
    Ok(())
}
