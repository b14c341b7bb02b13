//! Initialize a fresh IIQ instance
//!
//! Creates the instance schema, writes the instance property files,
//! extracts the application and loads the schema SQL it ships. Steps run in
//! order and stop at the first failure; nothing is rolled back, so a failed
//! upgrade load leaves the base tables in place.

use anyhow::{Context, Result};
use tracing::info;

use crate::build_script::{BuildMode, BuildScript};
use crate::config::InitSettings;
use crate::postgres::{self, SchemaCreation};
use crate::properties::{self, CopyOutcome};

pub fn create_tables_file(iiq_version: &str) -> String {
    format!("create_identity_tables-{}.postgresql", iiq_version)
}

pub fn upgrade_tables_pattern(iiq_version: &str) -> String {
    format!("upgrade_identity_tables-{}*.postgresql", iiq_version)
}

pub fn execute(settings: &InitSettings) -> Result<()> {
    let schema = &settings.build.instance_name;

    info!("=== Initializing IIQ environment ===");
    info!("Instance: {}", schema);
    info!(
        "Database: {}:{} as {}",
        settings.postgres.host, settings.postgres.port, settings.postgres.user
    );

    // 1. Schema
    info!("1. Creating schema if it doesn't exist...");
    match postgres::create_schema(&settings.postgres, schema).context("Schema creation failed")? {
        SchemaCreation::Created => info!("✓ Schema '{}' created", schema),
        SchemaCreation::AlreadyExists => info!("✓ Schema '{}' already exists", schema),
    }

    // 2. Instance property files
    info!("2. Copying IIQ property files...");
    let outcomes = properties::install_instance_properties(
        &settings.build.ssb_home,
        schema,
        &settings.db_host,
    )
    .context("Property file setup failed")?;
    for outcome in &outcomes {
        match outcome {
            CopyOutcome::Created(path) => info!("✓ Created {}", path.display()),
            CopyOutcome::Skipped(path) => info!("✓ Kept existing {}", path.display()),
        }
    }

    // 3. Extract application files
    info!("3. Extracting IIQ...");
    let build = BuildScript::new(&settings.build);
    build.clean_if_built().context("Build clean failed")?;
    build
        .build(BuildMode::Extract)
        .context("IIQ extract build failed")?;

    // 4. Schema SQL
    info!("4. Installing database schema...");
    let database_dir = build.database_dir();
    let create_tables = database_dir.join(create_tables_file(&settings.iiq_version));
    postgres::install_schema_file(&settings.postgres, schema, &create_tables)
        .context("Base schema installation failed")?;

    let upgrades = postgres::install_schema_files_matching(
        &settings.postgres,
        schema,
        &database_dir.join(upgrade_tables_pattern(&settings.iiq_version)),
    )
    .context("Upgrade schema installation failed")?;
    if upgrades.is_empty() {
        info!("No upgrade schema files for IIQ {}", settings.iiq_version);
    }

    info!("");
    info!("=== IIQ Environment Initialized ===");
    info!("✓ Instance '{}' is ready for deployment", schema);

    Ok(())
}
