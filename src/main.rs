//! deptools: IdentityIQ deployment tools
//!
//! Sequences the external tools an IIQ instance needs:
//! - `psql` to create the instance schema and load the IIQ schema SQL
//! - `pg_dump` to back up a schema
//! - the SSB `build.sh` to extract and package the application
//! - the Tomcat manager to reload the deployed application
//!
//! Settings come from the environment and are validated before anything
//! runs. Diagnostics go to `$BACKUP_HOME/deptools.log`.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

mod build_script;
mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod postgres;
mod process;
mod properties;
mod tomcat;
mod tools;
mod validation;

#[cfg(test)]
mod test_support;

use cli::{Cli, Operation};
use config::Settings;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => return cli::exit_on_parse_error(err),
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("deptools: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let operation: Operation = cli.operation.into_operation();
    let lookup = |key: &str| std::env::var(key).ok();

    // The log file lives under BACKUP_HOME. Without it, configuration
    // errors can only go to stderr.
    if let Some(backup_home) = config::backup_home(lookup) {
        let filter = logging::log_filter(cli.verbose, lookup);
        logging::init(&backup_home, &filter)?;
    }
    info!("deptools {} starting: {}", env!("CARGO_PKG_VERSION"), operation);

    let result = execute(&operation, &cli.db_host);

    if let Err(ref e) = result {
        error!("{} failed: {:#}", operation, e);
    }

    result
}

fn execute(operation: &Operation, db_host: &str) -> Result<()> {
    match Settings::from_env(operation, db_host)? {
        Settings::Init(s) => commands::init::execute(&s),
        Settings::Backup(s) => commands::backup::execute(&s),
        Settings::Deploy(s) => commands::deploy::execute(&s),
        Settings::Reload(s) => commands::reload::execute(&s),
    }
}
