//! CLI definitions for deptools
//!
//! One operation flag per invocation. Anything clap cannot parse, including
//! no operation at all, prints the usage text and exits with status 2.

use std::fmt;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser};

/// Exit status for malformed arguments
pub const USAGE_EXIT_CODE: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "deptools",
    version,
    about = "IdentityIQ deployment tools",
    long_about = "Initializes, backs up and deploys an IdentityIQ instance running on PostgreSQL and Tomcat.\n\
    Diagnostics are written to $BACKUP_HOME/deptools.log."
)]
pub struct Cli {
    #[command(flatten)]
    pub operation: OperationArgs,

    /// Database hostname written into the instance IIQ properties
    #[arg(long, env = "IIQ_DB_HOST", default_value = "db")]
    pub db_host: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct OperationArgs {
    /// Initialize IIQ environment
    #[arg(short = 's', long = "init-iiq")]
    pub init_iiq: bool,

    /// Backup the specified database schema
    #[arg(short = 'b', long = "backup-db", value_name = "SCHEMA")]
    pub backup_db: Option<String>,

    /// Build and deploy IIQ WAR file to Tomcat webapps directory
    #[arg(short = 'd', long = "deploy-iiq")]
    pub deploy_iiq: bool,

    /// Reload the deployed IIQ application through the Tomcat manager
    #[arg(short = 'r', long = "reload-iiq")]
    pub reload_iiq: bool,
}

/// The operation selected on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    InitIiq,
    BackupDb { schema: String },
    DeployIiq,
    ReloadIiq,
}

impl OperationArgs {
    pub fn into_operation(self) -> Operation {
        if let Some(schema) = self.backup_db {
            Operation::BackupDb { schema }
        } else if self.init_iiq {
            Operation::InitIiq
        } else if self.deploy_iiq {
            Operation::DeployIiq
        } else {
            Operation::ReloadIiq
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::InitIiq => write!(f, "init-iiq"),
            Operation::BackupDb { schema } => write!(f, "backup-db {}", schema),
            Operation::DeployIiq => write!(f, "deploy-iiq"),
            Operation::ReloadIiq => write!(f, "reload-iiq"),
        }
    }
}

/// Handle a clap parse result that did not yield a `Cli`
///
/// `--help` and `--version` print and succeed; everything else prints the
/// usage text and exits 2.
pub fn exit_on_parse_error(err: clap::Error) -> ExitCode {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = err.print();
            ExitCode::SUCCESS
        }
        _ => {
            let _ = Cli::command().print_help();
            println!();
            ExitCode::from(USAGE_EXIT_CODE)
        }
    }
}
