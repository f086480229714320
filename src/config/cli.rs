use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "mds-shipping")]
#[command(about = "MDS Collivery shipping rates and account settings")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "mds-shipping.toml")]
    pub config: PathBuf,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List the courier services for the configured account
    Services,

    /// Quote shipping rates for a package described in a JSON file
    Quote {
        #[arg(short, long)]
        package: PathBuf,
    },

    /// Validate and save settings from a JSON form submission
    UpdateSettings {
        #[arg(short, long)]
        form: PathBuf,
    },

    /// Inspect or export the diagnostic logs
    Logs {
        #[command(subcommand)]
        action: LogAction,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum LogAction {
    /// Print the entries of one log (error, warning or success)
    Show { kind: String },

    /// Zip the error and warning logs for support
    Bundle,

    /// Print the path of the error log, if any
    ErrorFile,
}
