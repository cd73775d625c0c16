//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// mx - audio matrix configuration manager
#[derive(Debug, Parser)]
#[command(
    name = "mx",
    about = "Manage and upload audio matrix configurations",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Device host, overrides the config file
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Directory of stored configurations, overrides the config file
    #[arg(long = "configs-path", global = true)]
    pub configs_path: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List stored configurations
    List,

    /// Show which stored configuration the device is running
    Current,

    /// Upload a stored configuration to the device
    Upload {
        /// Configuration file, or a name inside the configs directory
        file: PathBuf,

        /// Return as soon as the upload is accepted
        #[arg(long)]
        no_wait: bool,
    },

    /// Write a configuration to the device directly, bypassing the manager
    #[command(hide = true)]
    Restore {
        /// Configuration file, or a name inside the configs directory
        file: PathBuf,
    },

    /// Save the device's live matrix as a new stored configuration
    Dump {
        /// Name of the new configuration (`.yml` is added if missing)
        name: String,
    },

    /// Show how a stored configuration differs from the device
    Diff {
        /// Configuration file, or a name inside the configs directory
        file: PathBuf,
    },
}
