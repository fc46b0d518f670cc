//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Custodial multi-chain wallet core
#[derive(Parser, Debug)]
#[command(name = "diboas")]
#[command(version)]
pub struct Cli {
    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Run a scripted session against simulated providers
    Simulate(SimulateArgs),
}

/// Subcommands for `diboas config`.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display the effective configuration with defaults applied.
    Show(ConfigPathArg),
    /// Validate a configuration file.
    Check(ConfigPathArg),
}

#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,
}

/// Arguments for `diboas simulate`.
#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Configuration file; built-in defaults when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// JSON file holding an array of transaction requests.
    /// A built-in demo script runs when omitted.
    #[arg(short, long)]
    pub script: Option<PathBuf>,

    /// User the session runs as.
    #[arg(short, long, default_value = "demo")]
    pub user: String,

    /// Override the confirmation poll interval (milliseconds).
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Number of history records to print at the end.
    #[arg(long, default_value_t = 10)]
    pub history: usize,
}
