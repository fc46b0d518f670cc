use clap::Parser;
use tracing::debug;

use diboas_core::adapter::inbound::cli::command::{Cli, Commands, ConfigCommand};
use diboas_core::adapter::inbound::cli::output::{self, OutputConfig};
use diboas_core::adapter::inbound::cli::{config, simulate};
use diboas_core::error::Result;
use diboas_core::infrastructure::config::logging::LoggingConfig;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    output::configure(OutputConfig {
        json: cli.json,
        quiet: cli.quiet,
    });

    let level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    LoggingConfig {
        level: level.to_string(),
        format: if cli.json { "json" } else { "pretty" }.to_string(),
    }
    .init();
    debug!(command = ?cli.command, "diboas starting");

    if let Err(e) = run(cli).await {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Config(ConfigCommand::Show(arg)) => config::execute_show(&arg.config),
        Commands::Config(ConfigCommand::Check(arg)) => config::execute_check(&arg.config),
        Commands::Simulate(args) => simulate::execute(args).await,
    }
}
