//! Muezzin CLI - operate the prayer notification engine

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};
use commands::*;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging based on verbosity
    let cli = Cli::parse();

    // Set JSON output mode if requested
    output::set_json_mode(cli.json);

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "muezzin={0},muezzin_engine={0},muezzin_db={0},muezzin_push={0}",
                    log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let config_path = cli.config.as_deref();

    // Handle commands
    let result = match cli.command {
        Commands::Run(args) => run::execute(config_path, args).await,
        Commands::Test { user } => send_test::execute(config_path, &user).await,
        Commands::Status { user, at } => status::execute(config_path, &user, at).await,
        Commands::Import { file } => import::execute(config_path, &file).await,
        Commands::Like(args) => like::execute(config_path, args).await,
        Commands::Config { command } => config::execute(config_path, command),
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
