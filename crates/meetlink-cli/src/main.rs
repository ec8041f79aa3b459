//! meetlink CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use meetlink_cli::cli::{Cli, Command, ConfigAction};
use meetlink_cli::commands;
use meetlink_cli::config::CliConfig;
use meetlink_cli::error::CliResult;
use meetlink_cli::logging::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::cli()
    };
    if let Err(e) = init_tracing(tracing_config.with_format(cli.log_format)) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(CliConfig::default_path);
    let command = cli.command();
    if let Command::Config {
        action: ConfigAction::Path,
    } = command
    {
        return commands::config::path(&config_path);
    }

    let config = CliConfig::load(cli.config.as_deref())?;

    match command {
        Command::Create(args) => {
            let google = config.google_config(&cli.google)?;
            commands::create::run(&args, google).await
        }
        Command::Auth { force } => {
            let google = config.google_config(&cli.google)?;
            commands::auth::login(google, force).await
        }
        Command::Logout => commands::auth::logout(&config.token_path(&cli.google)),
        Command::Config { action } => match action {
            ConfigAction::Path => commands::config::path(&config_path),
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
        },
    }
}
