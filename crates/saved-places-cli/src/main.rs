//! Saved places importer: entry point.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{CommandFactory, Parser};

use saved_places_cli::app::{describe_error, run_import};
use saved_places_cli::browser::chromium::ChromiumConnector;
use saved_places_cli::cli::{Cli, Commands};
use saved_places_cli::doctor;
use saved_places_cli::operator::TerminalOperator;
use saved_places_cli::report::TracingReporter;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let (config_path, config) = match cli.load_config() {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!("{}", describe_error(&e));
            return Ok(ExitCode::FAILURE);
        }
    };

    match &cli.command {
        Some(Commands::Doctor) => {
            doctor::run(config_path.as_deref(), &config).await?;
            return Ok(ExitCode::SUCCESS);
        }
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "saved-places", &mut std::io::stdout());
            return Ok(ExitCode::SUCCESS);
        }
        None => {}
    }

    let Some(opts) = cli.import_options() else {
        Cli::command()
            .error(
                clap::error::ErrorKind::MissingRequiredArgument,
                "the following required arguments were not provided: <IMPORT_FILE>",
            )
            .exit();
    };

    let connector = ChromiumConnector {
        probe_timeout: config.probe_timeout(),
        navigation_timeout: config.navigation_timeout(),
    };
    let mut operator = TerminalOperator::new();
    let reporter = Arc::new(TracingReporter);

    match run_import(&opts, &config, &connector, &mut operator, reporter).await {
        Ok(report) => {
            tracing::debug!(?report, "run finished");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!("{}", describe_error(&e));
            Ok(ExitCode::FAILURE)
        }
    }
}
