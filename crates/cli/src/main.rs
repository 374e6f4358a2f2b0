use std::process::ExitCode;

use clap::Parser as _;
use cli::Cli;
use tokio::{
    select,
    signal::unix::{SignalKind, signal},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use quickdex_core::{
    config::Config,
    telemetry::{get_subscriber, init_subscriber},
};

mod cli;
mod context;
mod farm;
mod market;
mod pairs;
mod swap;
mod tokens;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = color_eyre::install() {
        eprintln!("failed to install error report handler: {err}");
        return ExitCode::FAILURE;
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let cli = Cli::parse();
    if let Err(err) = init_subscriber(get_subscriber(cli.verbose)) {
        eprintln!("failed to set up logging: {err}");
        return ExitCode::FAILURE;
    }

    let shutdown_token = CancellationToken::new();

    let command_jh = tokio::spawn(cli.run(config, shutdown_token.clone()));

    let mut sigterm = signal(SignalKind::terminate())
        .expect("setting sigterm listener on unix should always work");
    let mut sigint = signal(SignalKind::interrupt())
        .expect("setting sigint listener on unix should always work");

    let result = select! {
        res = command_jh => {
            res.map(|command_result| match command_result {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    error!("command failed: {e:?}");
                    ExitCode::FAILURE
                }
            })
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM signal");
            shutdown_token.cancel();
            Ok(ExitCode::FAILURE)
        }
        _ = sigint.recv() => {
            info!("received SIGINT signal");
            shutdown_token.cancel();
            Ok(ExitCode::FAILURE)
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!(%e, "command exited unexpectedly");
            ExitCode::FAILURE
        }
    }
}
