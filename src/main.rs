mod cli;
mod config;
mod fleet;
mod model;
mod storage;

use std::{io, process::ExitCode};

use clap::Parser;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{Cli, CliError, Output};
use config::Config;
use fleet::{Fleet, FleetError};
use storage::Storage;

/// Environment variable holding a `tracing` filter directive.
const LOG_ENV: &str = "HAUL_LOG";
const DEFAULT_LOG: &str = "haul=info";
const VERBOSE_LOG: &str = "haul=debug";

fn main() -> ExitCode {
    let cli = Cli::parse();
    let out = Output::new(cli.json);

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            let err = CliError::from(e);
            out.failure(&err);
            return err.exit_code();
        }
    };

    init_logging(cli.verbose, config.log.as_deref());

    match run(cli, &config, &out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            out.failure(&e);
            e.exit_code()
        }
    }
}

fn run(cli: Cli, config: &Config, out: &Output) -> Result<(), CliError> {
    let root = config.data_dir(cli.data_dir)?;
    let storage = Storage::with_busy_timeout(root, config.busy_timeout()).map_err(FleetError::from)?;
    debug!(root = %storage.root().display(), "data directory ready");
    let fleet = Fleet::new(storage);
    cli::run(cli.command, &fleet, out)
}

/// Logs go to stderr so stdout stays parseable.
fn init_logging(verbose: bool, configured: Option<&str>) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_LOG)
    } else {
        EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_new(configured.unwrap_or(DEFAULT_LOG)))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter)
        .init();
}
