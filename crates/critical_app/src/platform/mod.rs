//! Command-line front end: flags, configuration, logging and output.
mod cli;
mod config;
mod logging;
mod runner;

use std::process::ExitCode;

use clap::Parser;
use engine_logging::engine_error;

pub fn run_cli() -> ExitCode {
    let cli = cli::Cli::parse();
    logging::initialize(cli.log_destination(), cli.log_level);

    let outcome = config::load_config(&cli).and_then(|config| runner::run(&cli, config));
    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            engine_error!("{:#}", err);
            ExitCode::from(2)
        }
    }
}
