//! authwatch - authentication audit trail viewer
//!
//! Main entry point for the `authwatch` binary.

use std::process::ExitCode;

use authwatch_cli::cli::Cli;
use authwatch_cli::error::CliError;
use authwatch_cli::output::use_color;
use authwatch_common_config::{AuthwatchConfig, Environment};
use authwatch_common_log::{LogConfig, LogLevel};
use clap::Parser;

/// Application exit codes
#[repr(u8)]
pub enum Exit {
    Success = 0,
    GeneralError = 1,
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit as u8)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let color = use_color(cli.color);

    if let Err(e) = Environment::init() {
        eprintln!("warning: {e}");
    }

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => return fail(&e, color),
    };

    init_logging(&cli, &config);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start async runtime: {e}");
            return Exit::GeneralError.into();
        }
    };

    match runtime.block_on(cli.execute(config)) {
        Ok(()) => Exit::Success.into(),
        Err(e) => fail(&e, color),
    }
}

fn fail(error: &CliError, color: bool) -> ExitCode {
    tracing::debug!(code = error.code(), "command failed");
    eprintln!("{}", error.render(color));
    error.exit_code()
}

/// Logging follows the configuration file unless -v/-q is given.
fn init_logging(cli: &Cli, config: &AuthwatchConfig) {
    let logging = &config.logging;
    let mut log_config = LogConfig::from_settings(&logging.level, &logging.format, logging.file.clone());

    log_config.level = match (cli.quiet, cli.verbose) {
        (true, _) => LogLevel::Error,
        (false, 0) => log_config.level,
        (false, 1) => LogLevel::Info,
        (false, 2) => LogLevel::Debug,
        (false, _) => LogLevel::Trace,
    };

    if let Err(e) = authwatch_common_log::init(log_config) {
        eprintln!("warning: {e}");
    }
}
