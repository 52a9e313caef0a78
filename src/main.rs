use std::process::ExitCode;

use anyhow::Context;
use certsmith::cli::{self, Cli, Mode};
use certsmith::prompt::Console;
use clap::{CommandFactory, Parser};
use colored::Colorize;
use env_logger::Env;

fn main() -> ExitCode {
    let args = Cli::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    let Some(mode) = args.mode() else {
        if let Err(e) = Cli::command().print_help() {
            eprintln!("{} {e}", "Error:".red().bold());
            return ExitCode::FAILURE;
        }
        return ExitCode::SUCCESS;
    };

    if let Err(e) = certsmith::preflight() {
        eprintln!("{} {e}", "Error:".red().bold());
        eprintln!(
            "certsmith needs the operating system random number generator (getrandom) to create keys and serial numbers; check that /dev/urandom or the platform equivalent is available."
        );
        return ExitCode::from(2);
    }

    match run(mode, &args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(mode: Mode, args: &Cli) -> anyhow::Result<()> {
    let config = args.config();
    log::debug!("Starting {mode} mode");
    cli::run(mode, &mut Console, &config).with_context(|| format!("{mode} mode failed"))?;
    Ok(())
}
