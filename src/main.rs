//! `git-batch` binary: a thin command-line layer over the `git_batch` library.

mod cli;
mod terminal;

use clap::Parser;
use console::style;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .format_timestamp(None)
        .init();

    match cli.execute() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", style("error:").red().bold());
            ExitCode::FAILURE
        }
    }
}
