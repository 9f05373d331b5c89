//! ## crossing-cli
//! **Command line entrypoint for the crossing simulator**
//!
//! `crossing run <records>` simulates a population; `crossing check <records>`
//! only validates it. Exit status is 0 on success, 1 for bad input or
//! configuration, 2 for usage errors and 3 for synchronization defects.

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

mod commands;
mod error;

use commands::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match commands::dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("crossing: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
