//! vstest-config task entry point
//!
//! Reads the task inputs the agent exports, prints the assembled runner
//! configuration as JSON on stdout and persists variables through agent
//! logging commands. Fatal configuration errors end the process with a
//! non-zero exit code.

mod cli;
mod tracing;

use clap::Parser;
use std::io;

fn main() -> miette::Result<()> {
    let cli = cli::Cli::parse();
    tracing::init_tracing(cli.log_level, cli.log_format)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    cli::run(&cli, &mut out)
}
