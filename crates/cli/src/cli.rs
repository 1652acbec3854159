//! Command line definition and dispatch.

use crate::tracing::{LogLevel, TracingFormat};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;
use vstest_config::{Assembler, MemoryEnvironment, ProcessEnvironment, TaskEnvironment};

/// Command line of the task entry point.
#[derive(Debug, Parser)]
#[command(name = "vstest-config", version)]
#[command(about = "Assemble test runner configuration from task inputs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Read inputs, variables and endpoints from a JSON file instead of the
    /// process environment
    #[arg(long, global = true, env = "VSTEST_CONFIG_INPUTS")]
    pub from_file: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = TracingFormat::Compact)]
    pub log_format: TracingFormat,

    /// Pretty-print the configuration
    #[arg(long, global = true)]
    pub pretty: bool,
}

/// Which configuration to assemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Configuration for a run distributed across the agents of a phase
    Distributed,
    /// Configuration for a run on this agent
    Vstest,
}

/// Assemble the requested configuration and write it to `out`, followed by
/// the logging commands for any variables written along the way.
pub fn run(cli: &Cli, out: &mut impl Write) -> miette::Result<()> {
    match &cli.from_file {
        Some(path) => {
            info!("Reading task inputs from {}", path.display());
            let mut env = MemoryEnvironment::from_file(path)?;
            assemble(cli, &mut env, out)
        }
        None => assemble(cli, &mut ProcessEnvironment::new(), out),
    }
}

fn assemble(
    cli: &Cli,
    env: &mut impl TaskEnvironment,
    out: &mut impl Write,
) -> miette::Result<()> {
    let assembler = Assembler::new();
    match cli.command {
        Command::Distributed => {
            let config = assembler.distributed(&mut *env)?;
            write_json(out, &config, cli.pretty)?;
        }
        Command::Vstest => {
            let config = assembler.vstest(&*env)?;
            write_json(out, &config, cli.pretty)?;
        }
    }

    for update in env.take_updates() {
        writeln!(out, "{update}").map_err(|e| miette::miette!("Failed to write output: {e}"))?;
    }
    Ok(())
}

fn write_json(out: &mut impl Write, value: &impl Serialize, pretty: bool) -> miette::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| miette::miette!("Failed to serialize configuration: {e}"))?;

    writeln!(out, "{json}").map_err(|e| miette::miette!("Failed to write output: {e}"))
}
