//! memlens CLI - inspect engine values in captured memory snapshots
//!
//! # Commands
//!
//! - `memlens show` - Render a snapshot variable as the debugger would display it
//! - `memlens variables` - List the variables a snapshot captures
//! - `memlens patterns` - List the type patterns and the provider bound to each
//!
//! # Usage
//!
//! ```bash
//! # Expand two levels below the variable (the configured default)
//! memlens show capture.json names
//!
//! # Machine-readable output, deeper expansion
//! memlens show capture.json names --depth 4 --json
//! ```
//!
//! Limits and the default depth come from `config.toml` in the platform
//! config directory, or from the file passed with `--config`.

mod patterns;
mod show;
mod variables;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// memlens - debugger-style views of engine containers, strings and variants
#[derive(Parser)]
#[command(name = "memlens")]
#[command(about = "Inspect engine values in captured memory snapshots")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a snapshot variable as a display tree
    Show(show::ShowArgs),

    /// List the variables a snapshot captures
    Variables(variables::VariablesArgs),

    /// List registered type patterns in lookup order
    Patterns,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Show(args) => show::execute(args),
        Commands::Variables(args) => variables::execute(args),
        Commands::Patterns => patterns::execute(),
    }
}
