//! Javaflow CLI entry point.

use clap::Parser;
use javaflow::cli::{self, Cli, Commands, EXIT_ERROR};
use tracing_subscriber::EnvFilter;

fn main() {
    // Diagnostics go to stderr so JSON and DOT on stdout stay clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Cfg(args) => cli::run_cfg(args),
        Commands::Structure(args) => cli::run_structure(args),
        Commands::Relations(args) => cli::run_relations(args),
        Commands::Outline(args) => cli::run_outline(args),
        Commands::Init(args) => cli::run_init(args),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
