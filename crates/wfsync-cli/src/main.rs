//! wfsync CLI
//!
//! Offline diffing and validation of workflow JSON files

use clap::{Parser, Subcommand};
use wfsync_core::logging_facility::{init, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "wfsync")]
#[command(about = "wfsync - Workflow diff and validation", long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Diff a proposed workflow against a baseline
    Diff(commands::diff::DiffArgs),
    /// Round-trip and sanitize a workflow
    Validate(commands::validate::ValidateArgs),
}

fn main() {
    let cli = Cli::parse();
    if cli.verbose {
        init(Profile::Development);
    }

    let result = match cli.command {
        Commands::Diff(args) => commands::diff::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    }
}
