//! Validate command
//!
//! Usage: wfsync validate --state <FILE>

use clap::Args;
use std::path::PathBuf;
use wfsync_core::rules::validate_and_sanitize;
use wfsync_core::snapshot::round_trip_check;

use super::read_state;

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Workflow state to check
    #[arg(long)]
    pub state: PathBuf,
}

/// Exit code 1 when the state is invalid
pub fn execute(args: ValidateArgs) -> anyhow::Result<i32> {
    let state = read_state(&args.state)?;
    let mut valid = true;

    if let Err(e) = round_trip_check(&state) {
        println!("error: round trip failed: {}", e);
        valid = false;
    }

    let report = validate_and_sanitize(&state);
    for error in &report.errors {
        println!("error: {}", error);
    }
    for warning in &report.warnings {
        println!("warning: {}", warning);
    }
    valid &= report.is_valid();

    if valid {
        println!("✓ {} is valid", args.state.display());
        Ok(0)
    } else {
        Ok(1)
    }
}
