//! Diff command
//!
//! Usage: wfsync diff --baseline <FILE> --proposed <FILE> [--json]

use clap::Args;
use std::path::PathBuf;
use wfsync_core::diff::{create_diff, render_human_summary};

use super::read_state;

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Workflow state the proposal is compared against
    #[arg(long)]
    pub baseline: PathBuf,

    /// Proposed workflow state
    #[arg(long)]
    pub proposed: PathBuf,

    /// Print the analysis as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

/// Returns the process exit code
pub fn execute(args: DiffArgs) -> anyhow::Result<i32> {
    let baseline = read_state(&args.baseline)?;
    let proposed = read_state(&args.proposed)?;

    let diff = create_diff(&proposed, None, Some(&baseline), "cli").into_result()?;
    tracing::debug!(changes = diff.diff_analysis.change_count(), "computed diff");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&diff.diff_analysis)?);
    } else {
        println!("{}", render_human_summary(&diff.diff_analysis, Some(&proposed)));
    }
    Ok(0)
}
