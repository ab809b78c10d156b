//! The comparison flow: collect, stage, launch, clean up.

use crate::cli::Cli;
use crate::config::Config;
use crate::diff::{DiffSpec, Side, collect_records};
use crate::error::{DirdiffError, Result};
use crate::git::get_repo_root;
use crate::launch::launch_tool;
use crate::stage::{StageSummary, Stager};
use std::fs;
use tracing::info;

/// Run one comparison as described by the command line.
pub fn execute(cli: Cli) -> Result<()> {
    let repo_root = get_repo_root(std::env::current_dir()?)?;
    let config = Config::load()?;

    let tool = match cli.tool {
        Some(tool) => tool,
        None if !config.tool.is_empty() => config.tool.clone(),
        None => {
            return Err(DirdiffError::UserError(
                "no comparison tool configured.\n\
                 Set `tool` in the config file or pass --tool 'cmd {left} {right}'."
                    .to_string(),
            ));
        }
    };

    let spec = DiffSpec {
        revisions: cli.revisions,
        cached: cli.cached,
        pathspecs: cli.pathspecs,
        include_untracked: config.untracked && !cli.no_untracked,
    };

    let records = collect_records(&repo_root, &spec)?;
    if records.is_empty() {
        println!("No differences.");
        return Ok(());
    }
    info!(count = records.len(), "staging changed paths");

    let staging = tempfile::Builder::new()
        .prefix("git-dirdiff-")
        .tempdir()?;
    let left_root = staging.path().join("left");
    let right_root = staging.path().join("right");
    fs::create_dir_all(&left_root)?;
    fs::create_dir_all(&right_root)?;

    let mut stager = Stager::new(&repo_root)?;
    let left = stager.stage_side(&records, Side::Left, &left_root)?;
    let right = stager.stage_side(&records, Side::Right, &right_root)?;
    report_failures(&left, &right);

    launch_tool(&tool, &left_root, &right_root)?;

    if cli.keep || config.keep_staging {
        let kept = staging.keep();
        println!("Staging directories kept at {}", kept.display());
    }
    Ok(())
}

/// Summarize non-fatal retrieval failures on stderr after the per-record
/// warnings have already been logged.
fn report_failures(left: &StageSummary, right: &StageSummary) {
    let total = left.failures.len() + right.failures.len();
    if total > 0 {
        eprintln!(
            "warning: {total} path(s) could not be materialized; see log output above"
        );
    }
}
