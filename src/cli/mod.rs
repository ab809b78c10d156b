//! CLI argument parsing for git-dirdiff.
//!
//! Uses clap derive macros for declarative argument definitions. The
//! comparison itself is implemented in the `commands` module.

use clap::{ArgAction, Parser};

/// Stage both sides of a git diff into temporary trees and launch a
/// directory comparison tool on them.
///
/// With no revisions, compares the last commit against the working tree.
/// With one revision, compares that commit against the working tree. With
/// two revisions, compares the two commits.
#[derive(Parser, Debug)]
#[command(name = "git-dirdiff")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Revisions to compare (zero, one, or two, as for `git diff`).
    #[arg(value_name = "REVISION", num_args = 0..=2)]
    pub revisions: Vec<String>,

    /// Limit the comparison to the given pathspecs.
    #[arg(last = true, value_name = "PATH")]
    pub pathspecs: Vec<String>,

    /// Compare the index instead of the working tree.
    #[arg(long)]
    pub cached: bool,

    /// Comparison tool command; {left} and {right} expand to the staging
    /// directories. Overrides the configured tool.
    #[arg(long, value_name = "COMMAND")]
    pub tool: Option<String>,

    /// Do not include untracked files.
    #[arg(long)]
    pub no_untracked: bool,

    /// Keep the staging directories instead of deleting them on exit.
    #[arg(long)]
    pub keep: bool,

    /// Enable verbose diagnostics (repeat for more detail).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
