//! Command implementations for git-dirdiff.

pub mod compare;

use crate::cli::Cli;
use crate::error::Result;

/// Dispatch the parsed command line to its implementation.
pub fn dispatch(cli: Cli) -> Result<()> {
    compare::execute(cli)
}
