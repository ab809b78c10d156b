//! Git command plumbing for git-dirdiff.
//!
//! Provides a safe wrapper around captured git commands with structured
//! error handling, plus a spawn helper for the long-running producers whose
//! standard output is consumed as a stream rather than captured wholesale.

use crate::error::{DirdiffError, Result};
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};

/// Result of a successful captured git command execution.
#[derive(Debug, Clone)]
pub struct GitOutput {
    /// Standard output from the command (trimmed).
    pub stdout: String,
    /// Standard error from the command (trimmed).
    pub stderr: String,
}

impl GitOutput {
    fn from_output(output: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }

    /// Returns true if stdout is empty.
    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty()
    }
}

/// Run a git command with captured output in the specified directory.
///
/// # Arguments
///
/// * `cwd` - The working directory to run the command in
/// * `args` - The git command arguments (without "git" prefix)
///
/// # Returns
///
/// * `Ok(GitOutput)` - On successful execution (exit code 0)
/// * `Err(DirdiffError::GitError)` - On spawn failure or non-zero exit
pub fn run_git<P: AsRef<Path>>(cwd: P, args: &[&str]) -> Result<GitOutput> {
    let output = Command::new("git")
        .current_dir(cwd.as_ref())
        .args(args)
        .output()
        .map_err(|e| {
            DirdiffError::GitError(format!(
                "failed to execute git {}: {}",
                args.first().unwrap_or(&""),
                e
            ))
        })?;

    let git_output = GitOutput::from_output(&output);

    if output.status.success() {
        Ok(git_output)
    } else {
        let exit_code = output.status.code().unwrap_or(-1);
        let error_msg = if git_output.stderr.is_empty() {
            git_output.stdout.clone()
        } else {
            git_output.stderr.clone()
        };

        Err(DirdiffError::GitError(format!(
            "git {} failed (exit code {}): {}",
            args.first().unwrap_or(&""),
            exit_code,
            error_msg
        )))
    }
}

/// Spawn a git producer whose stdout will be drained as a line stream.
///
/// stdout is piped; stderr is inherited so git's own diagnostics reach the
/// terminal; stdin is closed. The caller owns the child and is responsible
/// for waiting on it and checking its exit status.
pub fn spawn_producer<P: AsRef<Path>>(cwd: P, args: &[&str]) -> Result<Child> {
    Command::new("git")
        .current_dir(cwd.as_ref())
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|e| {
            DirdiffError::GitError(format!(
                "failed to spawn git {}: {}",
                args.first().unwrap_or(&""),
                e
            ))
        })
}

/// Get the repository root directory using `git rev-parse --show-toplevel`.
///
/// Works from any location within a repository, including linked worktrees.
/// "Not inside a git repository" is reported as a clean user error rather
/// than a git failure.
pub fn get_repo_root<P: AsRef<Path>>(cwd: P) -> Result<std::path::PathBuf> {
    let output = Command::new("git")
        .current_dir(cwd.as_ref())
        .args(["rev-parse", "--show-toplevel"])
        .output()
        .map_err(|e| {
            DirdiffError::UserError(format!("failed to execute git: {} (is git installed?)", e))
        })?;

    let git_output = GitOutput::from_output(&output);

    if output.status.success() {
        Ok(std::path::PathBuf::from(&git_output.stdout))
    } else if git_output.stderr.contains("not a git repository") {
        Err(DirdiffError::UserError(
            "not inside a git repository. Run this command from within a git repository."
                .to_string(),
        ))
    } else {
        Err(DirdiffError::GitError(format!(
            "git rev-parse failed: {}",
            if git_output.stderr.is_empty() {
                &git_output.stdout
            } else {
                &git_output.stderr
            }
        )))
    }
}
