//! Concurrent change-record collection.
//!
//! Two subprocess producers feed the record set: `git diff --raw` (always)
//! and `git ls-files --others --exclude-standard` (only when untracked
//! files are requested and a working-copy side is in play). Each producer's
//! stdout is drained by its own thread; lines are parsed outside the lock
//! and only the append into the shared collection is serialized. The
//! coordinator blocks until both producers exit, fails fast on a non-zero
//! exit status, and returns the merged set sorted case-insensitively by
//! source path.

use super::record::{DiffRecord, Side};
use crate::error::{DirdiffError, Result};
use crate::git::spawn_producer;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, ChildStdout};
use std::sync::Mutex;
use std::thread;
use tracing::debug;

/// What to compare. Mirrors the common forms of `git diff`.
#[derive(Debug, Clone, Default)]
pub struct DiffSpec {
    /// Zero, one, or two revisions. With fewer than two, the other side is
    /// the working tree (or the index with `cached`).
    pub revisions: Vec<String>,
    /// Compare against the index instead of the working tree.
    pub cached: bool,
    /// Optional pathspecs passed through to git.
    pub pathspecs: Vec<String>,
    /// Include untracked files when a working-copy side is in play.
    pub include_untracked: bool,
}

impl DiffSpec {
    /// Which side the working copy occupies, if any.
    ///
    /// With two revisions there is no live side; with `--cached` the right
    /// side is the index, which has no untracked files either.
    pub fn working_side(&self) -> Option<Side> {
        if self.revisions.len() < 2 && !self.cached {
            Some(Side::Right)
        } else {
            None
        }
    }

    /// Arguments for the tracked-changes producer.
    fn diff_args(&self) -> Vec<&str> {
        let mut args = vec!["diff", "--raw"];
        if self.cached {
            args.push("--cached");
        }
        if self.revisions.is_empty() && !self.cached {
            // Bare `git diff` compares against the index; the tool's
            // default comparison base is the last commit.
            args.push("HEAD");
        }
        args.extend(self.revisions.iter().map(String::as_str));
        if !self.pathspecs.is_empty() {
            args.push("--");
            args.extend(self.pathspecs.iter().map(String::as_str));
        }
        args
    }

    /// Arguments for the untracked-files producer.
    fn untracked_args(&self) -> Vec<&str> {
        let mut args = vec!["ls-files", "--others", "--exclude-standard"];
        if !self.pathspecs.is_empty() {
            args.push("--");
            args.extend(self.pathspecs.iter().map(String::as_str));
        }
        args
    }
}

/// Collect, merge, and sort the change records for `spec`.
///
/// Fails with a format error on the first malformed line (the stream is
/// considered desynchronized) and with a producer-exit error if either
/// subprocess finishes non-zero; no partial record set is returned in
/// either case.
pub fn collect_records(repo_root: &Path, spec: &DiffSpec) -> Result<Vec<DiffRecord>> {
    let records = Mutex::new(Vec::new());

    let mut diff_child = spawn_producer(repo_root, &spec.diff_args())?;
    let diff_out = take_stdout(&mut diff_child)?;

    let untracked_side = spec.working_side().filter(|_| spec.include_untracked);
    let mut untracked_child = match untracked_side {
        Some(_) => Some(spawn_producer(repo_root, &spec.untracked_args())?),
        None => None,
    };
    let untracked_out = match untracked_child.as_mut() {
        Some(child) => Some(take_stdout(child)?),
        None => None,
    };

    let records_ref = &records;
    thread::scope(|scope| {
        let tracked = scope.spawn(move || drain_tracked(diff_out, records_ref));
        let untracked = untracked_out.zip(untracked_side).map(|(out, side)| {
            scope.spawn(move || drain_untracked(out, repo_root, side, records_ref))
        });

        let tracked_result = join(tracked);
        let untracked_result = match untracked {
            Some(handle) => join(handle),
            None => Ok(()),
        };
        tracked_result.and(untracked_result)
    })?;

    check_exit(&mut diff_child, "git diff")?;
    if let Some(mut child) = untracked_child {
        check_exit(&mut child, "git ls-files")?;
    }

    let mut list = std::mem::take(&mut *lock(&records));
    list.sort_by_cached_key(|record| record.src_path.to_lowercase());
    debug!(count = list.len(), "collected change records");
    Ok(list)
}

/// Parse tracked-diff lines and append them to the shared collection.
fn drain_tracked(stdout: ChildStdout, records: &Mutex<Vec<DiffRecord>>) -> Result<()> {
    for line in BufReader::new(stdout).lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        append(records, DiffRecord::parse(&line)?);
    }
    Ok(())
}

/// Wrap untracked-file lines into synthetic records and append them.
fn drain_untracked(
    stdout: ChildStdout,
    repo_root: &Path,
    working_side: Side,
    records: &Mutex<Vec<DiffRecord>>,
) -> Result<()> {
    for line in BufReader::new(stdout).lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let mode = worktree_file_mode(&repo_root.join(&line));
        append(records, DiffRecord::untracked(&line, mode, working_side));
    }
    Ok(())
}

/// Append one record under the lock.
///
/// Unmerged entries whose both hashes are the zero-hash duplicate
/// already-reported modified entries and are discarded here.
fn append(records: &Mutex<Vec<DiffRecord>>, record: DiffRecord) {
    if record.status == 'U' && record.src_hash == "0" && record.dst_hash == "0" {
        debug!(path = %record.src_path, "discarding duplicate unmerged record");
        return;
    }
    lock(records).push(record);
}

fn lock(records: &Mutex<Vec<DiffRecord>>) -> std::sync::MutexGuard<'_, Vec<DiffRecord>> {
    records.lock().unwrap_or_else(|poison| poison.into_inner())
}

fn join(handle: thread::ScopedJoinHandle<'_, Result<()>>) -> Result<()> {
    match handle.join() {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

fn take_stdout(child: &mut Child) -> Result<ChildStdout> {
    child
        .stdout
        .take()
        .ok_or_else(|| DirdiffError::GitError("producer stdout was not captured".to_string()))
}

fn check_exit(child: &mut Child, producer: &'static str) -> Result<()> {
    let status = child.wait()?;
    if status.success() {
        Ok(())
    } else {
        Err(DirdiffError::ProducerExit {
            producer,
            status: status.code().unwrap_or(-1),
        })
    }
}

/// Mode bits git would assign the live file: regular, executable, or
/// symlink. Defaults to a regular file if the path cannot be inspected.
fn worktree_file_mode(path: &Path) -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::symlink_metadata(path) {
            Ok(meta) if meta.file_type().is_symlink() => 0o120000,
            Ok(meta) if meta.permissions().mode() & 0o111 != 0 => 0o100755,
            _ => 0o100644,
        }
    }
    #[cfg(not(unix))]
    {
        let _ = path;
        0o100644
    }
}
