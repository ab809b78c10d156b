//! Materialization of the comparison staging trees.
//!
//! Each collected record contributes at most one file per side. The
//! content source per side is decided from the record alone: a mode of `0`
//! means the path did not exist there, a non-`"0"` hash names a blob in
//! the object store, and a `"0"` hash with a live mode means the working
//! tree holds the content. Blob materialization first probes the
//! working-tree file with the content-hash check and copies it directly on
//! a match, avoiding the retrieval round trip.
//!
//! Retrieval failures ("object not found") are per-record outcomes: they
//! are logged, recorded in the summary, and the run continues. Everything
//! else (protocol violations, I/O failures) aborts materialization.

use crate::diff::{DiffRecord, Side};
use crate::error::Result;
use crate::hash;
use crate::objects::{Fetch, ObjectReader};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// One path whose content could not be retrieved.
#[derive(Debug, Clone)]
pub struct StageFailure {
    /// Repository-relative path that could not be materialized.
    pub path: String,
    /// The hash that was requested.
    pub hash: String,
    /// The retrieval engine's error line.
    pub message: String,
}

/// Outcome of staging one side.
#[derive(Debug, Default)]
pub struct StageSummary {
    /// Number of files written.
    pub staged: usize,
    /// Non-fatal retrieval failures, one per affected path.
    pub failures: Vec<StageFailure>,
}

/// Writes one side of the comparison into a target directory.
pub struct Stager<'a> {
    repo_root: &'a Path,
    reader: ObjectReader,
}

impl<'a> Stager<'a> {
    /// Create a stager with its own retrieval channel.
    pub fn new(repo_root: &'a Path) -> Result<Self> {
        Ok(Self {
            repo_root,
            reader: ObjectReader::spawn(repo_root)?,
        })
    }

    /// Materialize `side` of every record under `target_root`.
    pub fn stage_side(
        &mut self,
        records: &[DiffRecord],
        side: Side,
        target_root: &Path,
    ) -> Result<StageSummary> {
        let mut summary = StageSummary::default();
        for record in records {
            let (mode, hash, rel_path) = record.side(side);
            if mode == 0 {
                continue;
            }
            let target = target_root.join(rel_path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            if hash == "0" {
                self.stage_worktree_file(rel_path, &target, &mut summary);
            } else {
                self.stage_blob(hash, rel_path, &target, &mut summary)?;
            }
        }
        Ok(summary)
    }

    /// Materialize a blob, preferring a matching working-tree file over an
    /// object-store fetch.
    fn stage_blob(
        &mut self,
        hash: &str,
        rel_path: &str,
        target: &Path,
        summary: &mut StageSummary,
    ) -> Result<()> {
        let live = self.repo_root.join(rel_path);
        if hash::matches_blob(&live, hash)? {
            debug!(path = rel_path, "working tree matches blob, copying directly");
            fs::copy(&live, target)?;
            set_readonly(target)?;
            summary.staged += 1;
            return Ok(());
        }

        match self.reader.fetch(hash)? {
            Fetch::Content(bytes) => {
                fs::write(target, bytes)?;
                set_readonly(target)?;
                summary.staged += 1;
            }
            Fetch::Missing(message) => {
                warn!(path = rel_path, hash, %message, "object retrieval failed");
                summary.failures.push(StageFailure {
                    path: rel_path.to_string(),
                    hash: hash.to_string(),
                    message,
                });
            }
        }
        Ok(())
    }

    /// Copy the live working-tree file. A file that vanished between the
    /// diff listing and now is recorded as a failure, not an abort.
    fn stage_worktree_file(&self, rel_path: &str, target: &Path, summary: &mut StageSummary) {
        let live = self.repo_root.join(rel_path);
        match fs::copy(&live, target) {
            Ok(_) => summary.staged += 1,
            Err(e) => {
                warn!(path = rel_path, error = %e, "working-tree file could not be staged");
                summary.failures.push(StageFailure {
                    path: rel_path.to_string(),
                    hash: "0".to_string(),
                    message: e.to_string(),
                });
            }
        }
    }
}

/// Staged blob copies are historical content; make them read-only so the
/// comparison tool cannot silently edit the wrong side.
fn set_readonly(path: &Path) -> std::io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(true);
    fs::set_permissions(path, perms)
}
