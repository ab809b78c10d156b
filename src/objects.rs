//! Client for git's batch object-retrieval protocol.
//!
//! A single long-lived `git cat-file --batch=Z%(objectsize)` child serves
//! all object fetches for a run. Each request writes one hash plus newline
//! to the child's stdin; the response is either
//!
//! ```text
//! Z<decimal size>\n<raw bytes>\n
//! ```
//!
//! or, for an unknown hash, a single line whose first byte is not `Z`
//! (git prints `<hash> missing`). The protocol is not multiplexed, so the
//! reader takes `&mut self` and callers are serialized by construction.

use crate::error::{DirdiffError, Result};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

/// Outcome of a single object fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetch {
    /// The raw object bytes.
    Content(Vec<u8>),
    /// The retrieval engine's error line for this hash (e.g. "missing").
    /// Non-fatal: the caller records it and continues with other records.
    Missing(String),
}

/// Handle on the persistent retrieval subprocess.
pub struct ObjectReader {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl ObjectReader {
    /// Spawn the retrieval subprocess for the given repository.
    pub fn spawn(repo_root: &Path) -> Result<Self> {
        let mut child = Command::new("git")
            .current_dir(repo_root)
            .args(["cat-file", "--batch=Z%(objectsize)"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| DirdiffError::GitError(format!("failed to spawn git cat-file: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DirdiffError::GitError("cat-file stdin was not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .map(BufReader::new)
            .ok_or_else(|| DirdiffError::GitError("cat-file stdout was not captured".to_string()))?;

        Ok(Self {
            child,
            stdin,
            stdout,
        })
    }

    /// Fetch the raw bytes of one object by hash.
    ///
    /// Protocol violations (stream closed, short payload, garbled size
    /// prefix, missing terminator) are fatal; an explicit "not found" from
    /// the engine is returned as [`Fetch::Missing`].
    pub fn fetch(&mut self, hash: &str) -> Result<Fetch> {
        writeln!(self.stdin, "{hash}")?;
        self.stdin.flush()?;

        let mut header = Vec::new();
        let read = self.stdout.read_until(b'\n', &mut header)?;
        if read == 0 {
            return Err(DirdiffError::ProtocolError(format!(
                "object stream closed before response for {hash}"
            )));
        }
        if header.last() == Some(&b'\n') {
            header.pop();
        }

        if header.first() != Some(&b'Z') {
            return Ok(Fetch::Missing(
                String::from_utf8_lossy(&header).into_owned(),
            ));
        }

        let size = parse_size(&header[1..], hash)?;
        let mut payload = vec![0u8; size];
        self.stdout.read_exact(&mut payload).map_err(|e| {
            DirdiffError::ProtocolError(format!(
                "object stream ended before {size} declared bytes for {hash}: {e}"
            ))
        })?;

        let mut terminator = [0u8; 1];
        self.stdout.read_exact(&mut terminator).map_err(|e| {
            DirdiffError::ProtocolError(format!(
                "object stream ended before payload terminator for {hash}: {e}"
            ))
        })?;
        if terminator[0] != b'\n' {
            return Err(DirdiffError::ProtocolError(format!(
                "expected newline after payload for {hash}, found byte 0x{:02X}",
                terminator[0]
            )));
        }

        Ok(Fetch::Content(payload))
    }
}

impl Drop for ObjectReader {
    fn drop(&mut self) {
        // On Unix this is SIGKILL; on Windows it is TerminateProcess. The
        // child holds no state worth flushing.
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Parse the decimal byte count following the `Z` discriminator.
fn parse_size(digits: &[u8], hash: &str) -> Result<usize> {
    if digits.is_empty() {
        return Err(DirdiffError::ProtocolError(format!(
            "empty size prefix in response for {hash}"
        )));
    }
    let mut size: usize = 0;
    for &digit in digits {
        if !digit.is_ascii_digit() {
            return Err(DirdiffError::ProtocolError(format!(
                "malformed size prefix in response for {hash}"
            )));
        }
        size = size
            .checked_mul(10)
            .and_then(|s| s.checked_add(usize::from(digit - b'0')))
            .ok_or_else(|| {
                DirdiffError::ProtocolError(format!(
                    "size prefix overflows in response for {hash}"
                ))
            })?;
    }
    Ok(size)
}
