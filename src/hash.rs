//! Blob content hashing for the skip-if-unchanged check.
//!
//! Git identifies a blob by the SHA-1 of `"blob " + <decimal length> +
//! NUL + <content>`. Computing that hash over a working-tree file lets the
//! stager prove the file is identical to a referenced blob and skip the
//! object-store round trip. Files are streamed in fixed-size chunks so
//! memory stays bounded regardless of file size.

use crate::error::Result;
use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

const CHUNK_SIZE: usize = 64 * 1024;

/// Check whether the file's blob hash matches `reference`.
///
/// The reference may be abbreviated: only as many hex characters as it
/// supplies are compared. Returns `false` if the file does not exist or if
/// its length drifts from the promised length while streaming.
pub fn matches_blob(path: &Path, reference: &str) -> Result<bool> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    let promised = file.metadata()?.len();

    let mut hasher = Sha1::new();
    hasher.update(b"blob ");
    hasher.update(promised.to_string().as_bytes());
    hasher.update([0u8]);

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut seen: u64 = 0;
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        seen += read as u64;
        if seen > promised {
            return Ok(false);
        }
        hasher.update(&buf[..read]);
    }
    if seen != promised {
        return Ok(false);
    }

    let computed = hex::encode(hasher.finalize());
    Ok(prefix_matches(&computed, reference))
}

/// Compare `computed` against a possibly-abbreviated `reference`.
///
/// Only `min(len(reference), len(computed))` characters are compared; a
/// reference longer than the computed text matches on the computed prefix.
/// The surrounding tool controls which abbreviations it presents, so this
/// is an abbreviation convenience, not a security boundary.
pub fn prefix_matches(computed: &str, reference: &str) -> bool {
    let len = computed.len().min(reference.len());
    computed.as_bytes()[..len] == reference.as_bytes()[..len]
}
