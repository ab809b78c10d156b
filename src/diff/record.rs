//! Raw change-record parsing.
//!
//! One line of `git diff --raw` output describes the before/after state of
//! a single path:
//!
//! ```text
//! :<octal srcMode> <octal dstMode> <srcHash> <dstHash> <status><score>?\t<path>[\t<path>]
//! ```
//!
//! Parsing is strict left-to-right with no backtracking: every step either
//! consumes the token it expects or fails with the byte offset of the
//! violation. A malformed line means the producer stream is desynchronized,
//! so parse errors are fatal to the whole ingestion run.

use super::unquote::decode_path_token;
use crate::error::{DirdiffError, Result};
use std::borrow::Cow;

/// Which side of the comparison the working copy occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The older/source side.
    Left,
    /// The newer/destination side.
    Right,
}

/// One changed-path entry, immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRecord {
    /// File mode on the source side; `0` means the path did not exist there.
    pub src_mode: u32,
    /// File mode on the destination side; `0` means the path did not exist there.
    pub dst_mode: u32,
    /// Content hash on the source side; the literal `"0"` means no content.
    pub src_hash: String,
    /// Content hash on the destination side; the literal `"0"` means no content.
    pub dst_hash: String,
    /// Single-character status (added, deleted, modified, renamed, ...).
    /// The alphabet is producer-defined and not validated beyond presence.
    pub status: char,
    /// Similarity/confidence score; `0` when the producer omitted it.
    pub score: u32,
    /// Decoded source path, host separators applied. Never empty.
    pub src_path: String,
    /// Decoded destination path; equals `src_path` when the record
    /// represents no rename.
    pub dst_path: String,
}

impl DiffRecord {
    /// Parse one raw diff line into a record.
    pub fn parse(line: &str) -> Result<Self> {
        let mut cursor = Cursor::new(line);

        cursor.expect(b':', "expected ':' at start of record")?;
        let src_mode = cursor.octal()?;
        cursor.expect(b' ', "expected space after source mode")?;
        let dst_mode = cursor.octal()?;
        cursor.expect(b' ', "expected space after destination mode")?;
        let src_hash = cursor.hash()?;
        cursor.expect(b' ', "expected space after source hash")?;
        let dst_hash = cursor.hash()?;
        cursor.expect(b' ', "expected space after destination hash")?;
        let status = cursor.status()?;
        let score = cursor.optional_decimal()?;
        cursor.expect(b'\t', "expected tab before path")?;

        let (raw_src, after_src) = decode_path_token(line, cursor.pos)?;
        if raw_src.is_empty() {
            return Err(cursor.error_at(cursor.pos, "empty source path"));
        }
        let src_path = host_separators(raw_src);
        cursor.pos = after_src;

        let dst_path = if cursor.at_end() {
            src_path.clone()
        } else {
            cursor.expect(b'\t', "expected tab before destination path")?;
            let (raw_dst, after_dst) = decode_path_token(line, cursor.pos)?;
            if raw_dst.is_empty() {
                return Err(cursor.error_at(cursor.pos, "empty destination path"));
            }
            cursor.pos = after_dst;
            if !cursor.at_end() {
                return Err(cursor.error_at(cursor.pos, "unexpected trailing field"));
            }
            host_separators(raw_dst)
        };

        Ok(Self {
            src_mode,
            dst_mode,
            src_hash,
            dst_hash,
            status,
            score,
            src_path,
            dst_path,
        })
    }

    /// Synthesize a record for an untracked path with no engine metadata.
    ///
    /// The working copy occupies `working_side`: the file mode lands on
    /// that side (with status `A` for the right, `D` for the left) and the
    /// other side gets mode `0`. Both hashes are `"0"` and both paths equal
    /// the given name.
    pub fn untracked(name: &str, file_mode: u32, working_side: Side) -> Self {
        let path = host_separators(Cow::Borrowed(name));
        let (src_mode, dst_mode, status) = match working_side {
            Side::Left => (file_mode, 0, 'D'),
            Side::Right => (0, file_mode, 'A'),
        };
        Self {
            src_mode,
            dst_mode,
            src_hash: "0".to_string(),
            dst_hash: "0".to_string(),
            status,
            score: 0,
            src_path: path.clone(),
            dst_path: path,
        }
    }

    /// Mode and hash for the given side of this record.
    pub fn side(&self, side: Side) -> (u32, &str, &str) {
        match side {
            Side::Left => (self.src_mode, &self.src_hash, &self.src_path),
            Side::Right => (self.dst_mode, &self.dst_hash, &self.dst_path),
        }
    }
}

/// Replace forward slashes with the host path separator.
fn host_separators(path: Cow<'_, str>) -> String {
    if cfg!(windows) {
        path.replace('/', "\\")
    } else {
        path.into_owned()
    }
}

/// Byte cursor over one source line. Every decode step advances it or
/// fails with the offset of the unexpected byte.
struct Cursor<'a> {
    line: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(line: &'a str) -> Self {
        Self { line, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.line.len()
    }

    fn peek(&self) -> Option<u8> {
        self.line.as_bytes().get(self.pos).copied()
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> DirdiffError {
        DirdiffError::FormatError {
            offset,
            message: message.into(),
        }
    }

    fn expect(&mut self, byte: u8, message: &str) -> Result<()> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error_at(self.pos, message))
        }
    }

    /// Read a non-empty run of octal digits with checked accumulation.
    fn octal(&mut self) -> Result<u32> {
        let start = self.pos;
        let mut value: u32 = 0;
        while let Some(digit @ b'0'..=b'7') = self.peek() {
            value = value
                .checked_mul(8)
                .and_then(|v| v.checked_add(u32::from(digit - b'0')))
                .ok_or_else(|| self.error_at(start, "octal value overflows"))?;
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error_at(start, "expected octal digit"));
        }
        Ok(value)
    }

    /// Read an optional run of decimal digits; absent means zero.
    fn optional_decimal(&mut self) -> Result<u32> {
        let start = self.pos;
        let mut value: u32 = 0;
        while let Some(digit @ b'0'..=b'9') = self.peek() {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u32::from(digit - b'0')))
                .ok_or_else(|| self.error_at(start, "score value overflows"))?;
            self.pos += 1;
        }
        Ok(value)
    }

    /// Read a non-empty hex run followed by an optional `.` filler run.
    ///
    /// A run consisting entirely of `0` digits collapses to the literal
    /// `"0"` (no content); the `.` run is an abbreviation marker and is
    /// consumed without appearing in the result.
    fn hash(&mut self) -> Result<String> {
        let start = self.pos;
        let mut all_zero = true;
        while let Some(byte) = self.peek() {
            if !byte.is_ascii_hexdigit() {
                break;
            }
            all_zero &= byte == b'0';
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error_at(start, "expected hex digit"));
        }
        let text = if all_zero {
            "0".to_string()
        } else {
            self.line[start..self.pos].to_string()
        };
        while self.peek() == Some(b'.') {
            self.pos += 1;
        }
        Ok(text)
    }

    /// Read exactly one status character.
    fn status(&mut self) -> Result<char> {
        match self.line[self.pos..].chars().next() {
            Some(ch) => {
                self.pos += ch.len_utf8();
                Ok(ch)
            }
            None => Err(self.error_at(self.pos, "expected status character")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOB: &str = "89abcdef89abcdef89abcdef89abcdef89abcdef";
    const ZERO: &str = "0000000000000000000000000000000000000000";

    #[test]
    fn parses_modified_record() {
        let line = format!(":100644 100644 {BLOB} {BLOB} M\tsrc/lib.rs");
        let record = DiffRecord::parse(&line).unwrap();
        assert_eq!(record.src_mode, 0o100644);
        assert_eq!(record.dst_mode, 0o100644);
        assert_eq!(record.src_hash, BLOB);
        assert_eq!(record.dst_hash, BLOB);
        assert_eq!(record.status, 'M');
        assert_eq!(record.score, 0);
        assert_eq!(record.src_path, "src/lib.rs");
        assert_eq!(record.dst_path, "src/lib.rs");
    }

    #[test]
    fn parses_rename_with_score() {
        let line = format!(":100644 100644 {BLOB} {BLOB} R95\told.rs\tnew.rs");
        let record = DiffRecord::parse(&line).unwrap();
        assert_eq!(record.status, 'R');
        assert_eq!(record.score, 95);
        assert_eq!(record.src_path, "old.rs");
        assert_eq!(record.dst_path, "new.rs");
    }

    #[test]
    fn single_path_aliases_destination() {
        let line = format!(":100644 000000 {BLOB} {ZERO} D\tgone.txt");
        let record = DiffRecord::parse(&line).unwrap();
        assert_eq!(record.src_path, record.dst_path);
        assert_eq!(record.dst_mode, 0);
    }

    #[test]
    fn all_zero_hash_collapses() {
        let line = format!(":000000 100644 {ZERO} {BLOB} A\tnew.txt");
        let record = DiffRecord::parse(&line).unwrap();
        assert_eq!(record.src_hash, "0");
        assert_eq!(record.dst_hash, BLOB);
    }

    #[test]
    fn abbreviated_hash_filler_is_stripped() {
        let line = ":100644 100644 89abcde............ 1234567............ M\ta.txt";
        let record = DiffRecord::parse(line).unwrap();
        assert_eq!(record.src_hash, "89abcde");
        assert_eq!(record.dst_hash, "1234567");
    }

    #[test]
    fn short_all_zero_hash_still_collapses() {
        let line = ":100644 100644 0000000...... 1234567...... M\ta.txt";
        let record = DiffRecord::parse(line).unwrap();
        assert_eq!(record.src_hash, "0");
    }

    #[test]
    fn quoted_path_with_escaped_quote() {
        let line = format!(":100644 100644 {ZERO} {BLOB} M\t\"a\\\"b.txt\"");
        let record = DiffRecord::parse(&line).unwrap();
        assert_eq!(record.src_hash, "0");
        assert_eq!(record.status, 'M');
        assert_eq!(record.src_path, "a\"b.txt");
        assert_eq!(record.dst_path, "a\"b.txt");
    }

    #[test]
    fn missing_leading_colon_fails_at_offset_zero() {
        let line = format!("100644 100644 {BLOB} {BLOB} M\ta.txt");
        let err = DiffRecord::parse(&line).unwrap_err();
        assert!(matches!(err, DirdiffError::FormatError { offset: 0, .. }));
    }

    #[test]
    fn non_octal_mode_fails() {
        let line = format!(":10x644 100644 {BLOB} {BLOB} M\ta.txt");
        let err = DiffRecord::parse(&line).unwrap_err();
        assert!(matches!(err, DirdiffError::FormatError { .. }));
    }

    #[test]
    fn mode_overflow_is_rejected() {
        let line = format!(":77777777777777777777 100644 {BLOB} {BLOB} M\ta.txt");
        let err = DiffRecord::parse(&line).unwrap_err();
        assert!(err.to_string().contains("overflow"));
    }

    #[test]
    fn empty_hash_run_fails() {
        let line = ":100644 100644  89abcde M\ta.txt";
        let err = DiffRecord::parse(line).unwrap_err();
        assert!(err.to_string().contains("expected hex digit"));
    }

    #[test]
    fn missing_tab_before_path_fails() {
        let line = format!(":100644 100644 {BLOB} {BLOB} M a.txt");
        let err = DiffRecord::parse(&line).unwrap_err();
        assert!(err.to_string().contains("expected tab"));
    }

    #[test]
    fn missing_status_fails() {
        let line = format!(":100644 100644 {BLOB} {BLOB} ");
        let err = DiffRecord::parse(&line).unwrap_err();
        assert!(err.to_string().contains("status"));
    }

    #[test]
    fn trailing_field_after_destination_fails() {
        let line = format!(":100644 100644 {BLOB} {BLOB} R90\ta.txt\tb.txt\tc.txt");
        let err = DiffRecord::parse(&line).unwrap_err();
        assert!(err.to_string().contains("trailing"));
    }

    #[test]
    fn octal_mode_round_trips_via_accumulation() {
        for mode in [0o100644u32, 0o100755, 0o120000, 0o040000, 0] {
            let line = format!(":{mode:o} 100644 {BLOB} {BLOB} M\ta.txt");
            let record = DiffRecord::parse(&line).unwrap();
            assert_eq!(record.src_mode, mode);
        }
    }

    #[test]
    fn untracked_right_side() {
        let record = DiffRecord::untracked("newfile.txt", 0o100644, Side::Right);
        assert_eq!(record.src_mode, 0);
        assert_eq!(record.dst_mode, 0o100644);
        assert_eq!(record.src_hash, "0");
        assert_eq!(record.dst_hash, "0");
        assert_eq!(record.status, 'A');
        assert_eq!(record.score, 0);
        assert_eq!(record.src_path, "newfile.txt");
        assert_eq!(record.dst_path, "newfile.txt");
    }

    #[test]
    fn untracked_left_side() {
        let record = DiffRecord::untracked("gone.txt", 0o100644, Side::Left);
        assert_eq!(record.src_mode, 0o100644);
        assert_eq!(record.dst_mode, 0);
        assert_eq!(record.status, 'D');
    }

    #[test]
    fn side_accessor_selects_fields() {
        let line = format!(":100644 100755 {ZERO} {BLOB} M\ta.txt");
        let record = DiffRecord::parse(&line).unwrap();
        let (mode, hash, path) = record.side(Side::Left);
        assert_eq!((mode, hash, path), (0o100644, "0", "a.txt"));
        let (mode, hash, path) = record.side(Side::Right);
        assert_eq!((mode, hash, path), (0o100755, BLOB, "a.txt"));
    }
}
