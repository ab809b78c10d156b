//! Quoted-path decoding for raw diff output.
//!
//! Git C-quotes paths containing specials or non-ASCII bytes: the token is
//! wrapped in double quotes and bytes are escaped with backslashes, with
//! non-ASCII bytes rendered as `\ooo` octal escapes of the raw UTF-8
//! encoding. This module decodes one such token in place, stopping at an
//! unescaped tab or end of input.
//!
//! When the token contains no quote or backslash the decoder returns a
//! borrowed slice of the input line; it only allocates once an escape or
//! quote forces a transformed copy.

use crate::error::{DirdiffError, Result};
use std::borrow::Cow;

/// Decode a possibly-quoted path token starting at `start`.
///
/// Returns the decoded text and the offset of the byte that ended the token
/// (either a tab or the end of the line).
///
/// Quote characters are elided from the output. Backslash escapes follow
/// git's C-quoting alphabet (`\a \b \t \n \v \f \r \" \\`), and a backslash
/// followed by an octal digit `0`-`3` begins a `\ooo` run encoding one
/// UTF-8 sequence of one to four bytes, which is reassembled into a single
/// code point.
pub fn decode_path_token(line: &str, start: usize) -> Result<(Cow<'_, str>, usize)> {
    let bytes = line.as_bytes();
    let mut pos = start;
    // Stays None for the common unescaped case; the first quote or
    // backslash switches to an owned buffer seeded with everything so far.
    let mut transformed: Option<String> = None;

    while pos < bytes.len() && bytes[pos] != b'\t' {
        match bytes[pos] {
            b'"' => {
                transformed.get_or_insert_with(|| line[start..pos].to_string());
                pos += 1;
            }
            b'\\' => {
                let out = transformed.get_or_insert_with(|| line[start..pos].to_string());
                pos = decode_escape(line, pos, out)?;
            }
            _ => {
                let run_start = pos;
                while pos < bytes.len() && !matches!(bytes[pos], b'\t' | b'"' | b'\\') {
                    pos += 1;
                }
                if let Some(out) = transformed.as_mut() {
                    out.push_str(&line[run_start..pos]);
                }
            }
        }
    }

    let decoded = match transformed {
        Some(owned) => Cow::Owned(owned),
        None => Cow::Borrowed(&line[start..pos]),
    };
    Ok((decoded, pos))
}

/// Decode one backslash escape starting at `backslash`, appending the
/// decoded text to `out`. Returns the offset just past the escape.
fn decode_escape(line: &str, backslash: usize, out: &mut String) -> Result<usize> {
    let Some(&code) = line.as_bytes().get(backslash + 1) else {
        return Err(format_error(backslash, "unterminated backslash escape"));
    };
    let simple = match code {
        b'\\' => Some('\\'),
        b'"' => Some('"'),
        b'a' => Some('\x07'),
        b'b' => Some('\x08'),
        b't' => Some('\t'),
        b'n' => Some('\n'),
        b'v' => Some('\x0B'),
        b'f' => Some('\x0C'),
        b'r' => Some('\r'),
        _ => None,
    };
    if let Some(ch) = simple {
        out.push(ch);
        return Ok(backslash + 2);
    }
    if matches!(code, b'0'..=b'3') {
        return decode_octal_sequence(line, backslash, out);
    }
    Err(format_error(
        backslash + 1,
        format!("unknown escape '\\{}'", char::from(code)),
    ))
}

/// Decode a run of `\ooo` escapes encoding one UTF-8 sequence.
///
/// The leading byte's high bits determine how many continuation escapes
/// follow (0xxxxxxx: none, 110xxxxx: one, 1110xxxx: two, 11110xxx: three).
/// Continuation bytes must lie in 0x80-0xBF. The reassembled code point is
/// appended as a single `char`.
fn decode_octal_sequence(line: &str, backslash: usize, out: &mut String) -> Result<usize> {
    let lead = octal_byte(line, backslash)?;
    let mut pos = backslash + 4;

    let (continuations, mut code_point) = match lead {
        0x00..=0x7F => (0usize, u32::from(lead)),
        0xC0..=0xDF => (1, u32::from(lead & 0x1F)),
        0xE0..=0xEF => (2, u32::from(lead & 0x0F)),
        0xF0..=0xF7 => (3, u32::from(lead & 0x07)),
        // 0x80-0xBF are continuation bytes, 0xF8-0xFF are not valid UTF-8
        // leading bytes at all.
        _ => {
            return Err(format_error(
                backslash,
                format!("invalid leading byte 0x{lead:02X} in octal escape"),
            ));
        }
    };

    for _ in 0..continuations {
        if line.as_bytes().get(pos) != Some(&b'\\') {
            return Err(format_error(pos, "truncated multi-byte octal escape"));
        }
        let cont = octal_byte(line, pos)?;
        if !(0x80..=0xBF).contains(&cont) {
            return Err(format_error(
                pos,
                format!("invalid continuation byte 0x{cont:02X} in octal escape"),
            ));
        }
        code_point = (code_point << 6) | u32::from(cont & 0x3F);
        pos += 4;
    }

    let ch = char::from_u32(code_point).ok_or_else(|| {
        format_error(
            backslash,
            format!("octal escape decodes to invalid code point U+{code_point:X}"),
        )
    })?;
    out.push(ch);
    Ok(pos)
}

/// Parse the three octal digits of a `\ooo` escape into a byte.
fn octal_byte(line: &str, backslash: usize) -> Result<u8> {
    let bytes = line.as_bytes();
    let mut value: u32 = 0;
    for i in 1..=3 {
        match bytes.get(backslash + i) {
            Some(digit @ b'0'..=b'7') => value = value * 8 + u32::from(digit - b'0'),
            _ => return Err(format_error(backslash + i, "expected octal digit")),
        }
    }
    u8::try_from(value)
        .map_err(|_| format_error(backslash, format!("octal escape \\{value:o} exceeds one byte")))
}

fn format_error(offset: usize, message: impl Into<String>) -> DirdiffError {
    DirdiffError::FormatError {
        offset,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(line: &str) -> (String, usize) {
        let (text, end) = decode_path_token(line, 0).unwrap();
        (text.into_owned(), end)
    }

    #[test]
    fn plain_token_is_borrowed() {
        let line = "src/main.rs\trest";
        let (text, end) = decode_path_token(line, 0).unwrap();
        assert!(matches!(text, Cow::Borrowed(_)));
        assert_eq!(text, "src/main.rs");
        assert_eq!(end, 11);
    }

    #[test]
    fn plain_token_without_tab_runs_to_end() {
        let (text, end) = decode("src/lib.rs");
        assert_eq!(text, "src/lib.rs");
        assert_eq!(end, 10);
    }

    #[test]
    fn start_offset_is_honored() {
        let line = "skip\tsrc/lib.rs";
        let (text, end) = decode_path_token(line, 5).unwrap();
        assert_eq!(text, "src/lib.rs");
        assert_eq!(end, line.len());
    }

    #[test]
    fn quotes_are_elided_and_force_owned() {
        let line = "\"a b.txt\"";
        let (text, _) = decode_path_token(line, 0).unwrap();
        assert!(matches!(text, Cow::Owned(_)));
        assert_eq!(text, "a b.txt");
    }

    #[test]
    fn simple_escapes_decode() {
        let (text, _) = decode(r#""a\tb\nc\rd\\e\"f""#);
        assert_eq!(text, "a\tb\nc\rd\\e\"f");
    }

    #[test]
    fn escaped_tab_does_not_terminate_token() {
        let line = "\"a\\tb\"\tnext";
        let (text, end) = decode_path_token(line, 0).unwrap();
        assert_eq!(text, "a\tb");
        assert_eq!(line.as_bytes()[end], b'\t');
    }

    #[test]
    fn single_byte_octal_escape() {
        // \040 is a space.
        let (text, _) = decode(r#""a\040b""#);
        assert_eq!(text, "a b");
    }

    #[test]
    fn two_byte_octal_sequence() {
        // U+00E9 (e-acute) is 0xC3 0xA9 in UTF-8: \303\251.
        let (text, _) = decode(r#""caf\303\251.txt""#);
        assert_eq!(text, "café.txt");
    }

    #[test]
    fn three_byte_octal_sequence() {
        // U+65E5 (日) is 0xE6 0x97 0xA5: \346\227\245.
        let (text, _) = decode(r#""\346\227\245.md""#);
        assert_eq!(text, "日.md");
    }

    #[test]
    fn four_byte_octal_sequence_above_bmp() {
        // U+1F600 (😀) is 0xF0 0x9F 0x98 0x80: \360\237\230\200.
        let (text, _) = decode(r#""\360\237\230\200""#);
        assert_eq!(text, "😀");
        let code_point = text.chars().next().unwrap() as u32;
        assert!(code_point > 0xFFFF);
    }

    #[test]
    fn unterminated_backslash_fails() {
        let err = decode_path_token("abc\\", 0).unwrap_err();
        assert!(matches!(
            err,
            DirdiffError::FormatError { offset: 3, .. }
        ));
    }

    #[test]
    fn unknown_escape_fails() {
        let err = decode_path_token(r"a\qb", 0).unwrap_err();
        assert!(matches!(err, DirdiffError::FormatError { .. }));
    }

    #[test]
    fn continuation_byte_as_lead_fails() {
        // \251 alone is 0xA9, a continuation byte with no lead.
        let err = decode_path_token(r"\251", 0).unwrap_err();
        assert!(err.to_string().contains("invalid leading byte"));
    }

    #[test]
    fn bad_continuation_byte_fails() {
        // Lead declares two bytes but the continuation is ASCII 'a' (\141).
        let err = decode_path_token(r"\303\141", 0).unwrap_err();
        assert!(err.to_string().contains("invalid continuation byte"));
    }

    #[test]
    fn truncated_multi_byte_sequence_fails() {
        let err = decode_path_token(r"\303", 0).unwrap_err();
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn octal_escape_out_of_range_fails() {
        // First escape parses as 0o3, then 77 is plain text; \477 would
        // exceed a byte but its first digit 4 is not in 0-3, so the escape
        // is rejected as unknown.
        let err = decode_path_token(r"\477", 0).unwrap_err();
        assert!(matches!(err, DirdiffError::FormatError { .. }));
    }

    #[test]
    fn missing_octal_digits_fail() {
        let err = decode_path_token(r"\30", 0).unwrap_err();
        assert!(err.to_string().contains("expected octal digit"));
    }

    #[test]
    fn round_trip_of_escaped_specials() {
        // Encode-then-decode round trip for a path with every special.
        let original = "dir/a \"b\"\\c\té.txt";
        let mut encoded = String::from("\"");
        for byte in original.bytes() {
            match byte {
                b'"' => encoded.push_str("\\\""),
                b'\\' => encoded.push_str("\\\\"),
                b'\t' => encoded.push_str("\\t"),
                0x20..=0x7E => encoded.push(char::from(byte)),
                _ => encoded.push_str(&format!("\\{byte:03o}")),
            }
        }
        encoded.push('"');

        let (decoded, _) = decode_path_token(&encoded, 0).unwrap();
        assert_eq!(decoded, original);
    }
}
