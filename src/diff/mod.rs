//! Change-record ingestion for git-dirdiff.
//!
//! This module turns the raw output of the diff producers into an ordered
//! record set:
//! - quoted-path decoding with git's C-style escaping (`unquote`)
//! - byte-precise parsing of `git diff --raw` lines (`record`)
//! - concurrent collection from both producers, merged and sorted
//!   (`collect`)
//!
//! Parsing is strict: one malformed line aborts the whole ingestion run,
//! since it means the producer stream is desynchronized.

mod collect;
mod record;
mod unquote;


pub use collect::{DiffSpec, collect_records};
pub use record::{DiffRecord, Side};
pub use unquote::decode_path_token;
