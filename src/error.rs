//! Error types for the git-dirdiff CLI.
//!
//! Uses thiserror for derive macros. The variants mirror the failure
//! taxonomy of the ingestion pipeline: format and protocol violations are
//! always fatal to the run, while a per-object retrieval failure is *not*
//! represented here at all: it is a value (`objects::Fetch::Missing`)
//! surfaced in the staging summary so it cannot abort anything.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for git-dirdiff operations.
#[derive(Error, Debug)]
pub enum DirdiffError {
    /// User provided invalid arguments or the environment is unusable.
    #[error("{0}")]
    UserError(String),

    /// The configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A change record or quoted path failed to parse. The offset is the
    /// byte position within the offending line.
    ///
    /// A malformed line means the producer stream is desynchronized, so
    /// this aborts the whole ingestion run rather than skipping the line.
    #[error("malformed change record at byte {offset}: {message}")]
    FormatError {
        /// Byte offset of the first unparseable input within the line.
        offset: usize,
        /// What was expected or found there.
        message: String,
    },

    /// The object-retrieval stream violated its framing (ended early,
    /// delivered fewer bytes than declared, or produced a garbled header).
    #[error("object retrieval protocol error: {0}")]
    ProtocolError(String),

    /// A producer subprocess exited with a non-zero status. No partial
    /// record set is surfaced when this happens.
    #[error("{producer} exited with status {status}")]
    ProducerExit {
        /// Which producer failed (e.g. "git diff").
        producer: &'static str,
        /// The subprocess exit status.
        status: i32,
    },

    /// A git command failed to start or reported an error.
    #[error("Git operation failed: {0}")]
    GitError(String),

    /// The comparison tool command is invalid or could not be launched.
    #[error("comparison tool failed: {0}")]
    ToolError(String),

    /// Underlying I/O failure while staging content.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DirdiffError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            DirdiffError::UserError(_) => exit_codes::USER_ERROR,
            DirdiffError::ConfigError(_) => exit_codes::USER_ERROR,
            DirdiffError::FormatError { .. } => exit_codes::INGEST_FAILURE,
            DirdiffError::ProtocolError(_) => exit_codes::INGEST_FAILURE,
            DirdiffError::Io(_) => exit_codes::INGEST_FAILURE,
            DirdiffError::ProducerExit { .. } => exit_codes::GIT_FAILURE,
            DirdiffError::GitError(_) => exit_codes::GIT_FAILURE,
            DirdiffError::ToolError(_) => exit_codes::TOOL_FAILURE,
        }
    }
}

/// Result type alias for git-dirdiff operations.
pub type Result<T> = std::result::Result<T, DirdiffError>;
