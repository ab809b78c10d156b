//! Exit code constants for the git-dirdiff CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, unusable environment, bad config)
//! - 2: Ingestion failure (malformed change record, broken retrieval
//!   protocol, staging I/O)
//! - 3: Git operation failure (including a producer exiting non-zero)
//! - 4: Comparison tool failure

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, unusable environment, or invalid configuration.
pub const USER_ERROR: i32 = 1;

/// Ingestion failure: malformed change record, retrieval protocol violation,
/// or an I/O failure while materializing the staging trees.
pub const INGEST_FAILURE: i32 = 2;

/// Git operation failure: a git command or producer subprocess failed.
pub const GIT_FAILURE: i32 = 3;

/// Comparison tool failure: the external tool could not be launched.
pub const TOOL_FAILURE: i32 = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [SUCCESS, USER_ERROR, INGEST_FAILURE, GIT_FAILURE, TOOL_FAILURE];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }

    #[test]
    fn success_is_zero() {
        assert_eq!(SUCCESS, 0);
    }
}
