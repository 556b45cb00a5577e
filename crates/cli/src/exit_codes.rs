//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! | Code | Meaning                                                    |
//! |------|------------------------------------------------------------|
//! | 0    | Success, every key is `matched_same`                       |
//! | 1    | Differences found (one-sided keys or amount mismatches)    |
//! | 2    | CLI usage error (bad args; emitted by clap)                |
//! | 3    | Invalid config, or config that does not fit the input data |
//! | 4    | Runtime error (unreadable file, sheet, output write)       |

use pricecheck_recon::ReconError;

/// Success - command completed, no differences.
pub const EXIT_SUCCESS: u8 = 0;

/// Differences found. Like `diff(1)`, exit 1 means "the feeds differ."
pub const EXIT_DIFFERENCES: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Config failed to parse or validate, or its column mapping cannot be
/// applied to the loaded tables.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// IO failure reading inputs or writing output.
pub const EXIT_RUNTIME: u8 = 4;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_)
        | ReconError::InvalidConfiguration(_)
        | ReconError::MissingColumn { .. }
        | ReconError::ColumnOutOfRange { .. }
        | ReconError::HeaderRowNotFound { .. } => EXIT_INVALID_CONFIG,
        ReconError::Io(_) => EXIT_RUNTIME,
    }
}
