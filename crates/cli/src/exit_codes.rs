//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args)               |
//! | 3       | Universal        | Input/output failure                     |
//! | 60-69   | recon            | Reconciliation run codes                 |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0-3)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
#[allow(dead_code)]
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// A source, config or output file could not be read or written.
pub const EXIT_IO: u8 = 3;

// =============================================================================
// Recon (60-69)
// =============================================================================

/// Config failed to parse or validate.
pub const EXIT_RECON_INVALID_CONFIG: u8 = 60;

/// Run completed and found mismatched, only-in-A or only-in-B records.
pub const EXIT_RECON_DIFFERENCES: u8 = 61;

/// Run failed after the config was accepted (engine or sink error).
pub const EXIT_RECON_RUNTIME: u8 = 62;
