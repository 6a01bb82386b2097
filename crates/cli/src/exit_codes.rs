//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Codes
//!
//! | Code | Meaning                                                     |
//! |------|-------------------------------------------------------------|
//! | 0    | Success                                                     |
//! | 1    | General error (unspecified)                                 |
//! | 2    | CLI usage error (bad args, bad settings, no template given) |
//! | 3    | Input error (missing file, bad format, missing columns)     |
//! | 4    | Stable key validation failed (duplicate or empty keys)      |
//! | 5    | Template validation failed                                  |
//! | 6    | Join failed (key or mapped column absent)                   |
//! | 7    | Label generation or archive write failed                    |
//! | 8    | Input has no records                                        |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use labelgen_io::{DataError, ErrorKind};

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unreadable `--config`, missing template path.
pub const EXIT_USAGE: u8 = 2;

/// Data or template file missing, unsupported or unreadable, or required
/// columns absent.
pub const EXIT_INPUT: u8 = 3;

/// Duplicate or empty stable keys (Barcode, or Code without Barcode).
pub const EXIT_KEYS: u8 = 4;

/// Template placeholders with no matching column (`validate` only).
pub const EXIT_TEMPLATE: u8 = 5;

/// Join key or mapped column missing from the product or EAN file.
pub const EXIT_JOIN: u8 = 6;

/// Could not write label files or build the archive.
pub const EXIT_GENERATION: u8 = 7;

/// Data file parsed but contains no records.
pub const EXIT_EMPTY: u8 = 8;

/// Map a data error to its exit code.
pub fn data_exit_code(err: &DataError) -> u8 {
    match err.kind() {
        ErrorKind::Input => EXIT_INPUT,
        ErrorKind::Keys => EXIT_KEYS,
        ErrorKind::Join => EXIT_JOIN,
        ErrorKind::Generation => EXIT_GENERATION,
    }
}
