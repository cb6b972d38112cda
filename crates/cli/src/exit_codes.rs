//! CLI Exit Code Registry
//!
//! Single source of truth for `pgrid` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success                                                   |
//! | 1    | General error (random source failure, unexpected)         |
//! | 2    | Usage error (bad arguments, unknown sheet, out of bounds) |
//! | 3    | I/O error (missing input, unwritable output)              |
//! | 4    | Parse error (dictionary JSON, plan TOML)                  |
//! | 5    | Format error (unreadable workbook, empty sheet)           |
//! | 6    | Nothing to export (no token reaches the exported table)   |

use pseudogrid_engine::error::EngineError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Input could not be read or output could not be written.
pub const EXIT_IO: u8 = 3;

/// Dictionary or plan file is malformed.
pub const EXIT_PARSE: u8 = 4;

/// Workbook cannot be decoded or the sheet holds no table.
pub const EXIT_FORMAT: u8 = 5;

/// Tokenize finished but the exported table would carry no token.
pub const EXIT_NOTHING_TO_EXPORT: u8 = 6;

/// Map an engine error to its exit code.
pub fn engine_exit_code(err: &EngineError) -> u8 {
    match err {
        EngineError::EmptySheet | EngineError::NoColumns => EXIT_FORMAT,
        EngineError::CellOutOfBounds { .. } | EngineError::ColumnOutOfBounds { .. } => EXIT_USAGE,
        EngineError::NoTable => EXIT_NOTHING_TO_EXPORT,
        EngineError::RandomUnavailable(_) => EXIT_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let codes = [EXIT_SUCCESS, EXIT_ERROR, EXIT_USAGE, EXIT_IO, EXIT_PARSE, EXIT_FORMAT, EXIT_NOTHING_TO_EXPORT];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_engine_mapping() {
        assert_eq!(engine_exit_code(&EngineError::EmptySheet), EXIT_FORMAT);
        assert_eq!(engine_exit_code(&EngineError::ColumnOutOfBounds { col: 3 }), EXIT_USAGE);
        assert_eq!(engine_exit_code(&EngineError::RandomUnavailable("x".into())), EXIT_ERROR);
    }
}
