//! CLI Exit Code Registry
//!
//! Single source of truth for `apaper` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 2    | Usage error (bad arguments, no template for a report) |
//! | 3    | Template structure rejected an edit                  |
//! | 4    | Export lacks required fields                         |
//! | 5    | Configured marker text not found in the template     |
//! | 6    | Invalid config                                       |
//! | 7    | File could not be read or written                    |
//! | 8    | Batch finished with at least one failed document     |

use auditpaper_report::ErrorKind;

/// Success - every document written.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Row insertion or merge restore hit a shape the template cannot take.
pub const EXIT_STRUCTURAL: u8 = 3;

/// The export is missing fields a report needs.
pub const EXIT_MISSING_FIELD: u8 = 4;

/// A configured marker was not found.
pub const EXIT_MARKER_NOT_FOUND: u8 = 5;

/// Config failed to parse or validate.
pub const EXIT_CONFIG: u8 = 6;

/// Template, export or output path unreadable or unwritable.
pub const EXIT_IO: u8 = 7;

/// Some documents in a batch failed; the rest were written.
pub const EXIT_BATCH_FAILED: u8 = 8;

/// Exit code for a single-document failure.
pub fn exit_code_for(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Structural => EXIT_STRUCTURAL,
        ErrorKind::MissingField => EXIT_MISSING_FIELD,
        ErrorKind::MarkerNotFound => EXIT_MARKER_NOT_FOUND,
        ErrorKind::Config => EXIT_CONFIG,
        ErrorKind::Io => EXIT_IO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_its_own_code() {
        let kinds = [
            ErrorKind::Structural,
            ErrorKind::MissingField,
            ErrorKind::MarkerNotFound,
            ErrorKind::Config,
            ErrorKind::Io,
        ];
        let mut codes: Vec<u8> = kinds.iter().map(|k| exit_code_for(*k)).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
        assert!(!codes.contains(&EXIT_SUCCESS));
        assert!(!codes.contains(&EXIT_USAGE));
        assert!(!codes.contains(&EXIT_BATCH_FAILED));
    }

    #[test]
    fn missing_field_code() {
        assert_eq!(exit_code_for(ErrorKind::MissingField), 4);
        assert_eq!(exit_code_for(ErrorKind::Io), EXIT_IO);
    }
}
