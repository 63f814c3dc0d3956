use std::fmt;

use auditpaper_engine::EngineError;
use auditpaper_records::RecordError;
use serde::Serialize;

/// Failure of one document. Batch siblings are unaffected.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportError {
    Engine(EngineError),
    Records(RecordError),
    /// Template/export read, output write, folder creation.
    Io(String),
}

/// Coarse classification surfaced in JSON output and mapped to exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Structural,
    MissingField,
    MarkerNotFound,
    Config,
    Io,
}

impl ReportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Engine(EngineError::MarkerNotFound { .. }) => ErrorKind::MarkerNotFound,
            Self::Engine(EngineError::Structural(_) | EngineError::UnknownSheet(_)) => {
                ErrorKind::Structural
            }
            Self::Records(RecordError::MissingField { .. }) => ErrorKind::MissingField,
            Self::Records(RecordError::Io(_)) => ErrorKind::Io,
            Self::Records(
                RecordError::Parse { .. }
                | RecordError::ConfigParse(_)
                | RecordError::ConfigValidation(_),
            ) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engine(e) => write!(f, "{e}"),
            Self::Records(e) => write!(f, "{e}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Engine(e) => Some(e),
            Self::Records(e) => Some(e),
            Self::Io(_) => None,
        }
    }
}

impl From<EngineError> for ReportError {
    fn from(e: EngineError) -> Self {
        Self::Engine(e)
    }
}

impl From<RecordError> for ReportError {
    fn from(e: RecordError) -> Self {
        Self::Records(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_mapping() {
        let marker = ReportError::from(EngineError::MarkerNotFound {
            sheet: "Lead".into(),
            text: "Conclusion".into(),
        });
        assert_eq!(marker.kind(), ErrorKind::MarkerNotFound);
        assert_eq!(
            ReportError::from(EngineError::UnknownSheet("2".into())).kind(),
            ErrorKind::Structural
        );
        assert_eq!(
            ReportError::from(RecordError::MissingField { fields: vec!["IDNUMBER".into()] }).kind(),
            ErrorKind::MissingField
        );
        assert_eq!(ReportError::Io("disk full".into()).kind(), ErrorKind::Io);
        assert_eq!(
            ReportError::from(RecordError::ConfigValidation("x".into())).kind(),
            ErrorKind::Config
        );
    }

    #[test]
    fn display_passes_through() {
        let e = ReportError::from(RecordError::MissingField {
            fields: vec!["PAYMENTDATE".into(), "PAY_REF_ITR_1".into()],
        });
        assert_eq!(e.to_string(), "missing required field(s): PAYMENTDATE, PAY_REF_ITR_1");
    }
}
