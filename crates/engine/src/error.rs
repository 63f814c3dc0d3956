use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A layout precondition was violated (overlapping merge, insertion
    /// through an unresolved merge, row past the sheet limit, ...).
    Structural(String),
    /// Sentinel text not present in the template.
    MarkerNotFound { sheet: String, text: String },
    /// Sheet index or name not present in the workbook.
    UnknownSheet(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structural(msg) => write!(f, "structural error: {msg}"),
            Self::MarkerNotFound { sheet, text } => {
                write!(f, "sheet '{sheet}': marker '{text}' not found")
            }
            Self::UnknownSheet(name) => write!(f, "unknown sheet: {name}"),
        }
    }
}

impl std::error::Error for EngineError {}

/// A formula token that could not be rewritten. The formula keeps the
/// original token text.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceRewriteWarning {
    pub formula: String,
    pub token: String,
    pub reason: String,
}

impl fmt::Display for ReferenceRewriteWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "formula '{}': token '{}' left unchanged ({})", self.formula, self.token, self.reason)
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
