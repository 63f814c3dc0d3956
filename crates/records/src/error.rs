use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    /// Required fields absent from the input header.
    MissingField { fields: Vec<String> },
    /// File read / CSV framing error.
    Io(String),
    /// A value could not be interpreted.
    Parse { field: String, value: String },
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (unknown report, empty template path, etc.).
    ConfigValidation(String),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { fields } => {
                write!(f, "missing required field(s): {}", fields.join(", "))
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Parse { field, value } => {
                write!(f, "field '{field}': cannot parse '{value}'")
            }
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
        }
    }
}

impl std::error::Error for RecordError {}
