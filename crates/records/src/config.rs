use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use auditpaper_engine::address::parse_column;
use serde::Deserialize;

use crate::error::RecordError;
use crate::filter::DomainFilter;

/// Report keys a config may name.
pub const REPORT_KEYS: &[&str] = &["tp1", "tp2", "tp3", "tp4"];

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub consultant: String,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Create the per-company folder layout around each output.
    #[serde(default)]
    pub folders: bool,
    /// Reporting templates (`.docx`, `.xlsx`, `.pdf`) copied into each
    /// company folder.
    #[serde(default)]
    pub report_templates: Option<PathBuf>,
    #[serde(default)]
    pub templates: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub filter: DomainFilter,
    #[serde(default)]
    pub markers: Vec<MarkerConfig>,
}

// ---------------------------------------------------------------------------
// Markers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// Three-way verdict over a tick column.
    Conclusion,
    /// Array formula mirroring a populated table.
    TableCopy,
}

impl std::fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conclusion => write!(f, "conclusion"),
            Self::TableCopy => write!(f, "table_copy"),
        }
    }
}

/// A sentinel cell whose neighbour below receives a generated formula.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkerConfig {
    pub report: String,
    #[serde(default)]
    pub sheet: usize,
    pub text: String,
    pub kind: MarkerKind,
    /// Tick column for `conclusion`, letters or 1-based number.
    #[serde(default)]
    pub column: Option<String>,
    pub start_row: u32,
    /// Sheet whose table a `table_copy` mirrors.
    #[serde(default)]
    pub source_sheet: Option<String>,
    #[serde(default)]
    pub true_cell: Option<String>,
    #[serde(default)]
    pub partial_cell: Option<String>,
    #[serde(default)]
    pub false_cell: Option<String>,
}

impl MarkerConfig {
    pub fn column_index(&self) -> Option<u16> {
        self.column.as_deref().and_then(parse_column)
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl RunConfig {
    pub fn from_toml(input: &str) -> Result<Self, RecordError> {
        let config: RunConfig =
            toml::from_str(input).map_err(|e| RecordError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, RecordError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| RecordError::Io(format!("{}: {e}", path.display())))?;
        let mut config = Self::from_toml(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Make relative template, output and reporting-template paths relative
    /// to `base` (the config file's directory).
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in self.templates.values_mut() {
            *path = base.join(&*path);
        }
        for path in [&mut self.output_dir, &mut self.report_templates].into_iter().flatten() {
            *path = base.join(&*path);
        }
    }

    /// `<config dir>/auditpaper/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("auditpaper")
            .join("config.toml")
    }

    /// Explicit path if given, else the default location when it exists.
    pub fn discover(explicit: Option<&Path>) -> Result<Option<Self>, RecordError> {
        if let Some(path) = explicit {
            return Self::load(path).map(Some);
        }
        let default = Self::default_path();
        if default.is_file() {
            log::debug!("using config {}", default.display());
            Self::load(&default).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn template(&self, report: &str) -> Option<&Path> {
        self.templates.get(report).map(PathBuf::as_path)
    }

    pub fn markers_for<'a>(&'a self, report: &'a str) -> impl Iterator<Item = &'a MarkerConfig> + 'a {
        self.markers.iter().filter(move |m| m.report == report)
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        if self.templates.is_empty() {
            return Err(RecordError::ConfigValidation(
                "at least one template is required".into(),
            ));
        }

        for (key, path) in &self.templates {
            if !REPORT_KEYS.contains(&key.as_str()) {
                return Err(RecordError::ConfigValidation(format!(
                    "unknown report '{key}' in [templates] (expected one of {})",
                    REPORT_KEYS.join(", ")
                )));
            }
            if path.as_os_str().is_empty() {
                return Err(RecordError::ConfigValidation(format!(
                    "template path for '{key}' is empty"
                )));
            }
        }

        for (i, marker) in self.markers.iter().enumerate() {
            let at = format!("markers[{i}] ('{}')", marker.text);
            if !self.templates.contains_key(&marker.report) {
                return Err(RecordError::ConfigValidation(format!(
                    "{at}: report '{}' has no configured template",
                    marker.report
                )));
            }
            if marker.text.trim().is_empty() {
                return Err(RecordError::ConfigValidation(format!("markers[{i}]: empty text")));
            }
            if marker.start_row == 0 {
                return Err(RecordError::ConfigValidation(format!("{at}: start_row must be >= 1")));
            }
            if marker.kind == MarkerKind::Conclusion {
                if marker.column_index().is_none() {
                    return Err(RecordError::ConfigValidation(format!(
                        "{at}: conclusion needs a valid column"
                    )));
                }
                if marker.true_cell.is_none()
                    || marker.partial_cell.is_none()
                    || marker.false_cell.is_none()
                {
                    return Err(RecordError::ConfigValidation(format!(
                        "{at}: conclusion needs true_cell, partial_cell and false_cell"
                    )));
                }
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
