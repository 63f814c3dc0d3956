use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::sheet::Worksheet;

/// An ordered set of named worksheets, loaded from a template and owned by
/// exactly one processing pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workbook {
    sheets: Vec<Worksheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sheets(sheets: Vec<Worksheet>) -> Self {
        Self { sheets }
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn sheet(&self, index: usize) -> Option<&Worksheet> {
        self.sheets.get(index)
    }

    pub fn sheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.sheets.get_mut(index)
    }

    /// Sheet at `index`, or `UnknownSheet`.
    pub fn require_sheet_mut(&mut self, index: usize) -> Result<&mut Worksheet> {
        let count = self.sheets.len();
        self.sheets.get_mut(index).ok_or_else(|| {
            EngineError::UnknownSheet(format!("index {index} (workbook has {count} sheets)"))
        })
    }

    pub fn sheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.sheets.iter().find(|s| s.name().eq_ignore_ascii_case(name))
    }

    pub fn sheet_by_name_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        self.sheets.iter_mut().find(|s| s.name().eq_ignore_ascii_case(name))
    }

    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets.iter().position(|s| s.name().eq_ignore_ascii_case(name))
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name()).collect()
    }

    pub fn sheets(&self) -> &[Worksheet] {
        &self.sheets
    }

    /// Append a sheet. Fails when the name is already taken.
    pub fn add_sheet(&mut self, sheet: Worksheet) -> Result<usize> {
        if self.sheet_index(sheet.name()).is_some() {
            return Err(EngineError::Structural(format!(
                "duplicate sheet name '{}'",
                sheet.name()
            )));
        }
        self.sheets.push(sheet);
        Ok(self.sheets.len() - 1)
    }
}
