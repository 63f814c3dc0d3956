use auditpaper_engine::{CellValue, Period, ReferenceRewriteWarning, Scalar, Workbook};
use auditpaper_records::AggregatedRow;
use chrono::NaiveDate;
use serde::Serialize;

use crate::error::ReportError;
use crate::report_type::ReportType;
use crate::source::SourceData;

/// Everything a populator reads besides the workbook.
#[derive(Debug, Clone, Copy)]
pub struct PopulateContext<'a> {
    pub source: &'a SourceData,
    pub consultant: &'a str,
    /// Printed in the lead-sheet header.
    pub date: NaiveDate,
}

/// Data rows written to one sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetRows {
    pub sheet: String,
    pub first_row: u32,
    pub rows: u32,
}

#[derive(Debug, Clone, Default)]
pub struct PopulateOutcome {
    pub sheets: Vec<SheetRows>,
    pub warnings: Vec<ReferenceRewriteWarning>,
    /// Periods that did not fit the claimed/paid column pools.
    pub truncated_periods: Vec<Period>,
}

impl PopulateOutcome {
    pub fn record_rows(&mut self, sheet: &str, first_row: u32, rows: u32) {
        self.sheets.push(SheetRows { sheet: sheet.to_string(), first_row, rows });
    }

    /// Rows inserted on `sheet` (case-insensitive), 0 when the sheet got no
    /// block.
    pub fn rows_on(&self, sheet: &str) -> u32 {
        self.sheets
            .iter()
            .filter(|s| s.sheet.eq_ignore_ascii_case(sheet))
            .map(|s| s.rows)
            .sum()
    }

    pub fn total_rows(&self) -> u32 {
        self.sheets.iter().map(|s| s.rows).sum()
    }
}

/// One report type's mutation of its template.
pub trait DocumentPopulator: Send + Sync {
    fn report(&self) -> ReportType;

    fn populate(
        &self,
        workbook: &mut Workbook,
        ctx: &PopulateContext<'_>,
    ) -> Result<PopulateOutcome, ReportError>;
}

/// A field value as written into a cell; absent fields leave the cell empty.
pub(crate) fn field_cell(row: &AggregatedRow, field: &str) -> CellValue {
    scalar_cell(row.get(field))
}

/// Like [`field_cell`] but dates stored as text are written as dates.
pub(crate) fn date_cell(row: &AggregatedRow, field: &str) -> CellValue {
    match row.date(field) {
        Some(date) => CellValue::from(date),
        None => field_cell(row, field),
    }
}

/// Sums are written as numbers even when every input was blank.
pub(crate) fn amount_cell(row: &AggregatedRow, field: &str) -> CellValue {
    CellValue::from(row.number(field).unwrap_or(0.0))
}

pub(crate) fn scalar_cell(value: Option<&Scalar>) -> CellValue {
    value.cloned().map(CellValue::from).unwrap_or_default()
}
