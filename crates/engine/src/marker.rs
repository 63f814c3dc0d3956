//! Sentinel cells and the formulas generated beneath them.

use crate::address::{col_to_letters, CellAddress};
use crate::cell::CellValue;
use crate::error::{EngineError, Result};
use crate::sheet::Worksheet;

/// First cell (row-major) whose literal text is exactly `text`.
pub fn find_marker(sheet: &Worksheet, text: &str) -> Result<CellAddress> {
    sheet.find_text(text).ok_or_else(|| EngineError::MarkerNotFound {
        sheet: sheet.name().to_string(),
        text: text.to_string(),
    })
}

/// Write `formula` directly below the marker and return where it went.
pub fn place_below(sheet: &mut Worksheet, text: &str, formula: &str) -> Result<CellAddress> {
    let marker = find_marker(sheet, text)?;
    let target = marker.offset_rows(1).ok_or_else(|| {
        EngineError::Structural(format!("marker '{}' sits on the last row", text))
    })?;
    sheet.set_value(target, CellValue::formula(formula));
    log::debug!("sheet '{}': placed formula at {} below '{}'", sheet.name(), target, text);
    Ok(target)
}

/// Last row of an `n`-row block starting at `start`; an empty block still
/// spans its first row.
fn block_end(start: u32, rows: u32) -> u32 {
    start + rows.max(1) - 1
}

/// `=ARRAYFORMULA('Sheet'!A{start}:AS{end})` mirroring a populated table.
pub fn table_copy_formula(source_sheet: &str, start_row: u32, rows: u32) -> String {
    format!(
        "=ARRAYFORMULA('{}'!A{}:AS{})",
        source_sheet.replace('\'', "''"),
        start_row,
        block_end(start_row, rows)
    )
}

/// Three-way verdict over a column of `a` ticks: all ticked, some ticked,
/// none ticked.
pub fn conclusion_formula(
    column: u16,
    start_row: u32,
    rows: u32,
    true_cell: &str,
    partial_cell: &str,
    false_cell: &str,
) -> String {
    let col = col_to_letters(column);
    let range = format!("{col}{start_row}:{col}{}", block_end(start_row, rows));
    format!(
        "=IF(COUNTIF({range},\"a\")=ROWS({range}),{true_cell},IF(COUNTIF({range},\"a\")>0,{partial_cell},{false_cell}))"
    )
}
