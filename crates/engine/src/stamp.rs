//! Template row replication.
//!
//! A template sheet carries one styled reference row above the insertion
//! point. Each inserted data row is stamped from it: styles are cloned,
//! literals copied, and formulas retargeted so row-relative references
//! point at the new row.

use crate::address::CellAddress;
use crate::cell::{Cell, CellValue};
use crate::error::ReferenceRewriteWarning;
use crate::formula;
use crate::sheet::Worksheet;

/// Copy `source_row` onto `target_row`.
pub fn stamp(sheet: &mut Worksheet, source_row: u32, target_row: u32) -> Vec<ReferenceRewriteWarning> {
    if source_row == target_row {
        return Vec::new();
    }
    let template: Vec<(u16, Cell)> = sheet
        .row_cells(source_row)
        .map(|(addr, cell)| (addr.col, cell.clone()))
        .collect();

    let mut warnings = Vec::new();
    for (col, cell) in template {
        let value = match cell.value {
            CellValue::Formula(text) => {
                let rewrite = formula::retarget_row(&text, source_row, target_row);
                warnings.extend(rewrite.warnings);
                CellValue::Formula(rewrite.text)
            }
            other => other,
        };
        sheet.set_cell(CellAddress::new(target_row, col), Cell::styled(value, cell.style));
    }
    sheet.set_row_height(target_row, sheet.row_height(source_row));
    warnings
}

/// Stamp `source_row` onto `count` consecutive rows starting at
/// `first_target`.
pub fn stamp_range(
    sheet: &mut Worksheet,
    source_row: u32,
    first_target: u32,
    count: u32,
) -> Vec<ReferenceRewriteWarning> {
    let mut warnings = Vec::new();
    for target in first_target..first_target.saturating_add(count) {
        warnings.extend(stamp(sheet, source_row, target));
    }
    log::debug!(
        "sheet '{}': stamped row {} onto {} rows from {}",
        sheet.name(),
        source_row,
        count,
        first_target
    );
    warnings
}

/// Give each target row the reference row's height (or clear it), then
/// optionally hide the reference row.
pub fn reset_row_heights(
    sheet: &mut Worksheet,
    reference_row: u32,
    targets: impl IntoIterator<Item = u32>,
    hide_reference: bool,
) {
    let height = sheet.row_height(reference_row);
    for row in targets {
        sheet.set_row_height(row, height);
    }
    if hide_reference {
        sheet.set_row_hidden(reference_row, true);
    }
}
