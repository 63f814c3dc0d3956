//! Per-cell highlight rules over freshly populated rows.
//!
//! Rules are stored on the worksheet and shift with `insert_rows`. The
//! highlight helpers here add one single-cell rule per (row, column), so
//! they must run after all insertions for the sheet are done.

use serde::{Deserialize, Serialize};

use crate::address::{CellAddress, CellRange};
use crate::cell::Scalar;
use crate::style::{rgb, Fill};
use crate::sheet::Worksheet;

/// Fill for empty cells in review columns.
pub const EMPTY_CELL_FILL: Fill = Fill { background: Some(rgb(0xFFCCCC)) };

/// Fill for a legend cell holding the rejection mark.
pub const LEGEND_FILL: Fill = Fill { background: Some(rgb(0xFF0000)) };

/// Legend value that flags a row for review.
pub const REJECT_MARK: &str = "r";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// Cell value equals the empty string.
    IsEmpty,
    /// Cell value equals a literal.
    Equals(Scalar),
    /// Free-form formula, relative to the top-left cell of the range.
    Expression(String),
}

impl Predicate {
    /// Operand in Excel `cellIs` notation: strings quoted, quotes doubled.
    pub fn operand(&self) -> Option<String> {
        match self {
            Predicate::IsEmpty => Some("\"\"".to_string()),
            Predicate::Equals(Scalar::Number(n)) => Some(Scalar::Number(*n).to_string()),
            Predicate::Equals(v) => Some(format!("\"{}\"", v.to_string().replace('"', "\"\""))),
            Predicate::Expression(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalRule {
    pub range: CellRange,
    pub predicate: Predicate,
    pub fill: Fill,
    pub stop_if_true: bool,
}

impl ConditionalRule {
    pub fn new(range: CellRange, predicate: Predicate, fill: Fill) -> Self {
        Self { range, predicate, fill, stop_if_true: true }
    }
}

/// Add an `IsEmpty` rule for every cell in `rows` × `columns`.
pub fn highlight_if_empty(
    sheet: &mut Worksheet,
    rows: std::ops::Range<u32>,
    columns: &[u16],
    fill: Fill,
) -> usize {
    let mut added = 0;
    for row in rows {
        for &col in columns {
            let cell = CellRange::single(CellAddress::new(row, col));
            sheet.add_conditional_rule(ConditionalRule::new(cell, Predicate::IsEmpty, fill));
            added += 1;
        }
    }
    added
}

/// Add an `Equals(value)` rule for every row of one column.
pub fn highlight_if_equals(
    sheet: &mut Worksheet,
    rows: std::ops::Range<u32>,
    column: u16,
    value: Scalar,
    fill: Fill,
) -> usize {
    let mut added = 0;
    for row in rows {
        let cell = CellRange::single(CellAddress::new(row, column));
        sheet.add_conditional_rule(ConditionalRule::new(cell, Predicate::Equals(value.clone()), fill));
        added += 1;
    }
    added
}

/// Empty review cells get a pale red fill; a legend cell marked `r` gets
/// solid red.
pub fn apply_review_highlights(
    sheet: &mut Worksheet,
    rows: std::ops::Range<u32>,
    columns: &[u16],
    legend: u16,
) -> usize {
    let added = highlight_if_empty(sheet, rows.clone(), columns, EMPTY_CELL_FILL);
    let legend_added = highlight_if_equals(sheet, rows, legend, Scalar::text(REJECT_MARK), LEGEND_FILL);
    log::debug!(
        "sheet '{}': {} review highlight rules added",
        sheet.name(),
        added + legend_added
    );
    added + legend_added
}
