use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::address::{CellAddress, CellRange, MAX_ROW};
use crate::cell::{Cell, CellValue};
use crate::cond_format::{ConditionalRule, Predicate};
use crate::error::{EngineError, ReferenceRewriteWarning, Result};
use crate::formula;
use crate::style::Style;

/// Excel's default row height in points.
pub const DEFAULT_ROW_HEIGHT: f64 = 15.0;

/// A rectangular block displayed as one cell. The value lives in the
/// top-left (anchor) cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MergedRegion {
    pub min_row: u32,
    pub min_col: u16,
    pub max_row: u32,
    pub max_col: u16,
}

impl MergedRegion {
    pub fn new(min_row: u32, min_col: u16, max_row: u32, max_col: u16) -> Self {
        let r = CellRange::new(min_row, min_col, max_row, max_col);
        Self::from(r)
    }

    pub fn parse(s: &str) -> Option<Self> {
        CellRange::parse(s).map(Self::from)
    }

    pub fn range(&self) -> CellRange {
        CellRange {
            min_row: self.min_row,
            min_col: self.min_col,
            max_row: self.max_row,
            max_col: self.max_col,
        }
    }

    pub fn anchor(&self) -> CellAddress {
        CellAddress::new(self.min_row, self.min_col)
    }

    pub fn contains(&self, addr: CellAddress) -> bool {
        self.range().contains(addr)
    }

    pub fn overlaps(&self, other: &MergedRegion) -> bool {
        self.range().overlaps(&other.range())
    }

    /// True when inserting at `at_row` would split the region.
    pub fn straddles(&self, at_row: u32) -> bool {
        self.min_row < at_row && at_row <= self.max_row
    }

    fn is_single_cell(&self) -> bool {
        self.min_row == self.max_row && self.min_col == self.max_col
    }
}

impl From<CellRange> for MergedRegion {
    fn from(r: CellRange) -> Self {
        Self { min_row: r.min_row, min_col: r.min_col, max_row: r.max_row, max_col: r.max_col }
    }
}

impl std::fmt::Display for MergedRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.range())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worksheet {
    name: String,
    cells: BTreeMap<CellAddress, Cell>,
    merges: Vec<MergedRegion>,
    row_heights: BTreeMap<u32, f64>,
    hidden_rows: BTreeSet<u32>,
    hidden_cols: BTreeSet<u16>,
    col_widths: BTreeMap<u16, f64>,
    default_row_height: f64,
    cond_formats: Vec<ConditionalRule>,
}

impl Worksheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
            merges: Vec::new(),
            row_heights: BTreeMap::new(),
            hidden_rows: BTreeSet::new(),
            hidden_cols: BTreeSet::new(),
            col_widths: BTreeMap::new(),
            default_row_height: DEFAULT_ROW_HEIGHT,
            cond_formats: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    // ------------------------------------------------------------------
    // Cells
    // ------------------------------------------------------------------

    pub fn cell(&self, addr: CellAddress) -> Option<&Cell> {
        self.cells.get(&addr)
    }

    pub fn value(&self, addr: CellAddress) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.cells.get(&addr).map(|c| &c.value).unwrap_or(&EMPTY)
    }

    pub fn style(&self, addr: CellAddress) -> Option<&Style> {
        self.cells.get(&addr).map(|c| &c.style)
    }

    /// Replace the value, keeping any existing style.
    pub fn set_value(&mut self, addr: CellAddress, value: impl Into<CellValue>) {
        let value = value.into();
        match self.cells.get_mut(&addr) {
            Some(cell) => cell.value = value,
            None if value.is_empty() => {}
            None => {
                self.cells.insert(addr, Cell::new(value));
            }
        }
    }

    /// Mutable style, creating an empty cell when needed.
    pub fn style_mut(&mut self, addr: CellAddress) -> &mut Style {
        &mut self.cells.entry(addr).or_default().style
    }

    pub fn set_style(&mut self, addr: CellAddress, style: Style) {
        self.cells.entry(addr).or_default().style = style;
    }

    pub fn set_cell(&mut self, addr: CellAddress, cell: Cell) {
        if cell.is_blank() {
            self.cells.remove(&addr);
        } else {
            self.cells.insert(addr, cell);
        }
    }

    pub fn clear_cell(&mut self, addr: CellAddress) -> Option<Cell> {
        self.cells.remove(&addr)
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (&CellAddress, &Cell)> {
        self.cells.iter()
    }

    pub fn row_cells(&self, row: u32) -> impl Iterator<Item = (&CellAddress, &Cell)> {
        self.cells
            .range(CellAddress::new(row, 1)..=CellAddress::new(row, u16::MAX))
    }

    /// Write a value at `addr`, or at the anchor of the merged region that
    /// covers `addr`.
    pub fn set_value_merged(&mut self, addr: CellAddress, value: impl Into<CellValue>) {
        let target = self.merge_at(addr).map(|m| m.anchor()).unwrap_or(addr);
        self.set_value(target, value);
    }

    /// Highest row that holds a cell, merge, height, hidden flag or rule.
    pub fn max_row(&self) -> u32 {
        let cells = self.cells.keys().next_back().map(|a| a.row).unwrap_or(0);
        let merges = self.merges.iter().map(|m| m.max_row).max().unwrap_or(0);
        let heights = self.row_heights.keys().next_back().copied().unwrap_or(0);
        let hidden = self.hidden_rows.iter().next_back().copied().unwrap_or(0);
        let rules = self.cond_formats.iter().map(|r| r.range.max_row).max().unwrap_or(0);
        cells.max(merges).max(heights).max(hidden).max(rules)
    }

    pub fn max_col(&self) -> u16 {
        let cells = self.cells.keys().map(|a| a.col).max().unwrap_or(0);
        let merges = self.merges.iter().map(|m| m.max_col).max().unwrap_or(0);
        cells.max(merges)
    }

    /// First cell in row-major order whose literal text equals `text`.
    pub fn find_text(&self, text: &str) -> Option<CellAddress> {
        self.cells.iter().find_map(|(addr, cell)| match &cell.value {
            CellValue::Literal(crate::cell::Scalar::Text(s)) if s == text => Some(*addr),
            _ => None,
        })
    }

    // ------------------------------------------------------------------
    // Merged regions
    // ------------------------------------------------------------------

    pub fn merges(&self) -> &[MergedRegion] {
        &self.merges
    }

    pub fn merge_at(&self, addr: CellAddress) -> Option<&MergedRegion> {
        self.merges.iter().find(|m| m.contains(addr))
    }

    /// Add a merged region. Fails if it overlaps an existing region.
    pub fn add_merge(&mut self, region: MergedRegion) -> Result<()> {
        if region.is_single_cell() {
            return Err(EngineError::Structural(format!(
                "sheet '{}': merged region {} covers a single cell",
                self.name, region
            )));
        }
        if region.max_row > MAX_ROW {
            return Err(EngineError::Structural(format!(
                "sheet '{}': merged region {} exceeds the row limit",
                self.name, region
            )));
        }
        if let Some(existing) = self.merges.iter().find(|m| m.overlaps(&region)) {
            return Err(EngineError::Structural(format!(
                "sheet '{}': merged region {} overlaps {}",
                self.name, region, existing
            )));
        }
        self.merges.push(region);
        Ok(())
    }

    pub fn remove_merge(&mut self, region: &MergedRegion) -> bool {
        let before = self.merges.len();
        self.merges.retain(|m| m != region);
        self.merges.len() != before
    }

    // ------------------------------------------------------------------
    // Row and column metadata
    // ------------------------------------------------------------------

    pub fn row_height(&self, row: u32) -> Option<f64> {
        self.row_heights.get(&row).copied()
    }

    /// Explicit height if set, else the sheet default.
    pub fn effective_row_height(&self, row: u32) -> f64 {
        self.row_height(row).unwrap_or(self.default_row_height)
    }

    pub fn set_row_height(&mut self, row: u32, height: Option<f64>) {
        match height {
            Some(h) => {
                self.row_heights.insert(row, h);
            }
            None => {
                self.row_heights.remove(&row);
            }
        }
    }

    pub fn row_heights(&self) -> &BTreeMap<u32, f64> {
        &self.row_heights
    }

    pub fn default_row_height(&self) -> f64 {
        self.default_row_height
    }

    pub fn set_default_row_height(&mut self, height: f64) {
        self.default_row_height = height;
    }

    pub fn is_row_hidden(&self, row: u32) -> bool {
        self.hidden_rows.contains(&row)
    }

    pub fn set_row_hidden(&mut self, row: u32, hidden: bool) {
        if hidden {
            self.hidden_rows.insert(row);
        } else {
            self.hidden_rows.remove(&row);
        }
    }

    pub fn hidden_rows(&self) -> &BTreeSet<u32> {
        &self.hidden_rows
    }

    pub fn is_col_hidden(&self, col: u16) -> bool {
        self.hidden_cols.contains(&col)
    }

    pub fn set_col_hidden(&mut self, col: u16, hidden: bool) {
        if hidden {
            self.hidden_cols.insert(col);
        } else {
            self.hidden_cols.remove(&col);
        }
    }

    pub fn hidden_cols(&self) -> &BTreeSet<u16> {
        &self.hidden_cols
    }

    pub fn col_width(&self, col: u16) -> Option<f64> {
        self.col_widths.get(&col).copied()
    }

    pub fn set_col_width(&mut self, col: u16, width: f64) {
        self.col_widths.insert(col, width);
    }

    pub fn col_widths(&self) -> &BTreeMap<u16, f64> {
        &self.col_widths
    }

    // ------------------------------------------------------------------
    // Conditional formatting
    // ------------------------------------------------------------------

    pub fn conditional_rules(&self) -> &[ConditionalRule] {
        &self.cond_formats
    }

    pub fn add_conditional_rule(&mut self, rule: ConditionalRule) {
        self.cond_formats.push(rule);
    }

    // ------------------------------------------------------------------
    // Row insertion
    // ------------------------------------------------------------------

    /// Insert `count` empty rows before `at_row`.
    ///
    /// Everything anchored at `at_row` or below moves down by `count`: cells,
    /// merged regions, explicit heights, hidden flags and conditional rules.
    /// Every formula on the sheet is rewritten so it keeps pointing at the
    /// same logical cells. Merged regions that straddle `at_row` must be
    /// removed first (see [`crate::merge`]); a conditional rule that
    /// straddles it is stretched instead.
    pub fn insert_rows(&mut self, at_row: u32, count: u32) -> Result<Vec<ReferenceRewriteWarning>> {
        if at_row == 0 {
            return Err(EngineError::Structural(format!(
                "sheet '{}': cannot insert before row 0",
                self.name
            )));
        }
        if count == 0 {
            return Ok(Vec::new());
        }
        if let Some(region) = self.merges.iter().find(|m| m.straddles(at_row)) {
            return Err(EngineError::Structural(format!(
                "sheet '{}': merged region {} straddles insertion row {}",
                self.name, region, at_row
            )));
        }
        let last = self.max_row();
        if last >= at_row && last.checked_add(count).map_or(true, |r| r > MAX_ROW) {
            return Err(EngineError::Structural(format!(
                "sheet '{}': inserting {} rows at {} pushes row {} past the sheet limit",
                self.name, count, at_row, last
            )));
        }

        let moved = self.cells.split_off(&CellAddress::new(at_row, 0));
        for (addr, cell) in moved {
            self.cells.insert(CellAddress::new(addr.row + count, addr.col), cell);
        }

        let mut warnings = Vec::new();
        for cell in self.cells.values_mut() {
            if let CellValue::Formula(text) = &mut cell.value {
                let rewrite = formula::rewrite_rows(text, at_row, count);
                *text = rewrite.text;
                warnings.extend(rewrite.warnings);
            }
        }

        for region in &mut self.merges {
            if region.min_row >= at_row {
                region.min_row += count;
                region.max_row += count;
            }
        }

        let heights = self.row_heights.split_off(&at_row);
        self.row_heights
            .extend(heights.into_iter().map(|(row, h)| (row + count, h)));

        let hidden = self.hidden_rows.split_off(&at_row);
        self.hidden_rows.extend(hidden.into_iter().map(|row| row + count));

        for rule in &mut self.cond_formats {
            if rule.range.min_row >= at_row {
                rule.range.min_row += count;
                rule.range.max_row += count;
            } else if rule.range.max_row >= at_row {
                rule.range.max_row += count;
            }
            if let Predicate::Expression(expr) = &mut rule.predicate {
                let rewrite = formula::rewrite_rows(expr, at_row, count);
                *expr = rewrite.text;
                warnings.extend(rewrite.warnings);
            }
        }

        log::debug!(
            "sheet '{}': inserted {} rows at {} ({} rewrite warnings)",
            self.name,
            count,
            at_row,
            warnings.len()
        );
        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Scalar;
    use crate::style::Fill;

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    #[test]
    fn test_set_value_keeps_style() {
        let mut sheet = Worksheet::new("s");
        let mut style = Style::default();
        style.font.bold = true;
        sheet.set_style(addr("B2"), style.clone());
        sheet.set_value(addr("B2"), "hello");
        assert_eq!(sheet.style(addr("B2")), Some(&style));
        assert_eq!(sheet.value(addr("B2")), &CellValue::from("hello"));
        assert_eq!(sheet.value(addr("Z9")), &CellValue::Empty);
    }

    #[test]
    fn test_add_merge_rejects_overlap() {
        let mut sheet = Worksheet::new("s");
        sheet.add_merge(MergedRegion::parse("A1:C2").unwrap()).unwrap();
        let err = sheet.add_merge(MergedRegion::parse("C2:D3").unwrap()).unwrap_err();
        assert!(matches!(err, EngineError::Structural(_)));
        sheet.add_merge(MergedRegion::parse("D1:E2").unwrap()).unwrap();
        assert_eq!(sheet.merges().len(), 2);
        assert!(sheet.remove_merge(&MergedRegion::parse("A1:C2").unwrap()));
        assert!(!sheet.remove_merge(&MergedRegion::parse("A1:C2").unwrap()));
    }

    #[test]
    fn test_insert_rows_shifts_everything_below() {
        let mut sheet = Worksheet::new("s");
        sheet.set_value(addr("A4"), "above");
        sheet.set_value(addr("A5"), "at");
        sheet.set_value(addr("B9"), CellValue::formula("=SUM(B4:B5)"));
        sheet.set_row_height(5, Some(30.0));
        sheet.set_row_height(4, Some(12.0));
        sheet.set_row_hidden(6, true);
        sheet.add_merge(MergedRegion::parse("C7:D8").unwrap()).unwrap();

        let warnings = sheet.insert_rows(5, 3).unwrap();
        assert!(warnings.is_empty());

        assert_eq!(sheet.value(addr("A4")), &CellValue::from("above"));
        assert_eq!(sheet.value(addr("A5")), &CellValue::Empty);
        assert_eq!(sheet.value(addr("A8")), &CellValue::from("at"));
        assert_eq!(sheet.value(addr("B12")), &CellValue::Formula("=SUM(B4:B8)".into()));
        assert_eq!(sheet.row_height(4), Some(12.0));
        assert_eq!(sheet.row_height(5), None);
        assert_eq!(sheet.row_height(8), Some(30.0));
        assert!(!sheet.is_row_hidden(6));
        assert!(sheet.is_row_hidden(9));
        assert_eq!(sheet.merges()[0], MergedRegion::parse("C10:D11").unwrap());
    }

    #[test]
    fn test_insert_rows_rejects_straddling_merge() {
        let mut sheet = Worksheet::new("s");
        sheet.add_merge(MergedRegion::parse("A4:B6").unwrap()).unwrap();
        assert!(matches!(sheet.insert_rows(5, 1), Err(EngineError::Structural(_))));
        // At the top edge the region moves as a whole.
        sheet.insert_rows(4, 1).unwrap();
        assert_eq!(sheet.merges()[0], MergedRegion::parse("A5:B7").unwrap());
    }

    #[test]
    fn test_insert_rows_row_zero_and_limit() {
        let mut sheet = Worksheet::new("s");
        assert!(matches!(sheet.insert_rows(0, 1), Err(EngineError::Structural(_))));
        sheet.set_value(CellAddress::new(MAX_ROW - 1, 1), 1.0);
        assert!(matches!(sheet.insert_rows(10, 2), Err(EngineError::Structural(_))));
        assert!(sheet.insert_rows(10, 1).is_ok());
    }

    #[test]
    fn test_insert_rows_count_zero_is_noop() {
        let mut sheet = Worksheet::new("s");
        sheet.set_value(addr("A1"), CellValue::formula("=A2"));
        assert!(sheet.insert_rows(1, 0).unwrap().is_empty());
        assert_eq!(sheet.value(addr("A1")), &CellValue::Formula("=A2".into()));
    }

    #[test]
    fn test_insert_rows_moves_and_stretches_rules() {
        let mut sheet = Worksheet::new("s");
        let fill = Fill::default();
        sheet.add_conditional_rule(ConditionalRule::new(
            CellRange::parse("A10:A12").unwrap(),
            Predicate::Equals(Scalar::text("r")),
            fill,
        ));
        sheet.add_conditional_rule(ConditionalRule::new(
            CellRange::parse("B2:B20").unwrap(),
            Predicate::Expression("B2>$C$15".into()),
            fill,
        ));
        sheet.add_conditional_rule(ConditionalRule::new(
            CellRange::parse("C1:C3").unwrap(),
            Predicate::IsEmpty,
            fill,
        ));
        sheet.insert_rows(5, 2).unwrap();
        let rules = sheet.conditional_rules();
        assert_eq!(rules[0].range.to_string(), "A12:A14");
        assert_eq!(rules[1].range.to_string(), "B2:B22");
        assert_eq!(rules[1].predicate, Predicate::Expression("B2>$C$17".into()));
        assert_eq!(rules[2].range.to_string(), "C1:C3");
    }

    #[test]
    fn test_insert_rows_collects_warnings() {
        let mut sheet = Worksheet::new("s");
        sheet.set_value(addr("A1"), CellValue::formula("=B5&\"x"));
        let warnings = sheet.insert_rows(2, 1).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(sheet.value(addr("A1")), &CellValue::Formula("=B6&\"x".into()));
    }

    #[test]
    fn test_set_value_merged_targets_anchor() {
        let mut sheet = Worksheet::new("s");
        sheet.add_merge(MergedRegion::parse("D11:E11").unwrap()).unwrap();
        sheet.set_value_merged(addr("E11"), "Smith");
        assert_eq!(sheet.value(addr("D11")), &CellValue::from("Smith"));
        assert_eq!(sheet.value(addr("E11")), &CellValue::Empty);
    }

    #[test]
    fn test_find_text_row_major() {
        let mut sheet = Worksheet::new("s");
        sheet.set_value(addr("C2"), "Conclusion");
        sheet.set_value(addr("A3"), "Conclusion");
        assert_eq!(sheet.find_text("Conclusion"), Some(addr("C2")));
        assert_eq!(sheet.find_text("Missing"), None);
    }
}
