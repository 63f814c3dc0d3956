//! The insert-and-stamp sequence every data table goes through.
//!
//! Footer merges are lifted, `n` rows are inserted at the first data row
//! and the styled template row above is stamped onto each of them. Once the
//! caller has written its values and totals, [`OpenBlock::close`] puts the
//! merges back below the block, evens out row heights and hides the
//! template row.

use std::ops::{Range, RangeInclusive};

use auditpaper_engine::merge::{reapply, snapshot_and_unmerge, MergeSnapshot};
use auditpaper_engine::stamp::{reset_row_heights, stamp_range};
use auditpaper_engine::{ReferenceRewriteWarning, Worksheet};

use crate::error::ReportError;

/// Where a table sits in its template sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    /// Styled reference row directly above the table.
    pub template_row: u32,
    /// First data row; rows are inserted here.
    pub first_row: u32,
    /// Rows whose merged regions are lifted around the insertion.
    pub footer: (u32, u32),
}

#[derive(Debug)]
pub struct OpenBlock {
    layout: BlockLayout,
    rows: u32,
    footer_merges: MergeSnapshot,
}

impl BlockLayout {
    pub fn open(
        &self,
        sheet: &mut Worksheet,
        rows: u32,
        warnings: &mut Vec<ReferenceRewriteWarning>,
    ) -> Result<OpenBlock, ReportError> {
        let footer_merges = snapshot_and_unmerge(sheet, self.footer.0, self.footer.1);
        warnings.extend(sheet.insert_rows(self.first_row, rows)?);
        warnings.extend(stamp_range(sheet, self.template_row, self.first_row, rows));
        Ok(OpenBlock { layout: *self, rows, footer_merges })
    }
}

impl OpenBlock {
    pub fn len(&self) -> u32 {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn first_row(&self) -> u32 {
        self.layout.first_row
    }

    /// Rows holding data.
    pub fn rows(&self) -> Range<u32> {
        self.layout.first_row..self.layout.first_row + self.rows
    }

    /// `(row, 1-based index)` for each data row.
    pub fn numbered_rows(&self) -> impl Iterator<Item = (u32, u32)> {
        self.rows().zip(1..)
    }

    /// Last data row, `None` for an empty block.
    pub fn last_row(&self) -> Option<u32> {
        (self.rows > 0).then(|| self.layout.first_row + self.rows - 1)
    }

    /// Row `gap` rows past the end of the block.
    pub fn row_after(&self, gap: u32) -> u32 {
        self.layout.first_row + self.rows + gap
    }

    /// `=SUM(X{first}:X{last})`, or `=0` when nothing was inserted.
    pub fn column_sum(&self, column: &str) -> String {
        match self.last_row() {
            Some(last) => format!("=SUM({column}{}:{column}{last})", self.layout.first_row),
            None => "=0".to_string(),
        }
    }

    /// Restore footer merges shifted by the block size, copy the template
    /// row's height onto `height_rows` and hide the template row.
    pub fn close(self, sheet: &mut Worksheet, height_rows: RangeInclusive<u32>) -> Result<(), ReportError> {
        reapply(sheet, &self.footer_merges, self.rows)?;
        reset_row_heights(sheet, self.layout.template_row, height_rows, true);
        Ok(())
    }
}
