//! Unmerge/snapshot/reapply for merged regions around a row insertion.
//!
//! Template footers are usually merged blocks below the data table. They
//! are lifted off the sheet before rows are inserted, then put back at
//! their shifted position with the alignment and height they had.

use crate::address::MAX_ROW;
use crate::error::{EngineError, Result};
use crate::sheet::{MergedRegion, Worksheet};
use crate::style::Alignment;

#[derive(Debug, Clone, PartialEq)]
pub struct CapturedRegion {
    pub region: MergedRegion,
    pub anchor_alignment: Alignment,
    /// Explicit height of the region's top row, else the sheet default.
    pub anchor_row_height: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeSnapshot {
    pub regions: Vec<CapturedRegion>,
}

impl MergeSnapshot {
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Remove every merged region whose row span intersects
/// `[start_row, end_row]` and return what is needed to restore it.
pub fn snapshot_and_unmerge(sheet: &mut Worksheet, start_row: u32, end_row: u32) -> MergeSnapshot {
    let targets: Vec<MergedRegion> = sheet
        .merges()
        .iter()
        .filter(|m| m.range().intersects_rows(start_row, end_row))
        .copied()
        .collect();

    let mut regions = Vec::with_capacity(targets.len());
    for region in targets {
        let anchor_alignment = sheet
            .style(region.anchor())
            .map(|s| s.alignment)
            .unwrap_or_default();
        let anchor_row_height = sheet.effective_row_height(region.min_row);
        sheet.remove_merge(&region);
        regions.push(CapturedRegion { region, anchor_alignment, anchor_row_height });
    }

    log::debug!(
        "sheet '{}': unmerged {} regions in rows {}..={}",
        sheet.name(),
        regions.len(),
        start_row,
        end_row
    );
    MergeSnapshot { regions }
}

/// Recreate each captured region `row_offset` rows further down.
///
/// Fails on the first region that would overlap an existing merge or run
/// past the sheet; regions before it stay applied.
pub fn reapply(sheet: &mut Worksheet, snapshot: &MergeSnapshot, row_offset: u32) -> Result<()> {
    for captured in &snapshot.regions {
        let r = captured.region;
        let (min_row, max_row) = match (r.min_row.checked_add(row_offset), r.max_row.checked_add(row_offset)) {
            (Some(min), Some(max)) if max <= MAX_ROW => (min, max),
            _ => {
                return Err(EngineError::Structural(format!(
                    "sheet '{}': region {} shifted by {} exceeds the row limit",
                    sheet.name(),
                    r,
                    row_offset
                )))
            }
        };
        let shifted = MergedRegion::new(min_row, r.min_col, max_row, r.max_col);
        sheet.add_merge(shifted)?;

        for addr in shifted.range().cells() {
            sheet.style_mut(addr).alignment = captured.anchor_alignment;
        }
        sheet.set_row_height(min_row, Some(captured.anchor_row_height));
    }
    Ok(())
}
