//! Period-indexed column pools.
//!
//! Some sheets reserve a fixed block of columns for a variable number of
//! date periods. Periods are mapped onto the block in chronological order;
//! once a pool is full the remaining periods are dropped from it and
//! reported in [`Allocation::truncated`].

use std::fmt;
use std::ops::Range;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::address::{col_to_letters, CellAddress};
use crate::sheet::Worksheet;

/// A claim period. Orders by `(from, till)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Period {
    pub from: NaiveDate,
    pub till: NaiveDate,
}

impl Period {
    pub fn new(from: NaiveDate, till: NaiveDate) -> Self {
        Self { from, till }
    }

    /// `"27 March 2020 to 16 April 2020"`
    pub fn label(&self) -> String {
        format!("{} to {}", self.from.format("%d %B %Y"), self.till.format("%d %B %Y"))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnPool {
    pub first: u16,
    pub capacity: u16,
    /// Appended to the period label in the header cell.
    pub suffix: &'static str,
}

/// Amounts claimed: `G..=V`.
pub const CLAIMED_POOL: ColumnPool = ColumnPool { first: 7, capacity: 16, suffix: "" };

/// Amounts paid: `Y..=AO`.
pub const PAID_POOL: ColumnPool = ColumnPool { first: 25, capacity: 17, suffix: " (PAID)" };

impl ColumnPool {
    /// Owned columns; empty when `capacity` is 0.
    pub fn columns(&self) -> Range<u16> {
        self.first..self.end()
    }

    /// First column after the pool.
    pub fn end(&self) -> u16 {
        self.first + self.capacity
    }

    fn fill(&self, periods: &[Period]) -> (Vec<ColumnSlot>, Vec<Period>) {
        let cap = self.capacity as usize;
        let slots = periods
            .iter()
            .take(cap)
            .enumerate()
            .map(|(i, period)| ColumnSlot {
                period: *period,
                column: self.first + i as u16,
                label: format!("{}{}", period.label(), self.suffix),
            })
            .collect();
        let overflow = periods.iter().skip(cap).copied().collect();
        (slots, overflow)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSlot {
    pub period: Period,
    pub column: u16,
    /// Header text: the period label plus the pool suffix.
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allocation {
    pub claimed: Vec<ColumnSlot>,
    pub paid: Vec<ColumnSlot>,
    /// Periods left out of at least one pool, chronological.
    pub truncated: Vec<Period>,
}

impl Allocation {
    /// Column for a header label; paid labels carry the `" (PAID)"` suffix.
    pub fn column_for(&self, label: &str) -> Option<u16> {
        self.claimed
            .iter()
            .chain(self.paid.iter())
            .find(|slot| slot.label == label)
            .map(|slot| slot.column)
    }

    pub fn claimed_column(&self, period: &Period) -> Option<u16> {
        self.claimed.iter().find(|s| &s.period == period).map(|s| s.column)
    }

    pub fn paid_column(&self, period: &Period) -> Option<u16> {
        self.paid.iter().find(|s| &s.period == period).map(|s| s.column)
    }

    /// Claimed periods in column order.
    pub fn claimed_periods(&self) -> impl Iterator<Item = &Period> {
        self.claimed.iter().map(|s| &s.period)
    }

    /// Write every slot label into `header_row`.
    pub fn write_headers(&self, sheet: &mut Worksheet, header_row: u32) {
        for slot in self.claimed.iter().chain(self.paid.iter()) {
            sheet.set_value(CellAddress::new(header_row, slot.column), slot.label.as_str());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnAllocator {
    pub claimed: ColumnPool,
    pub paid: ColumnPool,
}

impl Default for ColumnAllocator {
    fn default() -> Self {
        Self { claimed: CLAIMED_POOL, paid: PAID_POOL }
    }
}

impl ColumnAllocator {
    pub fn new(claimed: ColumnPool, paid: ColumnPool) -> Self {
        Self { claimed, paid }
    }

    /// Map periods onto both pools, chronologically and without duplicates.
    pub fn allocate(&self, periods: &[Period]) -> Allocation {
        let mut ordered = periods.to_vec();
        ordered.sort();
        ordered.dedup();

        let (claimed, claimed_over) = self.claimed.fill(&ordered);
        let (paid, paid_over) = self.paid.fill(&ordered);

        let mut truncated: Vec<Period> = claimed_over.into_iter().chain(paid_over).collect();
        truncated.sort();
        truncated.dedup();
        for period in &truncated {
            log::warn!(
                "period '{}' exceeds column capacity ({} claimed, {} paid) and was not allocated",
                period,
                self.claimed.capacity,
                self.paid.capacity
            );
        }
        Allocation { claimed, paid, truncated }
    }
}

/// Hide every column in `source` without a value in `first_row..=last_row`,
/// together with the column at the same offset from `mirror_first`. Columns
/// that hold data are shown.
pub fn hide_empty_columns(
    sheet: &mut Worksheet,
    first_row: u32,
    last_row: u32,
    source: Range<u16>,
    mirror_first: u16,
) -> Vec<u16> {
    let source_first = source.start;
    let mut hidden = Vec::new();
    for col in source {
        let has_data = first_row <= last_row
            && (first_row..=last_row).any(|row| !sheet.value(CellAddress::new(row, col)).is_empty());
        let mirror = mirror_first + (col - source_first);
        sheet.set_col_hidden(col, !has_data);
        sheet.set_col_hidden(mirror, !has_data);
        if !has_data {
            hidden.push(col);
        }
    }
    log::debug!(
        "sheet '{}': hid {} empty period columns ({})",
        sheet.name(),
        hidden.len(),
        hidden.iter().map(|c| col_to_letters(*c)).collect::<Vec<_>>().join(",")
    );
    hidden
}
