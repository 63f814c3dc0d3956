//! A1-style cell addressing.
//!
//! Rows and columns are 1-based, matching the way templates are authored.
//! `CellAddress` orders row-major so a `BTreeMap<CellAddress, _>` iterates
//! cells in reading order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Last addressable row in an XLSX worksheet.
pub const MAX_ROW: u32 = 1_048_576;

/// Last addressable column (`XFD`).
pub const MAX_COL: u16 = 16_384;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellAddress {
    pub row: u32,
    pub col: u16,
}

impl CellAddress {
    #[inline]
    pub fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }

    /// Parse `"B12"` / `"$B$12"`. Returns `None` for anything that is not a
    /// single in-bounds cell reference.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let bytes = s.as_bytes();
        let mut i = 0;
        if bytes.get(i) == Some(&b'$') {
            i += 1;
        }
        let col_start = i;
        while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
            i += 1;
        }
        let letters = &s[col_start..i];
        if bytes.get(i) == Some(&b'$') {
            i += 1;
        }
        let digits = &s[i..];
        if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let col = letters_to_col(letters)?;
        let row: u32 = digits.parse().ok()?;
        if row == 0 || row > MAX_ROW {
            return None;
        }
        Some(Self { row, col })
    }

    /// Same column, `delta` rows further down.
    pub fn offset_rows(self, delta: u32) -> Option<Self> {
        let row = self.row.checked_add(delta)?;
        (row <= MAX_ROW).then_some(Self { row, col: self.col })
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", col_to_letters(self.col), self.row)
    }
}

/// Convert a 1-based column index to letters: 1=A, 26=Z, 27=AA.
pub fn col_to_letters(col: u16) -> String {
    let mut result = String::new();
    let mut n = col as u32;
    while n > 0 {
        let rem = (n - 1) % 26;
        result.insert(0, (b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    result
}

/// Convert column letters to a 1-based index. Case-insensitive; `None` when
/// longer than three letters or past `XFD`.
pub fn letters_to_col(letters: &str) -> Option<u16> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut n: u32 = 0;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        n = n * 26 + (b.to_ascii_uppercase() - b'A' + 1) as u32;
    }
    (n <= MAX_COL as u32).then_some(n as u16)
}

/// Parse a column given either as letters (`"G"`) or a 1-based number.
pub fn parse_column(s: &str) -> Option<u16> {
    let s = s.trim();
    match s.parse::<u16>() {
        Ok(n) if (1..=MAX_COL).contains(&n) => Some(n),
        Ok(_) => None,
        Err(_) => letters_to_col(s),
    }
}

/// Inclusive rectangular range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellRange {
    pub min_row: u32,
    pub min_col: u16,
    pub max_row: u32,
    pub max_col: u16,
}

impl CellRange {
    pub fn new(min_row: u32, min_col: u16, max_row: u32, max_col: u16) -> Self {
        Self {
            min_row: min_row.min(max_row),
            min_col: min_col.min(max_col),
            max_row: min_row.max(max_row),
            max_col: min_col.max(max_col),
        }
    }

    pub fn single(addr: CellAddress) -> Self {
        Self::new(addr.row, addr.col, addr.row, addr.col)
    }

    /// Parse `"A1:C3"` or a single `"B2"`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.split_once(':') {
            Some((a, b)) => {
                let a = CellAddress::parse(a)?;
                let b = CellAddress::parse(b)?;
                Some(Self::new(a.row, a.col, b.row, b.col))
            }
            None => CellAddress::parse(s).map(Self::single),
        }
    }

    pub fn top_left(&self) -> CellAddress {
        CellAddress::new(self.min_row, self.min_col)
    }

    pub fn contains(&self, addr: CellAddress) -> bool {
        (self.min_row..=self.max_row).contains(&addr.row)
            && (self.min_col..=self.max_col).contains(&addr.col)
    }

    pub fn overlaps(&self, other: &CellRange) -> bool {
        self.min_row <= other.max_row
            && other.min_row <= self.max_row
            && self.min_col <= other.max_col
            && other.min_col <= self.max_col
    }

    /// True when the row span intersects `[start, end]`.
    pub fn intersects_rows(&self, start: u32, end: u32) -> bool {
        self.min_row <= end && start <= self.max_row
    }

    pub fn cells(&self) -> impl Iterator<Item = CellAddress> + '_ {
        (self.min_row..=self.max_row)
            .flat_map(move |r| (self.min_col..=self.max_col).map(move |c| CellAddress::new(r, c)))
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min_row == self.max_row && self.min_col == self.max_col {
            write!(f, "{}", self.top_left())
        } else {
            write!(
                f,
                "{}:{}",
                self.top_left(),
                CellAddress::new(self.max_row, self.max_col)
            )
        }
    }
}
