use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::style::Style;

/// A literal value: what a record field or a non-formula cell holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl Scalar {
    pub fn text(s: impl Into<String>) -> Self {
        Scalar::Text(s.into())
    }

    /// Numeric view. Text is parsed with thousands separators stripped;
    /// dates and unparsable text yield `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            Scalar::Text(s) => {
                let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
                if cleaned.is_empty() {
                    None
                } else {
                    cleaned.parse().ok()
                }
            }
            Scalar::Date(_) => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Scalar::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Blank text counts as absent.
    pub fn is_blank(&self) -> bool {
        matches!(self, Scalar::Text(s) if s.trim().is_empty())
    }

    /// Ordering used by `Min` reducers and sorting: numbers numerically,
    /// dates chronologically, text lexicographically. Mixed kinds order
    /// Number < Date < Text.
    pub fn compare(&self, other: &Scalar) -> Ordering {
        match (self, other) {
            (Scalar::Number(a), Scalar::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Scalar::Date(a), Scalar::Date(b)) => a.cmp(b),
            (Scalar::Text(a), Scalar::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Scalar::Number(_) => 0,
            Scalar::Date(_) => 1,
            Scalar::Text(_) => 2,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Scalar::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Number(n)
    }
}

impl From<NaiveDate> for Scalar {
    fn from(d: NaiveDate) -> Self {
        Scalar::Date(d)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Literal(Scalar),
    /// Formula text including the leading `=`.
    Formula(String),
}

impl CellValue {
    /// Build a formula value, adding the leading `=` when missing.
    pub fn formula(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.starts_with('=') {
            CellValue::Formula(text)
        } else {
            CellValue::Formula(format!("={text}"))
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_formula(&self) -> Option<&str> {
        match self {
            CellValue::Formula(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Scalar> {
        match self {
            CellValue::Literal(s) => Some(s),
            _ => None,
        }
    }

    /// Text as an author would see it in the formula bar.
    pub fn raw_display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Literal(s) => s.to_string(),
            CellValue::Formula(f) => f.clone(),
        }
    }
}

impl From<Scalar> for CellValue {
    fn from(v: Scalar) -> Self {
        CellValue::Literal(v)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Literal(Scalar::from(s))
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Literal(Scalar::Text(s))
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Literal(Scalar::Number(n))
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::Literal(Scalar::Date(d))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub value: CellValue,
    pub style: Style,
}

impl Cell {
    pub fn new(value: CellValue) -> Self {
        Self { value, style: Style::default() }
    }

    pub fn styled(value: CellValue, style: Style) -> Self {
        Self { value, style }
    }

    /// No value and no formatting; such cells need not be stored.
    pub fn is_blank(&self) -> bool {
        self.value.is_empty() && self.style.is_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_as_number() {
        assert_eq!(Scalar::text("1,250.50").as_number(), Some(1250.5));
        assert_eq!(Scalar::text(" 12 ").as_number(), Some(12.0));
        assert_eq!(Scalar::text("n/a").as_number(), None);
        assert_eq!(Scalar::text("").as_number(), None);
        assert_eq!(Scalar::Number(3.5).as_number(), Some(3.5));
        let d = NaiveDate::from_ymd_opt(2020, 4, 1).unwrap();
        assert_eq!(Scalar::Date(d).as_number(), None);
    }

    #[test]
    fn test_scalar_compare() {
        let early = Scalar::Date(NaiveDate::from_ymd_opt(2019, 1, 1).unwrap());
        let late = Scalar::Date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(early.compare(&late), Ordering::Less);
        assert_eq!(Scalar::Number(2.0).compare(&Scalar::Number(10.0)), Ordering::Less);
        assert_eq!(Scalar::text("b").compare(&Scalar::text("a")), Ordering::Greater);
        assert_eq!(Scalar::Number(99.0).compare(&Scalar::text("a")), Ordering::Less);
    }

    #[test]
    fn test_scalar_display() {
        assert_eq!(Scalar::Number(60.0).to_string(), "60");
        assert_eq!(Scalar::Number(1.25).to_string(), "1.25");
        let d = NaiveDate::from_ymd_opt(2020, 3, 27).unwrap();
        assert_eq!(Scalar::Date(d).to_string(), "2020-03-27");
    }

    #[test]
    fn test_formula_constructor_adds_marker() {
        assert_eq!(CellValue::formula("SUM(A1:A2)"), CellValue::Formula("=SUM(A1:A2)".into()));
        assert_eq!(CellValue::formula("=A1"), CellValue::Formula("=A1".into()));
        assert_eq!(CellValue::from("x").raw_display(), "x");
    }
}
