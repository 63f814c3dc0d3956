use std::collections::BTreeMap;

use auditpaper_engine::Scalar;
use chrono::NaiveDate;

use crate::dates;

// ---------------------------------------------------------------------------
// Export schema
// ---------------------------------------------------------------------------

/// Field names in the raw payment export.
pub mod fields {
    pub const IDNUMBER: &str = "IDNUMBER";
    pub const FIRSTNAME: &str = "FIRSTNAME";
    pub const LASTNAME: &str = "LASTNAME";
    pub const EMPLOYMENT_START_DATE: &str = "EMPLOYMENTSTARTDATE";
    pub const TERMINATION_DATE: &str = "TERMINATIONDATE";
    pub const BANK_PAY_AMOUNT: &str = "BANK_PAY_AMOUNT";
    pub const LEAVE_INCOME: &str = "LEAVE_INCOME";
    pub const MONTHLY_SALARY: &str = "MONTHLY_SALARY";
    pub const PAYMENT_DATE: &str = "PAYMENTDATE";
    pub const PAY_REF: &str = "PAY_REF_ITR_1";
    pub const SHUTDOWN_FROM: &str = "SHUTDOWN_FROM";
    pub const SHUTDOWN_TILL: &str = "SHUTDOWN_TILL";
    pub const TRADE_NAME: &str = "TRADENAME";
    pub const UIF_REFERENCE: &str = "UIFREFERENCENUMBER";
    pub const PAYMENT_STATUS: &str = "PAYMENT_STATUS_ID";
    pub const PAYMENT_MEDIUM: &str = "PAYMENTMEDIUMID";
}

/// Fields every payment export must carry before any report is attempted.
pub const SOURCE_REQUIRED_FIELDS: &[&str] = &[
    fields::TRADE_NAME,
    fields::UIF_REFERENCE,
    fields::SHUTDOWN_FROM,
    fields::SHUTDOWN_TILL,
    fields::IDNUMBER,
    fields::PAYMENT_STATUS,
    fields::PAYMENT_MEDIUM,
    fields::BANK_PAY_AMOUNT,
];

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Header row plus data rows, as read from a CSV file or a workbook sheet.
/// `None` marks an empty cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<Scalar>>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self { headers, rows: Vec::new() }
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One raw input row. Empty cells are absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Scalar>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<Scalar>) -> Self {
        self.insert(field, value);
        self
    }

    /// Blank text is treated as an empty cell and not stored.
    pub fn insert(&mut self, field: &str, value: impl Into<Scalar>) {
        let value = value.into();
        if value.is_blank() {
            self.fields.remove(field);
        } else {
            self.fields.insert(field.to_string(), value);
        }
    }

    pub fn get(&self, field: &str) -> Option<&Scalar> {
        self.fields.get(field)
    }

    /// Display text of a field; empty when absent.
    pub fn text(&self, field: &str) -> String {
        self.get(field).map(|v| v.to_string()).unwrap_or_default()
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(Scalar::as_number)
    }

    pub fn date(&self, field: &str) -> Option<NaiveDate> {
        self.get(field).and_then(dates::parse_scalar)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Scalar)> {
        self.fields.iter()
    }
}

// ---------------------------------------------------------------------------
// Aggregated row
// ---------------------------------------------------------------------------

/// One output row per group key: key fields first, then reduced fields,
/// in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedRow {
    values: Vec<(String, Option<Scalar>)>,
}

impl AggregatedRow {
    pub fn push(&mut self, field: &str, value: Option<Scalar>) {
        self.values.push((field.to_string(), value));
    }

    /// Replace an existing field or append a new one.
    pub fn set(&mut self, field: &str, value: Option<Scalar>) {
        match self.values.iter_mut().find(|(f, _)| f == field) {
            Some(slot) => slot.1 = value,
            None => self.push(field, value),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Scalar> {
        self.values
            .iter()
            .find(|(f, _)| f == field)
            .and_then(|(_, v)| v.as_ref())
    }

    pub fn text(&self, field: &str) -> String {
        self.get(field).map(|v| v.to_string()).unwrap_or_default()
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(Scalar::as_number)
    }

    pub fn date(&self, field: &str) -> Option<NaiveDate> {
        self.get(field).and_then(dates::parse_scalar)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(f, _)| f.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Scalar>)> {
        self.values.iter().map(|(f, v)| (f.as_str(), v.as_ref()))
    }
}
