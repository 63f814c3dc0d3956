//! Lockdown periods carried on each payment row.

use std::collections::BTreeSet;

use auditpaper_engine::Period;

use crate::model::{fields, Record};

/// The `(SHUTDOWN_FROM, SHUTDOWN_TILL)` period of one record, if both parse.
pub fn record_period(record: &Record) -> Option<Period> {
    let from = record.date(fields::SHUTDOWN_FROM)?;
    let till = record.date(fields::SHUTDOWN_TILL)?;
    Some(Period::new(from, till))
}

/// Distinct periods across `records`, chronological.
pub fn extract_periods<'a>(records: impl IntoIterator<Item = &'a Record>) -> Vec<Period> {
    let mut incomplete = 0usize;
    let mut periods = BTreeSet::new();
    for record in records {
        match record_period(record) {
            Some(p) => {
                periods.insert(p);
            }
            None => incomplete += 1,
        }
    }
    if incomplete > 0 {
        log::debug!("{incomplete} records carry no complete lockdown period");
    }
    periods.into_iter().collect()
}

/// `"27 March 2020 to 16 April 2020, 17 April 2020 to 30 April 2020"`
pub fn periods_label(periods: &[Period]) -> String {
    periods.iter().map(Period::label).collect::<Vec<_>>().join(", ")
}
