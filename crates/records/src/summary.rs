use std::collections::HashSet;

use auditpaper_engine::Period;
use serde::Serialize;

use crate::model::{fields, Record};
use crate::periods;

/// Company-level totals for one payment export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanySummary {
    pub trade_name: String,
    pub uif_reference: String,
    pub periods: Vec<Period>,
    pub employee_count: usize,
    pub total_amount: f64,
}

impl CompanySummary {
    /// `first` is the first data row of the unfiltered export; it names the
    /// company. Everything else is computed over `filtered`.
    pub fn from_records(first: Option<&Record>, filtered: &[Record]) -> Self {
        let pick = |field: &str| first.map(|r| r.text(field)).unwrap_or_default();
        let employees: HashSet<String> = filtered
            .iter()
            .filter_map(|r| r.get(fields::IDNUMBER).map(|v| v.to_string()))
            .collect();
        let total: f64 = filtered
            .iter()
            .filter_map(|r| r.number(fields::BANK_PAY_AMOUNT))
            .sum();

        Self {
            trade_name: pick(fields::TRADE_NAME),
            uif_reference: pick(fields::UIF_REFERENCE),
            periods: periods::extract_periods(filtered),
            employee_count: employees.len(),
            total_amount: (total * 100.0).round() / 100.0,
        }
    }

    pub fn periods_label(&self) -> String {
        periods::periods_label(&self.periods)
    }
}
