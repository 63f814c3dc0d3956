use serde::Deserialize;

use crate::model::{fields, Record};

/// Keeps paid bank-transfer rows with a non-zero amount.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DomainFilter {
    #[serde(default = "default_payment_status")]
    pub payment_status: i64,
    #[serde(default = "default_payment_medium")]
    pub payment_medium: i64,
}

fn default_payment_status() -> i64 {
    3
}

fn default_payment_medium() -> i64 {
    2
}

impl Default for DomainFilter {
    fn default() -> Self {
        Self {
            payment_status: default_payment_status(),
            payment_medium: default_payment_medium(),
        }
    }
}

impl DomainFilter {
    pub fn keeps(&self, record: &Record) -> bool {
        let code_matches = |field: &str, code: i64| record.number(field) == Some(code as f64);
        code_matches(fields::PAYMENT_STATUS, self.payment_status)
            && code_matches(fields::PAYMENT_MEDIUM, self.payment_medium)
            && record.number(fields::BANK_PAY_AMOUNT).is_some_and(|a| a != 0.0)
    }

    pub fn apply(&self, records: Vec<Record>) -> Vec<Record> {
        let before = records.len();
        let kept: Vec<Record> = records.into_iter().filter(|r| self.keeps(r)).collect();
        log::debug!(
            "domain filter (status={}, medium={}): kept {} of {} records",
            self.payment_status,
            self.payment_medium,
            kept.len(),
            before
        );
        kept
    }
}
