use std::path::Path;

use auditpaper_records::model::SOURCE_REQUIRED_FIELDS;
use auditpaper_records::source::{records_from_table, require_fields};
use auditpaper_records::{CompanySummary, DomainFilter, Record, RecordError, Table};

use crate::error::ReportError;

/// A payment export after the domain filter, ready for any populator.
#[derive(Debug, Clone)]
pub struct SourceData {
    pub headers: Vec<String>,
    /// First data row of the unfiltered export; names the company.
    pub first: Option<Record>,
    pub records: Vec<Record>,
    pub summary: CompanySummary,
}

impl SourceData {
    pub fn from_table(table: &Table, filter: &DomainFilter) -> Result<Self, ReportError> {
        require_fields(table, SOURCE_REQUIRED_FIELDS)?;
        let all = records_from_table(table);
        let first = all.first().cloned();
        let records = filter.apply(all);
        let summary = CompanySummary::from_records(first.as_ref(), &records);
        Ok(Self { headers: table.headers.clone(), first, records, summary })
    }

    pub fn load(path: &Path, filter: &DomainFilter) -> Result<Self, ReportError> {
        let table = auditpaper_io::read_table(path).map_err(ReportError::Io)?;
        Self::from_table(&table, filter)
    }

    /// Every field in `fields` the export header lacks, reported together.
    pub fn require(&self, fields: &[&str]) -> Result<(), ReportError> {
        let missing: Vec<String> = fields
            .iter()
            .filter(|f| !self.headers.iter().any(|h| h == *f))
            .map(|f| f.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RecordError::MissingField { fields: missing }.into())
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use auditpaper_records::source::parse_csv;

    pub(crate) const HEADER: &str = "TRADENAME,UIFREFERENCENUMBER,SHUTDOWN_FROM,SHUTDOWN_TILL,IDNUMBER,FIRSTNAME,LASTNAME,EMPLOYMENTSTARTDATE,TERMINATIONDATE,PAYMENT_STATUS_ID,PAYMENTMEDIUMID,BANK_PAY_AMOUNT,LEAVE_INCOME,MONTHLY_SALARY,PAYMENTDATE,PAY_REF_ITR_1";

    /// Two employees over two periods plus one row the filter drops.
    pub(crate) fn sample_csv() -> String {
        [
            HEADER,
            "Acme Bakery,U123/45,2020-03-27,2020-04-16,8001,Thandi,Zulu,2015-02-01,2020-06-30,3,2,\"1,000.00\",0,5000,2020-05-02,REF-B",
            "Acme Bakery,U123/45,2020-04-17,2020-04-30,8001,Thandi,Zulu,2015-02-01,2020-05-31,3,2,500.00,100,5000,2020-05-20,REF-A",
            "Acme Bakery,U123/45,2020-03-27,2020-04-16,7002,Pieter,Botha,2018-09-15,,3,2,750.50,0,4200,2020-05-02,REF-B",
            "Acme Bakery,U123/45,2020-03-27,2020-04-16,9003,Rejected,Row,2019-01-01,,4,2,999,0,3000,2020-05-02,REF-B",
        ]
        .join("\n")
    }

    pub(crate) fn sample_source() -> SourceData {
        let table = parse_csv(&sample_csv()).unwrap();
        SourceData::from_table(&table, &DomainFilter::default()).unwrap()
    }

    #[test]
    fn filter_and_summary() {
        let source = sample_source();
        assert_eq!(source.records.len(), 3);
        assert_eq!(source.summary.trade_name, "Acme Bakery");
        assert_eq!(source.summary.employee_count, 2);
        assert!((source.summary.total_amount - 2250.5).abs() < 1e-9);
        assert_eq!(source.summary.periods.len(), 2);
    }

    #[test]
    fn missing_source_fields() {
        let table = parse_csv("TRADENAME,IDNUMBER\nAcme,1").unwrap();
        let err = SourceData::from_table(&table, &DomainFilter::default()).unwrap_err();
        match err {
            ReportError::Records(RecordError::MissingField { fields }) => {
                assert!(fields.contains(&"UIFREFERENCENUMBER".to_string()));
                assert!(!fields.contains(&"IDNUMBER".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn require_lists_all_missing() {
        let source = sample_source();
        assert!(source.require(&["IDNUMBER", "PAYMENTDATE"]).is_ok());
        let err = source.require(&["IDNUMBER", "NOPE", "ALSO_NOPE"]).unwrap_err();
        assert_eq!(err.to_string(), "missing required field(s): NOPE, ALSO_NOPE");
    }
}
