//! TP1 Compliance and Existence Testing: the lead-sheet header only.

use auditpaper_engine::Workbook;

use crate::error::ReportError;
use crate::header::{write_header, SIGNOFF_E};
use crate::populate::{DocumentPopulator, PopulateContext, PopulateOutcome};
use crate::report_type::ReportType;

pub struct ComplianceTesting;

impl DocumentPopulator for ComplianceTesting {
    fn report(&self) -> ReportType {
        ReportType::Tp1
    }

    fn populate(
        &self,
        workbook: &mut Workbook,
        ctx: &PopulateContext<'_>,
    ) -> Result<PopulateOutcome, ReportError> {
        write_header(workbook, ctx, SIGNOFF_E)?;
        Ok(PopulateOutcome::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::tests::sample_source;
    use auditpaper_engine::{CellAddress, CellValue, Worksheet};
    use chrono::NaiveDate;

    #[test]
    fn header_only() {
        let source = sample_source();
        let ctx = PopulateContext {
            source: &source,
            consultant: "J. Smith",
            date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
        };
        let mut lead = Worksheet::new("Lead");
        lead.set_value(CellAddress::new(12, 1), "Procedures");
        let mut wb = Workbook::from_sheets(vec![lead, Worksheet::new("Notes")]);

        let outcome = ComplianceTesting.populate(&mut wb, &ctx).unwrap();
        assert_eq!(outcome.total_rows(), 0);
        let lead = wb.sheet(0).unwrap();
        assert_eq!(lead.value(CellAddress::new(1, 5)), &CellValue::from("J. Smith"));
        assert_eq!(lead.value(CellAddress::new(12, 1)), &CellValue::from("Procedures"));
        assert_eq!(wb.sheet(1).unwrap().cells().count(), 0);
    }
}
