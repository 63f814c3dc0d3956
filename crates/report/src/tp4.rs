//! TP4 Confirmation of UIF Contributions: the lead-sheet header, signed off
//! in column F.

use auditpaper_engine::Workbook;

use crate::error::ReportError;
use crate::header::{write_header, SIGNOFF_F};
use crate::populate::{DocumentPopulator, PopulateContext, PopulateOutcome};
use crate::report_type::ReportType;

pub struct ContributionConfirmation;

impl DocumentPopulator for ContributionConfirmation {
    fn report(&self) -> ReportType {
        ReportType::Tp4
    }

    fn populate(
        &self,
        workbook: &mut Workbook,
        ctx: &PopulateContext<'_>,
    ) -> Result<PopulateOutcome, ReportError> {
        write_header(workbook, ctx, SIGNOFF_F)?;
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
    fn signs_off_in_column_f() {
        let source = sample_source();
        let ctx = PopulateContext {
            source: &source,
            consultant: "A. Dlamini",
            date: NaiveDate::from_ymd_opt(2024, 1, 9).unwrap(),
        };
        let mut wb = Workbook::from_sheets(vec![Worksheet::new("Lead")]);
        ContributionConfirmation.populate(&mut wb, &ctx).unwrap();

        let lead = wb.sheet(0).unwrap();
        assert_eq!(lead.value(CellAddress::new(1, 6)), &CellValue::from("A. Dlamini"));
        assert_eq!(lead.value(CellAddress::new(3, 6)), &CellValue::from("2024-01-09"));
        assert_eq!(lead.value(CellAddress::new(2, 2)), &CellValue::from("U123/45"));
    }
}
