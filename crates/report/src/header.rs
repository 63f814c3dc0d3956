//! Company block at the top of the lead sheet.

use auditpaper_engine::merge::{reapply, snapshot_and_unmerge};
use auditpaper_engine::{CellAddress, Workbook};

use crate::error::ReportError;
use crate::populate::PopulateContext;

/// Written to `B4`; the reviewer fills in the detail.
pub const PERIODS_CAPTION: &str = "Lockdown Periods";

/// Column that carries consultant (row 1) and date (row 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderLayout {
    pub signoff_col: u16,
}

/// TP1 and TP3 sign off in column E.
pub const SIGNOFF_E: HeaderLayout = HeaderLayout { signoff_col: 5 };
/// TP4 signs off in column F.
pub const SIGNOFF_F: HeaderLayout = HeaderLayout { signoff_col: 6 };

pub fn write_header(
    workbook: &mut Workbook,
    ctx: &PopulateContext<'_>,
    layout: HeaderLayout,
) -> Result<(), ReportError> {
    let lead = workbook.require_sheet_mut(0)?;
    let merges = snapshot_and_unmerge(lead, 1, 4);

    let summary = &ctx.source.summary;
    lead.set_value(CellAddress::new(1, 2), summary.trade_name.as_str());
    lead.set_value(CellAddress::new(2, 2), summary.uif_reference.as_str());
    lead.set_value(CellAddress::new(4, 2), PERIODS_CAPTION);
    lead.set_value(
        CellAddress::new(3, layout.signoff_col),
        ctx.date.format("%Y-%m-%d").to_string(),
    );
    lead.set_value(CellAddress::new(1, layout.signoff_col), ctx.consultant);

    reapply(lead, &merges, 0)?;
    log::debug!(
        "sheet '{}': header written for '{}' ({})",
        lead.name(),
        summary.trade_name,
        summary.uif_reference
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::tests::sample_source;
    use auditpaper_engine::{CellValue, MergedRegion, Worksheet};
    use chrono::NaiveDate;

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    #[test]
    fn header_survives_merges() {
        let mut lead = Worksheet::new("Lead");
        lead.add_merge(MergedRegion::parse("B1:C1").unwrap()).unwrap();
        lead.add_merge(MergedRegion::parse("E3:G3").unwrap()).unwrap();
        let mut wb = Workbook::from_sheets(vec![lead]);

        let source = sample_source();
        let ctx = PopulateContext {
            source: &source,
            consultant: "J. Smith",
            date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
        };
        write_header(&mut wb, &ctx, SIGNOFF_E).unwrap();

        let lead = wb.sheet(0).unwrap();
        assert_eq!(lead.value(addr("B1")), &CellValue::from("Acme Bakery"));
        assert_eq!(lead.value(addr("B2")), &CellValue::from("U123/45"));
        assert_eq!(lead.value(addr("B4")), &CellValue::from("Lockdown Periods"));
        assert_eq!(lead.value(addr("E3")), &CellValue::from("2024-07-01"));
        assert_eq!(lead.value(addr("E1")), &CellValue::from("J. Smith"));
        assert_eq!(lead.merges().len(), 2);
    }

    #[test]
    fn tp4_uses_column_f() {
        let mut wb = Workbook::from_sheets(vec![Worksheet::new("Lead")]);
        let source = sample_source();
        let ctx = PopulateContext {
            source: &source,
            consultant: "J. Smith",
            date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
        };
        write_header(&mut wb, &ctx, SIGNOFF_F).unwrap();
        let lead = wb.sheet(0).unwrap();
        assert_eq!(lead.value(addr("F1")), &CellValue::from("J. Smith"));
        assert!(lead.value(addr("E1")).is_empty());
    }

    #[test]
    fn missing_lead_sheet() {
        let mut wb = Workbook::new();
        let source = sample_source();
        let ctx = PopulateContext {
            source: &source,
            consultant: "",
            date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
        };
        let err = write_header(&mut wb, &ctx, SIGNOFF_E).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Structural);
    }
}
