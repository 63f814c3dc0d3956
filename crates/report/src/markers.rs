//! Configured sentinel cells and the formulas written beneath them.
//!
//! Block sizes come from the populate outcome, so a marker always spans
//! exactly the rows its table received.

use auditpaper_engine::marker::{conclusion_formula, place_below, table_copy_formula};
use auditpaper_engine::{CellAddress, EngineError, Workbook};
use auditpaper_records::config::{MarkerConfig, MarkerKind};
use auditpaper_records::RecordError;

use crate::error::ReportError;
use crate::populate::PopulateOutcome;

fn invalid(marker: &MarkerConfig, what: &str) -> ReportError {
    RecordError::ConfigValidation(format!("marker '{}': {what}", marker.text)).into()
}

/// Formula for one marker given the populated workbook.
fn marker_formula(
    marker: &MarkerConfig,
    sheet_name: &str,
    outcome: &PopulateOutcome,
) -> Result<String, ReportError> {
    match marker.kind {
        MarkerKind::TableCopy => {
            let source = marker.source_sheet.as_deref().unwrap_or(sheet_name);
            Ok(table_copy_formula(source, marker.start_row, outcome.rows_on(source)))
        }
        MarkerKind::Conclusion => {
            let column = marker.column_index().ok_or_else(|| invalid(marker, "no tick column"))?;
            let cell = |value: &Option<String>, name: &str| {
                value.clone().ok_or_else(|| invalid(marker, &format!("no {name}")))
            };
            Ok(conclusion_formula(
                column,
                marker.start_row,
                outcome.rows_on(sheet_name),
                &cell(&marker.true_cell, "true_cell")?,
                &cell(&marker.partial_cell, "partial_cell")?,
                &cell(&marker.false_cell, "false_cell")?,
            ))
        }
    }
}

/// Place every marker's formula; stops at the first marker that cannot be
/// resolved.
pub fn apply_markers<'a>(
    workbook: &mut Workbook,
    markers: impl IntoIterator<Item = &'a MarkerConfig>,
    outcome: &PopulateOutcome,
) -> Result<Vec<CellAddress>, ReportError> {
    let mut placed = Vec::new();
    for marker in markers {
        let sheet_name = workbook
            .sheet(marker.sheet)
            .map(|s| s.name().to_string())
            .ok_or_else(|| EngineError::UnknownSheet(format!("index {}", marker.sheet)))?;
        let formula = marker_formula(marker, &sheet_name, outcome)?;
        let sheet = workbook.require_sheet_mut(marker.sheet)?;
        let at = place_below(sheet, &marker.text, &formula)?;
        log::debug!("{} marker '{}' resolved at {}!{}", marker.kind, marker.text, sheet_name, at);
        placed.push(at);
    }
    Ok(placed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use auditpaper_engine::{CellValue, Worksheet};

    fn marker(kind: MarkerKind, text: &str) -> MarkerConfig {
        MarkerConfig {
            report: "tp3".into(),
            sheet: 0,
            text: text.into(),
            kind,
            column: Some("U".into()),
            start_row: 15,
            source_sheet: Some("TP3.2".into()),
            true_cell: Some("Data!B3".into()),
            partial_cell: Some("Data!B4".into()),
            false_cell: Some("Data!B5".into()),
        }
    }

    fn workbook() -> Workbook {
        let mut lead = Worksheet::new("TP3.1");
        lead.set_value(CellAddress::parse("B40").unwrap(), "Conclusion");
        lead.set_value(CellAddress::parse("A50").unwrap(), "Table copy");
        Workbook::from_sheets(vec![lead, Worksheet::new("TP3.2")])
    }

    fn outcome() -> PopulateOutcome {
        let mut outcome = PopulateOutcome::default();
        outcome.record_rows("TP3.1", 20, 3);
        outcome.record_rows("TP3.2", 15, 4);
        outcome
    }

    #[test]
    fn places_both_kinds() {
        let mut wb = workbook();
        let markers = vec![
            marker(MarkerKind::Conclusion, "Conclusion"),
            marker(MarkerKind::TableCopy, "Table copy"),
        ];
        let placed = apply_markers(&mut wb, &markers, &outcome()).unwrap();
        assert_eq!(placed, vec![CellAddress::parse("B41").unwrap(), CellAddress::parse("A51").unwrap()]);

        let sheet = wb.sheet(0).unwrap();
        assert_eq!(
            sheet.value(CellAddress::parse("B41").unwrap()),
            &CellValue::Formula(
                "=IF(COUNTIF(U15:U17,\"a\")=ROWS(U15:U17),Data!B3,IF(COUNTIF(U15:U17,\"a\")>0,Data!B4,Data!B5))"
                    .into()
            )
        );
        assert_eq!(
            sheet.value(CellAddress::parse("A51").unwrap()),
            &CellValue::Formula("=ARRAYFORMULA('TP3.2'!A15:AS18)".into())
        );
    }

    #[test]
    fn missing_sentinel() {
        let mut wb = workbook();
        let markers = vec![marker(MarkerKind::Conclusion, "Sign-off")];
        let err = apply_markers(&mut wb, &markers, &outcome()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MarkerNotFound);
    }

    #[test]
    fn unknown_sheet_index() {
        let mut wb = workbook();
        let mut m = marker(MarkerKind::TableCopy, "Table copy");
        m.sheet = 7;
        let err = apply_markers(&mut wb, [&m], &outcome()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
    }
}
