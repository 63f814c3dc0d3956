// Write a workbook with rust_xlsxwriter, load it back through calamine and
// the layout parser, and check what a template author relies on survives.

use auditpaper_engine::address::CellRange;
use auditpaper_engine::cell::{CellValue, Scalar};
use auditpaper_engine::cond_format::{ConditionalRule, Predicate, EMPTY_CELL_FILL, LEGEND_FILL};
use auditpaper_engine::style::{rgb, BorderStyle, Style};
use auditpaper_engine::{CellAddress, MergedRegion, Workbook, Worksheet};
use auditpaper_io::{load_template, write_workbook};
use chrono::NaiveDate;

fn addr(s: &str) -> CellAddress {
    CellAddress::parse(s).unwrap()
}

fn sample_workbook() -> Workbook {
    let mut lead = Worksheet::new("Lead");
    lead.set_value(addr("B1"), "Acme Holdings");
    lead.set_value(addr("B2"), "UIF-0042");
    lead.set_value(addr("C5"), 1250.5);
    lead.set_value(addr("C6"), NaiveDate::from_ymd_opt(2020, 4, 16).unwrap());
    lead.set_value(addr("C7"), CellValue::formula("=SUM(C5:C5)"));
    lead.add_merge(MergedRegion::parse("A10:E11").unwrap()).unwrap();
    lead.set_value(addr("A10"), "Conclusion");

    let mut bold = Style::default();
    bold.font.bold = true;
    bold.border.bottom.style = BorderStyle::Thin;
    bold.number_format = "#,##0.00".into();
    lead.set_style(addr("C5"), bold);

    let mut tp = Worksheet::new("TP 3.2");
    tp.set_value(addr("A15"), "Acme");
    tp.set_row_height(14, Some(22.5));
    tp.set_row_hidden(14, true);
    tp.set_col_hidden(7, true);
    tp.set_col_width(1, 18.0);
    tp.add_conditional_rule(ConditionalRule::new(
        CellRange::parse("A15:C15").unwrap(),
        Predicate::IsEmpty,
        EMPTY_CELL_FILL,
    ));
    tp.add_conditional_rule(ConditionalRule::new(
        CellRange::parse("AS15").unwrap(),
        Predicate::Equals(Scalar::text("r")),
        LEGEND_FILL,
    ));

    Workbook::from_sheets(vec![lead, tp])
}

#[test]
fn written_workbook_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("paper.xlsx");

    let written = write_workbook(&sample_workbook(), &path).unwrap();
    assert_eq!(written.sheets_written, 2);
    assert_eq!(written.formulas_written, 1);
    assert_eq!(written.merges_written, 1);
    assert_eq!(written.conditional_formats_written, 2);

    let (wb, summary) = load_template(&path).unwrap();
    assert_eq!(summary.sheets_loaded, 2);
    assert_eq!(wb.sheet_names(), vec!["Lead", "TP 3.2"]);

    let lead = wb.sheet_by_name("Lead").unwrap();
    assert_eq!(lead.value(addr("B1")), &CellValue::from("Acme Holdings"));
    assert_eq!(lead.value(addr("C5")), &CellValue::from(1250.5));
    assert_eq!(
        lead.value(addr("C6")),
        &CellValue::from(NaiveDate::from_ymd_opt(2020, 4, 16).unwrap())
    );
    assert_eq!(lead.value(addr("C7")), &CellValue::Formula("=SUM(C5:C5)".into()));
    assert_eq!(lead.merges(), &[MergedRegion::parse("A10:E11").unwrap()]);
    assert_eq!(lead.value(addr("A10")), &CellValue::from("Conclusion"));

    let c5 = lead.style(addr("C5")).unwrap();
    assert!(c5.font.bold);
    assert_eq!(c5.border.bottom.style, BorderStyle::Thin);
    assert_eq!(c5.number_format, "#,##0.00");

    let tp = wb.sheet_by_name("TP 3.2").unwrap();
    assert_eq!(tp.value(addr("A15")), &CellValue::from("Acme"));
    assert_eq!(tp.row_height(14), Some(22.5));
    assert!(tp.is_row_hidden(14));
    assert!(tp.is_col_hidden(7));
    assert_eq!(tp.col_width(1), Some(18.0));

    let rules = tp.conditional_rules();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].range, CellRange::parse("A15:C15").unwrap());
    assert_eq!(rules[0].predicate, Predicate::IsEmpty);
    assert_eq!(rules[0].fill.background, Some(rgb(0xFFCCCC)));
    assert!(rules[0].stop_if_true);
    assert_eq!(rules[1].predicate, Predicate::Equals(Scalar::text("r")));
    assert_eq!(rules[1].fill.background, Some(rgb(0xFF0000)));
}

#[test]
fn load_rejects_non_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.xlsx");
    std::fs::write(&path, b"not a zip").unwrap();
    assert!(load_template(&path).is_err());
}
