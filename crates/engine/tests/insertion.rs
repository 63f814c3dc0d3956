// Row insertion properties and the template-stamping walkthrough.
// CI: 128 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::BTreeMap;

use auditpaper_engine::cell::{Cell, CellValue, Scalar};
use auditpaper_engine::merge::{reapply, snapshot_and_unmerge, MergeSnapshot};
use auditpaper_engine::stamp::{reset_row_heights, stamp_range};
use auditpaper_engine::style::{rgb, Fill, Style};
use auditpaper_engine::{CellAddress, MergedRegion, Worksheet};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_128() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(128),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

fn arb_literal() -> impl Strategy<Value = CellValue> {
    prop_oneof![
        3 => (-1.0e6..1.0e6f64).prop_map(CellValue::from),
        2 => r"[a-zA-Z ]{1,12}".prop_map(CellValue::from),
        1 => Just(CellValue::Empty),
    ]
}

fn arb_style() -> impl Strategy<Value = Style> {
    (any::<bool>(), proptest::option::of(0u32..0xFFFFFF)).prop_map(|(bold, color)| {
        let mut style = Style::default();
        style.font.bold = bold;
        style.fill = Fill { background: color.map(rgb) };
        style
    })
}

/// Literal-only sheet: (row, col) -> cell, rows 1..=60, columns A..=J.
fn arb_cells() -> impl Strategy<Value = BTreeMap<(u32, u16), Cell>> {
    proptest::collection::btree_map(
        (1u32..=60, 1u16..=10),
        (arb_literal(), arb_style()).prop_map(|(v, s)| Cell::styled(v, s)),
        0..80,
    )
}

fn build_sheet(cells: &BTreeMap<(u32, u16), Cell>) -> Worksheet {
    let mut sheet = Worksheet::new("prop");
    for ((row, col), cell) in cells {
        sheet.set_cell(CellAddress::new(*row, *col), cell.clone());
    }
    sheet
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_128())]
    #[test]
    fn rows_at_or_below_insertion_move_unchanged(
        cells in arb_cells(),
        at_row in 1u32..=70,
        count in 0u32..=25,
    ) {
        let original = build_sheet(&cells);
        let mut sheet = original.clone();
        sheet.insert_rows(at_row, count).unwrap();

        for (addr, cell) in original.cells() {
            let expected_at = if addr.row >= at_row {
                CellAddress::new(addr.row + count, addr.col)
            } else {
                *addr
            };
            prop_assert_eq!(sheet.cell(expected_at), Some(cell), "cell {} moved wrong", addr);
        }
        prop_assert_eq!(sheet.cells().count(), original.cells().count());

        let used_before = original.max_row();
        let expected_max = if used_before >= at_row { used_before + count } else { used_before };
        prop_assert_eq!(sheet.max_row(), expected_max);

        for row in at_row..at_row + count {
            prop_assert_eq!(sheet.row_cells(row).count(), 0);
            prop_assert_eq!(sheet.row_height(row), None);
        }
    }

    #[test]
    fn merges_never_overlap_after_insert(
        at_row in 1u32..=40,
        count in 1u32..=10,
    ) {
        let mut sheet = Worksheet::new("m");
        sheet.add_merge(MergedRegion::parse("A5:C6").unwrap()).unwrap();
        sheet.add_merge(MergedRegion::parse("A7:C7").unwrap()).unwrap();
        sheet.add_merge(MergedRegion::parse("D20:H22").unwrap()).unwrap();

        let snap = snapshot_and_unmerge(&mut sheet, at_row, at_row);
        sheet.insert_rows(at_row, count).unwrap();
        for captured in &snap.regions {
            let shift = if captured.region.min_row >= at_row { count } else { 0 };
            let one = MergeSnapshot { regions: vec![captured.clone()] };
            reapply(&mut sheet, &one, shift).unwrap();
        }

        let merges = sheet.merges();
        for (i, a) in merges.iter().enumerate() {
            for b in &merges[i + 1..] {
                prop_assert!(!a.overlaps(b), "{} overlaps {}", a, b);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Stamping walkthrough
// ---------------------------------------------------------------------------

#[test]
fn stamp_reference_row_across_inserted_block() {
    let mut sheet = Worksheet::new("TP2.1");
    sheet.set_cell(
        CellAddress::new(12, 1),
        Cell::new(CellValue::formula("=SUM(A$12:A$12)")),
    );
    sheet.set_row_height(12, Some(20.0));
    sheet.set_value(CellAddress::new(13, 1), CellValue::formula("=SUM(A12:A13)+B20"));
    sheet.set_value(CellAddress::new(13, 2), Scalar::text("footer"));

    sheet.insert_rows(13, 5).unwrap();
    let warnings = stamp_range(&mut sheet, 12, 13, 5);
    assert!(warnings.is_empty());

    for row in 13..=17 {
        assert_eq!(sheet.row_height(row), Some(20.0));
        assert_eq!(
            sheet.value(CellAddress::new(row, 1)),
            &CellValue::Formula(format!("=SUM(A{row}:A{row})"))
        );
    }
    assert_eq!(
        sheet.value(CellAddress::new(18, 1)),
        &CellValue::Formula("=SUM(A12:A18)+B25".into())
    );
    assert_eq!(sheet.value(CellAddress::new(18, 2)), &CellValue::from("footer"));
    assert_eq!(
        sheet.value(CellAddress::new(12, 1)),
        &CellValue::Formula("=SUM(A$12:A$12)".into())
    );
}

#[test]
fn footer_merges_survive_insertion() {
    let mut sheet = Worksheet::new("TP2.1");
    sheet.add_merge(MergedRegion::parse("A15:E16").unwrap()).unwrap();
    sheet.add_merge(MergedRegion::parse("B24:F26").unwrap()).unwrap();
    sheet.set_row_height(15, Some(33.0));
    sheet.set_row_height(12, Some(20.0));

    let snap = snapshot_and_unmerge(&mut sheet, 15, 26);
    sheet.insert_rows(13, 4).unwrap();
    reapply(&mut sheet, &snap, 4).unwrap();
    reset_row_heights(&mut sheet, 12, [21, 22], true);

    assert!(sheet.merges().contains(&MergedRegion::parse("A19:E20").unwrap()));
    assert!(sheet.merges().contains(&MergedRegion::parse("B28:F30").unwrap()));
    assert_eq!(sheet.row_height(19), Some(33.0));
    assert_eq!(sheet.row_height(21), Some(20.0));
    assert!(sheet.is_row_hidden(12));
}
