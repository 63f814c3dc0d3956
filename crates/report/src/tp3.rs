//! TP3 Payment Verification.
//!
//! Three sheets behind the lead-sheet header:
//! - TP3.1 (sheet 0): one row per payment reference with month, date and
//!   total, followed by a totals row.
//! - TP3.2 (sheet 1): one row per employee with the amount claimed in each
//!   lockdown period. Period columns are allocated from the export, unused
//!   ones are hidden together with their "paid" mirrors.
//! - TP3.3 (sheet 2): the distinct employee list for sampling.

use std::collections::HashMap;

use auditpaper_engine::address::col_to_letters;
use auditpaper_engine::columns::{hide_empty_columns, Allocation, ColumnAllocator, CLAIMED_POOL, PAID_POOL};
use auditpaper_engine::cond_format::apply_review_highlights;
use auditpaper_engine::{CellAddress, CellValue, Workbook, Worksheet};
use auditpaper_records::aggregate::distinct_by;
use auditpaper_records::model::fields;
use auditpaper_records::periods::{extract_periods, record_period};
use auditpaper_records::{group_and_aggregate, AggregatedRow, GroupSpec, Record, Reducer};

use crate::block::BlockLayout;
use crate::error::ReportError;
use crate::header::{write_header, SIGNOFF_E};
use crate::populate::{
    amount_cell, date_cell, field_cell, scalar_cell, DocumentPopulator, PopulateContext,
    PopulateOutcome,
};
use crate::report_type::ReportType;
use crate::source::SourceData;

const PAYMENTS_FIELDS: &[&str] = &[fields::PAYMENT_DATE, fields::PAY_REF, fields::BANK_PAY_AMOUNT];

const CLAIMS_FIELDS: &[&str] = &[
    fields::IDNUMBER,
    fields::FIRSTNAME,
    fields::LASTNAME,
    fields::TERMINATION_DATE,
    fields::BANK_PAY_AMOUNT,
    fields::SHUTDOWN_TILL,
];

const SAMPLE_FIELDS: &[&str] = &[fields::IDNUMBER, fields::FIRSTNAME, fields::LASTNAME];

const PAYMENTS: BlockLayout = BlockLayout { template_row: 19, first_row: 20, footer: (22, 37) };
const CLAIMS: BlockLayout = BlockLayout { template_row: 14, first_row: 15, footer: (18, 31) };
const SAMPLE: BlockLayout = BlockLayout { template_row: 10, first_row: 11, footer: (13, 23) };

/// Period headings on TP3.2.
const CLAIMS_HEADER_ROW: u32 = 13;
/// Status printed for every employee on TP3.2.
pub const IN_SERVICE: &str = "IN SERVICE";

// Review columns and their legend.
const COL_K: u16 = 11;
const COL_AO: u16 = 41;
const COL_AQ: u16 = 43;
const COL_AS: u16 = 45;

pub struct PaymentVerification;

impl DocumentPopulator for PaymentVerification {
    fn report(&self) -> ReportType {
        ReportType::Tp3
    }

    fn populate(
        &self,
        workbook: &mut Workbook,
        ctx: &PopulateContext<'_>,
    ) -> Result<PopulateOutcome, ReportError> {
        ctx.source.require(PAYMENTS_FIELDS)?;
        ctx.source.require(CLAIMS_FIELDS)?;
        ctx.source.require(SAMPLE_FIELDS)?;

        write_header(workbook, ctx, SIGNOFF_E)?;

        let mut outcome = PopulateOutcome::default();
        populate_payments(workbook.require_sheet_mut(0)?, ctx.source, &mut outcome)?;
        populate_claims(workbook.require_sheet_mut(1)?, ctx.source, &mut outcome)?;
        populate_sample(workbook.require_sheet_mut(2)?, ctx.source, &mut outcome)?;
        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// TP3.1 payments by reference
// ---------------------------------------------------------------------------

fn payment_rows(source: &SourceData) -> Vec<AggregatedRow> {
    let spec = GroupSpec::by(fields::PAY_REF)
        .reduce(fields::PAYMENT_DATE, Reducer::First)
        .reduce(fields::BANK_PAY_AMOUNT, Reducer::Sum)
        .sorted_by(fields::PAY_REF);
    group_and_aggregate(&source.records, &spec)
}

fn populate_payments(
    sheet: &mut Worksheet,
    source: &SourceData,
    outcome: &mut PopulateOutcome,
) -> Result<(), ReportError> {
    let rows = payment_rows(source);
    let block = PAYMENTS.open(sheet, rows.len() as u32, &mut outcome.warnings)?;

    for (row, data) in block.rows().zip(&rows) {
        let paid_on = data.date(fields::PAYMENT_DATE);
        if paid_on.is_none() {
            log::warn!(
                "sheet '{}': payment reference '{}' has no readable payment date",
                sheet.name(),
                data.text(fields::PAY_REF)
            );
        }
        let month = paid_on
            .map(|d| CellValue::from(d.format("%B %Y").to_string()))
            .unwrap_or_default();
        sheet.set_value(CellAddress::new(row, 1), month);
        sheet.set_value(CellAddress::new(row, 2), date_cell(data, fields::PAYMENT_DATE));
        sheet.set_value(CellAddress::new(row, 3), field_cell(data, fields::PAY_REF));
        sheet.set_value(CellAddress::new(row, 4), amount_cell(data, fields::BANK_PAY_AMOUNT));
    }

    let total = block.row_after(2);
    sheet.set_value(CellAddress::new(total, 4), CellValue::formula(block.column_sum("D")));
    sheet.set_value(CellAddress::new(total, 8), CellValue::formula(block.column_sum("H")));
    sheet.set_value(
        CellAddress::new(total, 9),
        CellValue::formula(format!("=D{total} - H{total}")),
    );

    let n = block.len();
    let data_rows = block.rows();
    outcome.record_rows(sheet.name(), block.first_row(), n);
    block.close(sheet, 26..=27 + n)?;
    apply_review_highlights(sheet, data_rows, &[6, 7, 8], COL_K);
    log::debug!("sheet '{}': {} payment references written", sheet.name(), n);
    Ok(())
}

// ---------------------------------------------------------------------------
// TP3.2 claims per employee and period
// ---------------------------------------------------------------------------

/// One employee's line on TP3.2.
#[derive(Debug, Clone)]
struct ClaimLine {
    /// First record seen for the employee.
    employee: Record,
    /// Claimed total per allocated column.
    claimed: Vec<(u16, f64)>,
}

/// Employees in ascending ID order, each with a claimed sum (possibly zero)
/// for every allocated period. Records without a usable period add nobody.
fn claim_lines(records: &[Record], allocation: &Allocation) -> Vec<ClaimLine> {
    let columns: Vec<u16> = allocation.claimed.iter().map(|slot| slot.column).collect();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut lines: Vec<ClaimLine> = Vec::new();

    for record in records {
        let Some(id) = record.get(fields::IDNUMBER) else { continue };
        let Some(period) = record_period(record) else { continue };
        let slot = *index.entry(id.to_string()).or_insert_with(|| {
            lines.push(ClaimLine {
                employee: record.clone(),
                claimed: columns.iter().map(|c| (*c, 0.0)).collect(),
            });
            lines.len() - 1
        });

        let Some(column) = allocation.claimed_column(&period) else { continue };
        let amount = record.number(fields::BANK_PAY_AMOUNT).unwrap_or(0.0);
        if let Some(entry) = lines[slot].claimed.iter_mut().find(|(c, _)| *c == column) {
            entry.1 += amount;
        }
    }
    lines.sort_by_cached_key(|line| id_sort_key(&line.employee));
    lines
}

/// Numeric IDs order by value ahead of anything non-numeric.
fn id_sort_key(record: &Record) -> (bool, u128, String) {
    let id = record.get(fields::IDNUMBER).map(|v| v.to_string()).unwrap_or_default();
    let id = id.trim().to_string();
    match id.parse::<u128>() {
        Ok(n) => (false, n, id),
        Err(_) => (true, 0, id),
    }
}

fn populate_claims(
    sheet: &mut Worksheet,
    source: &SourceData,
    outcome: &mut PopulateOutcome,
) -> Result<(), ReportError> {
    let allocation = ColumnAllocator::default().allocate(&extract_periods(&source.records));
    outcome.truncated_periods.extend(allocation.truncated.iter().copied());
    allocation.write_headers(sheet, CLAIMS_HEADER_ROW);

    let lines = claim_lines(&source.records, &allocation);
    let block = CLAIMS.open(sheet, lines.len() as u32, &mut outcome.warnings)?;

    for ((row, index), line) in block.numbered_rows().zip(&lines) {
        let pick = |field: &str| scalar_cell(line.employee.get(field));
        sheet.set_value(CellAddress::new(row, 1), index as f64);
        sheet.set_value(CellAddress::new(row, 2), pick(fields::IDNUMBER));
        sheet.set_value(CellAddress::new(row, 3), CellValue::Empty);
        sheet.set_value(CellAddress::new(row, 4), pick(fields::FIRSTNAME));
        sheet.set_value(CellAddress::new(row, 5), pick(fields::LASTNAME));
        sheet.set_value(CellAddress::new(row, 6), IN_SERVICE);
        for (column, amount) in &line.claimed {
            sheet.set_value(CellAddress::new(row, *column), *amount);
        }
    }

    let total = block.row_after(1);
    let summed = CLAIMED_POOL.columns().chain(PAID_POOL.columns()).chain([COL_AQ]);
    for col in summed {
        let formula = block.column_sum(&col_to_letters(col));
        sheet.set_value(CellAddress::new(total, col), CellValue::formula(formula));
    }
    sheet.set_value(
        CellAddress::new(total, CLAIMED_POOL.end()),
        CellValue::formula(format!("=SUM(G{total}:V{total})")),
    );
    sheet.set_value(
        CellAddress::new(total, PAID_POOL.end()),
        CellValue::formula(format!("=SUM(Y{total}:AO{total})")),
    );

    let n = block.len();
    let data_rows = block.rows();
    let first_row = block.first_row();
    outcome.record_rows(sheet.name(), first_row, n);
    block.close(sheet, 18..=31 + n)?;

    let review: Vec<u16> = (1..=COL_AO).collect();
    apply_review_highlights(sheet, data_rows, &review, COL_AS);
    // An empty block gives an empty row range, so every period column hides.
    let last_row = first_row + n - 1;
    hide_empty_columns(sheet, first_row, last_row, CLAIMED_POOL.columns(), PAID_POOL.first);
    log::debug!(
        "sheet '{}': {} employees over {} periods",
        sheet.name(),
        n,
        allocation.claimed.len()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// TP3.3 employee sample
// ---------------------------------------------------------------------------

fn sample_rows(source: &SourceData) -> Vec<Record> {
    let mut rows = distinct_by(&source.records, fields::IDNUMBER);
    rows.sort_by(|a, b| {
        let key = |r: &Record| r.get(fields::LASTNAME).cloned();
        match (key(a), key(b)) {
            (Some(x), Some(y)) => x.compare(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
    });
    rows
}

fn populate_sample(
    sheet: &mut Worksheet,
    source: &SourceData,
    outcome: &mut PopulateOutcome,
) -> Result<(), ReportError> {
    let rows = sample_rows(source);
    let block = SAMPLE.open(sheet, rows.len() as u32, &mut outcome.warnings)?;

    for ((row, index), record) in block.numbered_rows().zip(&rows) {
        let cells = [
            (1, CellValue::from(index as f64)),
            (2, scalar_cell(record.get(fields::IDNUMBER))),
            (3, scalar_cell(record.get(fields::FIRSTNAME))),
            (4, scalar_cell(record.get(fields::LASTNAME))),
        ];
        for (col, value) in cells {
            sheet.set_value_merged(CellAddress::new(row, col), value);
        }
    }

    let n = block.len();
    let data_rows = block.rows();
    apply_review_highlights(sheet, data_rows, &[6, 8], COL_K);
    outcome.record_rows(sheet.name(), block.first_row(), n);
    block.close(sheet, 13..=23 + n)?;
    log::debug!("sheet '{}': {} employees listed", sheet.name(), n);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::tests::sample_source;
    use auditpaper_engine::cond_format::{Predicate, EMPTY_CELL_FILL};
    use auditpaper_engine::{MergedRegion, Period, Scalar};
    use chrono::{Duration, NaiveDate};

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    fn template() -> Workbook {
        let mut payments = Worksheet::new("TP3.1");
        payments.add_merge(MergedRegion::parse("B1:C1").unwrap()).unwrap();
        payments.set_value(addr("E19"), CellValue::formula("=D19-H19"));
        payments.set_row_height(19, Some(17.0));
        payments.add_merge(MergedRegion::parse("A24:I26").unwrap()).unwrap();

        let mut claims = Worksheet::new("TP3.2");
        claims.set_row_height(14, Some(16.0));
        claims.add_merge(MergedRegion::parse("A18:F19").unwrap()).unwrap();

        let mut sample = Worksheet::new("TP3.3");
        sample.set_row_height(10, Some(20.0));
        sample.add_merge(MergedRegion::parse("A13:H14").unwrap()).unwrap();

        Workbook::from_sheets(vec![payments, claims, sample])
    }

    fn ctx(source: &SourceData) -> PopulateContext<'_> {
        PopulateContext {
            source,
            consultant: "J. Smith",
            date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
        }
    }

    fn run() -> (Workbook, PopulateOutcome) {
        let source = sample_source();
        let mut wb = template();
        let outcome = PaymentVerification.populate(&mut wb, &ctx(&source)).unwrap();
        (wb, outcome)
    }

    #[test]
    fn payments_grouped_by_reference() {
        let (wb, outcome) = run();
        let sheet = wb.sheet(0).unwrap();
        assert_eq!(outcome.rows_on("TP3.1"), 2);

        // Header shares the sheet.
        assert_eq!(sheet.value(addr("B1")), &CellValue::from("Acme Bakery"));
        assert!(sheet.merges().contains(&MergedRegion::parse("B1:C1").unwrap()));

        // REF-A sorts first.
        assert_eq!(sheet.value(addr("A20")), &CellValue::from("May 2020"));
        assert_eq!(
            sheet.value(addr("B20")),
            &CellValue::from(NaiveDate::from_ymd_opt(2020, 5, 20).unwrap())
        );
        assert_eq!(sheet.value(addr("C20")), &CellValue::from("REF-A"));
        assert_eq!(sheet.value(addr("D20")), &CellValue::from(500.0));
        assert_eq!(sheet.value(addr("C21")), &CellValue::from("REF-B"));
        assert_eq!(sheet.value(addr("D21")), &CellValue::from(1750.5));
        assert_eq!(sheet.value(addr("E21")), &CellValue::Formula("=D21-H21".into()));

        assert_eq!(sheet.value(addr("D24")), &CellValue::Formula("=SUM(D20:D21)".into()));
        assert_eq!(sheet.value(addr("H24")), &CellValue::Formula("=SUM(H20:H21)".into()));
        assert_eq!(sheet.value(addr("I24")), &CellValue::Formula("=D24 - H24".into()));

        assert!(sheet.merges().contains(&MergedRegion::parse("A26:I28").unwrap()));
        assert!(sheet.is_row_hidden(19));
        assert_eq!(sheet.row_height(29), Some(17.0));

        // Three review columns plus the legend, per data row.
        assert_eq!(sheet.conditional_rules().len(), 8);
        assert_eq!(sheet.conditional_rules()[0].fill, EMPTY_CELL_FILL);
    }

    #[test]
    fn claims_per_period() {
        let (wb, outcome) = run();
        let sheet = wb.sheet(1).unwrap();
        assert_eq!(outcome.rows_on("TP3.2"), 2);
        assert!(outcome.truncated_periods.is_empty());

        assert_eq!(sheet.value(addr("G13")), &CellValue::from("27 March 2020 to 16 April 2020"));
        assert_eq!(sheet.value(addr("H13")), &CellValue::from("17 April 2020 to 30 April 2020"));
        assert_eq!(
            sheet.value(addr("Y13")),
            &CellValue::from("27 March 2020 to 16 April 2020 (PAID)")
        );

        // Ascending ID: 7002 then 8001.
        assert_eq!(sheet.value(addr("A15")), &CellValue::from(1.0));
        assert_eq!(sheet.value(addr("B15")), &CellValue::from("7002"));
        assert_eq!(sheet.value(addr("F15")), &CellValue::from(IN_SERVICE));
        assert_eq!(sheet.value(addr("G15")), &CellValue::from(750.5));
        assert_eq!(sheet.value(addr("H15")), &CellValue::from(0.0));
        assert!(sheet.value(addr("Y15")).is_empty());
        assert_eq!(sheet.value(addr("A16")), &CellValue::from(2.0));
        assert_eq!(sheet.value(addr("B16")), &CellValue::from("8001"));
        assert_eq!(sheet.value(addr("D16")), &CellValue::from("Thandi"));
        assert_eq!(sheet.value(addr("G16")), &CellValue::from(1000.0));
        assert_eq!(sheet.value(addr("H16")), &CellValue::from(500.0));

        assert_eq!(sheet.value(addr("G18")), &CellValue::Formula("=SUM(G15:G16)".into()));
        assert_eq!(sheet.value(addr("AO18")), &CellValue::Formula("=SUM(AO15:AO16)".into()));
        assert_eq!(sheet.value(addr("AQ18")), &CellValue::Formula("=SUM(AQ15:AQ16)".into()));
        assert_eq!(sheet.value(addr("W18")), &CellValue::Formula("=SUM(G18:V18)".into()));
        assert_eq!(sheet.value(addr("AP18")), &CellValue::Formula("=SUM(Y18:AO18)".into()));

        // G and H hold data, so Y and Z stay; I..V and their mirrors AA..AN hide.
        assert!(!sheet.is_col_hidden(7));
        assert!(!sheet.is_col_hidden(8));
        assert!(sheet.is_col_hidden(9));
        assert!(sheet.is_col_hidden(22));
        assert!(!sheet.is_col_hidden(25));
        assert!(!sheet.is_col_hidden(26));
        assert!((27..=40).all(|col| sheet.is_col_hidden(col)));

        assert!(sheet.merges().contains(&MergedRegion::parse("A20:F21").unwrap()));
        assert!(sheet.is_row_hidden(14));
        assert_eq!(sheet.row_height(33), Some(16.0));

        let legend = sheet
            .conditional_rules()
            .iter()
            .filter(|r| r.predicate == Predicate::Equals(Scalar::text("r")))
            .count();
        assert_eq!(legend, 2);
        assert_eq!(sheet.conditional_rules().len(), 2 * 41 + 2);
    }

    #[test]
    fn sample_distinct_and_sorted() {
        let (wb, _) = run();
        let sheet = wb.sheet(2).unwrap();
        assert_eq!(sheet.value(addr("A11")), &CellValue::from(1.0));
        assert_eq!(sheet.value(addr("B11")), &CellValue::from("7002"));
        assert_eq!(sheet.value(addr("D11")), &CellValue::from("Botha"));
        assert_eq!(sheet.value(addr("B12")), &CellValue::from("8001"));
        assert!(sheet.merges().contains(&MergedRegion::parse("A15:H16").unwrap()));
        assert!(sheet.is_row_hidden(10));
        assert_eq!(sheet.row_height(25), Some(20.0));
        assert_eq!(sheet.conditional_rules().len(), 6);
    }

    #[test]
    fn claim_lines_skip_unallocated_periods() {
        let start = NaiveDate::from_ymd_opt(2020, 3, 27).unwrap();
        let periods: Vec<Period> = (0..20)
            .map(|i| {
                let from = start + Duration::days(10 * i);
                Period::new(from, from + Duration::days(5))
            })
            .collect();
        let allocation = ColumnAllocator::default().allocate(&periods);
        assert_eq!(allocation.claimed.len(), 16);
        assert_eq!(allocation.truncated.len(), 4);

        let last = periods[19];
        let record = Record::new()
            .with(fields::IDNUMBER, "1")
            .with(fields::BANK_PAY_AMOUNT, "10")
            .with(fields::SHUTDOWN_FROM, last.from)
            .with(fields::SHUTDOWN_TILL, last.till);
        let lines = claim_lines(&[record], &allocation);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].claimed.iter().all(|(_, amount)| *amount == 0.0));
    }

    #[test]
    fn claim_lines_sorted_by_id_without_periodless_employees() {
        let allocation = ColumnAllocator::default().allocate(&[Period::new(
            NaiveDate::from_ymd_opt(2020, 3, 27).unwrap(),
            NaiveDate::from_ymd_opt(2020, 4, 16).unwrap(),
        )]);
        let employee = |id: &str| {
            Record::new()
                .with(fields::IDNUMBER, id)
                .with(fields::BANK_PAY_AMOUNT, "10")
                .with(fields::SHUTDOWN_FROM, "2020-03-27")
                .with(fields::SHUTDOWN_TILL, "2020-04-16")
        };
        let records = [
            employee("900"),
            Record::new().with(fields::IDNUMBER, "100").with(fields::BANK_PAY_AMOUNT, "5"),
            employee("25"),
            employee("900"),
        ];

        let lines = claim_lines(&records, &allocation);
        let ids: Vec<String> = lines
            .iter()
            .map(|l| l.employee.get(fields::IDNUMBER).unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["25", "900"]);
        assert_eq!(lines[1].claimed, vec![(7, 20.0)]);
    }

    #[test]
    fn empty_export_writes_zero_totals() {
        let source = crate::source::tests::sample_source();
        let empty = SourceData { records: Vec::new(), ..source };
        let mut wb = template();
        let outcome = PaymentVerification.populate(&mut wb, &ctx(&empty)).unwrap();
        assert_eq!(outcome.total_rows(), 0);

        let payments = wb.sheet(0).unwrap();
        assert_eq!(payments.value(addr("D22")), &CellValue::Formula("=0".into()));
        let claims = wb.sheet(1).unwrap();
        assert_eq!(claims.value(addr("G16")), &CellValue::Formula("=0".into()));
        assert!(claims.is_col_hidden(7));
    }
}
