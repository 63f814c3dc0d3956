//! TP2 Employment Verification Testing: per-employee detail (TP2.1) and the
//! employee register (TP2.2). No lead-sheet header.

use auditpaper_engine::{CellAddress, CellValue, Workbook, Worksheet};
use auditpaper_records::model::fields;
use auditpaper_records::{group_and_aggregate, AggregatedRow, GroupSpec, Reducer};

use crate::block::BlockLayout;
use crate::error::ReportError;
use crate::populate::{
    amount_cell, date_cell, field_cell, DocumentPopulator, PopulateContext, PopulateOutcome,
};
use crate::report_type::ReportType;
use crate::source::SourceData;

const DETAIL_FIELDS: &[&str] = &[
    fields::IDNUMBER,
    fields::FIRSTNAME,
    fields::LASTNAME,
    fields::EMPLOYMENT_START_DATE,
    fields::TERMINATION_DATE,
    fields::BANK_PAY_AMOUNT,
    fields::LEAVE_INCOME,
    fields::MONTHLY_SALARY,
];

const REGISTER_FIELDS: &[&str] = &[
    fields::IDNUMBER,
    fields::LASTNAME,
    fields::FIRSTNAME,
    fields::EMPLOYMENT_START_DATE,
];

const DETAIL: BlockLayout = BlockLayout { template_row: 12, first_row: 13, footer: (15, 26) };
const REGISTER: BlockLayout = BlockLayout { template_row: 13, first_row: 14, footer: (16, 27) };

pub struct EmploymentVerification;

impl DocumentPopulator for EmploymentVerification {
    fn report(&self) -> ReportType {
        ReportType::Tp2
    }

    fn populate(
        &self,
        workbook: &mut Workbook,
        ctx: &PopulateContext<'_>,
    ) -> Result<PopulateOutcome, ReportError> {
        ctx.source.require(DETAIL_FIELDS)?;
        ctx.source.require(REGISTER_FIELDS)?;

        let mut outcome = PopulateOutcome::default();
        populate_detail(workbook.require_sheet_mut(0)?, ctx.source, &mut outcome)?;
        populate_register(workbook.require_sheet_mut(1)?, ctx.source, &mut outcome)?;
        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// TP2.1
// ---------------------------------------------------------------------------

fn detail_rows(source: &SourceData) -> Vec<AggregatedRow> {
    let spec = GroupSpec::by(fields::IDNUMBER)
        .reduce(fields::FIRSTNAME, Reducer::First)
        .reduce(fields::LASTNAME, Reducer::First)
        .reduce(fields::EMPLOYMENT_START_DATE, Reducer::First)
        .reduce(fields::TERMINATION_DATE, Reducer::Min)
        .reduce(fields::BANK_PAY_AMOUNT, Reducer::Sum)
        .reduce(fields::LEAVE_INCOME, Reducer::Sum)
        .reduce(fields::MONTHLY_SALARY, Reducer::First)
        .sorted_by(fields::LASTNAME);
    group_and_aggregate(&source.records, &spec)
}

fn populate_detail(
    sheet: &mut Worksheet,
    source: &SourceData,
    outcome: &mut PopulateOutcome,
) -> Result<(), ReportError> {
    let rows = detail_rows(source);
    let block = DETAIL.open(sheet, rows.len() as u32, &mut outcome.warnings)?;

    // Column D is left to the reviewer.
    for (row, data) in block.rows().zip(&rows) {
        let cells = [
            (1, field_cell(data, fields::IDNUMBER)),
            (2, field_cell(data, fields::FIRSTNAME)),
            (3, field_cell(data, fields::LASTNAME)),
            (5, date_cell(data, fields::EMPLOYMENT_START_DATE)),
            (6, date_cell(data, fields::TERMINATION_DATE)),
            (7, amount_cell(data, fields::BANK_PAY_AMOUNT)),
            (8, amount_cell(data, fields::LEAVE_INCOME)),
            (9, field_cell(data, fields::MONTHLY_SALARY)),
        ];
        for (col, value) in cells {
            sheet.set_value(CellAddress::new(row, col), value);
        }
    }

    outcome.record_rows(sheet.name(), block.first_row(), block.len());
    block.close(sheet, 17..=18)?;
    log::debug!("sheet '{}': {} employees written", sheet.name(), rows.len());
    Ok(())
}

// ---------------------------------------------------------------------------
// TP2.2
// ---------------------------------------------------------------------------

fn register_rows(source: &SourceData) -> Vec<AggregatedRow> {
    let spec = GroupSpec::by(fields::IDNUMBER)
        .reduce(fields::LASTNAME, Reducer::First)
        .reduce(fields::FIRSTNAME, Reducer::First)
        .reduce(fields::EMPLOYMENT_START_DATE, Reducer::First)
        .sorted_by(fields::LASTNAME);
    group_and_aggregate(&source.records, &spec)
}

/// First letter of the first name followed by the first letter of the
/// surname.
fn initials(first: &str, last: &str) -> String {
    [first, last]
        .iter()
        .filter_map(|name| name.trim().chars().next())
        .collect()
}

fn populate_register(
    sheet: &mut Worksheet,
    source: &SourceData,
    outcome: &mut PopulateOutcome,
) -> Result<(), ReportError> {
    let rows = register_rows(source);
    let block = REGISTER.open(sheet, rows.len() as u32, &mut outcome.warnings)?;

    for ((row, index), data) in block.numbered_rows().zip(&rows) {
        let first = data.text(fields::FIRSTNAME);
        let last = data.text(fields::LASTNAME);
        let cells = [
            (1, CellValue::from(index as f64)),
            (2, CellValue::Empty),
            (3, field_cell(data, fields::IDNUMBER)),
            (4, field_cell(data, fields::LASTNAME)),
            (5, field_cell(data, fields::FIRSTNAME)),
            (6, CellValue::from(initials(&first, &last))),
            (7, date_cell(data, fields::EMPLOYMENT_START_DATE)),
        ];
        for (col, value) in cells {
            sheet.set_value(CellAddress::new(row, col), value);
        }
    }

    outcome.record_rows(sheet.name(), block.first_row(), block.len());
    block.close(sheet, 18..=19)?;
    log::debug!("sheet '{}': {} register rows written", sheet.name(), rows.len());
    Ok(())
}
