//! `apaper summary` and `apaper inspect`: read-only views of an export and
//! of a template.

use std::path::Path;

use auditpaper_engine::marker::find_marker;
use auditpaper_engine::{Workbook, Worksheet};
use auditpaper_io::load_template;
use auditpaper_records::{CompanySummary, RunConfig};
use auditpaper_report::{ReportType, SourceData};
use serde::Serialize;

use crate::settings::load_config;
use crate::CliError;

// ---------------------------------------------------------------------------
// summary
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct SummaryOutput<'a> {
    input: &'a Path,
    records: usize,
    periods_label: String,
    #[serde(flatten)]
    summary: &'a CompanySummary,
}

pub fn cmd_summary(config_path: Option<&Path>, input: &Path, json: bool) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let filter = config.as_ref().map(|c| c.filter).unwrap_or_default();
    let source = SourceData::load(input, &filter)?;
    print_summary(input, &source, json)
}

fn print_summary(input: &Path, source: &SourceData, json: bool) -> Result<(), CliError> {
    let summary = &source.summary;
    if json {
        let out = SummaryOutput {
            input,
            records: source.records.len(),
            periods_label: summary.periods_label(),
            summary,
        };
        let text = serde_json::to_string_pretty(&out).map_err(|e| CliError::io(e.to_string()))?;
        println!("{}", text);
        return Ok(());
    }

    println!("Company:    {}", summary.trade_name);
    println!("Reference:  {}", summary.uif_reference);
    println!("Periods:    {}", summary.periods_label());
    println!("Employees:  {}", summary.employee_count);
    println!("Records:    {}", source.records.len());
    println!("Total paid: {:.2}", summary.total_amount);
    Ok(())
}

// ---------------------------------------------------------------------------
// inspect
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SheetInfo {
    index: usize,
    name: String,
    max_row: u32,
    max_col: u16,
    merges: Vec<String>,
    conditional_rules: usize,
    hidden_rows: Vec<u32>,
    hidden_cols: Vec<u16>,
}

impl SheetInfo {
    fn new(index: usize, sheet: &Worksheet) -> Self {
        Self {
            index,
            name: sheet.name().to_string(),
            max_row: sheet.max_row(),
            max_col: sheet.max_col(),
            merges: sheet.merges().iter().map(ToString::to_string).collect(),
            conditional_rules: sheet.conditional_rules().len(),
            hidden_rows: sheet.hidden_rows().iter().copied().collect(),
            hidden_cols: sheet.hidden_cols().iter().copied().collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct MarkerCheck {
    sheet: usize,
    text: String,
    kind: String,
    /// Cell holding the marker text, `None` when absent.
    found_at: Option<String>,
}

fn check_markers(workbook: &Workbook, config: &RunConfig, report: ReportType) -> Vec<MarkerCheck> {
    config
        .markers_for(report.key())
        .map(|marker| MarkerCheck {
            sheet: marker.sheet,
            text: marker.text.clone(),
            kind: marker.kind.to_string(),
            found_at: workbook
                .sheet(marker.sheet)
                .and_then(|sheet| find_marker(sheet, &marker.text).ok())
                .map(|at| at.to_string()),
        })
        .collect()
}

#[derive(Serialize)]
struct InspectOutput {
    template: String,
    loaded: String,
    sheets: Vec<SheetInfo>,
    markers: Vec<MarkerCheck>,
}

pub fn cmd_inspect(
    config_path: Option<&Path>,
    template: &Path,
    report: Option<&str>,
    json: bool,
) -> Result<(), CliError> {
    let report = report
        .map(str::parse::<ReportType>)
        .transpose()
        .map_err(CliError::args)?;
    let config = match report {
        Some(_) => load_config(config_path)?,
        None => None,
    };

    let (workbook, loaded) = load_template(template).map_err(CliError::io)?;
    let sheets: Vec<SheetInfo> = workbook
        .sheets()
        .iter()
        .enumerate()
        .map(|(i, sheet)| SheetInfo::new(i, sheet))
        .collect();
    let markers = match (&config, report) {
        (Some(config), Some(report)) => check_markers(&workbook, config, report),
        _ => Vec::new(),
    };
    let missing = markers.iter().filter(|m| m.found_at.is_none()).count();

    if json {
        let out = InspectOutput {
            template: template.display().to_string(),
            loaded: loaded.summary(),
            sheets,
            markers,
        };
        let text = serde_json::to_string_pretty(&out).map_err(|e| CliError::io(e.to_string()))?;
        println!("{}", text);
    } else {
        println!("{}: {}", template.display(), loaded.summary());
        for sheet in &sheets {
            println!(
                "  [{}] {:<24} {} rows x {} cols, {} merges, {} rules",
                sheet.index,
                sheet.name,
                sheet.max_row,
                sheet.max_col,
                sheet.merges.len(),
                sheet.conditional_rules
            );
        }
        for marker in &markers {
            match &marker.found_at {
                Some(at) => println!("  marker '{}' ({}) on sheet {} at {}", marker.text, marker.kind, marker.sheet, at),
                None => println!("  marker '{}' ({}) on sheet {} NOT FOUND", marker.text, marker.kind, marker.sheet),
            }
        }
    }

    if missing > 0 {
        return Err(CliError {
            code: crate::exit_codes::EXIT_MARKER_NOT_FOUND,
            message: format!("{missing} configured marker(s) not found in {}", template.display()),
            hint: None,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use auditpaper_engine::{CellAddress, MergedRegion};

    #[test]
    fn sheet_info_lists_layout() {
        let mut sheet = Worksheet::new("TP3.1");
        sheet.set_value(CellAddress::parse("C20").unwrap(), "x");
        sheet.add_merge(MergedRegion::parse("A24:D25").unwrap()).unwrap();
        sheet.set_row_hidden(19, true);

        let info = SheetInfo::new(0, &sheet);
        assert_eq!(info.name, "TP3.1");
        assert_eq!(info.max_row, 25);
        assert_eq!(info.merges, vec!["A24:D25".to_string()]);
        assert_eq!(info.hidden_rows, vec![19]);
    }

    #[test]
    fn marker_check_reports_missing() {
        let config = RunConfig::from_toml(
            r#"
[templates]
tp3 = "TP3.xlsx"

[[markers]]
report = "tp3"
sheet = 0
text = "Table copy"
kind = "table_copy"
start_row = 15

[[markers]]
report = "tp3"
sheet = 3
text = "Conclusion"
kind = "table_copy"
start_row = 15
"#,
        )
        .unwrap();
        let mut lead = Worksheet::new("TP3.1");
        lead.set_value(CellAddress::parse("A30").unwrap(), "Table copy");
        let wb = Workbook::from_sheets(vec![lead]);

        let checks = check_markers(&wb, &config, ReportType::Tp3);
        assert_eq!(checks.len(), 2);
        assert_eq!(checks[0].found_at.as_deref(), Some("A30"));
        assert!(checks[1].found_at.is_none());
        assert!(check_markers(&wb, &config, ReportType::Tp1).is_empty());
    }
}
