// Raw export loading: CSV goes through the records parser, spreadsheet
// exports are read from their first sheet with the header in row 1.

use std::path::Path;

use auditpaper_engine::cell::Scalar;
use auditpaper_records::dates::from_excel_serial;
use auditpaper_records::source::load_csv;
use auditpaper_records::Table;
use calamine::{open_workbook_auto, Data, Reader};

/// Read a raw export into a table, choosing the reader by extension.
pub fn read_table(path: &Path) -> Result<Table, String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" | "txt" => load_csv(path).map_err(|e| e.to_string()),
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => read_spreadsheet(path),
        other => Err(format!(
            "{}: unsupported export format '{}' (expected csv, xlsx or xls)",
            path.display(),
            other
        )),
    }
}

fn read_spreadsheet(path: &Path) -> Result<Table, String> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open export '{}': {}", path.display(), e))?;
    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| format!("Export '{}' contains no sheets", path.display()))?;
    let range = workbook
        .worksheet_range(&first)
        .map_err(|e| format!("Failed to read sheet '{}': {}", first, e))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row.iter().map(|c| c.to_string().trim().to_string()).collect(),
        None => return Ok(Table::new(Vec::new())),
    };

    let mut table = Table::new(headers);
    for row in rows {
        let values: Vec<Option<Scalar>> = (0..table.headers.len())
            .map(|i| row.get(i).and_then(data_to_scalar))
            .collect();
        if values.iter().all(Option::is_none) {
            continue;
        }
        table.rows.push(values);
    }

    log::debug!("{}: read {} rows from sheet '{}'", path.display(), table.len(), first);
    Ok(table)
}

fn data_to_scalar(cell: &Data) -> Option<Scalar> {
    match cell {
        Data::Empty => None,
        Data::String(s) if s.trim().is_empty() => None,
        Data::String(s) => Some(Scalar::text(s.as_str())),
        Data::Float(n) => Some(Scalar::Number(*n)),
        Data::Int(n) => Some(Scalar::Number(*n as f64)),
        Data::Bool(b) => Some(Scalar::text(if *b { "TRUE" } else { "FALSE" })),
        Data::DateTime(dt) => from_excel_serial(dt.as_f64()).map(Scalar::Date),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(Scalar::text(s.as_str())),
        Data::Error(_) => None,
    }
}
