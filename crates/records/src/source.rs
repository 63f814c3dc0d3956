use std::path::Path;

use auditpaper_engine::Scalar;

use crate::error::RecordError;
use crate::model::{Record, Table};

/// Read a CSV export. Every cell is kept as text; numeric and date views
/// are parsed on demand.
pub fn parse_csv(csv_data: &str) -> Result<Table, RecordError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| RecordError::Io(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut table = Table::new(headers);
    for record in reader.records() {
        let record = record.map_err(|e| RecordError::Io(e.to_string()))?;
        let row = (0..table.headers.len())
            .map(|i| {
                let raw = record.get(i).unwrap_or("");
                (!raw.trim().is_empty()).then(|| Scalar::text(raw))
            })
            .collect();
        table.rows.push(row);
    }
    Ok(table)
}

pub fn load_csv(path: &Path) -> Result<Table, RecordError> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| RecordError::Io(format!("{}: {e}", path.display())))?;
    parse_csv(&data)
}

/// Fields in `required` that the table header lacks, in `required` order.
pub fn missing_fields(table: &Table, required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|f| table.column(f).is_none())
        .map(|f| f.to_string())
        .collect()
}

/// Fail with every missing field at once.
pub fn require_fields(table: &Table, required: &[&str]) -> Result<(), RecordError> {
    let fields = missing_fields(table, required);
    if fields.is_empty() {
        Ok(())
    } else {
        Err(RecordError::MissingField { fields })
    }
}

/// Same check against records that have already been converted. A field
/// counts as present if any record carries it.
pub fn require_record_fields(records: &[Record], required: &[&str]) -> Result<(), RecordError> {
    let fields: Vec<String> = required
        .iter()
        .filter(|f| !records.iter().any(|r| r.get(f).is_some()))
        .map(|f| f.to_string())
        .collect();
    if fields.is_empty() {
        Ok(())
    } else {
        Err(RecordError::MissingField { fields })
    }
}

/// Convert table rows into records; rows with no values at all are skipped.
pub fn records_from_table(table: &Table) -> Vec<Record> {
    table
        .rows
        .iter()
        .filter_map(|row| {
            let mut record = Record::new();
            for (header, value) in table.headers.iter().zip(row.iter()) {
                if header.is_empty() {
                    continue;
                }
                if let Some(v) = value {
                    record.insert(header, v.clone());
                }
            }
            let keep = record.fields().next().is_some();
            keep.then_some(record)
        })
        .collect()
}
