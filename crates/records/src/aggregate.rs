use std::cmp::Ordering;
use std::collections::HashMap;

use auditpaper_engine::Scalar;

use crate::dates;
use crate::model::{AggregatedRow, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    /// First present value in input order.
    First,
    /// Smallest present value; text that reads as a date compares as one.
    Min,
    /// Numeric sum. Unparsable values count as zero.
    Sum,
}

#[derive(Debug, Clone, Default)]
pub struct GroupSpec {
    pub key: Vec<String>,
    pub reducers: Vec<(String, Reducer)>,
    pub sort_by: Option<String>,
}

impl GroupSpec {
    pub fn by(key: &str) -> Self {
        Self { key: vec![key.to_string()], ..Self::default() }
    }

    pub fn reduce(mut self, field: &str, reducer: Reducer) -> Self {
        self.reducers.push((field.to_string(), reducer));
        self
    }

    pub fn sorted_by(mut self, field: &str) -> Self {
        self.sort_by = Some(field.to_string());
        self
    }
}

/// Dates hiding in text compare chronologically.
fn normalized(value: &Scalar) -> Scalar {
    match value {
        Scalar::Text(s) => dates::parse_date_str(s).map(Scalar::Date).unwrap_or_else(|| value.clone()),
        other => other.clone(),
    }
}

/// Present values sort before absent ones.
fn compare_present(a: Option<&Scalar>, b: Option<&Scalar>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => normalized(a).compare(&normalized(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

struct Accumulator {
    key: Vec<Option<Scalar>>,
    values: Vec<Option<Scalar>>,
    sums: Vec<f64>,
}

/// Group records by `spec.key` and reduce the remaining fields. Groups keep
/// first-discovery order unless `spec.sort_by` is set, in which case the
/// sort is stable. Records missing a key field are skipped.
pub fn group_and_aggregate(records: &[Record], spec: &GroupSpec) -> Vec<AggregatedRow> {
    let mut index: HashMap<Vec<String>, usize> = HashMap::new();
    let mut groups: Vec<Accumulator> = Vec::new();
    let mut skipped = 0usize;

    for record in records {
        let key_values: Vec<Option<&Scalar>> = spec.key.iter().map(|k| record.get(k)).collect();
        if key_values.iter().any(Option::is_none) {
            skipped += 1;
            continue;
        }
        let key_text: Vec<String> = key_values.iter().flatten().map(|v| v.to_string()).collect();

        let slot = *index.entry(key_text).or_insert_with(|| {
            groups.push(Accumulator {
                key: key_values.iter().map(|v| v.cloned()).collect(),
                values: vec![None; spec.reducers.len()],
                sums: vec![0.0; spec.reducers.len()],
            });
            groups.len() - 1
        });
        let acc = &mut groups[slot];

        for (i, (field, reducer)) in spec.reducers.iter().enumerate() {
            let Some(value) = record.get(field) else { continue };
            match reducer {
                Reducer::First => {
                    if acc.values[i].is_none() {
                        acc.values[i] = Some(value.clone());
                    }
                }
                Reducer::Min => {
                    let candidate = normalized(value);
                    let replace = match &acc.values[i] {
                        Some(current) => candidate.compare(current) == Ordering::Less,
                        None => true,
                    };
                    if replace {
                        acc.values[i] = Some(candidate);
                    }
                }
                Reducer::Sum => acc.sums[i] += value.as_number().unwrap_or(0.0),
            }
        }
    }

    if skipped > 0 {
        log::debug!("aggregation skipped {skipped} records with no '{}'", spec.key.join("/"));
    }

    let mut rows: Vec<AggregatedRow> = groups
        .into_iter()
        .map(|acc| {
            let mut row = AggregatedRow::default();
            for (field, value) in spec.key.iter().zip(acc.key) {
                row.push(field, value);
            }
            for (i, (field, reducer)) in spec.reducers.iter().enumerate() {
                let value = match reducer {
                    Reducer::Sum => Some(Scalar::Number(acc.sums[i])),
                    _ => acc.values[i].clone(),
                };
                row.set(field, value);
            }
            row
        })
        .collect();

    if let Some(field) = &spec.sort_by {
        rows.sort_by(|a, b| compare_present(a.get(field), b.get(field)));
    }
    rows
}

/// First record per key, in input order.
pub fn distinct_by(records: &[Record], key: &str) -> Vec<Record> {
    let mut seen = std::collections::HashSet::new();
    records
        .iter()
        .filter(|r| r.get(key).is_some_and(|v| seen.insert(v.to_string())))
        .cloned()
        .collect()
}
