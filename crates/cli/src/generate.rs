//! `apaper generate` and `apaper batch`.

use std::path::{Path, PathBuf};

use auditpaper_report::{generate, run_batch, DocumentOutcome, DocumentReport};
use serde::Serialize;

use crate::exit_codes::{exit_code_for, EXIT_BATCH_FAILED};
use crate::settings::{load_config, parse_reports, plan_jobs, run_options};
use crate::{CliError, OutputArgs};

pub fn cmd_generate(
    config_path: Option<&Path>,
    input: PathBuf,
    report: &str,
    template: Option<PathBuf>,
    output: &OutputArgs,
    json: bool,
) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let reports = parse_reports(report, config.as_ref())?;
    let jobs = plan_jobs(&[input], &reports, template.as_deref(), config.as_ref())?;
    let opts = run_options(config.as_ref(), output)?;

    // One export through several reports goes through the batch runner so
    // the export is read once.
    if let [job] = jobs.as_slice() {
        let report = generate(job, &opts)?;
        print_report(&report, json)?;
        return Ok(());
    }
    finish_batch(run_batch(&jobs, &opts), json)
}

pub fn cmd_batch(
    config_path: Option<&Path>,
    inputs: Vec<PathBuf>,
    report: &str,
    template: Option<PathBuf>,
    output: &OutputArgs,
    json: bool,
) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let reports = parse_reports(report, config.as_ref())?;
    let jobs = plan_jobs(&inputs, &reports, template.as_deref(), config.as_ref())?;
    let opts = run_options(config.as_ref(), output)?;
    finish_batch(run_batch(&jobs, &opts), json)
}

fn print_report(report: &DocumentReport, json: bool) -> Result<(), CliError> {
    if json {
        let out = serde_json::to_string_pretty(report).map_err(|e| CliError::io(e.to_string()))?;
        println!("{}", out);
        return Ok(());
    }
    let rows: u32 = report.sheets.iter().map(|s| s.rows).sum();
    eprintln!(
        "{} {} -> {} ({} rows, {} cells)",
        report.report,
        report.input.display(),
        report.output.display(),
        rows,
        report.cells_written
    );
    for warning in &report.warnings {
        eprintln!("  warning: {}", warning);
    }
    if !report.truncated_periods.is_empty() {
        eprintln!(
            "  warning: {} period(s) did not fit the claim columns",
            report.truncated_periods.len()
        );
    }
    Ok(())
}

/// JSON line for one batch document.
#[derive(Serialize)]
struct OutcomeLine<'a> {
    input: &'a Path,
    report: auditpaper_report::ReportType,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    document: Option<&'a DocumentReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<auditpaper_report::ErrorKind>,
}

impl<'a> From<&'a DocumentOutcome> for OutcomeLine<'a> {
    fn from(outcome: &'a DocumentOutcome) -> Self {
        let (document, error, error_kind) = match &outcome.result {
            Ok(report) => (Some(report), None, None),
            Err(e) => (None, Some(e.to_string()), Some(e.kind())),
        };
        Self {
            input: &outcome.input,
            report: outcome.report,
            ok: outcome.is_ok(),
            document,
            error,
            error_kind,
        }
    }
}

fn finish_batch(outcomes: Vec<DocumentOutcome>, json: bool) -> Result<(), CliError> {
    let mut failed = 0usize;
    for outcome in &outcomes {
        if json {
            let line = serde_json::to_string(&OutcomeLine::from(outcome))
                .map_err(|e| CliError::io(e.to_string()))?;
            println!("{}", line);
        }
        match &outcome.result {
            Ok(report) if !json => print_report(report, false)?,
            Ok(_) => {}
            Err(e) => {
                failed += 1;
                if !json {
                    eprintln!(
                        "{} {}: error (exit {}): {}",
                        outcome.report,
                        outcome.input.display(),
                        exit_code_for(e.kind()),
                        e
                    );
                }
            }
        }
    }

    if failed == 0 {
        return Ok(());
    }
    Err(CliError {
        code: EXIT_BATCH_FAILED,
        message: format!("{} of {} documents failed", failed, outcomes.len()),
        hint: None,
    })
}
