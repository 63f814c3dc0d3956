//! Config file plus command-line overrides, resolved into run options and
//! jobs.

use std::path::{Path, PathBuf};

use auditpaper_records::{RecordError, RunConfig};
use auditpaper_report::{DocumentJob, ReportType, RunOptions};
use chrono::NaiveDate;

use crate::{CliError, OutputArgs};

pub fn load_config(explicit: Option<&Path>) -> Result<Option<RunConfig>, CliError> {
    let config = RunConfig::discover(explicit).map_err(|e| match e {
        RecordError::Io(msg) => CliError::io(format!("cannot read config: {msg}")),
        other => CliError::config(other.to_string())
            .with_hint("see the [templates] and [[markers]] tables in the config"),
    })?;
    match &config {
        Some(config) => log::debug!(
            "config loaded: {} template(s), {} marker(s)",
            config.templates.len(),
            config.markers.len()
        ),
        None => log::debug!("no config file, using command-line options only"),
    }
    Ok(config)
}

/// `all` or a single report key.
pub fn parse_reports(value: &str, config: Option<&RunConfig>) -> Result<Vec<ReportType>, CliError> {
    if !value.trim().eq_ignore_ascii_case("all") {
        let report: ReportType = value.parse().map_err(CliError::args)?;
        return Ok(vec![report]);
    }
    let configured: Vec<ReportType> = ReportType::ALL
        .into_iter()
        .filter(|r| config.is_some_and(|c| c.template(r.key()).is_some()))
        .collect();
    if configured.is_empty() {
        return Err(CliError::args("--report all needs templates from a config file")
            .with_hint("name one report with --report and pass --template, or use --config"));
    }
    Ok(configured)
}

/// One job per input and report. `--template` applies only when a single
/// report is requested.
pub fn plan_jobs(
    inputs: &[PathBuf],
    reports: &[ReportType],
    template: Option<&Path>,
    config: Option<&RunConfig>,
) -> Result<Vec<DocumentJob>, CliError> {
    if template.is_some() && reports.len() > 1 {
        return Err(CliError::args("--template needs a single --report"));
    }

    let mut templates = Vec::with_capacity(reports.len());
    for report in reports {
        let path = template
            .map(Path::to_path_buf)
            .or_else(|| config.and_then(|c| c.template(report.key())).map(Path::to_path_buf))
            .ok_or_else(|| {
                CliError::args(format!("no template for {report}")).with_hint(format!(
                    "pass --template or add `{} = \"...\"` under [templates] in the config",
                    report.key()
                ))
            })?;
        templates.push((*report, path));
    }

    let jobs: Vec<DocumentJob> = inputs
        .iter()
        .flat_map(|input| {
            templates.iter().map(move |(report, path)| DocumentJob {
                input: input.clone(),
                report: *report,
                template: path.clone(),
            })
        })
        .collect();
    log::info!("{} document(s) planned from {} export(s)", jobs.len(), inputs.len());
    Ok(jobs)
}

/// Config values with command-line flags laid over them.
pub fn run_options(config: Option<&RunConfig>, args: &OutputArgs) -> Result<RunOptions, CliError> {
    let mut opts = match config {
        Some(config) => RunOptions::from_config(config),
        None => RunOptions::new("."),
    };
    if let Some(out) = &args.out {
        opts.output_dir = out.clone();
    }
    if let Some(consultant) = &args.consultant {
        opts.consultant = consultant.clone();
    }
    if args.folders {
        opts.folders = true;
    }
    if let Some(dir) = &args.report_templates {
        opts.report_templates = Some(dir.clone());
    }
    if let Some(date) = &args.date {
        opts.date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|_| CliError::args(format!("invalid --date '{date}' (expected YYYY-MM-DD)")))?;
    }
    Ok(opts)
}
