//! Load → populate → markers → write for one document.

use std::path::{Path, PathBuf};

use auditpaper_engine::Period;
use auditpaper_io::{load_template, write_workbook};
use auditpaper_records::config::MarkerConfig;
use auditpaper_records::{CompanySummary, DomainFilter, RunConfig};
use chrono::NaiveDate;
use serde::Serialize;

use crate::error::ReportError;
use crate::markers::apply_markers;
use crate::naming::{output_path, prepare_company_folder};
use crate::populate::{PopulateContext, SheetRows};
use crate::report_type::ReportType;
use crate::source::SourceData;

/// One export rendered through one report template.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentJob {
    pub input: PathBuf,
    pub report: ReportType,
    pub template: PathBuf,
}

/// Settings shared by every document in a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub consultant: String,
    pub date: NaiveDate,
    pub output_dir: PathBuf,
    pub folders: bool,
    pub report_templates: Option<PathBuf>,
    pub filter: DomainFilter,
    pub markers: Vec<MarkerConfig>,
}

impl RunOptions {
    /// Today's date, flat output into `output_dir`, default filter.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            consultant: String::new(),
            date: chrono::Local::now().date_naive(),
            output_dir: output_dir.into(),
            folders: false,
            report_templates: None,
            filter: DomainFilter::default(),
            markers: Vec::new(),
        }
    }

    /// Options as configured; the output directory falls back to `.`.
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            consultant: config.consultant.clone(),
            folders: config.folders,
            report_templates: config.report_templates.clone(),
            filter: config.filter,
            markers: config.markers.clone(),
            ..Self::new(config.output_dir.clone().unwrap_or_else(|| PathBuf::from(".")))
        }
    }

    fn markers_for(&self, report: ReportType) -> impl Iterator<Item = &MarkerConfig> {
        self.markers.iter().filter(move |m| m.report == report.key())
    }
}

/// What was written for one document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub input: PathBuf,
    pub report: ReportType,
    pub template: PathBuf,
    pub output: PathBuf,
    pub summary: CompanySummary,
    pub sheets: Vec<SheetRows>,
    pub markers_placed: usize,
    pub warnings: Vec<String>,
    pub truncated_periods: Vec<Period>,
    pub cells_written: usize,
}

/// Render `job` end to end.
pub fn generate(job: &DocumentJob, opts: &RunOptions) -> Result<DocumentReport, ReportError> {
    let source = SourceData::load(&job.input, &opts.filter)?;
    let output = prepare_output(job, &source.summary, opts)?;
    render(job, &source, opts, &output)
}

/// Resolve the output path and create the folders it needs.
pub fn prepare_output(
    job: &DocumentJob,
    summary: &CompanySummary,
    opts: &RunOptions,
) -> Result<PathBuf, ReportError> {
    let output = output_path(&opts.output_dir, job.report, summary, opts.folders);
    if opts.folders {
        prepare_company_folder(
            &opts.output_dir,
            summary,
            &job.input,
            opts.report_templates.as_deref(),
        )?;
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| ReportError::Io(format!("cannot create '{}': {e}", parent.display())))?;
    }
    Ok(output)
}

/// Populate the job's template from an already loaded export and write it
/// to `output`.
pub fn render(
    job: &DocumentJob,
    source: &SourceData,
    opts: &RunOptions,
    output: &Path,
) -> Result<DocumentReport, ReportError> {
    let (mut workbook, loaded) = load_template(&job.template).map_err(ReportError::Io)?;
    log::debug!("{}: {}", job.template.display(), loaded.summary());

    let ctx = PopulateContext { source, consultant: &opts.consultant, date: opts.date };
    let outcome = job.report.populator().populate(&mut workbook, &ctx)?;
    let placed = apply_markers(&mut workbook, opts.markers_for(job.report), &outcome)?;

    for warning in &outcome.warnings {
        log::warn!("{} {}: {warning}", job.input.display(), job.report);
    }

    let written = write_workbook(&workbook, output).map_err(ReportError::Io)?;
    log::info!(
        "{} {} -> {} ({} rows, {} cells)",
        job.report,
        job.input.display(),
        output.display(),
        outcome.total_rows(),
        written.cells_written
    );

    Ok(DocumentReport {
        input: job.input.clone(),
        report: job.report,
        template: job.template.clone(),
        output: output.to_path_buf(),
        summary: source.summary.clone(),
        sheets: outcome.sheets,
        markers_placed: placed.len(),
        warnings: outcome.warnings.iter().map(ToString::to_string).collect(),
        truncated_periods: outcome.truncated_periods,
        cells_written: written.cells_written,
    })
}
