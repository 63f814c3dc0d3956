//! Output file names and the per-company folder layout.
//!
//! ```text
//! {ref} - {trade}/
//!     AUDIT REPORTING TEMPLATES/
//!     AUDIT WORKING PAPERS/{report folder}/{report folder}_{ref}.xlsx
//!     INFORMATION FROM EMPLOYER/
//!     UIF DATAFILE/{source export}
//! ```

use std::path::{Path, PathBuf};

use auditpaper_records::CompanySummary;

use crate::error::ReportError;
use crate::report_type::ReportType;

pub const REPORTING_TEMPLATES: &str = "AUDIT REPORTING TEMPLATES";
pub const WORKING_PAPERS: &str = "AUDIT WORKING PAPERS";
pub const EMPLOYER_INFORMATION: &str = "INFORMATION FROM EMPLOYER";
pub const UIF_DATAFILE: &str = "UIF DATAFILE";

const COMPANY_SUBFOLDERS: [&str; 4] =
    [REPORTING_TEMPLATES, WORKING_PAPERS, EMPLOYER_INFORMATION, UIF_DATAFILE];

/// Reporting templates copied into the company folder.
const TEMPLATE_EXTENSIONS: [&str; 3] = ["docx", "xlsx", "pdf"];

/// Keep alphanumerics, space, `_` and `-`; everything else becomes `_`.
pub fn safe_name(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, ' ' | '_' | '-') { c } else { '_' })
        .collect::<String>()
        .trim()
        .to_string()
}

/// `"TP.3_Payment Verification_U123_45.xlsx"`
pub fn file_name(report: ReportType, summary: &CompanySummary) -> String {
    format!("{}_{}.xlsx", report.folder_name(), safe_name(&summary.uif_reference))
}

/// `"{ref} - {trade}"`, or `"UIF_REF - {trade}"` when the export carries no
/// reference.
pub fn company_folder_name(summary: &CompanySummary) -> String {
    let reference = safe_name(&summary.uif_reference);
    let trade = safe_name(&summary.trade_name);
    if reference.is_empty() {
        format!("UIF_REF - {trade}")
    } else {
        format!("{reference} - {trade}")
    }
}

/// Where a document is written. Pure: nothing is created.
pub fn output_path(
    output_dir: &Path,
    report: ReportType,
    summary: &CompanySummary,
    folders: bool,
) -> PathBuf {
    let name = file_name(report, summary);
    if folders {
        output_dir
            .join(company_folder_name(summary))
            .join(WORKING_PAPERS)
            .join(report.folder_name())
            .join(name)
    } else {
        output_dir.join(name)
    }
}

fn create_dir(path: &Path) -> Result<(), ReportError> {
    std::fs::create_dir_all(path)
        .map_err(|e| ReportError::Io(format!("cannot create '{}': {e}", path.display())))
}

/// Create the company folder and its subfolders, copy the source export
/// into `UIF DATAFILE` and, when given, the reporting templates renamed
/// `"{stem} - {ref}.{ext}"`. Copy failures are logged, not fatal.
pub fn prepare_company_folder(
    output_dir: &Path,
    summary: &CompanySummary,
    source_file: &Path,
    report_templates: Option<&Path>,
) -> Result<PathBuf, ReportError> {
    let company = output_dir.join(company_folder_name(summary));
    for sub in COMPANY_SUBFOLDERS {
        create_dir(&company.join(sub))?;
    }

    if let Some(file_name) = source_file.file_name() {
        let target = company.join(UIF_DATAFILE).join(file_name);
        if let Err(e) = std::fs::copy(source_file, &target) {
            log::warn!("could not copy '{}' into {}: {e}", source_file.display(), UIF_DATAFILE);
        }
    }

    let reference = safe_name(&summary.uif_reference);
    if let (Some(dir), false) = (report_templates, reference.is_empty()) {
        copy_reporting_templates(dir, &company.join(REPORTING_TEMPLATES), &reference);
    }

    log::debug!("company folder ready: {}", company.display());
    Ok(company)
}

fn copy_reporting_templates(from: &Path, to: &Path, reference: &str) {
    let entries = match std::fs::read_dir(from) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("cannot read reporting templates '{}': {e}", from.display());
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let (Some(stem), Some(ext)) = (
            path.file_stem().and_then(|s| s.to_str()),
            path.extension().and_then(|s| s.to_str()),
        ) else {
            continue;
        };
        if !TEMPLATE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
            continue;
        }
        let target = to.join(format!("{stem} - {reference}.{ext}"));
        if let Err(e) = std::fs::copy(&path, &target) {
            log::warn!("could not copy reporting template '{}': {e}", path.display());
        }
    }
}
