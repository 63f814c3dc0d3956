//! Many documents at once.
//!
//! Exports are loaded in parallel, each once no matter how many reports use
//! it. Output paths and company folders are then resolved on the calling
//! thread, so two jobs never race on the same directory or file. Jobs that
//! would write the same output are rejected before anything is rendered.
//! The remaining jobs render in parallel, each owning its workbook.

use std::collections::HashMap;
use std::path::PathBuf;

use rayon::prelude::*;

use crate::error::ReportError;
use crate::pipeline::{prepare_output, render, DocumentJob, DocumentReport, RunOptions};
use crate::report_type::ReportType;
use crate::source::SourceData;

/// Result of one batch job. A failure never affects its siblings.
#[derive(Debug)]
pub struct DocumentOutcome {
    pub input: PathBuf,
    pub report: ReportType,
    pub result: Result<DocumentReport, ReportError>,
}

impl DocumentOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run every job; outcomes come back in job order.
pub fn run_batch(jobs: &[DocumentJob], opts: &RunOptions) -> Vec<DocumentOutcome> {
    let mut inputs: Vec<&PathBuf> = jobs.iter().map(|j| &j.input).collect();
    inputs.sort();
    inputs.dedup();

    let sources: HashMap<&PathBuf, Result<SourceData, ReportError>> = inputs
        .par_iter()
        .map(|input| (*input, SourceData::load(input, &opts.filter)))
        .collect();

    // Output path per job, or the error that stops it.
    let mut planned: Vec<Result<PathBuf, ReportError>> = jobs
        .iter()
        .map(|job| match &sources[&job.input] {
            Ok(source) => Ok(crate::naming::output_path(
                &opts.output_dir,
                job.report,
                &source.summary,
                opts.folders,
            )),
            Err(e) => Err(e.clone()),
        })
        .collect();

    reject_duplicate_outputs(jobs, &mut planned);

    for (job, plan) in jobs.iter().zip(planned.iter_mut()) {
        let Ok(source) = &sources[&job.input] else { continue };
        if plan.is_ok() {
            *plan = prepare_output(job, &source.summary, opts);
        }
    }

    log::info!(
        "batch: {} jobs over {} exports, {} ready",
        jobs.len(),
        inputs.len(),
        planned.iter().filter(|p| p.is_ok()).count()
    );

    jobs.par_iter()
        .zip(planned.into_par_iter())
        .map(|(job, plan)| {
            let result = plan.and_then(|output| match &sources[&job.input] {
                Ok(source) => render(job, source, opts, &output),
                Err(e) => Err(e.clone()),
            });
            if let Err(e) = &result {
                log::warn!("{} {}: {e}", job.report, job.input.display());
            }
            DocumentOutcome { input: job.input.clone(), report: job.report, result }
        })
        .collect()
}

/// Fail every job whose output path another job also claims.
fn reject_duplicate_outputs(jobs: &[DocumentJob], planned: &mut [Result<PathBuf, ReportError>]) {
    let mut claims: HashMap<PathBuf, Vec<usize>> = HashMap::new();
    for (i, plan) in planned.iter().enumerate() {
        if let Ok(path) = plan {
            claims.entry(path.clone()).or_default().push(i);
        }
    }
    for (path, owners) in claims.into_iter().filter(|(_, owners)| owners.len() > 1) {
        let names: Vec<String> = owners
            .iter()
            .map(|&i| format!("{} ({})", jobs[i].input.display(), jobs[i].report))
            .collect();
        for &i in &owners {
            planned[i] = Err(ReportError::Io(format!(
                "output '{}' would be written by several jobs: {}",
                path.display(),
                names.join(", ")
            )));
        }
    }
}
