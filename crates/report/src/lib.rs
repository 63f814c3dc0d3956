//! `auditpaper-report` — fills audit working-paper templates from a payment
//! export.
//!
//! Each report type owns a populator that drives the engine's insertion,
//! stamping and formatting steps against a loaded template. The pipeline
//! wraps load, populate and write for one document; the batch runner fans
//! documents out across threads.

pub mod batch;
pub mod block;
pub mod error;
pub mod header;
pub mod markers;
pub mod naming;
pub mod pipeline;
pub mod populate;
pub mod report_type;
pub mod source;
pub mod tp1;
pub mod tp2;
pub mod tp3;
pub mod tp4;

pub use batch::{run_batch, DocumentOutcome};
pub use error::{ErrorKind, ReportError};
pub use pipeline::{generate, DocumentJob, DocumentReport, RunOptions};
pub use populate::{DocumentPopulator, PopulateContext, PopulateOutcome};
pub use report_type::ReportType;
pub use source::SourceData;
