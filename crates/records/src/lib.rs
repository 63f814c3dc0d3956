//! `auditpaper-records` — raw export records for working-paper generation.
//!
//! Turns a header + rows table (CSV or a workbook sheet) into typed
//! records, keeps only the rows the audit covers, and groups them into the
//! rows each report sheet needs. No workbook IO.

pub mod aggregate;
pub mod config;
pub mod dates;
pub mod error;
pub mod filter;
pub mod model;
pub mod periods;
pub mod source;
pub mod summary;

pub use aggregate::{group_and_aggregate, GroupSpec, Reducer};
pub use config::RunConfig;
pub use error::RecordError;
pub use filter::DomainFilter;
pub use model::{AggregatedRow, Record, Table};
pub use summary::CompanySummary;
