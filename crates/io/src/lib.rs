// File I/O operations

pub mod source;
pub mod xlsx;
pub mod xlsx_styles;

pub use source::read_table;
pub use xlsx::{load_template, write_workbook, LoadSummary, WriteSummary};
