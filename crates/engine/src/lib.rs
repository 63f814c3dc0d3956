pub mod address;
pub mod cell;
pub mod columns;
pub mod cond_format;
pub mod error;
pub mod formula;
pub mod marker;
pub mod merge;
pub mod sheet;
pub mod stamp;
pub mod style;
pub mod workbook;

pub use address::{CellAddress, CellRange};
pub use cell::{Cell, CellValue, Scalar};
pub use columns::Period;
pub use error::{EngineError, ReferenceRewriteWarning};
pub use sheet::{MergedRegion, Worksheet};
pub use workbook::Workbook;
