//! XLSX (Office Open XML) backend for spreadsheet normalization.
//!
//! Workbooks are rewritten in place: only the worksheet and style parts that
//! change are re-serialized, every other part is copied through unchanged.

pub mod normalize;
pub mod package;
pub mod reference;
pub mod shared_strings;
pub mod styles;
pub mod workbook;
pub mod worksheet;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use normalize::{append_label_column, clean_sentinels, CleanReport, LABEL_COLUMN_HEADER};
pub use package::XlsxPackage;
pub use styles::{CellStyles, INTEGER_NUM_FMT_ID};
pub use workbook::Workbook;
pub use worksheet::{Cell, CellContent, Worksheet};
