//! Core domain types, naming rules and OPC helpers for extracting
//! spreadsheets and images embedded in presentations.

pub mod error;
pub mod label;
pub mod opc;
pub mod sentinel;
pub mod types;

pub use error::{Error, Result};
pub use label::SlideLabel;
pub use opc::{local_name, parse_relationships, rels_part_for, resolve_target, Relationship};
pub use sentinel::{is_sentinel, SENTINEL_VALUES};
pub use types::{
    base_name, image_file_name, spreadsheet_file_name, ExtractionMode, SpreadsheetFormat,
};
