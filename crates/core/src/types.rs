//! Domain types and output naming rules.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What to pull out of every uploaded presentation in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Embedded spreadsheets, cleaned and optionally annotated with slide labels.
    Excel,
    /// Picture shapes, written with their native extension.
    Images,
}

impl ExtractionMode {
    /// Lower-case name, used for the output subtree and user messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excel => "excel",
            Self::Images => "images",
        }
    }

    /// Name of the directory inside the output archive.
    pub fn subtree(&self) -> &'static str {
        self.as_str()
    }

    /// Default name of the downloadable archive.
    pub fn archive_name(&self) -> String {
        format!("pptx_{}_output.zip", self.as_str())
    }
}

impl fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The packaging of an embedded spreadsheet part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpreadsheetFormat {
    /// Office Open XML workbook.
    Xlsx,
    /// Legacy BIFF workbook. Extracted verbatim, never rewritten.
    Xls,
}

impl SpreadsheetFormat {
    /// Detect the format from an embedded part name.
    pub fn from_part_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "xlsx" => Some(Self::Xlsx),
            "xls" => Some(Self::Xls),
            _ => None,
        }
    }

    /// Extension used for the extracted file.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
        }
    }
}

/// Derive the base name used for output files from an uploaded filename.
///
/// Drops the extension and replaces spaces with underscores, so
/// `"Quarterly Review.pptx"` becomes `"Quarterly_Review"`.
pub fn base_name(filename: &str) -> String {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    };
    stem.replace(' ', "_")
}

/// `<base>_embedded_excel_<n>.<ext>`, with `n` 1-based.
pub fn spreadsheet_file_name(base: &str, n: usize, format: SpreadsheetFormat) -> String {
    format!("{}_embedded_excel_{}.{}", base, n, format.extension())
}

/// `<base>_image_<n>.<ext>`, with `n` 1-based across the whole document.
pub fn image_file_name(base: &str, n: usize, ext: &str) -> String {
    format!("{}_image_{}.{}", base, n, ext)
}
