//! One extraction request: every uploaded presentation, one mode, one archive.

use crate::archive::package_directory;
use anyhow::{Context, Result};
use embex_core::{base_name, ExtractionMode, SpreadsheetFormat};
use embex_pptx::{
    extract_images, extract_spreadsheets, EmbeddingIndex, ExtractedImage, ExtractedSpreadsheet,
    PresentationContainer,
};
use embex_xlsx::{append_label_column, clean_sentinels};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Everything a request needs, passed explicitly.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub inputs: Vec<PathBuf>,
    pub mode: ExtractionMode,
    /// Append the `table_title` column to extracted workbooks.
    pub labels: bool,
    /// Where the archive is written when anything was extracted.
    pub output: PathBuf,
}

/// Files produced from one presentation.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub source: String,
    /// Prefix of the output file names.
    pub base: String,
    pub count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub spreadsheets: Vec<ExtractedSpreadsheet>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ExtractedImage>,
}

/// Result of a request.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionSummary {
    pub mode: ExtractionMode,
    pub documents: Vec<DocumentSummary>,
    pub total: usize,
    /// Cells rewritten by the cleaning pass (spreadsheet mode).
    pub cells_replaced: usize,
    /// File names inside the archive subtree, sorted.
    pub files: Vec<String>,
    /// `None` when nothing was extracted.
    pub archive: Option<PathBuf>,
}

impl ExtractionSummary {
    /// The line shown to the user.
    pub fn message(&self) -> String {
        if self.total == 0 {
            format!(
                "No {} files found in the uploaded PowerPoint files.",
                self.mode
            )
        } else {
            format!("Successfully extracted {} {} file(s).", self.total, self.mode)
        }
    }
}

/// Run a request end to end.
///
/// Documents are processed one after another. A failed label column is
/// logged and skipped; any other failure aborts the request.
pub fn run_request(request: &ExtractionRequest) -> Result<ExtractionSummary> {
    let staging = TempDir::new().context("Failed to create staging directory")?;
    let mut documents = Vec::with_capacity(request.inputs.len());
    let mut workbooks = Vec::new();
    let mut bases = HashSet::new();

    for input in &request.inputs {
        log::info!("Processing: {}", input.display());
        let source = input
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Invalid input file name: {}", input.display()))?
            .to_string();
        let base = unique_base(&mut bases, base_name(&source));

        let mut container = PresentationContainer::open(input)
            .with_context(|| format!("Failed to open {}", input.display()))?;

        let mut spreadsheets = Vec::new();
        let mut images = Vec::new();
        match request.mode {
            ExtractionMode::Excel => {
                let extracted = extract_spreadsheets(&mut container, staging.path(), &base)
                    .with_context(|| format!("Failed to extract spreadsheets from {}", source))?;

                let index = if request.labels && !extracted.is_empty() {
                    Some(
                        EmbeddingIndex::build(&mut container)
                            .with_context(|| format!("Failed to read slides of {}", source))?,
                    )
                } else {
                    None
                };

                for sheet in &extracted {
                    if sheet.format != SpreadsheetFormat::Xlsx {
                        log::warn!(
                            "{}: legacy workbook {} copied without normalization",
                            source,
                            sheet.part_name
                        );
                        continue;
                    }
                    if let Some(index) = &index {
                        let label = index.label_for(&sheet.part_name, sheet.index);
                        if let Err(e) = append_label_column(&sheet.path, &label) {
                            log::error!(
                                "Error adding label to {}: {}",
                                sheet.path.display(),
                                e
                            );
                        }
                    }
                    workbooks.push(sheet.path.clone());
                }
                spreadsheets = extracted;
            }
            ExtractionMode::Images => {
                images = extract_images(&mut container, staging.path(), &base)
                    .with_context(|| format!("Failed to extract images from {}", source))?;
            }
        }

        let count = spreadsheets.len() + images.len();
        log::info!("  Found {} {} file(s) in {}", count, request.mode, source);
        documents.push(DocumentSummary {
            source,
            base,
            count,
            spreadsheets,
            images,
        });
    }

    let cells_replaced = clean_workbooks(&workbooks)?;

    let total = documents.iter().map(|d| d.count).sum();
    let (files, archive) = if total > 0 {
        let files = package_directory(staging.path(), request.mode.subtree(), &request.output)?;
        (files, Some(request.output.clone()))
    } else {
        (Vec::new(), None)
    };

    Ok(ExtractionSummary {
        mode: request.mode,
        documents,
        total,
        cells_replaced,
        files,
        archive,
    })
}

/// `base`, or `base_2`, `base_3`, ... when an earlier input already
/// produced files under that name.
fn unique_base(used: &mut HashSet<String>, base: String) -> String {
    if used.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}", base, n);
        if used.insert(candidate.clone()) {
            log::warn!(
                "Output name '{}' is already used in this request; using '{}'",
                base,
                candidate
            );
            return candidate;
        }
        n += 1;
    }
}

/// The cleaning pass over every extracted workbook.
fn clean_workbooks(paths: &[PathBuf]) -> Result<usize> {
    let mut replaced = 0;
    for path in paths {
        let report = clean_workbook(path)?;
        log::debug!(
            "Cleaned {}: {} cell(s) in {} sheet(s)",
            path.display(),
            report.cells_replaced,
            report.sheets
        );
        replaced += report.cells_replaced;
    }
    Ok(replaced)
}

fn clean_workbook(path: &Path) -> Result<embex_xlsx::CleanReport> {
    clean_sentinels(path).with_context(|| format!("Failed to clean {}", path.display()))
}
