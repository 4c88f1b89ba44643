//! Writing embedded spreadsheets and pictures to disk.

use crate::container::PresentationContainer;
use crate::slide::parse_slide_shapes;
use embex_core::{
    image_file_name, parse_relationships, resolve_target, spreadsheet_file_name, Result,
    SpreadsheetFormat,
};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

/// An embedded spreadsheet copied out of a presentation.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedSpreadsheet {
    /// Zero-based position among the document's embedded spreadsheets.
    pub index: usize,
    /// Source part name inside the presentation.
    pub part_name: String,
    pub format: SpreadsheetFormat,
    /// Where the copy was written.
    pub path: PathBuf,
}

/// A picture written out of a presentation.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedImage {
    /// 1-based slide position in presentation order.
    pub slide: usize,
    /// Source part name inside the presentation.
    pub part_name: String,
    pub path: PathBuf,
}

/// Copy every embedded spreadsheet into `output_dir`.
///
/// Files are named `<base>_embedded_excel_<n>.<ext>` with `n` following
/// archive order. Bytes are written unchanged.
pub fn extract_spreadsheets<R: Read + Seek>(
    container: &mut PresentationContainer<R>,
    output_dir: &Path,
    base: &str,
) -> Result<Vec<ExtractedSpreadsheet>> {
    let parts = container.embedded_spreadsheets();
    let mut extracted = Vec::with_capacity(parts.len());

    for (index, part_name) in parts.into_iter().enumerate() {
        let Some(format) = SpreadsheetFormat::from_part_name(&part_name) else {
            continue;
        };
        let data = container.read_part(&part_name)?;
        let path = output_dir.join(spreadsheet_file_name(base, index + 1, format));
        fs::write(&path, &data)?;

        log::debug!(
            "Extracted {} ({} bytes) to {}",
            part_name,
            data.len(),
            path.display()
        );

        extracted.push(ExtractedSpreadsheet {
            index,
            part_name,
            format,
            path,
        });
    }

    Ok(extracted)
}

/// Write every picture shape into `output_dir`.
///
/// Slides are walked in presentation order and shapes in document order.
/// Files are named `<base>_image_<n>.<ext>`, numbered across the whole
/// document, with the extension of the image part. Pictures whose image
/// is linked rather than embedded are skipped.
pub fn extract_images<R: Read + Seek>(
    container: &mut PresentationContainer<R>,
    output_dir: &Path,
    base: &str,
) -> Result<Vec<ExtractedImage>> {
    let slides = container.presentation_order()?;
    let mut extracted = Vec::new();

    for (position, slide) in slides.iter().enumerate() {
        let xml = container.read_xml(&slide.path)?;
        let pictures: Vec<String> = parse_slide_shapes(&xml)?
            .into_iter()
            .filter(|shape| shape.is_picture())
            .filter_map(|shape| shape.image_rel_id)
            .collect();
        if pictures.is_empty() {
            continue;
        }

        let targets: HashMap<String, String> = match container.read_xml_optional(&slide.rels_path())? {
            Some(rels_xml) => parse_relationships(&rels_xml)?
                .into_iter()
                .filter(|rel| !rel.is_external())
                .map(|rel| (rel.id, resolve_target(&slide.path, &rel.target)))
                .collect(),
            None => HashMap::new(),
        };

        for rel_id in pictures {
            let Some(part_name) = targets.get(&rel_id) else {
                log::warn!("{}: picture {} has no embedded image", slide.path, rel_id);
                continue;
            };
            let Some(data) = container.read_part_optional(part_name)? else {
                log::warn!("{}: image part {} is missing", slide.path, part_name);
                continue;
            };

            let ext = image_extension(part_name);
            let path = output_dir.join(image_file_name(base, extracted.len() + 1, &ext));
            fs::write(&path, &data)?;
            log::debug!("Extracted {} to {}", part_name, path.display());

            extracted.push(ExtractedImage {
                slide: position + 1,
                part_name: part_name.clone(),
                path,
            });
        }
    }

    Ok(extracted)
}

/// Lower-case extension of an image part, `bin` when it has none.
fn image_extension(part_name: &str) -> String {
    let file = part_name.rsplit('/').next().unwrap_or(part_name);
    match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => "bin".to_string(),
    }
}
