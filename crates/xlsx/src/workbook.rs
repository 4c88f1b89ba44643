//! A workbook opened for editing.

use crate::package::XlsxPackage;
use crate::shared_strings::parse_shared_strings;
use crate::styles::{CellStyles, MINIMAL_STYLESHEET};
use crate::worksheet::{CellContent, Worksheet};
use embex_core::{
    local_name, parse_relationships, rels_part_for, resolve_target, Error, Relationship, Result,
};
use log::{debug, info};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::Cursor;
use std::path::Path;

const REL_OFFICE_DOCUMENT: &str = "/officeDocument";
const REL_WORKSHEET: &str = "/worksheet";
const REL_SHARED_STRINGS: &str = "/sharedStrings";
const REL_STYLES: &str = "/styles";
const REL_STYLES_URI: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const STYLES_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const DEFAULT_WORKBOOK_PART: &str = "xl/workbook.xml";

fn has_type(rel: &Relationship, suffix: &str) -> bool {
    rel.type_uri.ends_with(suffix)
}

struct SheetEntry {
    name: String,
    part: String,
    worksheet: Worksheet,
    dirty: bool,
}

/// Where the stylesheet comes from.
enum StylesSource {
    Part(String),
    /// No stylesheet in the package; one is added on save if needed.
    Created,
}

/// An XLSX workbook with its worksheets parsed.
///
/// Chart sheets and dialog sheets are not loaded and pass through untouched.
pub struct Workbook {
    package: XlsxPackage,
    workbook_part: String,
    workbook_rels: Vec<Relationship>,
    sheets: Vec<SheetEntry>,
    shared_strings: Vec<String>,
    styles: CellStyles,
    styles_part: String,
    styles_source: StylesSource,
}

impl Workbook {
    /// Open a workbook file.
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_package(XlsxPackage::open(path)?)
    }

    /// Parse a loaded package.
    pub fn from_package(package: XlsxPackage) -> Result<Self> {
        let workbook_part = find_workbook_part(&package)?;
        let workbook_xml = package.required_part_str(&workbook_part)?;
        let sheet_list = parse_sheet_list(workbook_xml)?;

        let rels_part = rels_part_for(&workbook_part);
        let workbook_rels = match package.part_str(&rels_part)? {
            Some(xml) => parse_relationships(xml)?,
            None => {
                return Err(Error::WorkbookError(format!(
                    "workbook relationships '{}' not found",
                    rels_part
                )));
            }
        };

        let mut sheets = Vec::new();
        for (name, rel_id) in sheet_list {
            let rel = workbook_rels.iter().find(|r| r.id == rel_id).ok_or_else(|| {
                Error::WorkbookError(format!("sheet '{}' has no relationship '{}'", name, rel_id))
            })?;
            if !has_type(rel, REL_WORKSHEET) {
                debug!("Skipping non-worksheet sheet '{}' ({})", name, rel.type_uri);
                continue;
            }
            let part = resolve_target(&workbook_part, &rel.target);
            let worksheet = Worksheet::parse(package.required_part_str(&part)?)?;
            sheets.push(SheetEntry {
                name,
                part,
                worksheet,
                dirty: false,
            });
        }

        let shared_strings = match workbook_rels
            .iter()
            .find(|r| has_type(r, REL_SHARED_STRINGS))
        {
            Some(rel) => {
                let part = resolve_target(&workbook_part, &rel.target);
                match package.part_str(&part)? {
                    Some(xml) => parse_shared_strings(xml)?,
                    None => Vec::new(),
                }
            }
            None => Vec::new(),
        };

        let existing_styles = workbook_rels
            .iter()
            .find(|r| has_type(r, REL_STYLES))
            .map(|rel| resolve_target(&workbook_part, &rel.target))
            .filter(|part| package.part(part).is_some());
        let (styles, styles_part, styles_source) = match existing_styles {
            Some(part) => {
                let styles = CellStyles::parse(package.required_part_str(&part)?)?;
                (styles, part.clone(), StylesSource::Part(part))
            }
            None => (
                CellStyles::parse(MINIMAL_STYLESHEET)?,
                resolve_target(&workbook_part, "styles.xml"),
                StylesSource::Created,
            ),
        };

        Ok(Self {
            package,
            workbook_part,
            workbook_rels,
            sheets,
            shared_strings,
            styles,
            styles_part,
            styles_source,
        })
    }

    /// Worksheet names in workbook order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// A worksheet by name.
    pub fn worksheet(&self, name: &str) -> Option<&Worksheet> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .map(|s| &s.worksheet)
    }

    pub fn worksheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn shared_strings(&self) -> &[String] {
        &self.shared_strings
    }

    pub fn styles(&self) -> &CellStyles {
        &self.styles
    }

    /// Content of a cell, `Empty` when the cell does not exist.
    pub fn cell_content(&self, sheet: &str, reference: &str) -> Result<CellContent> {
        let worksheet = self
            .worksheet(sheet)
            .ok_or_else(|| Error::WorkbookError(format!("no worksheet named '{}'", sheet)))?;
        match worksheet.cell_at(reference) {
            Some(cell) => cell.content(&self.shared_strings),
            None => Ok(CellContent::Empty),
        }
    }

    /// Whether any worksheet has pending changes.
    pub fn is_dirty(&self) -> bool {
        self.sheets.iter().any(|s| s.dirty)
    }

    /// Append `header` plus `value` in every data row to each worksheet.
    pub fn append_label_column(&mut self, header: &str, value: &str) {
        for sheet in &mut self.sheets {
            let col = sheet.worksheet.append_column(header, value);
            debug!("Label column {} added to sheet '{}'", col, sheet.name);
            sheet.dirty = true;
        }
    }

    /// Replace placeholder values in every worksheet. Returns the number of
    /// cells replaced.
    pub fn clean_sentinels(&mut self) -> Result<usize> {
        let mut total = 0;
        for sheet in &mut self.sheets {
            let replaced = sheet
                .worksheet
                .clean_sentinels(&self.shared_strings, &mut self.styles)?;
            if replaced > 0 {
                debug!("Replaced {} cell(s) in sheet '{}'", replaced, sheet.name);
                sheet.dirty = true;
            }
            total += replaced;
        }
        Ok(total)
    }

    /// Write pending changes into the package.
    fn flush(&mut self) -> Result<()> {
        for sheet in &mut self.sheets {
            if sheet.dirty {
                let xml = sheet.worksheet.to_xml()?;
                self.package.set_part(&sheet.part, xml.into_bytes());
                sheet.dirty = false;
            }
        }

        if !self.styles.is_modified() {
            return Ok(());
        }

        let existing = match &self.styles_source {
            StylesSource::Part(part) => Some(part.clone()),
            StylesSource::Created => None,
        };
        match existing {
            Some(part) => {
                let xml = self.styles.apply_to(self.package.required_part_str(&part)?)?;
                self.package.set_part(&part, xml.into_bytes());
            }
            None => {
                info!("Adding stylesheet '{}' to workbook", self.styles_part);
                let xml = self.styles.apply_to(MINIMAL_STYLESHEET)?;
                self.package.set_part(&self.styles_part, xml.into_bytes());
                self.register_styles_part()?;
                self.styles_source = StylesSource::Part(self.styles_part.clone());
            }
        }
        self.styles = CellStyles::parse(self.package.required_part_str(&self.styles_part)?)?;

        Ok(())
    }

    /// Link a new stylesheet from the workbook and declare its content type.
    fn register_styles_part(&mut self) -> Result<()> {
        let mut n = self.workbook_rels.len() + 1;
        while self.workbook_rels.iter().any(|r| r.id == format!("rId{}", n)) {
            n += 1;
        }
        let id = format!("rId{}", n);
        let target = relative_target(&self.workbook_part, &self.styles_part);

        let rels_part = rels_part_for(&self.workbook_part);
        let mut relationship = BytesStart::new("Relationship");
        relationship.push_attribute(("Id", id.as_str()));
        relationship.push_attribute(("Type", REL_STYLES_URI));
        relationship.push_attribute(("Target", target.as_str()));
        let rels = append_child(self.package.required_part_str(&rels_part)?, relationship)?;
        self.package.set_part(&rels_part, rels.into_bytes());

        let part_name = format!("/{}", self.styles_part);
        let mut override_entry = BytesStart::new("Override");
        override_entry.push_attribute(("PartName", part_name.as_str()));
        override_entry.push_attribute(("ContentType", STYLES_CONTENT_TYPE));
        let types = append_child(
            self.package.required_part_str(CONTENT_TYPES_PART)?,
            override_entry,
        )?;
        self.package.set_part(CONTENT_TYPES_PART, types.into_bytes());

        self.workbook_rels.push(Relationship {
            id,
            type_uri: REL_STYLES_URI.to_string(),
            target,
            target_mode: None,
        });
        Ok(())
    }

    /// Serialize the workbook with pending changes applied.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.flush()?;
        self.package.to_bytes()
    }

    /// Apply pending changes and write the workbook to `path`.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.flush()?;
        self.package.save(path)
    }
}

/// The main workbook part, from the package relationships.
fn find_workbook_part(package: &XlsxPackage) -> Result<String> {
    if let Some(xml) = package.part_str("_rels/.rels")? {
        let rels = parse_relationships(xml)?;
        if let Some(rel) = rels.iter().find(|r| has_type(r, REL_OFFICE_DOCUMENT)) {
            return Ok(resolve_target("", &rel.target));
        }
    }
    Ok(DEFAULT_WORKBOOK_PART.to_string())
}

/// `(name, relationship id)` for each `<sheet>` in workbook order.
fn parse_sheet_list(xml: &str) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut sheets = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if local_name(e.name().as_ref()) == b"sheet" =>
            {
                let mut name = None;
                let mut rel_id = None;
                for attr in e.attributes() {
                    let attr = attr?;
                    match (attr.key.prefix().is_some(), local_name(attr.key.as_ref())) {
                        (false, b"name") => name = Some(attr.unescape_value()?.into_owned()),
                        (true, b"id") => rel_id = Some(attr.unescape_value()?.into_owned()),
                        _ => {}
                    }
                }
                match (name, rel_id) {
                    (Some(name), Some(rel_id)) => sheets.push((name, rel_id)),
                    _ => {
                        return Err(Error::WorkbookError(
                            "<sheet> without name or r:id".into(),
                        ));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!("Error parsing workbook: {}", e)));
            }
            _ => {}
        }
    }
    Ok(sheets)
}

/// Path of `target_part` relative to the directory of `source_part`.
fn relative_target(source_part: &str, target_part: &str) -> String {
    let dir = source_part.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
    match target_part.strip_prefix(dir).and_then(|t| t.strip_prefix('/')) {
        Some(relative) if !dir.is_empty() => relative.to_string(),
        _ => format!("/{}", target_part),
    }
}

/// Add `child` as the last element of the document's root.
fn append_child(xml: &str, child: BytesStart<'_>) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut depth = 0usize;

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Start(_) => {
                depth += 1;
                writer.write_event(&event)?;
            }
            Event::End(_) => {
                if depth == 1 {
                    writer.write_event(Event::Empty(child.borrow()))?;
                }
                depth = depth.saturating_sub(1);
                writer.write_event(&event)?;
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }

    String::from_utf8(writer.into_inner().into_inner()).map_err(|e| Error::XmlError(e.to_string()))
}
