//! In-memory workbook builder for tests.
//!
//! Sheets are given as raw `<row>` fragments so tests control exactly which
//! cells exist and how they are typed.

use quick_xml::escape::escape;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Two cell formats: the default, and a bold one with a percent format.
pub const FIXTURE_STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="9" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1" applyNumberFormat="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const REL_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const REL_CHARTSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/chartsheet";
const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_SHARED_STRINGS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings";

enum FixtureSheet {
    Worksheet { name: String, rows: String },
    Chartsheet { name: String },
}

/// Builder for a minimal `.xlsx` package.
pub struct XlsxBuilder {
    sheets: Vec<FixtureSheet>,
    shared_strings: Vec<String>,
    styles: Option<String>,
}

impl Default for XlsxBuilder {
    fn default() -> Self {
        Self {
            sheets: Vec::new(),
            shared_strings: Vec::new(),
            styles: Some(FIXTURE_STYLES.to_string()),
        }
    }
}

impl XlsxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a worksheet whose `<sheetData>` holds `rows`.
    pub fn sheet(mut self, name: &str, rows: &str) -> Self {
        self.sheets.push(FixtureSheet::Worksheet {
            name: name.to_string(),
            rows: rows.to_string(),
        });
        self
    }

    /// Append a chart sheet, which carries no cells.
    pub fn chartsheet(mut self, name: &str) -> Self {
        self.sheets.push(FixtureSheet::Chartsheet {
            name: name.to_string(),
        });
        self
    }

    /// Set the shared string table.
    pub fn shared_strings(mut self, strings: &[&str]) -> Self {
        self.shared_strings = strings.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Replace the stylesheet.
    pub fn styles(mut self, xml: &str) -> Self {
        self.styles = Some(xml.to_string());
        self
    }

    /// Build without `xl/styles.xml`.
    pub fn without_styles(mut self) -> Self {
        self.styles = None;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let put = |zip: &mut ZipWriter<Cursor<Vec<u8>>>, name: &str, data: &[u8]| {
            zip.start_file(name, options).expect("start fixture entry");
            zip.write_all(data).expect("write fixture entry");
        };

        let mut content_types = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
        );
        let mut workbook = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="{}" xmlns:r="{}"><sheets>"#,
            NS_MAIN, NS_REL
        );
        let mut workbook_rels = String::from(RELS_OPEN);
        let mut parts: Vec<(String, String)> = Vec::new();

        for (i, sheet) in self.sheets.iter().enumerate() {
            let number = i + 1;
            let (name, rel_type, target, xml) = match sheet {
                FixtureSheet::Worksheet { name, rows } => (
                    name,
                    REL_WORKSHEET,
                    format!("worksheets/sheet{}.xml", number),
                    format!(
                        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="{}" xmlns:r="{}"><dimension ref="A1"/><sheetViews><sheetView workbookViewId="0"/></sheetViews><sheetFormatPr defaultRowHeight="15"/><sheetData>{}</sheetData><pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/></worksheet>"#,
                        NS_MAIN, NS_REL, rows
                    ),
                ),
                FixtureSheet::Chartsheet { name } => (
                    name,
                    REL_CHARTSHEET,
                    format!("chartsheets/sheet{}.xml", number),
                    format!(
                        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><chartsheet xmlns="{}" xmlns:r="{}"><sheetViews><sheetView workbookViewId="0"/></sheetViews></chartsheet>"#,
                        NS_MAIN, NS_REL
                    ),
                ),
            };
            let content_type = if rel_type == REL_WORKSHEET {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"
            } else {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.chartsheet+xml"
            };
            content_types.push_str(&format!(
                r#"<Override PartName="/xl/{}" ContentType="{}"/>"#,
                target, content_type
            ));
            workbook.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape(name.as_str()),
                number,
                number
            ));
            workbook_rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="{}" Target="{}"/>"#,
                number, rel_type, target
            ));
            parts.push((format!("xl/{}", target), xml));
        }
        workbook.push_str("</sheets></workbook>");

        let mut next_rel = self.sheets.len() + 1;
        if let Some(styles) = &self.styles {
            content_types.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
            workbook_rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="{}" Target="styles.xml"/>"#,
                next_rel, REL_STYLES
            ));
            next_rel += 1;
            parts.push(("xl/styles.xml".to_string(), styles.clone()));
        }
        if !self.shared_strings.is_empty() {
            content_types.push_str(r#"<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#);
            workbook_rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="{}" Target="sharedStrings.xml"/>"#,
                next_rel, REL_SHARED_STRINGS
            ));
            let mut sst = format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><sst xmlns="{}" count="{}" uniqueCount="{}">"#,
                NS_MAIN,
                self.shared_strings.len(),
                self.shared_strings.len()
            );
            for s in &self.shared_strings {
                sst.push_str(&format!("<si><t>{}</t></si>", escape(s.as_str())));
            }
            sst.push_str("</sst>");
            parts.push(("xl/sharedStrings.xml".to_string(), sst));
        }
        workbook_rels.push_str(RELS_CLOSE);
        content_types.push_str("</Types>");

        put(&mut zip, "[Content_Types].xml", content_types.as_bytes());
        put(&mut zip, "_rels/.rels", PACKAGE_RELS.as_bytes());
        put(&mut zip, "xl/workbook.xml", workbook.as_bytes());
        put(&mut zip, "xl/_rels/workbook.xml.rels", workbook_rels.as_bytes());
        for (name, xml) in &parts {
            put(&mut zip, name, xml.as_bytes());
        }

        zip.finish().expect("finish fixture archive").into_inner()
    }

    /// Build and write to `dir/name`.
    pub fn write(self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.build()).expect("write fixture workbook");
        path
    }
}

/// An inline string cell.
pub fn text_cell(reference: &str, text: &str) -> String {
    format!(
        r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
        reference,
        escape(text)
    )
}

/// A numeric cell.
pub fn number_cell(reference: &str, value: &str) -> String {
    format!(r#"<c r="{}"><v>{}</v></c>"#, reference, value)
}

/// A `<row>` holding the given cells.
pub fn row(number: u32, cells: &[String]) -> String {
    format!(r#"<row r="{}">{}</row>"#, number, cells.concat())
}

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const RELS_OPEN: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#;
const RELS_CLOSE: &str = "</Relationships>";
