//! The cell format table (`cellXfs`) of `xl/styles.xml`.

use embex_core::{local_name, Error, Result};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use std::io::Write as _;

/// Built-in number format `0`: integer, no separators.
pub const INTEGER_NUM_FMT_ID: u32 = 1;

/// Stylesheet written for workbooks that have none.
pub const MINIMAL_STYLESHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

/// One `<xf>` record: its attributes and its child elements as raw XML.
#[derive(Debug, Clone)]
struct Xf {
    attrs: Vec<(String, String)>,
    children: String,
}

impl Xf {
    fn default_record() -> Self {
        Self {
            attrs: ["numFmtId", "fontId", "fillId", "borderId", "xfId"]
                .iter()
                .map(|k| (k.to_string(), "0".to_string()))
                .collect(),
            children: String::new(),
        }
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn set_attr(&mut self, key: &str, value: &str) {
        match self.attrs.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attrs.push((key.to_string(), value.to_string())),
        }
    }

    fn num_fmt_id(&self) -> u32 {
        self.attr("numFmtId")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Equality ignoring attribute order.
    fn same_as(&self, other: &Xf) -> bool {
        let mut a = self.attrs.clone();
        let mut b = other.attrs.clone();
        a.sort();
        b.sort();
        a == b && self.children == other.children
    }
}

/// The `cellXfs` table, with formats derived during a pass appended at the end.
#[derive(Debug, Clone)]
pub struct CellStyles {
    xfs: Vec<Xf>,
    original_len: usize,
    integer_variants: HashMap<u32, u32>,
}

impl CellStyles {
    /// Read the `cellXfs` table from a stylesheet.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);

        let mut xfs = Vec::new();
        let mut found_table = false;
        let mut in_table = false;
        // Child writer and nesting depth for the `<xf>` being read.
        let mut open: Option<(Xf, Writer<Vec<u8>>, usize)> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| Error::XmlError(format!("Error parsing styles: {}", e)))?;

            let closes_xf = match open.as_mut() {
                Some((_, writer, depth)) => match &event {
                    Event::End(_) if *depth == 0 => true,
                    other => {
                        match other {
                            Event::Start(_) => *depth += 1,
                            Event::End(_) => *depth -= 1,
                            Event::Eof => {
                                return Err(Error::XmlError(
                                    "Unterminated <xf> in styles".into(),
                                ));
                            }
                            _ => {}
                        }
                        writer.write_event(other)?;
                        continue;
                    }
                },
                None => false,
            };
            if closes_xf {
                if let Some((mut xf, writer, _)) = open.take() {
                    xf.children = String::from_utf8(writer.into_inner())
                        .map_err(|e| Error::XmlError(e.to_string()))?;
                    xfs.push(xf);
                }
                continue;
            }

            match event {
                Event::Start(ref e) if local_name(e.name().as_ref()) == b"cellXfs" => {
                    found_table = true;
                    in_table = true;
                }
                Event::Empty(ref e) if local_name(e.name().as_ref()) == b"cellXfs" => {
                    found_table = true;
                }
                Event::End(ref e) if local_name(e.name().as_ref()) == b"cellXfs" => {
                    in_table = false;
                }
                Event::Start(ref e) if in_table && local_name(e.name().as_ref()) == b"xf" => {
                    open = Some((read_xf(e)?, Writer::new(Vec::new()), 0));
                }
                Event::Empty(ref e) if in_table && local_name(e.name().as_ref()) == b"xf" => {
                    xfs.push(read_xf(e)?);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !found_table {
            return Err(Error::WorkbookError(
                "styles part has no cellXfs table".into(),
            ));
        }

        let original_len = xfs.len();
        Ok(Self {
            xfs,
            original_len,
            integer_variants: HashMap::new(),
        })
    }

    /// Number of cell formats, including appended ones.
    pub(crate) fn len(&self) -> usize {
        self.xfs.len()
    }

    /// Whether formats were appended since parsing.
    pub fn is_modified(&self) -> bool {
        self.len() != self.original_len
    }

    /// Number format id of a cell format; `0` for unknown indexes.
    pub fn num_fmt_id(&self, xf: u32) -> u32 {
        self.xfs.get(xf as usize).map(Xf::num_fmt_id).unwrap_or(0)
    }

    /// A cell format equal to `xf` but with the integer number format.
    ///
    /// Returns `xf` itself when it already uses the integer format, an
    /// existing identical record when there is one, and appends a new record
    /// otherwise.
    pub fn integer_format(&mut self, xf: u32) -> u32 {
        if let Some(&variant) = self.integer_variants.get(&xf) {
            return variant;
        }

        if self.xfs.is_empty() {
            self.xfs.push(Xf::default_record());
        }

        let base_index = if (xf as usize) < self.xfs.len() { xf } else { 0 };
        let base = &self.xfs[base_index as usize];
        if base.num_fmt_id() == INTEGER_NUM_FMT_ID {
            self.integer_variants.insert(xf, base_index);
            return base_index;
        }

        let mut candidate = base.clone();
        candidate.set_attr("numFmtId", &INTEGER_NUM_FMT_ID.to_string());
        candidate.set_attr("applyNumberFormat", "1");

        let variant = match self.xfs.iter().position(|x| x.same_as(&candidate)) {
            Some(existing) => existing as u32,
            None => {
                self.xfs.push(candidate);
                (self.xfs.len() - 1) as u32
            }
        };

        self.integer_variants.insert(xf, variant);
        variant
    }

    /// Rewrite a stylesheet so its `cellXfs` table matches this one.
    pub fn apply_to(&self, xml: &str) -> Result<String> {
        if !self.is_modified() {
            return Ok(xml.to_string());
        }

        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);
        let mut writer = Writer::new(Vec::new());

        loop {
            let event = reader
                .read_event()
                .map_err(|e| Error::XmlError(format!("Error parsing styles: {}", e)))?;

            match event {
                Event::Start(ref e) if local_name(e.name().as_ref()) == b"cellXfs" => {
                    writer.write_event(Event::Start(self.table_start(e)?))?;
                }
                Event::Empty(ref e) if local_name(e.name().as_ref()) == b"cellXfs" => {
                    let start = self.table_start(e)?;
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    writer.write_event(Event::Start(start))?;
                    self.write_appended(&mut writer, &name)?;
                    writer.write_event(Event::End(BytesEnd::new(name)))?;
                }
                Event::End(ref e) if local_name(e.name().as_ref()) == b"cellXfs" => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    self.write_appended(&mut writer, &name)?;
                    writer.write_event(&event)?;
                }
                Event::Eof => break,
                ref other => writer.write_event(other)?,
            }
        }

        String::from_utf8(writer.into_inner()).map_err(|e| Error::XmlError(e.to_string()))
    }

    /// `<cellXfs>` start tag with an updated `count`.
    fn table_start(&self, e: &BytesStart) -> Result<BytesStart<'static>> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let mut start = BytesStart::new(name);
        for attr in e.attributes() {
            let attr = attr?;
            if attr.key.as_ref() != b"count" {
                start.push_attribute(attr);
            }
        }
        start.push_attribute(("count", self.len().to_string().as_str()));
        Ok(start.into_owned())
    }

    /// Write the records appended since parsing, using the table's prefix.
    fn write_appended(&self, writer: &mut Writer<Vec<u8>>, table_name: &str) -> Result<()> {
        let xf_name = match table_name.rsplit_once(':') {
            Some((prefix, _)) => format!("{}:xf", prefix),
            None => "xf".to_string(),
        };

        // A table that was parsed empty gets its default record too.
        let first_new = self.original_len.min(self.xfs.len());
        for xf in &self.xfs[first_new..] {
            let mut start = BytesStart::new(xf_name.as_str());
            for (k, v) in &xf.attrs {
                start.push_attribute((k.as_str(), v.as_str()));
            }
            if xf.children.is_empty() {
                writer.write_event(Event::Empty(start))?;
            } else {
                writer.write_event(Event::Start(start))?;
                writer.get_mut().write_all(xf.children.as_bytes())?;
                writer.write_event(Event::End(BytesEnd::new(xf_name.as_str())))?;
            }
        }
        Ok(())
    }
}

fn read_xf(e: &BytesStart) -> Result<Xf> {
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    Ok(Xf {
        attrs,
        children: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><numFmts count="1"><numFmt numFmtId="164" formatCode="0.0%"/></numFmts><cellXfs count="3"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="164" fontId="1" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"><alignment horizontal="center"/></xf><xf numFmtId="1" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

    #[test]
    fn test_parse_cell_xfs() {
        let styles = CellStyles::parse(STYLES).unwrap();
        assert_eq!(styles.len(), 3);
        assert_eq!(styles.num_fmt_id(1), 164);
        assert_eq!(styles.num_fmt_id(2), 1);
        assert_eq!(styles.num_fmt_id(99), 0);
        assert!(!styles.is_modified());
    }

    #[test]
    fn test_integer_format_reuses_existing_record() {
        let mut styles = CellStyles::parse(STYLES).unwrap();
        // xf 0 with numFmtId=1 and applyNumberFormat=1 is record 2.
        assert_eq!(styles.integer_format(0), 2);
        assert_eq!(styles.integer_format(2), 2);
        assert!(!styles.is_modified());
        assert_eq!(styles.apply_to(STYLES).unwrap(), STYLES);
    }

    #[test]
    fn test_integer_format_appends_variant_once() {
        let mut styles = CellStyles::parse(STYLES).unwrap();
        assert_eq!(styles.integer_format(1), 3);
        assert_eq!(styles.integer_format(1), 3);
        assert_eq!(styles.len(), 4);
        assert_eq!(styles.num_fmt_id(3), INTEGER_NUM_FMT_ID);

        let rewritten = styles.apply_to(STYLES).unwrap();
        assert!(rewritten.contains(r#"<cellXfs count="4">"#));
        assert!(rewritten.contains(
            r#"<xf numFmtId="1" fontId="1" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"><alignment horizontal="center"/></xf></cellXfs>"#
        ));

        let reparsed = CellStyles::parse(&rewritten).unwrap();
        assert_eq!(reparsed.len(), 4);
        let mut again = reparsed.clone();
        assert_eq!(again.integer_format(1), 3);
        assert!(!again.is_modified());
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let xml = r#"<styleSheet><fonts count="0"/></styleSheet>"#;
        assert!(matches!(
            CellStyles::parse(xml),
            Err(Error::WorkbookError(_))
        ));
    }

    #[test]
    fn test_minimal_stylesheet() {
        let mut styles = CellStyles::parse(MINIMAL_STYLESHEET).unwrap();
        assert_eq!(styles.integer_format(0), 1);
        let rewritten = styles.apply_to(MINIMAL_STYLESHEET).unwrap();
        assert_eq!(CellStyles::parse(&rewritten).unwrap().num_fmt_id(1), 1);
    }
}
