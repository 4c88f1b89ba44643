//! Open Packaging Conventions helpers shared by the PPTX and XLSX backends.
//!
//! Both formats are ZIP packages whose parts point at each other through
//! `_rels/*.rels` relationship parts.

use crate::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

/// A single `<Relationship>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub type_uri: String,
    pub target: String,
    /// `Some("External")` for links outside the package.
    pub target_mode: Option<String>,
}

impl Relationship {
    /// Whether the target lives outside the package.
    pub fn is_external(&self) -> bool {
        self.target_mode
            .as_deref()
            .is_some_and(|mode| mode.eq_ignore_ascii_case("External"))
    }
}

/// Parse a relationships part.
pub fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut relationships = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let mut id = None;
                let mut type_uri = None;
                let mut target = None;
                let mut target_mode = None;

                for attr in e.attributes() {
                    let attr = attr?;
                    let value = attr.unescape_value()?.into_owned();
                    match attr.key.as_ref() {
                        b"Id" => id = Some(value),
                        b"Type" => type_uri = Some(value),
                        b"Target" => target = Some(value),
                        b"TargetMode" => target_mode = Some(value),
                        _ => {}
                    }
                }

                if let (Some(id), Some(type_uri), Some(target)) = (id, type_uri, target) {
                    relationships.push(Relationship {
                        id,
                        type_uri,
                        target,
                        target_mode,
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(relationships)
}

/// Resolve a relationship target against the part that owns the relationship.
///
/// `resolve_target("ppt/slides/slide1.xml", "../embeddings/Book1.xlsx")`
/// yields `"ppt/embeddings/Book1.xlsx"`. Absolute targets are rooted at the
/// package root; fragments are dropped.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    let target = target.split_once('#').map(|(t, _)| t).unwrap_or(target);

    let (target, absolute) = match target.strip_prefix('/') {
        Some(rest) => (rest, true),
        None => (target, false),
    };

    let mut segments: Vec<&str> = if absolute {
        Vec::new()
    } else {
        source_part
            .trim_start_matches('/')
            .rsplit_once('/')
            .map(|(dir, _)| dir.split('/').filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    };

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}

/// The relationships part that belongs to `part`.
///
/// `ppt/slides/slide3.xml` -> `ppt/slides/_rels/slide3.xml.rels`.
pub fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Extract the local name from a potentially namespaced XML element name.
pub fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIDE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout2.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/package" Target="../embeddings/Microsoft_Excel_Worksheet.xlsx"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/" TargetMode="External"/>
</Relationships>"#;

    #[test]
    fn test_parse_relationships() {
        let rels = parse_relationships(SLIDE_RELS).unwrap();
        assert_eq!(rels.len(), 3);
        assert_eq!(rels[1].id, "rId2");
        assert_eq!(rels[1].target, "../embeddings/Microsoft_Excel_Worksheet.xlsx");
        assert!(!rels[1].is_external());
        assert!(rels[2].is_external());
    }

    #[test]
    fn test_parse_relationships_rejects_malformed_xml() {
        let err = parse_relationships("<Relationships></Relationship>").unwrap_err();
        assert!(matches!(err, Error::XmlError(_)));
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(
            resolve_target("ppt/slides/slide1.xml", "../embeddings/Book1.xlsx"),
            "ppt/embeddings/Book1.xlsx"
        );
        assert_eq!(
            resolve_target("ppt/slides/slide1.xml", "/ppt/media/image1.png"),
            "ppt/media/image1.png"
        );
        assert_eq!(
            resolve_target("xl/workbook.xml", "worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_target("ppt/presentation.xml", "slides/slide2.xml#frag"),
            "ppt/slides/slide2.xml"
        );
    }

    #[test]
    fn test_rels_part_for() {
        assert_eq!(
            rels_part_for("ppt/slides/slide3.xml"),
            "ppt/slides/_rels/slide3.xml.rels"
        );
        assert_eq!(rels_part_for("xl/workbook.xml"), "xl/_rels/workbook.xml.rels");
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"p:sp"), b"sp");
        assert_eq!(local_name(b"a:t"), b"t");
        assert_eq!(local_name(b"sp"), b"sp");
    }
}
