//! Shared string table.

use embex_core::{local_name, Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

/// Parse `xl/sharedStrings.xml` into plain strings.
///
/// Rich-text runs are concatenated; phonetic runs (`rPh`) are skipped.
pub fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    let mut phonetic_depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"si" => current = Some(String::new()),
                b"rPh" => phonetic_depth += 1,
                b"t" if phonetic_depth == 0 => in_t = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => {
                if local_name(e.name().as_ref()) == b"si" {
                    strings.push(String::new());
                }
            }
            Ok(Event::Text(ref e)) => {
                if in_t {
                    if let Some(s) = current.as_mut() {
                        s.push_str(&e.unescape()?);
                    }
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"si" => {
                    if let Some(s) = current.take() {
                        strings.push(s);
                    }
                }
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"t" => in_t = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing shared strings: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(strings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_and_rich_strings() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="4" uniqueCount="4">
  <si><t>Region</t></si>
  <si><r><rPr><b/></rPr><t>N/</t></r><r><t xml:space="preserve">A </t></r></si>
  <si/>
  <si><t>東京</t><rPh sb="0" eb="2"><t>トウキョウ</t></rPh></si>
</sst>"#;
        let strings = parse_shared_strings(xml).unwrap();
        assert_eq!(strings, vec!["Region", "N/A ", "", "東京"]);
    }

    #[test]
    fn test_escaped_text() {
        let xml = r#"<sst><si><t>R&amp;D</t></si></sst>"#;
        assert_eq!(parse_shared_strings(xml).unwrap(), vec!["R&D"]);
    }
}
