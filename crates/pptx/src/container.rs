//! Read-only access to the parts of a presentation container.

use embex_core::{
    local_name, parse_relationships, rels_part_for, resolve_target, Error, Result,
    SpreadsheetFormat,
};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::sync::LazyLock;
use zip::ZipArchive;

/// Directory holding embedded binary parts.
pub const EMBEDDINGS_PREFIX: &str = "ppt/embeddings/";

const PRESENTATION_PART: &str = "ppt/presentation.xml";

/// Matches slide parts and captures their 1-based number.
static SLIDE_PART_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ppt/slides/slide([1-9][0-9]*)\.xml$").unwrap());

/// A slide XML part and the number encoded in its filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlidePart {
    /// Part name, e.g. `ppt/slides/slide3.xml`.
    pub path: String,
    /// 1-based number from the filename.
    pub number: usize,
}

impl SlidePart {
    /// Zero-based slide index (number - 1).
    pub fn index(&self) -> usize {
        self.number - 1
    }

    /// Relationships part for this slide.
    pub fn rels_path(&self) -> String {
        rels_part_for(&self.path)
    }
}

/// An opened presentation package.
///
/// Part names are captured once at open time so enumeration follows the
/// archive's own entry order.
pub struct PresentationContainer<R: Read + Seek = BufReader<File>> {
    archive: ZipArchive<R>,
    names: Vec<String>,
}

impl PresentationContainer<BufReader<File>> {
    /// Open a presentation file from disk.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> PresentationContainer<R> {
    /// Open a presentation from any seekable reader.
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let mut names = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let entry = archive
                .by_index(i)
                .map_err(|e| Error::ZipError(format!("Failed to read entry {}: {}", i, e)))?;
            names.push(entry.name().to_string());
        }

        Ok(Self { archive, names })
    }

    /// All part names in archive order.
    pub fn part_names(&self) -> &[String] {
        &self.names
    }

    /// Whether the package contains a part.
    pub fn has_part(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Embedded spreadsheet parts, in archive order.
    pub fn embedded_spreadsheets(&self) -> Vec<String> {
        self.names
            .iter()
            .filter(|name| name.starts_with(EMBEDDINGS_PREFIX))
            .filter(|name| SpreadsheetFormat::from_part_name(name).is_some())
            .cloned()
            .collect()
    }

    /// Slide parts sorted by the number in their filename.
    pub fn slide_parts(&self) -> Vec<SlidePart> {
        let mut slides: Vec<SlidePart> = self
            .names
            .iter()
            .filter_map(|name| {
                let caps = SLIDE_PART_REGEX.captures(name)?;
                let number = caps[1].parse().ok()?;
                Some(SlidePart {
                    path: name.clone(),
                    number,
                })
            })
            .collect();
        slides.sort_by_key(|s| s.number);
        slides
    }

    /// Slide parts in presentation order.
    ///
    /// Follows the slide id list of `ppt/presentation.xml`. Falls back to
    /// filename order when the presentation part lists no slides.
    pub fn presentation_order(&mut self) -> Result<Vec<SlidePart>> {
        let slides = self.slide_parts();

        let Some(presentation_xml) = self.read_xml_optional(PRESENTATION_PART)? else {
            return Ok(slides);
        };
        let slide_rel_ids = parse_slide_id_list(&presentation_xml)?;
        if slide_rel_ids.is_empty() {
            return Ok(slides);
        }

        let rels_xml = self.read_xml(&rels_part_for(PRESENTATION_PART))?;
        let targets: HashMap<String, String> = parse_relationships(&rels_xml)?
            .into_iter()
            .map(|rel| (rel.id, resolve_target(PRESENTATION_PART, &rel.target)))
            .collect();

        let by_path: HashMap<&str, &SlidePart> =
            slides.iter().map(|s| (s.path.as_str(), s)).collect();

        let mut seen = HashSet::new();
        let mut ordered = Vec::with_capacity(slide_rel_ids.len());
        for rel_id in &slide_rel_ids {
            let Some(target) = targets.get(rel_id) else {
                log::warn!("Slide relationship {} not found in presentation rels", rel_id);
                continue;
            };
            match by_path.get(target.as_str()) {
                Some(slide) if seen.insert(target.clone()) => ordered.push((*slide).clone()),
                Some(_) => {}
                None => log::warn!("Slide part {} listed but not present", target),
            }
        }

        Ok(ordered)
    }

    /// Read a part's raw bytes.
    pub fn read_part(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut file = self.archive.by_name(name).map_err(|e| match e {
            zip::result::ZipError::FileNotFound => Error::MissingPart(name.to_string()),
            other => Error::ZipError(format!("Failed to open '{}': {}", name, other)),
        })?;

        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", name, e)))?;

        Ok(data)
    }

    /// Read a part's raw bytes, or `None` when the part does not exist.
    pub fn read_part_optional(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        if !self.has_part(name) {
            return Ok(None);
        }
        self.read_part(name).map(Some)
    }

    /// Read a part as UTF-8 XML text.
    pub fn read_xml(&mut self, name: &str) -> Result<String> {
        let data = self.read_part(name)?;
        String::from_utf8(data)
            .map_err(|e| Error::XmlError(format!("'{}' is not valid UTF-8: {}", name, e)))
    }

    /// Read a part as UTF-8 XML text, or `None` when the part does not exist.
    pub fn read_xml_optional(&mut self, name: &str) -> Result<Option<String>> {
        if !self.has_part(name) {
            return Ok(None);
        }
        self.read_xml(name).map(Some)
    }
}

/// Relationship ids of `<p:sldId>` entries, in order.
fn parse_slide_id_list(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut ids = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if local_name(e.name().as_ref()) == b"sldId" =>
            {
                for attr in e.attributes() {
                    let attr = attr?;
                    // The bare `id` attribute is the numeric slide id; the
                    // prefixed one is the relationship id.
                    if attr.key.prefix().is_some() && attr.key.local_name().as_ref() == b"id" {
                        ids.push(attr.unescape_value()?.into_owned());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing presentation: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(ids)
}
