//! In-memory presentation builder for tests.
//!
//! Produces the smallest package layout the extractors read: content types,
//! `ppt/presentation.xml` with its slide id list, slides with their
//! relationship parts, embeddings and media.

use quick_xml::escape::escape;
use std::collections::{BTreeSet, HashMap};
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const NS_DECLS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

const REL_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const REL_PACKAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/package";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";

struct SlideRel {
    id: String,
    type_uri: &'static str,
    target: String,
    external: bool,
}

/// Builder for a minimal `.pptx` package.
#[derive(Default)]
pub struct PptxBuilder {
    slides: Vec<Vec<String>>,
    rels: HashMap<usize, Vec<SlideRel>>,
    without_rels: BTreeSet<usize>,
    order: Option<Vec<usize>>,
    embeddings: Vec<(String, Vec<u8>)>,
    media: Vec<(String, Vec<u8>)>,
}

impl PptxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a slide made of the given top-level shape fragments.
    pub fn slide(mut self, shapes: &[String]) -> Self {
        self.slides.push(shapes.to_vec());
        self
    }

    /// Store a part under `ppt/embeddings/` without linking it.
    pub fn embedding(mut self, name: &str, data: &[u8]) -> Self {
        self.embeddings.push((name.to_string(), data.to_vec()));
        self
    }

    /// Link an embedding from a slide (1-based slide number).
    pub fn link_embedding(mut self, slide: usize, name: &str) -> Self {
        let rels = self.rels.entry(slide).or_default();
        let id = format!("rIdEmb{}", rels.len() + 1);
        rels.push(SlideRel {
            id,
            type_uri: REL_PACKAGE,
            target: format!("../embeddings/{}", name),
            external: false,
        });
        self
    }

    /// Store a part under `ppt/media/`.
    pub fn media(mut self, name: &str, data: &[u8]) -> Self {
        self.media.push((name.to_string(), data.to_vec()));
        self
    }

    /// Add an image relationship to a slide.
    pub fn link_image(mut self, slide: usize, rel_id: &str, name: &str) -> Self {
        self.rels.entry(slide).or_default().push(SlideRel {
            id: rel_id.to_string(),
            type_uri: REL_IMAGE,
            target: format!("../media/{}", name),
            external: false,
        });
        self
    }

    /// Add an external (linked, not embedded) image relationship to a slide.
    pub fn link_external_image(mut self, slide: usize, rel_id: &str, url: &str) -> Self {
        self.rels.entry(slide).or_default().push(SlideRel {
            id: rel_id.to_string(),
            type_uri: REL_IMAGE,
            target: url.to_string(),
            external: true,
        });
        self
    }

    /// Omit the relationships part of a slide.
    pub fn without_rels(mut self, slide: usize) -> Self {
        self.without_rels.insert(slide);
        self
    }

    /// Presentation order as 1-based slide numbers.
    pub fn order(mut self, order: &[usize]) -> Self {
        self.order = Some(order.to_vec());
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Stored);

        let put = |zip: &mut ZipWriter<Cursor<Vec<u8>>>, name: &str, data: &[u8]| {
            zip.start_file(name, options).expect("start fixture entry");
            zip.write_all(data).expect("write fixture entry");
        };

        put(&mut zip, "[Content_Types].xml", CONTENT_TYPES.as_bytes());
        put(&mut zip, "_rels/.rels", PACKAGE_RELS.as_bytes());

        let order: Vec<usize> = self
            .order
            .clone()
            .unwrap_or_else(|| (1..=self.slides.len()).collect());

        let mut presentation = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:presentation {}><p:sldIdLst>"#,
            NS_DECLS
        );
        for (i, number) in order.iter().enumerate() {
            presentation.push_str(&format!(
                r#"<p:sldId id="{}" r:id="rIdSlide{}"/>"#,
                256 + i,
                number
            ));
        }
        presentation.push_str("</p:sldIdLst></p:presentation>");
        put(&mut zip, "ppt/presentation.xml", presentation.as_bytes());

        let mut presentation_rels = String::from(RELS_OPEN);
        for number in 1..=self.slides.len() {
            presentation_rels.push_str(&format!(
                r#"<Relationship Id="rIdSlide{}" Type="{}" Target="slides/slide{}.xml"/>"#,
                number, REL_SLIDE, number
            ));
        }
        presentation_rels.push_str(RELS_CLOSE);
        put(
            &mut zip,
            "ppt/_rels/presentation.xml.rels",
            presentation_rels.as_bytes(),
        );

        for (i, shapes) in self.slides.iter().enumerate() {
            let number = i + 1;
            let xml = format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sld {}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree></p:cSld></p:sld>"#,
                NS_DECLS,
                shapes.concat()
            );
            put(&mut zip, &format!("ppt/slides/slide{}.xml", number), xml.as_bytes());

            if self.without_rels.contains(&number) {
                continue;
            }
            let mut rels = String::from(RELS_OPEN);
            rels.push_str(&format!(
                r#"<Relationship Id="rIdLayout" Type="{}" Target="../slideLayouts/slideLayout1.xml"/>"#,
                REL_LAYOUT
            ));
            for rel in self.rels.get(&number).into_iter().flatten() {
                let mode = if rel.external {
                    r#" TargetMode="External""#
                } else {
                    ""
                };
                rels.push_str(&format!(
                    r#"<Relationship Id="{}" Type="{}" Target="{}"{}/>"#,
                    rel.id,
                    rel.type_uri,
                    escape(&rel.target),
                    mode
                ));
            }
            rels.push_str(RELS_CLOSE);
            put(
                &mut zip,
                &format!("ppt/slides/_rels/slide{}.xml.rels", number),
                rels.as_bytes(),
            );
        }

        for (name, data) in &self.embeddings {
            put(&mut zip, &format!("ppt/embeddings/{}", name), data);
        }
        for (name, data) in &self.media {
            put(&mut zip, &format!("ppt/media/{}", name), data);
        }

        zip.finish().expect("finish fixture archive").into_inner()
    }
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="xlsx" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"/><Default Extension="png" ContentType="image/png"/><Default Extension="jpeg" ContentType="image/jpeg"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#;

const RELS_OPEN: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#;
const RELS_CLOSE: &str = "</Relationships>";

/// A text box with one paragraph per entry.
pub fn paragraphs_shape(paragraphs: &[&str]) -> String {
    let body: String = paragraphs
        .iter()
        .map(|p| {
            if p.is_empty() {
                "<a:p/>".to_string()
            } else {
                format!("<a:p><a:r><a:rPr lang=\"en-US\"/><a:t>{}</a:t></a:r></a:p>", escape(*p))
            }
        })
        .collect();
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="TextBox"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/>{}</p:txBody></p:sp>"#,
        body
    )
}

/// A text box with a single paragraph.
pub fn text_shape(text: &str) -> String {
    paragraphs_shape(&[text])
}

/// A title placeholder carrying text.
pub fn title_shape(text: &str) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="Title 1"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>"#,
        escape(text)
    )
}

/// A rectangle without a text body.
pub fn plain_shape() -> String {
    r#"<p:sp><p:nvSpPr><p:cNvPr id="5" name="Rectangle"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr><a:prstGeom prst="rect"/></p:spPr></p:sp>"#.to_string()
}

/// A picture shape whose blip points at `rel_id`.
pub fn picture_shape(rel_id: &str) -> String {
    picture_with_nv_pr(rel_id, "<p:nvPr/>")
}

/// A picture placeholder (not a plain picture).
pub fn placeholder_picture_shape(rel_id: &str) -> String {
    picture_with_nv_pr(rel_id, r#"<p:nvPr><p:ph type="pic" idx="1"/></p:nvPr>"#)
}

/// A video frame; its poster image is a blip but the shape is media.
pub fn media_shape(rel_id: &str) -> String {
    picture_with_nv_pr(rel_id, r#"<p:nvPr><a:videoFile r:link="rIdVideo"/></p:nvPr>"#)
}

fn picture_with_nv_pr(rel_id: &str, nv_pr: &str) -> String {
    format!(
        r#"<p:pic><p:nvPicPr><p:cNvPr id="4" name="Picture"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr>{}</p:nvPicPr><p:blipFill><a:blip r:embed="{}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr/></p:pic>"#,
        nv_pr, rel_id
    )
}

/// A group wrapping other shapes.
pub fn group_shape(children: &[String]) -> String {
    format!(
        r#"<p:grpSp><p:nvGrpSpPr><p:cNvPr id="6" name="Group"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:grpSp>"#,
        children.concat()
    )
}

/// A one-cell table frame.
pub fn table_shape(cell_text: &str) -> String {
    format!(
        r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="7" name="Table"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr><p:xfrm/><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tr h="0"><a:tc><a:txBody><a:bodyPr/><a:p><a:r><a:t>{}</a:t></a:r></a:p></a:txBody></a:tc></a:tr></a:tbl></a:graphicData></a:graphic></p:graphicFrame>"#,
        escape(cell_text)
    )
}
