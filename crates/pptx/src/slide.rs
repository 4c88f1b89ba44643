//! Slide shape parsing.
//!
//! Only the direct children of the slide's shape tree are shapes; shapes
//! nested in groups belong to their group.

use embex_core::{local_name, Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// The element a top-level shape was declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// `p:sp`: autoshapes, text boxes and text placeholders.
    AutoShape,
    /// `p:pic`
    Picture,
    /// `p:grpSp`
    Group,
    /// `p:graphicFrame`: tables, charts, OLE objects.
    GraphicFrame,
    /// `p:cxnSp`
    Connector,
    /// `p:contentPart`
    ContentPart,
}

impl ShapeKind {
    fn from_element(local: &[u8]) -> Option<Self> {
        match local {
            b"sp" => Some(Self::AutoShape),
            b"pic" => Some(Self::Picture),
            b"grpSp" => Some(Self::Group),
            b"graphicFrame" => Some(Self::GraphicFrame),
            b"cxnSp" => Some(Self::Connector),
            b"contentPart" => Some(Self::ContentPart),
            _ => None,
        }
    }
}

/// A top-level shape on a slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    pub kind: ShapeKind,
    /// Text frame contents, paragraphs joined by `\n`. Only autoshapes
    /// with a text body carry text.
    pub text: Option<String>,
    /// Relationship id of the embedded image, for pictures.
    pub image_rel_id: Option<String>,
    /// Declared as a placeholder (`p:ph`).
    pub placeholder: bool,
    /// Carries a video or audio reference.
    pub media: bool,
}

impl Shape {
    /// A plain picture: not a placeholder and not a media frame.
    pub fn is_picture(&self) -> bool {
        self.kind == ShapeKind::Picture && !self.placeholder && !self.media
    }

    /// Non-blank text, if any.
    pub fn visible_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// In-progress state for the shape being read.
struct ShapeState {
    kind: ShapeKind,
    /// Element depth of the shape's own start tag.
    depth: usize,
    text: String,
    has_text_body: bool,
    in_text_body: bool,
    in_text_run: bool,
    paragraphs: usize,
    image_rel_id: Option<String>,
    placeholder: bool,
    media: bool,
}

impl ShapeState {
    fn new(kind: ShapeKind, depth: usize) -> Self {
        Self {
            kind,
            depth,
            text: String::new(),
            has_text_body: false,
            in_text_body: false,
            in_text_run: false,
            paragraphs: 0,
            image_rel_id: None,
            placeholder: false,
            media: false,
        }
    }

    fn start(&mut self, local: &[u8], e: &BytesStart) -> Result<()> {
        match local {
            b"txBody" => {
                self.has_text_body = true;
                self.in_text_body = true;
            }
            b"p" if self.in_text_body => self.begin_paragraph(),
            b"t" if self.in_text_body => self.in_text_run = true,
            _ => self.marker(local, e)?,
        }
        Ok(())
    }

    fn empty(&mut self, local: &[u8], e: &BytesStart) -> Result<()> {
        match local {
            b"txBody" => self.has_text_body = true,
            b"p" if self.in_text_body => self.begin_paragraph(),
            b"br" if self.in_text_body => self.text.push('\n'),
            _ => self.marker(local, e)?,
        }
        Ok(())
    }

    fn end(&mut self, local: &[u8]) {
        match local {
            b"t" => self.in_text_run = false,
            b"txBody" => self.in_text_body = false,
            _ => {}
        }
    }

    fn begin_paragraph(&mut self) {
        if self.paragraphs > 0 {
            self.text.push('\n');
        }
        self.paragraphs += 1;
    }

    /// Elements that classify the shape rather than carry text.
    fn marker(&mut self, local: &[u8], e: &BytesStart) -> Result<()> {
        match local {
            b"ph" => self.placeholder = true,
            b"videoFile" | b"audioFile" | b"quickTimeFile" | b"media" => self.media = true,
            b"blip" if self.image_rel_id.is_none() => {
                for attr in e.attributes() {
                    let attr = attr?;
                    if attr.key.local_name().as_ref() == b"embed" {
                        self.image_rel_id = Some(attr.unescape_value()?.into_owned());
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self) -> Shape {
        let text = (self.kind == ShapeKind::AutoShape && self.has_text_body).then_some(self.text);
        let image_rel_id = if self.kind == ShapeKind::Picture {
            self.image_rel_id
        } else {
            None
        };
        Shape {
            kind: self.kind,
            text,
            image_rel_id,
            placeholder: self.placeholder,
            media: self.media,
        }
    }
}

/// Parse the top-level shapes of a slide, in document order.
pub fn parse_slide_shapes(xml: &str) -> Result<Vec<Shape>> {
    let mut reader = Reader::from_str(xml);
    // Whitespace inside text runs is content.
    reader.trim_text(false);

    let mut shapes = Vec::new();
    let mut depth = 0usize;
    let mut tree_depth: Option<usize> = None;
    let mut current: Option<ShapeState> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                depth += 1;
                let name = e.name();
                let local = local_name(name.as_ref());

                if let Some(state) = current.as_mut() {
                    state.start(local, e)?;
                } else if tree_depth.is_none() && local == b"spTree" {
                    tree_depth = Some(depth);
                } else if tree_depth == Some(depth - 1) {
                    if let Some(kind) = ShapeKind::from_element(local) {
                        current = Some(ShapeState::new(kind, depth));
                    }
                }
            }
            Ok(Event::Empty(ref e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                if let Some(state) = current.as_mut() {
                    state.empty(local, e)?;
                } else if tree_depth == Some(depth) {
                    if let Some(kind) = ShapeKind::from_element(local) {
                        shapes.push(ShapeState::new(kind, depth + 1).finish());
                    }
                }
            }
            Ok(Event::Text(ref e)) => {
                if let Some(state) = current.as_mut() {
                    if state.in_text_run {
                        let text = e.unescape()?;
                        state.text.push_str(&text);
                    }
                }
            }
            Ok(Event::CData(ref e)) => {
                if let Some(state) = current.as_mut() {
                    if state.in_text_run {
                        state.text.push_str(&String::from_utf8_lossy(e));
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                let closes_shape = current.as_ref().is_some_and(|s| s.depth == depth);
                if closes_shape {
                    if let Some(state) = current.take() {
                        shapes.push(state.finish());
                    }
                } else if let Some(state) = current.as_mut() {
                    state.end(local);
                } else if tree_depth == Some(depth) {
                    // Only the first shape tree is read.
                    tree_depth = Some(usize::MAX);
                }

                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!("Error parsing slide: {}", e)));
            }
            _ => {}
        }
    }

    Ok(shapes)
}

/// Shape texts in shape order, for label derivation.
pub fn shape_texts(shapes: &[Shape]) -> Vec<&str> {
    shapes.iter().filter_map(Shape::visible_text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{
        group_shape, media_shape, paragraphs_shape, picture_shape, placeholder_picture_shape,
        plain_shape, table_shape, text_shape, title_shape,
    };

    fn slide_xml(shapes: &[String]) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><p:sld xmlns:a="a" xmlns:r="r" xmlns:p="p"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree></p:cSld></p:sld>"#,
            shapes.concat()
        )
    }

    #[test]
    fn test_text_shapes_in_order() {
        let xml = slide_xml(&[title_shape("Q1 Results"), text_shape("Regional breakdown")]);
        let shapes = parse_slide_shapes(&xml).unwrap();

        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].kind, ShapeKind::AutoShape);
        assert!(shapes[0].placeholder);
        assert_eq!(shape_texts(&shapes), vec!["Q1 Results", "Regional breakdown"]);
    }

    #[test]
    fn test_paragraphs_joined_with_newline() {
        let xml = slide_xml(&[paragraphs_shape(&["Line one", "", "Line  three "])]);
        let shapes = parse_slide_shapes(&xml).unwrap();

        assert_eq!(shapes[0].text.as_deref(), Some("Line one\n\nLine  three "));
    }

    #[test]
    fn test_shape_without_text_body_has_no_text() {
        let xml = slide_xml(&[plain_shape()]);
        let shapes = parse_slide_shapes(&xml).unwrap();

        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].text, None);
        assert!(shape_texts(&shapes).is_empty());
    }

    #[test]
    fn test_picture_kinds() {
        let xml = slide_xml(&[
            picture_shape("rId2"),
            placeholder_picture_shape("rId3"),
            media_shape("rId4"),
        ]);
        let shapes = parse_slide_shapes(&xml).unwrap();

        assert_eq!(shapes.len(), 3);
        assert!(shapes[0].is_picture());
        assert_eq!(shapes[0].image_rel_id.as_deref(), Some("rId2"));
        assert!(!shapes[1].is_picture());
        assert!(shapes[1].placeholder);
        assert!(!shapes[2].is_picture());
        assert!(shapes[2].media);
    }

    #[test]
    fn test_grouped_shapes_are_not_top_level() {
        let xml = slide_xml(&[
            group_shape(&[text_shape("Inside group"), picture_shape("rId2")]),
            text_shape("Outside"),
        ]);
        let shapes = parse_slide_shapes(&xml).unwrap();

        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].kind, ShapeKind::Group);
        assert_eq!(shapes[0].text, None);
        assert_eq!(shapes[0].image_rel_id, None);
        assert_eq!(shape_texts(&shapes), vec!["Outside"]);
    }

    #[test]
    fn test_table_text_is_not_shape_text() {
        let xml = slide_xml(&[table_shape("Cell"), text_shape("Caption")]);
        let shapes = parse_slide_shapes(&xml).unwrap();

        assert_eq!(shapes[0].kind, ShapeKind::GraphicFrame);
        assert_eq!(shape_texts(&shapes), vec!["Caption"]);
    }

    #[test]
    fn test_escaped_text() {
        let xml = slide_xml(&[text_shape("R&D <core>")]);
        let shapes = parse_slide_shapes(&xml).unwrap();
        assert_eq!(shapes[0].text.as_deref(), Some("R&D <core>"));
    }

    #[test]
    fn test_malformed_slide_is_an_error() {
        let result = parse_slide_shapes("<p:sld><p:cSld></p:sld>");
        assert!(matches!(result, Err(Error::XmlError(_))));
    }
}
