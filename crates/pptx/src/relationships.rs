//! Associates embedded parts with the slides that reference them.

use crate::container::{PresentationContainer, EMBEDDINGS_PREFIX};
use crate::slide::{parse_slide_shapes, shape_texts};
use embex_core::{parse_relationships, resolve_target, Result, SlideLabel};
use std::collections::HashMap;
use std::io::{Read, Seek};

/// Map every embedded part to the zero-based index of the slide that
/// references it.
///
/// Slides are visited in filename order; when several slides reference the
/// same part, the last one visited wins. Slides without a relationships part
/// contribute nothing.
pub fn map_embeddings_to_slides<R: Read + Seek>(
    container: &mut PresentationContainer<R>,
) -> Result<HashMap<String, usize>> {
    let mut mapping = HashMap::new();

    for slide in container.slide_parts() {
        let Some(rels_xml) = container.read_xml_optional(&slide.rels_path())? else {
            log::debug!("{} has no relationships part", slide.path);
            continue;
        };

        for rel in parse_relationships(&rels_xml)? {
            if rel.is_external() {
                continue;
            }
            let target = resolve_target(&slide.path, &rel.target);
            if !target.starts_with(EMBEDDINGS_PREFIX) {
                continue;
            }
            if let Some(previous) = mapping.insert(target.clone(), slide.index()) {
                if previous != slide.index() {
                    log::warn!(
                        "{} is referenced by slides {} and {}; using slide {}",
                        target,
                        previous + 1,
                        slide.number,
                        slide.number
                    );
                }
            }
        }
    }

    Ok(mapping)
}

/// One label per slide, keyed by the zero-based index of its part name
/// (`slideN.xml` -> `N - 1`), the same key `map_embeddings_to_slides` uses.
///
/// Every slide part is labelled, including parts left out of the
/// presentation's slide list.
pub fn slide_labels<R: Read + Seek>(
    container: &mut PresentationContainer<R>,
) -> Result<HashMap<usize, SlideLabel>> {
    let mut labels = HashMap::new();

    for slide in container.slide_parts() {
        let xml = container.read_xml(&slide.path)?;
        let shapes = parse_slide_shapes(&xml)?;
        labels.insert(slide.index(), SlideLabel::from_texts(shape_texts(&shapes)));
    }

    Ok(labels)
}

/// Slide origin and labels for a document's embedded parts.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingIndex {
    pub slide_of: HashMap<String, usize>,
    pub labels: HashMap<usize, SlideLabel>,
}

impl EmbeddingIndex {
    /// Build the index for a container.
    pub fn build<R: Read + Seek>(container: &mut PresentationContainer<R>) -> Result<Self> {
        Ok(Self {
            slide_of: map_embeddings_to_slides(container)?,
            labels: slide_labels(container)?,
        })
    }

    /// Label for an embedded part.
    ///
    /// Uses the referencing slide, or the part's enumeration index when no
    /// slide references it. Indexes without a slide part give an empty label.
    pub fn label_for(&self, part_name: &str, enumeration_index: usize) -> String {
        let slide = self
            .slide_of
            .get(part_name)
            .copied()
            .unwrap_or(enumeration_index);
        self.labels
            .get(&slide)
            .map(SlideLabel::text)
            .unwrap_or_default()
    }
}
