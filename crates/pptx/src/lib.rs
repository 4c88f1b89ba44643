//! PPTX (Office Open XML) backend for embedded asset extraction.
//!
//! Parses .pptx files which are ZIP archives containing XML documents,
//! and pulls out embedded spreadsheets and picture shapes.

pub mod container;
pub mod extract;
pub mod relationships;
pub mod slide;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use container::{PresentationContainer, SlidePart, EMBEDDINGS_PREFIX};
pub use extract::{extract_images, extract_spreadsheets, ExtractedImage, ExtractedSpreadsheet};
pub use relationships::{map_embeddings_to_slides, slide_labels, EmbeddingIndex};
pub use slide::{parse_slide_shapes, Shape, ShapeKind};
