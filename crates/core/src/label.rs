//! Slide labels used to annotate extracted spreadsheets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A human-readable label for a slide, built from its shape texts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideLabel {
    /// First non-blank text on the slide.
    pub title: Option<String>,
    /// First later text that differs from the title.
    pub subtitle: Option<String>,
}

impl SlideLabel {
    /// Build a label from shape texts in shape order.
    ///
    /// Blank texts are skipped and every text is trimmed.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut label = Self::default();

        for text in texts {
            let text = text.as_ref().trim();
            if text.is_empty() {
                continue;
            }
            match &label.title {
                None => label.title = Some(text.to_string()),
                Some(title) if title != text => {
                    label.subtitle = Some(text.to_string());
                    break;
                }
                Some(_) => {}
            }
        }

        label
    }

    /// `"title - subtitle"`, `"title"`, or `""` when the slide has no text.
    pub fn text(&self) -> String {
        match (&self.title, &self.subtitle) {
            (Some(title), Some(subtitle)) => format!("{} - {}", title, subtitle),
            (Some(title), None) => title.clone(),
            _ => String::new(),
        }
    }
}

impl fmt::Display for SlideLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_and_subtitle() {
        let label = SlideLabel::from_texts(["Q1 Results", "Regional breakdown"]);
        assert_eq!(label.text(), "Q1 Results - Regional breakdown");
    }

    #[test]
    fn test_title_only() {
        assert_eq!(SlideLabel::from_texts(["Summary"]).text(), "Summary");
    }

    #[test]
    fn test_no_text() {
        let empty: [&str; 0] = [];
        assert_eq!(SlideLabel::from_texts(empty).text(), "");
        assert_eq!(SlideLabel::from_texts(["", "   "]).text(), "");
    }

    #[test]
    fn test_subtitle_must_differ_from_title() {
        let label = SlideLabel::from_texts(["Revenue", " Revenue ", "", "By region", "Notes"]);
        assert_eq!(label.title.as_deref(), Some("Revenue"));
        assert_eq!(label.subtitle.as_deref(), Some("By region"));
        assert_eq!(label.to_string(), "Revenue - By region");
    }
}
