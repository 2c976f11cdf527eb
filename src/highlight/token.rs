//! Token stream building from raw OCR word records.
//!
//! OCR output is noisy by nature, so a record that cannot be placed on the
//! page is skipped with a warning instead of failing the page.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Confidence value OCR engines report for layout rows that carry no text.
pub const NO_TEXT_CONFIDENCE: f32 = -1.0;

/// Normalize a word for comparison: lowercase, alphanumeric characters only.
pub fn normalize(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Axis-aligned box in page pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Clip the box to an image of the given size.
    ///
    /// Returns `None` when nothing of the box remains visible.
    pub fn clip(&self, image_width: u32, image_height: u32) -> Option<BoundingBox> {
        if self.left >= image_width || self.top >= image_height {
            return None;
        }
        let right = self.left.saturating_add(self.width).min(image_width);
        let bottom = self.top.saturating_add(self.height).min(image_height);
        let width = right - self.left;
        let height = bottom - self.top;
        if width == 0 || height == 0 {
            return None;
        }
        Some(BoundingBox::new(self.left, self.top, width, height))
    }
}

/// A raw word record as handed over by an OCR collaborator.
///
/// Every field is optional so that malformed rows can still be represented
/// and skipped downstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrRecord {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, alias = "conf")]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub left: Option<i64>,
    #[serde(default)]
    pub top: Option<i64>,
    #[serde(default)]
    pub width: Option<i64>,
    #[serde(default)]
    pub height: Option<i64>,
}

impl OcrRecord {
    /// Convenience constructor for a well-formed record.
    pub fn word(text: &str, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            text: Some(text.to_string()),
            confidence: Some(confidence),
            left: Some(bbox.left as i64),
            top: Some(bbox.top as i64),
            width: Some(bbox.width as i64),
            height: Some(bbox.height as i64),
        }
    }

    fn bounding_box(&self) -> Option<BoundingBox> {
        let field = |v: Option<i64>| v.and_then(|v| u32::try_from(v).ok());
        Some(BoundingBox::new(
            field(self.left)?,
            field(self.top)?,
            field(self.width)?,
            field(self.height)?,
        ))
    }
}

/// One OCR-recognized word on one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub normalized: String,
    pub raw: String,
    pub bbox: BoundingBox,
    pub page: usize,
    pub position: usize,
}

impl Token {
    /// Empty tokens keep their slot but never take part in a match.
    pub fn is_matchable(&self) -> bool {
        !self.normalized.is_empty()
    }
}

/// Builds ordered token sequences from raw OCR records.
#[derive(Debug, Clone, Default)]
pub struct TokenStreamBuilder {
    min_confidence: Option<f32>,
}

impl TokenStreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop records whose confidence is below `min` in addition to the
    /// no-text sentinel.
    pub fn with_min_confidence(mut self, min: Option<f32>) -> Self {
        self.min_confidence = min;
        self
    }

    /// Build the token sequence for one page.
    pub fn build(&self, page: usize, records: &[OcrRecord]) -> Vec<Token> {
        let mut tokens = Vec::with_capacity(records.len());
        let mut skipped = 0usize;

        for (row, record) in records.iter().enumerate() {
            let Some(confidence) = record.confidence.filter(|c| c.is_finite()) else {
                warn!("page {}: skipping OCR row {} without confidence", page, row);
                skipped += 1;
                continue;
            };
            if confidence <= NO_TEXT_CONFIDENCE {
                continue;
            }
            if self.min_confidence.is_some_and(|min| confidence < min) {
                debug!(
                    "page {}: dropping row {} below confidence ({})",
                    page, row, confidence
                );
                continue;
            }
            let Some(bbox) = record.bounding_box() else {
                warn!("page {}: skipping OCR row {} with invalid bounding box", page, row);
                skipped += 1;
                continue;
            };

            let raw = record.text.clone().unwrap_or_default();
            tokens.push(Token {
                normalized: normalize(&raw),
                raw,
                bbox,
                page,
                position: tokens.len(),
            });
        }

        debug!(
            "page {}: built {} tokens ({} malformed rows skipped)",
            page,
            tokens.len(),
            skipped
        );
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox() -> BoundingBox {
        BoundingBox::new(10, 20, 30, 40)
    }

    #[test]
    fn normalize_strips_case_and_punctuation() {
        assert_eq!(normalize("Machine,"), "machine");
        assert_eq!(normalize("Learning."), "learning");
        assert_eq!(normalize("DNA's"), "dnas");
        assert_eq!(normalize("—"), "");
        assert_eq!(normalize("Málaga"), "málaga");
    }

    #[test]
    fn normalize_is_idempotent() {
        for word in ["Spain,[f]", "  Hello-World!", "x86_64", "ÆSIR", ""] {
            let once = normalize(word);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn sentinel_rows_are_dropped() {
        let records = vec![
            OcrRecord::word("", NO_TEXT_CONFIDENCE, bbox()),
            OcrRecord::word("The", 96.0, bbox()),
        ];
        let tokens = TokenStreamBuilder::new().build(0, &records);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].normalized, "the");
        assert_eq!(tokens[0].position, 0);
    }

    #[test]
    fn empty_tokens_keep_their_slot() {
        let records = vec![
            OcrRecord::word("a", 90.0, bbox()),
            OcrRecord::word("--", 90.0, bbox()),
            OcrRecord::word("b", 90.0, bbox()),
        ];
        let tokens = TokenStreamBuilder::new().build(2, &records);
        assert_eq!(tokens.len(), 3);
        assert!(!tokens[1].is_matchable());
        assert_eq!(tokens[2].position, 2);
        assert!(tokens.iter().all(|t| t.page == 2));
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let records = vec![
            OcrRecord {
                text: Some("nobox".into()),
                confidence: Some(90.0),
                ..Default::default()
            },
            OcrRecord {
                confidence: None,
                ..OcrRecord::word("noconf", 0.0, bbox())
            },
            OcrRecord {
                width: Some(-5),
                ..OcrRecord::word("negative", 90.0, bbox())
            },
            OcrRecord::word("kept", 90.0, bbox()),
        ];
        let tokens = TokenStreamBuilder::new().build(0, &records);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].raw, "kept");
        assert_eq!(tokens[0].position, 0);
    }

    #[test]
    fn min_confidence_filters_low_rows() {
        let records = vec![
            OcrRecord::word("blurry", 12.0, bbox()),
            OcrRecord::word("crisp", 91.0, bbox()),
        ];
        let tokens = TokenStreamBuilder::new()
            .with_min_confidence(Some(50.0))
            .build(0, &records);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].raw, "crisp");
    }

    #[test]
    fn clip_to_image_bounds() {
        let b = BoundingBox::new(90, 90, 20, 20);
        assert_eq!(b.clip(100, 100), Some(BoundingBox::new(90, 90, 10, 10)));
        assert_eq!(BoundingBox::new(100, 0, 5, 5).clip(100, 100), None);
        assert_eq!(BoundingBox::new(0, 0, 0, 5).clip(100, 100), None);
        assert_eq!(bbox().clip(100, 100), Some(bbox()));
    }

    #[test]
    fn record_deserializes_with_missing_fields() {
        let record: OcrRecord =
            serde_json::from_str(r#"{"text": "word", "conf": 88.5, "left": 1}"#).unwrap();
        assert_eq!(record.confidence, Some(88.5));
        assert_eq!(record.top, None);
    }
}
