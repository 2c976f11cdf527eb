//! Machine-readable summary of a document's highlights.

use serde::Serialize;

use super::matcher::SpanContinuation;
use super::phrase_index::PhraseOrigin;
use super::pipeline::{DocumentHighlights, PageOutcome};
use super::token::BoundingBox;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightManifest {
    pub pages: Vec<PageManifest>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Highlighted,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageManifest {
    pub page: usize,
    pub status: PageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub spans: Vec<SpanRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpanRecord {
    pub start: usize,
    pub length: usize,
    pub phrase: String,
    pub origin: PhraseOrigin,
    pub continuation: SpanContinuation,
    pub boxes: Vec<BoundingBox>,
}

impl HighlightManifest {
    pub fn from_document(doc: &DocumentHighlights) -> Self {
        Self {
            pages: doc.pages.iter().map(PageManifest::from_outcome).collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl PageManifest {
    fn from_outcome(outcome: &PageOutcome) -> Self {
        match outcome {
            Ok(page) => Self {
                page: page.page,
                status: PageStatus::Highlighted,
                error: None,
                spans: page
                    .spans
                    .iter()
                    .map(|span| SpanRecord {
                        start: span.start,
                        length: span.len,
                        phrase: span.phrase.text.clone(),
                        origin: span.phrase.origin,
                        continuation: span.continuation,
                        boxes: span.tokens(&page.tokens).iter().map(|t| t.bbox).collect(),
                    })
                    .collect(),
            },
            Err(failure) => Self {
                page: failure.page,
                status: PageStatus::Failed,
                error: Some(failure.error.to_string()),
                spans: Vec::new(),
            },
        }
    }
}
