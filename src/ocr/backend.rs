//! OCR backend abstraction.
//!
//! A backend turns a page image into word-level records with bounding boxes
//! and confidences. Backends are collaborators of the highlighter: their
//! failures become per-page input failures, never pipeline aborts.

use std::path::Path;
use thiserror::Error;

use crate::highlight::OcrRecord;

/// Errors from OCR backends and page rasterization.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("Malformed OCR output: {0}")]
    MalformedOutput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Available OCR backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OcrBackendType {
    /// Tesseract OCR via command-line.
    Tesseract,
}

impl OcrBackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrBackendType::Tesseract => "tesseract",
        }
    }
}

impl std::str::FromStr for OcrBackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tesseract" => Ok(OcrBackendType::Tesseract),
            _ => Err(format!("unknown OCR backend '{}'", s)),
        }
    }
}

impl std::fmt::Display for OcrBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait for word-level OCR backends.
pub trait OcrBackend: Send + Sync {
    /// Get the backend type.
    fn backend_type(&self) -> OcrBackendType;

    /// Check if this backend is available (dependencies installed).
    fn is_available(&self) -> bool;

    /// Get a description of what's needed to make this backend available.
    fn availability_hint(&self) -> String;

    /// Recognize the words on a page image, in reading order.
    fn ocr_words(&self, image_path: &Path) -> Result<Vec<OcrRecord>, OcrError>;
}

/// Configuration for OCR backends.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OcrConfig {
    /// Language for OCR (e.g., "eng", "spa").
    #[serde(default = "default_language")]
    pub language: String,
    /// Resolution used when rasterizing PDF pages.
    #[serde(default = "default_dpi")]
    pub dpi: u32,
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_dpi() -> u32 {
    200
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            dpi: default_dpi(),
        }
    }
}
