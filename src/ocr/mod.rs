//! OCR collaborators: word-level recognition and PDF rasterization.
//!
//! - Tesseract (TSV output) produces per-word records with boxes and confidences
//! - pdftoppm (Poppler) renders PDF pages to images
//!
//! Both run as external binaries; use `check_tools` to see what is installed.

mod backend;
mod rasterize;
mod tesseract;
mod tools;

pub use backend::{OcrBackend, OcrBackendType, OcrConfig, OcrError};
pub use rasterize::{rasterize_pdf, RasterizedPdf};
pub use tesseract::{parse_tsv, TesseractBackend};
pub use tools::{check_binary, check_pdftoppm_hint, check_tools};
