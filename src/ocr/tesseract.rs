//! Tesseract OCR backend implementation.
//!
//! Runs Tesseract via command-line with TSV output, which reports one row per
//! layout element: page, block, paragraph, line and word. Only word rows
//! carry text; the others report a confidence of -1.

use std::collections::HashMap;
use std::path::Path;
use std::process::Command;
use std::time::Instant;

use tracing::debug;

use super::backend::{OcrBackend, OcrBackendType, OcrConfig, OcrError};
use super::tools::check_binary;
use crate::highlight::OcrRecord;

const REQUIRED_COLUMNS: [&str; 6] = ["left", "top", "width", "height", "conf", "text"];

/// Tesseract OCR backend.
pub struct TesseractBackend {
    config: OcrConfig,
}

impl TesseractBackend {
    /// Create a new Tesseract backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: OcrConfig::default(),
        }
    }

    /// Create a new Tesseract backend with custom configuration.
    pub fn with_config(config: OcrConfig) -> Self {
        Self { config }
    }

    /// Run Tesseract on an image file, returning its TSV output.
    fn run_tesseract(&self, image_path: &Path) -> Result<String, OcrError> {
        let output = Command::new("tesseract")
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.config.language])
            .arg("tsv")
            .output();

        match output {
            Ok(output) => {
                if output.status.success() {
                    Ok(String::from_utf8_lossy(&output.stdout).to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(OcrError::OcrFailed(format!("tesseract failed: {}", stderr)))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(OcrError::BackendNotAvailable(
                    "tesseract not found (install tesseract-ocr)".to_string(),
                ))
            }
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl Default for TesseractBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrBackend for TesseractBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Tesseract
    }

    fn is_available(&self) -> bool {
        check_binary("tesseract")
    }

    fn availability_hint(&self) -> String {
        if !check_binary("tesseract") {
            "Tesseract not installed. Install with: apt install tesseract-ocr".to_string()
        } else {
            "Tesseract is available".to_string()
        }
    }

    fn ocr_words(&self, image_path: &Path) -> Result<Vec<OcrRecord>, OcrError> {
        let start = Instant::now();
        let tsv = self.run_tesseract(image_path)?;
        let records = parse_tsv(&tsv)?;
        debug!(
            "tesseract: {} rows from {} in {}ms",
            records.len(),
            image_path.display(),
            start.elapsed().as_millis()
        );
        Ok(records)
    }
}

/// Parse Tesseract TSV output into OCR records.
///
/// Cells that fail to parse become `None`; a missing header is an error for
/// the whole page.
pub fn parse_tsv(tsv: &str) -> Result<Vec<OcrRecord>, OcrError> {
    let mut lines = tsv.lines();
    let header = lines
        .next()
        .ok_or_else(|| OcrError::MalformedOutput("empty TSV output".to_string()))?;

    let columns: HashMap<&str, usize> = header
        .split('\t')
        .enumerate()
        .map(|(i, name)| (name.trim(), i))
        .collect();
    if let Some(missing) = REQUIRED_COLUMNS.iter().find(|c| !columns.contains_key(*c)) {
        return Err(OcrError::MalformedOutput(format!(
            "TSV header missing column '{}'",
            missing
        )));
    }
    let width = columns.len();

    let records = lines
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let cells: Vec<&str> = line.splitn(width, '\t').collect();
            let cell = |name: &str| columns.get(name).and_then(|&i| cells.get(i).copied());
            let int = |name: &str| cell(name).and_then(|v| v.trim().parse::<i64>().ok());
            OcrRecord {
                text: cell("text").map(str::to_string),
                confidence: cell("conf").and_then(|v| v.trim().parse::<f32>().ok()),
                left: int("left"),
                top: int("top"),
                width: int("width"),
                height: int("height"),
            }
        })
        .collect();

    Ok(records)
}
