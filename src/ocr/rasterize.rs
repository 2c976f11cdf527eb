//! PDF page rasterization via pdftoppm.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use super::backend::OcrError;

/// Page images rendered from a PDF. The images live as long as this value.
pub struct RasterizedPdf {
    dir: TempDir,
    pages: Vec<PathBuf>,
}

impl RasterizedPdf {
    /// Page image paths in page order.
    pub fn pages(&self) -> &[PathBuf] {
        &self.pages
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

/// Render every page of `pdf_path` to PNG at `dpi`.
pub fn rasterize_pdf(pdf_path: &Path, dpi: u32) -> Result<RasterizedPdf, OcrError> {
    let dir = TempDir::new()?;
    let dpi = dpi.to_string();

    let status = Command::new("pdftoppm")
        .args(["-png", "-r", &dpi])
        .arg(pdf_path)
        .arg(dir.path().join("page"))
        .status();

    match status {
        Ok(s) if s.success() => {}
        Ok(_) => {
            return Err(OcrError::OcrFailed(
                "pdftoppm failed to convert PDF".to_string(),
            ))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(OcrError::BackendNotAvailable(
                "pdftoppm not found (install poppler-utils)".to_string(),
            ))
        }
        Err(e) => return Err(OcrError::Io(e)),
    }

    let pages = collect_page_images(dir.path())?;
    if pages.is_empty() {
        return Err(OcrError::OcrFailed(
            "No images generated from PDF".to_string(),
        ));
    }
    Ok(RasterizedPdf { dir, pages })
}

/// Find `page-N.png` files and order them by page number.
///
/// pdftoppm zero-pads page numbers to the width of the page count, so a
/// numeric sort is needed rather than a lexical one.
fn collect_page_images(dir: &Path) -> Result<Vec<PathBuf>, OcrError> {
    let mut pages: Vec<(u32, PathBuf)> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter_map(|path| {
            let stem = path.file_stem()?.to_str()?;
            let number = stem.strip_prefix("page-")?.parse().ok()?;
            (path.extension()? == "png").then_some((number, path))
        })
        .collect();
    pages.sort_by_key(|(number, _)| *number);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_sorted_numerically() {
        let dir = TempDir::new().unwrap();
        for name in ["page-10.png", "page-02.png", "page-1.png", "notes.txt", "page-x.png"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let pages = collect_page_images(dir.path()).unwrap();
        let names: Vec<_> = pages
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["page-1.png", "page-02.png", "page-10.png"]);
    }
}
