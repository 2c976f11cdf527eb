//! Shared helper functions for CLI commands.

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::ocr::{rasterize_pdf, RasterizedPdf};

/// Page images for a run. Rasterized PDFs keep their temp dirs alive here.
pub struct PageImages {
    pub paths: Vec<PathBuf>,
    _rasterized: Vec<RasterizedPdf>,
}

/// Expand the command-line inputs into page image paths, in page order.
/// PDFs are rasterized at `dpi`; anything else is taken as an image.
pub fn collect_page_images(inputs: &[PathBuf], dpi: u32) -> anyhow::Result<PageImages> {
    let mut paths = Vec::new();
    let mut rasterized = Vec::new();

    for input in inputs {
        if !input.exists() {
            anyhow::bail!("Input not found: {}", input.display());
        }
        if is_pdf(input) {
            let pdf = rasterize_pdf(input, dpi)?;
            info!("{}: {} pages", input.display(), pdf.pages().len());
            paths.extend(pdf.pages().iter().cloned());
            rasterized.push(pdf);
        } else {
            paths.push(input.clone());
        }
    }

    Ok(PageImages {
        paths,
        _rasterized: rasterized,
    })
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

pub fn progress_bar(len: usize, message: &'static str) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")?
            .progress_chars("█▓░"),
    );
    pb.set_message(message);
    Ok(pb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_pdf_extension() {
        assert!(is_pdf(Path::new("scan.PDF")));
        assert!(is_pdf(Path::new("a/b/report.pdf")));
        assert!(!is_pdf(Path::new("page.png")));
        assert!(!is_pdf(Path::new("pdf")));
    }

    #[test]
    fn images_pass_through_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        std::fs::write(&a, b"").unwrap();
        std::fs::write(&b, b"").unwrap();

        let pages = collect_page_images(&[b.clone(), a.clone()], 200).unwrap();
        assert_eq!(pages.paths, vec![b, a]);
    }

    #[test]
    fn missing_input_is_an_error() {
        let result = collect_page_images(&[PathBuf::from("/nonexistent/page.png")], 200);
        assert!(result.is_err());
    }
}
