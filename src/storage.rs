//! Storage helpers for highlighted output on disk.
//!
//! Layout of an output directory:
//! `{out}/page_{n}.png` for every highlighted page (1-based),
//! `{out}/manifest.json` with spans and failures,
//! and optionally `{out}/words.json` with the token dump.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::highlight::{DocumentHighlights, HighlightManifest, Token};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const WORDS_FILE: &str = "words.json";

/// Construct the path for a rendered page. `page` is the 0-based position.
pub fn page_image_path(out_dir: &Path, page: usize) -> PathBuf {
    out_dir.join(format!("page_{}.png", page + 1))
}

/// Save every highlighted page of `doc` as PNG, returning the paths written.
pub fn save_highlighted_pages(out_dir: &Path, doc: &DocumentHighlights) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)?;
    let mut written = Vec::new();
    for page in doc.highlighted() {
        let path = page_image_path(out_dir, page.page);
        page.image.save(&path)?;
        debug!("wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

/// Write the span manifest next to the page images.
pub fn save_manifest(out_dir: &Path, manifest: &HighlightManifest) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join(MANIFEST_FILE);
    std::fs::write(&path, manifest.to_json()?)?;
    Ok(path)
}

#[derive(Debug, Serialize)]
struct WordRecord<'a> {
    page: usize,
    position: usize,
    raw: &'a str,
    normalized: &'a str,
    left: u32,
    top: u32,
    width: u32,
    height: u32,
}

impl<'a> From<&'a Token> for WordRecord<'a> {
    fn from(token: &'a Token) -> Self {
        Self {
            page: token.page,
            position: token.position,
            raw: &token.raw,
            normalized: &token.normalized,
            left: token.bbox.left,
            top: token.bbox.top,
            width: token.bbox.width,
            height: token.bbox.height,
        }
    }
}

/// Serialize token streams (one slice per page) as a flat JSON array.
pub fn words_json<'a>(pages: impl IntoIterator<Item = &'a [Token]>) -> serde_json::Result<String> {
    let words: Vec<WordRecord<'_>> = pages
        .into_iter()
        .flat_map(|tokens| tokens.iter().map(WordRecord::from))
        .collect();
    serde_json::to_string_pretty(&words)
}

/// Write the token dump of every highlighted page.
pub fn save_words(out_dir: &Path, doc: &DocumentHighlights) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join(WORDS_FILE);
    let json = words_json(doc.highlighted().map(|p| p.tokens.as_slice()))?;
    std::fs::write(&path, json)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::{
        BoundingBox, Highlighter, OcrRecord, PageFailure, PageInput, PhraseIndex, PipelineError,
    };
    use image::{DynamicImage, Rgb, RgbImage};

    fn document() -> DocumentHighlights {
        let index = PhraseIndex::build(["brown fox"], ["dog"]);
        let page = PageInput {
            page: 0,
            image: DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 20, Rgb([255, 255, 255]))),
            records: vec![
                OcrRecord::word("brown", 95.0, BoundingBox::new(0, 2, 10, 8)),
                OcrRecord::word("fox", 95.0, BoundingBox::new(12, 2, 10, 8)),
            ],
        };
        let failed = Err(PageFailure::new(
            1,
            PipelineError::InputUnavailable("unreadable".to_string()),
        ));
        Highlighter::default().highlight(&index, vec![Ok(page), failed])
    }

    #[test]
    fn page_paths_are_one_based() {
        assert_eq!(page_image_path(Path::new("out"), 0), PathBuf::from("out/page_1.png"));
        assert_eq!(page_image_path(Path::new("out"), 9), PathBuf::from("out/page_10.png"));
    }

    #[test]
    fn saves_pages_manifest_and_words() {
        let dir = tempfile::tempdir().unwrap();
        let doc = document();

        let pages = save_highlighted_pages(dir.path(), &doc).unwrap();
        assert_eq!(pages, vec![dir.path().join("page_1.png")]);
        assert!(!dir.path().join("page_2.png").exists());

        let saved = image::open(&pages[0]).unwrap();
        assert_eq!((saved.width(), saved.height()), (50, 20));

        let manifest = save_manifest(dir.path(), &HighlightManifest::from_document(&doc)).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(manifest).unwrap()).unwrap();
        assert_eq!(json["pages"].as_array().unwrap().len(), 2);

        let words = save_words(dir.path(), &doc).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(words).unwrap()).unwrap();
        assert_eq!(json[1]["raw"], "fox");
        assert_eq!(json[1]["left"], 12);
    }
}
