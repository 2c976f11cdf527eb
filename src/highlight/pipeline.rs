//! Page pipeline: tokenize, match and render every page of a document.
//!
//! Matching runs page by page in order so the lookahead into the next page
//! and the carry of split phrases can be threaded between neighbours.
//! Rendering depends only on a page's own plan and image, so callers may
//! render pages on separate workers.

use image::DynamicImage;
use thiserror::Error;
use tracing::{info, warn};

use super::matcher::{Carry, CrossPagePolicy, MatchSpan, StreamMatcher};
use super::overlay::{HighlightStyle, OverlayRenderer};
use super::phrase_index::PhraseIndex;
use super::token::{OcrRecord, Token, TokenStreamBuilder};
use crate::ocr::OcrError;

/// Errors that make a single page unavailable.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Input unavailable: {0}")]
    InputUnavailable(String),

    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A page that could not be processed. It is reported, never rendered.
#[derive(Debug, Error)]
#[error("page {page}: {error}")]
pub struct PageFailure {
    pub page: usize,
    #[source]
    pub error: PipelineError,
}

impl PageFailure {
    pub fn new(page: usize, error: impl Into<PipelineError>) -> Self {
        Self {
            page,
            error: error.into(),
        }
    }
}

/// Collaborator input for one page.
#[derive(Debug, Clone)]
pub struct PageInput {
    pub page: usize,
    pub image: DynamicImage,
    pub records: Vec<OcrRecord>,
}

/// A page's token sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizedPage {
    pub page: usize,
    pub tokens: Vec<Token>,
}

/// Tokens and spans of one page, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct PagePlan {
    pub page: usize,
    pub tokens: Vec<Token>,
    pub spans: Vec<MatchSpan>,
}

/// Output artifact for one page.
#[derive(Debug, Clone)]
pub struct HighlightedPage {
    pub page: usize,
    pub image: DynamicImage,
    pub tokens: Vec<Token>,
    pub spans: Vec<MatchSpan>,
}

pub type PageOutcome = Result<HighlightedPage, PageFailure>;

/// Per-page outcomes of a document run, in input order.
#[derive(Debug, Default)]
pub struct DocumentHighlights {
    pub pages: Vec<PageOutcome>,
}

impl DocumentHighlights {
    pub fn highlighted(&self) -> impl Iterator<Item = &HighlightedPage> {
        self.pages.iter().filter_map(|p| p.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &PageFailure> {
        self.pages.iter().filter_map(|p| p.as_ref().err())
    }

    pub fn failed_pages(&self) -> Vec<usize> {
        self.failures().map(|f| f.page).collect()
    }

    pub fn span_count(&self) -> usize {
        self.highlighted().map(|p| p.spans.len()).sum()
    }
}

/// Settings the orchestrator is constructed with.
#[derive(Debug, Clone, Default)]
pub struct HighlighterOptions {
    pub style: HighlightStyle,
    pub cross_page: CrossPagePolicy,
    pub min_confidence: Option<f32>,
}

/// Drives the matcher and renderer across the pages of a document.
#[derive(Debug, Clone, Default)]
pub struct Highlighter {
    builder: TokenStreamBuilder,
    renderer: OverlayRenderer,
    policy: CrossPagePolicy,
}

impl Highlighter {
    pub fn new(options: HighlighterOptions) -> Self {
        Self {
            builder: TokenStreamBuilder::new().with_min_confidence(options.min_confidence),
            renderer: OverlayRenderer::new(options.style),
            policy: options.cross_page,
        }
    }

    pub fn tokenize(&self, page: usize, records: &[OcrRecord]) -> TokenizedPage {
        TokenizedPage {
            page,
            tokens: self.builder.build(page, records),
        }
    }

    /// Match all pages in order. Failed pages pass through untouched and
    /// neither receive nor provide lookahead.
    pub fn match_pages(
        &self,
        index: &PhraseIndex,
        pages: Vec<Result<TokenizedPage, PageFailure>>,
    ) -> Vec<Result<PagePlan, PageFailure>> {
        let matcher = StreamMatcher::new(index).with_policy(self.policy);
        let mut plans = Vec::with_capacity(pages.len());
        let mut carry: Option<Carry> = None;

        for position in 0..pages.len() {
            let current = match &pages[position] {
                Ok(current) => current,
                Err(_) => {
                    carry = None;
                    continue;
                }
            };
            let lookahead = match pages.get(position + 1) {
                Some(Ok(next)) => Some(next.tokens.as_slice()),
                _ => None,
            };
            let found =
                matcher.match_page(current.page, &current.tokens, lookahead, carry.as_ref());
            carry = found.carry;
            plans.push((position, found.spans));
        }

        let mut spans_by_position = plans.into_iter().peekable();
        pages
            .into_iter()
            .enumerate()
            .map(|(position, page)| {
                let page = page?;
                let spans = match spans_by_position.next_if(|(p, _)| *p == position) {
                    Some((_, spans)) => spans,
                    None => Vec::new(),
                };
                Ok(PagePlan {
                    page: page.page,
                    tokens: page.tokens,
                    spans,
                })
            })
            .collect()
    }

    /// Render a planned page onto its image.
    pub fn render_page(&self, plan: PagePlan, image: &DynamicImage) -> HighlightedPage {
        let rendered = self.renderer.render(image, &plan.tokens, &plan.spans);
        HighlightedPage {
            page: plan.page,
            image: rendered,
            tokens: plan.tokens,
            spans: plan.spans,
        }
    }

    /// Run the whole pipeline synchronously.
    pub fn highlight(
        &self,
        index: &PhraseIndex,
        pages: Vec<Result<PageInput, PageFailure>>,
    ) -> DocumentHighlights {
        let mut images = Vec::with_capacity(pages.len());
        let tokenized: Vec<Result<TokenizedPage, PageFailure>> = pages
            .into_iter()
            .map(|input| {
                let input = input?;
                let tokenized = self.tokenize(input.page, &input.records);
                images.push(input.image);
                Ok(tokenized)
            })
            .collect();

        let mut images = images.into_iter();
        let outcomes: Vec<PageOutcome> = self
            .match_pages(index, tokenized)
            .into_iter()
            .map(|plan| {
                let plan = plan?;
                match images.next() {
                    Some(image) => Ok(self.render_page(plan, &image)),
                    None => Err(PageFailure::new(
                        plan.page,
                        PipelineError::InputUnavailable("page image missing".to_string()),
                    )),
                }
            })
            .collect();

        let result = DocumentHighlights { pages: outcomes };
        for failure in result.failures() {
            warn!("{}", failure);
        }
        info!(
            "highlighted {} pages ({} spans), {} failed",
            result.highlighted().count(),
            result.span_count(),
            result.failures().count()
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::token::BoundingBox;
    use image::{Rgb, RgbImage};

    const NONE: [&str; 0] = [];

    fn input(page: usize, words: &[&str]) -> Result<PageInput, PageFailure> {
        let records = words
            .iter()
            .enumerate()
            .map(|(i, w)| OcrRecord::word(w, 90.0, BoundingBox::new(i as u32 * 12, 4, 10, 8)))
            .collect();
        Ok(PageInput {
            page,
            image: DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 16, Rgb([250, 250, 250]))),
            records,
        })
    }

    fn unavailable(page: usize) -> Result<PageInput, PageFailure> {
        Err(PageFailure::new(
            page,
            PipelineError::InputUnavailable("ocr crashed".to_string()),
        ))
    }

    #[test]
    fn failed_page_is_isolated() {
        let index = PhraseIndex::build(NONE, ["fox"]);
        let doc = Highlighter::default().highlight(
            &index,
            vec![input(1, &["a", "fox"]), unavailable(2), input(3, &["fox"])],
        );
        assert_eq!(doc.pages.len(), 3);
        assert_eq!(doc.failed_pages(), vec![2]);
        let pages: Vec<_> = doc.highlighted().map(|p| p.page).collect();
        assert_eq!(pages, vec![1, 3]);
        assert_eq!(doc.span_count(), 2);
    }

    #[test]
    fn no_lookahead_across_failed_page() {
        let index = PhraseIndex::build(["end start"], NONE);
        let doc = Highlighter::default().highlight(
            &index,
            vec![input(0, &["the", "end"]), unavailable(1), input(2, &["start"])],
        );
        assert_eq!(doc.span_count(), 0);
    }

    #[test]
    fn split_phrase_highlights_both_pages() {
        let index = PhraseIndex::build(["end start"], NONE);
        let doc = Highlighter::default().highlight(
            &index,
            vec![input(0, &["the", "end"]), input(1, &["start", "here"])],
        );
        let spans: Vec<_> = doc
            .highlighted()
            .flat_map(|p| p.spans.iter().map(|s| (s.page, s.start, s.len)))
            .collect();
        assert_eq!(spans, vec![(0, 1, 1), (1, 0, 1)]);
    }

    #[test]
    fn match_pages_keeps_order_and_failures() {
        let highlighter = Highlighter::default();
        let index = PhraseIndex::build(NONE, ["x"]);
        let pages = vec![
            Err(PageFailure::new(
                0,
                PipelineError::InputUnavailable("gone".to_string()),
            )),
            Ok(highlighter.tokenize(1, &[OcrRecord::word("x", 80.0, BoundingBox::new(0, 0, 2, 2))])),
        ];
        let plans = highlighter.match_pages(&index, pages);
        assert!(plans[0].is_err());
        let plan = plans[1].as_ref().unwrap();
        assert_eq!(plan.page, 1);
        assert_eq!(plan.spans.len(), 1);
    }
}
