//! Highlight and word-dump commands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use console::style;
use futures::future::join_all;
use image::DynamicImage;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::config::Config;
use crate::highlight::{
    CrossPagePolicy, DocumentHighlights, HighlightManifest, Highlighter, OcrRecord, PageFailure,
    PageOutcome, PipelineError, TokenizedPage,
};
use crate::ocr::{OcrBackend, TesseractBackend};
use crate::phrases::{PhraseSource, SentenceRank};
use crate::storage;

use super::helpers::{collect_page_images, progress_bar};

pub struct HighlightArgs {
    pub input: Vec<PathBuf>,
    pub phrases: PathBuf,
    pub out: Option<PathBuf>,
    pub workers: Option<usize>,
    pub min_rank: Option<SentenceRank>,
    pub policy: Option<CrossPagePolicy>,
    pub words: bool,
}

/// OCR output for one page, plus the page image when rendering follows.
struct RecognizedPage {
    page: usize,
    records: Vec<OcrRecord>,
    image: Option<DynamicImage>,
}

/// OCR every page on blocking workers, keeping input order.
async fn recognize_pages(
    paths: &[PathBuf],
    config: &Config,
    workers: usize,
    with_images: bool,
) -> anyhow::Result<Vec<Result<RecognizedPage, PageFailure>>> {
    let backend = Arc::new(TesseractBackend::with_config(config.ocr.clone()));
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let pb = progress_bar(paths.len(), "Running OCR...")?;

    let mut handles = Vec::with_capacity(paths.len());
    for (page, path) in paths.iter().cloned().enumerate() {
        let backend = backend.clone();
        let semaphore = semaphore.clone();
        let pb = pb.clone();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let result = tokio::task::spawn_blocking(move || -> Result<RecognizedPage, PageFailure> {
                let records = backend
                    .ocr_words(&path)
                    .map_err(|e| PageFailure::new(page, e))?;
                let image = if with_images {
                    Some(image::open(&path).map_err(|e| PageFailure::new(page, e))?)
                } else {
                    None
                };
                Ok(RecognizedPage {
                    page,
                    records,
                    image,
                })
            })
            .await;
            pb.inc(1);
            match result {
                Ok(page_result) => page_result,
                Err(e) => Err(PageFailure::new(
                    page,
                    PipelineError::InputUnavailable(format!("OCR task failed: {}", e)),
                )),
            }
        }));
    }

    let pages: Vec<Result<RecognizedPage, PageFailure>> = join_all(handles)
        .await
        .into_iter()
        .enumerate()
        .map(|(page, joined)| {
            joined.unwrap_or_else(|e| {
                Err(PageFailure::new(
                    page,
                    PipelineError::InputUnavailable(format!("OCR task failed: {}", e)),
                ))
            })
        })
        .collect();
    pb.finish_and_clear();

    for failure in pages.iter().filter_map(|p| p.as_ref().err()) {
        warn!("{}", failure);
    }
    Ok(pages)
}

/// Run OCR, match phrases across pages and write highlighted pages.
pub async fn cmd_highlight(config: &Config, args: HighlightArgs) -> anyhow::Result<()> {
    let mut source = PhraseSource::load(&args.phrases)
        .with_context(|| format!("loading phrases from {}", args.phrases.display()))?;
    if let Some(min_rank) = args.min_rank {
        source = source.with_min_rank(min_rank);
    }
    if source.is_empty() {
        println!(
            "{} No phrases in {}; pages will be copied unchanged",
            style("!").yellow(),
            args.phrases.display()
        );
    }
    let index = source.index();
    info!("{} phrases indexed", index.len());

    let mut options = config.highlight.options();
    if let Some(policy) = args.policy {
        options.cross_page = policy;
    }
    let highlighter = Arc::new(Highlighter::new(options));
    let workers = args.workers.unwrap_or(config.workers).max(1);
    let out_dir = args.out.unwrap_or_else(|| config.output_path());

    let images = collect_page_images(&args.input, config.ocr.dpi)?;
    if images.paths.is_empty() {
        anyhow::bail!("No pages to process");
    }
    let recognized = recognize_pages(&images.paths, config, workers, true).await?;

    let mut page_images = Vec::with_capacity(recognized.len());
    let tokenized: Vec<Result<TokenizedPage, PageFailure>> = recognized
        .into_iter()
        .map(|page| {
            let page = page?;
            page_images.push(page.image);
            Ok(highlighter.tokenize(page.page, &page.records))
        })
        .collect();

    let plans = highlighter.match_pages(&index, tokenized);

    let semaphore = Arc::new(Semaphore::new(workers));
    let pb = progress_bar(plans.len(), "Rendering...")?;
    let mut page_images = page_images.into_iter();
    let mut handles = Vec::with_capacity(plans.len());
    for plan in plans {
        let image = plan.as_ref().ok().and_then(|_| page_images.next().flatten());
        let highlighter = highlighter.clone();
        let semaphore = semaphore.clone();
        let pb = pb.clone();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let plan = plan?;
            let page = plan.page;
            let image = image.ok_or_else(|| {
                PageFailure::new(
                    page,
                    PipelineError::InputUnavailable("page image missing".to_string()),
                )
            })?;
            let rendered =
                tokio::task::spawn_blocking(move || highlighter.render_page(plan, &image)).await;
            pb.inc(1);
            rendered.map_err(|e| {
                PageFailure::new(
                    page,
                    PipelineError::InputUnavailable(format!("render task failed: {}", e)),
                )
            })
        }));
    }

    let outcomes: Vec<PageOutcome> = join_all(handles)
        .await
        .into_iter()
        .enumerate()
        .map(|(page, joined)| {
            joined.unwrap_or_else(|e| {
                Err(PageFailure::new(
                    page,
                    PipelineError::InputUnavailable(format!("render task failed: {}", e)),
                ))
            })
        })
        .collect();
    pb.finish_and_clear();

    let doc = DocumentHighlights { pages: outcomes };
    let written = storage::save_highlighted_pages(&out_dir, &doc)
        .with_context(|| format!("writing pages to {}", out_dir.display()))?;
    let manifest = storage::save_manifest(&out_dir, &HighlightManifest::from_document(&doc))?;
    if args.words {
        storage::save_words(&out_dir, &doc)?;
    }

    println!(
        "{} Highlighted {} spans on {} pages",
        style("✓").green(),
        doc.span_count(),
        written.len()
    );
    for failure in doc.failures() {
        println!(
            "  {} Page {} failed: {}",
            style("✗").red(),
            failure.page + 1,
            failure.error
        );
    }
    println!("  Output: {}", style(out_dir.display()).cyan());
    println!("  Manifest: {}", style(manifest.display()).dim());

    Ok(())
}

/// OCR the input and print each page's tokens.
pub async fn cmd_words(config: &Config, input: &[PathBuf], json: bool) -> anyhow::Result<()> {
    let images = collect_page_images(input, config.ocr.dpi)?;
    let recognized = recognize_pages(&images.paths, config, config.workers, false).await?;
    let highlighter = Highlighter::new(config.highlight.options());

    let pages: Vec<Result<TokenizedPage, PageFailure>> = recognized
        .into_iter()
        .map(|page| page.map(|p| highlighter.tokenize(p.page, &p.records)))
        .collect();

    if json {
        let tokens = pages.iter().filter_map(|p| p.as_ref().ok()).map(|p| p.tokens.as_slice());
        println!("{}", storage::words_json(tokens)?);
        return Ok(());
    }

    for page in &pages {
        match page {
            Ok(page) => {
                println!("\n{}", style(format!("── Page {} ", page.page + 1)).bold());
                for token in &page.tokens {
                    let normalized = if token.is_matchable() {
                        style(token.normalized.as_str()).cyan()
                    } else {
                        style("(empty)").dim()
                    };
                    println!(
                        "  {:>4}  {:<24} {:<24} {}x{}+{}+{}",
                        token.position,
                        token.raw,
                        normalized,
                        token.bbox.width,
                        token.bbox.height,
                        token.bbox.left,
                        token.bbox.top
                    );
                }
            }
            Err(failure) => {
                println!(
                    "\n{} Page {} failed: {}",
                    style("✗").red(),
                    failure.page + 1,
                    failure.error
                );
            }
        }
    }

    Ok(())
}
