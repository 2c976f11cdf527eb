//! Phrase highlighting over OCR'd pages.
//!
//! - `token`: normalizes raw OCR records into per-page token sequences
//! - `phrase_index`: first-word lookup over target phrases and keywords
//! - `matcher`: greedy, non-overlapping phrase matching with one-page lookahead
//! - `overlay`: translucent rectangles composited onto page images
//! - `pipeline`: per-document orchestration with per-page fault isolation
//! - `manifest`: serializable summary of the spans on every page

mod manifest;
mod matcher;
mod overlay;
mod phrase_index;
mod pipeline;
mod token;

pub use manifest::{HighlightManifest, PageManifest, PageStatus, SpanRecord};
pub use matcher::{Carry, CrossPagePolicy, MatchSpan, PageMatch, SpanContinuation, StreamMatcher};
pub use overlay::{HighlightStyle, OverlayRenderer};
pub use phrase_index::{PhraseCandidate, PhraseIndex, PhraseOrigin};
pub use pipeline::{
    DocumentHighlights, HighlightedPage, Highlighter, HighlighterOptions, PageFailure, PageInput,
    PageOutcome, PagePlan, PipelineError, TokenizedPage,
};
pub use token::{normalize, BoundingBox, OcrRecord, Token, TokenStreamBuilder, NO_TEXT_CONFIDENCE};
