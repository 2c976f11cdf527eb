//! ReadEase - highlight key phrases and keywords on OCR'd document pages.
//!
//! Pages are recognized word by word, matched against a phrase index with a
//! one-page lookahead, and rendered with translucent rectangles over every
//! matched word.

pub mod cli;
pub mod config;
pub mod highlight;
pub mod ocr;
pub mod phrases;
pub mod storage;
