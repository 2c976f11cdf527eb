//! Phrase sources: the keywords and key sentences to highlight.
//!
//! Phrases are selected upstream (usually by a language model). This module
//! only loads them: from a JSON/TOML/YAML file, or from a raw model response
//! that may be wrapped in a Markdown code fence.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::highlight::PhraseIndex;

#[derive(Debug, Error)]
pub enum PhraseSourceError {
    #[error("Failed to read phrase file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse phrase file: {0}")]
    Parse(String),
}

/// Relevance label an extractor attaches to a sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankLabel {
    #[serde(alias = "Low", alias = "LOW")]
    Low,
    #[serde(alias = "Average", alias = "AVERAGE", alias = "medium")]
    Average,
    #[serde(alias = "High", alias = "HIGH")]
    High,
}

impl RankLabel {
    /// Position on the numeric rank scale: low 1, average 2, high 3.
    pub fn score(self) -> f64 {
        match self {
            RankLabel::Low => 1.0,
            RankLabel::Average => 2.0,
            RankLabel::High => 3.0,
        }
    }
}

/// A sentence rank: a relevance label or a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SentenceRank {
    Score(f64),
    Label(RankLabel),
}

impl SentenceRank {
    pub fn score(self) -> f64 {
        match self {
            SentenceRank::Score(score) => score,
            SentenceRank::Label(label) => label.score(),
        }
    }
}

impl FromStr for SentenceRank {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(score) = s.parse::<f64>() {
            return Ok(SentenceRank::Score(score));
        }
        match s.to_lowercase().as_str() {
            "low" => Ok(SentenceRank::Label(RankLabel::Low)),
            "average" | "medium" => Ok(SentenceRank::Label(RankLabel::Average)),
            "high" => Ok(SentenceRank::Label(RankLabel::High)),
            _ => Err(format!("invalid rank '{}' (low, average, high or a number)", s)),
        }
    }
}

/// A sentence, optionally with the relevance rank the extractor gave it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SentenceEntry {
    Plain(String),
    Ranked(String, SentenceRank),
}

impl SentenceEntry {
    pub fn text(&self) -> &str {
        match self {
            SentenceEntry::Plain(text) | SentenceEntry::Ranked(text, _) => text,
        }
    }

    pub fn rank(&self) -> Option<SentenceRank> {
        match self {
            SentenceEntry::Plain(_) => None,
            SentenceEntry::Ranked(_, rank) => Some(*rank),
        }
    }
}

/// Keywords and sentences for one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhraseSource {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub sentences: Vec<SentenceEntry>,
}

impl PhraseSource {
    pub fn new(keywords: Vec<String>, sentences: Vec<String>) -> Self {
        Self {
            keywords,
            sentences: sentences.into_iter().map(SentenceEntry::Plain).collect(),
        }
    }

    /// Load from a file. The format follows the extension (toml, yaml/yml,
    /// anything else is JSON).
    pub fn load(path: &Path) -> Result<Self, PhraseSourceError> {
        let contents = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        match ext {
            "toml" => toml::from_str(&contents).map_err(|e| PhraseSourceError::Parse(e.to_string())),
            "yaml" | "yml" => {
                serde_yaml::from_str(&contents).map_err(|e| PhraseSourceError::Parse(e.to_string()))
            }
            _ => serde_json::from_str(&contents)
                .map_err(|e| PhraseSourceError::Parse(e.to_string())),
        }
    }

    /// Parse a model response. Unparseable output yields an empty source.
    ///
    /// Entries are read one by one, so a malformed keyword or sentence is
    /// dropped on its own without losing the rest.
    pub fn from_model_response(text: &str) -> Self {
        let body = strip_code_fence(text);
        let value: serde_json::Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(e) => {
                warn!("Could not parse phrase response ({}), using no phrases", e);
                return Self::default();
            }
        };

        let keywords = entries(&value, "keywords")
            .filter_map(|v| match v.as_str() {
                Some(keyword) => Some(keyword.to_string()),
                None => {
                    warn!("Skipping non-string keyword {}", v);
                    None
                }
            })
            .collect();
        let sentences = entries(&value, "sentences")
            .filter_map(|v| match SentenceEntry::deserialize(v) {
                Ok(sentence) => Some(sentence),
                Err(e) => {
                    warn!("Skipping sentence {} ({})", v, e);
                    None
                }
            })
            .collect();

        Self {
            keywords,
            sentences,
        }
    }

    /// Keep ranked sentences whose rank is at least `min_rank`.
    /// Labels compare on the numeric scale (low 1, average 2, high 3).
    /// Unranked sentences are always kept.
    pub fn with_min_rank(mut self, min_rank: SentenceRank) -> Self {
        let min = min_rank.score();
        self.sentences
            .retain(|s| s.rank().map_or(true, |rank| rank.score() >= min));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty() && self.sentences.is_empty()
    }

    /// Compile into a phrase index.
    pub fn index(&self) -> PhraseIndex {
        PhraseIndex::build(self.sentences.iter().map(SentenceEntry::text), &self.keywords)
    }
}

fn entries<'a>(
    value: &'a serde_json::Value,
    key: &str,
) -> impl Iterator<Item = &'a serde_json::Value> {
    value
        .get(key)
        .and_then(serde_json::Value::as_array)
        .into_iter()
        .flatten()
}

/// Remove a surrounding ``` fence, with an optional language tag.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if !(trimmed.starts_with("```") && trimmed.ends_with("```") && trimmed.len() >= 6) {
        return trimmed;
    }
    let inner = &trimmed[3..trimmed.len() - 3];
    let inner = match inner.split_once('\n') {
        Some((tag, rest)) if tag.trim().chars().all(|c| c.is_ascii_alphanumeric()) => rest,
        _ => inner,
    };
    inner.trim()
}
