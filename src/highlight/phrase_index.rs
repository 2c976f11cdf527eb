//! First-word index over the phrases to highlight.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::token::normalize;

/// Where a phrase candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhraseOrigin {
    Sentence,
    Keyword,
}

/// An ordered sequence of normalized words to search for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhraseCandidate {
    pub words: Vec<String>,
    pub text: String,
    pub origin: PhraseOrigin,
}

impl PhraseCandidate {
    /// Split `text` into normalized words, dropping words that normalize away.
    pub fn new(text: &str, origin: PhraseOrigin) -> Self {
        let words = text
            .split_whitespace()
            .map(normalize)
            .filter(|w| !w.is_empty())
            .collect();
        Self {
            words,
            text: text.trim().to_string(),
            origin,
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn first_word(&self) -> Option<&str> {
        self.words.first().map(String::as_str)
    }
}

/// Lookup from a first word to the candidates starting with it.
///
/// Buckets keep insertion order: sentence phrases first, then keywords.
#[derive(Debug, Clone, Default)]
pub struct PhraseIndex {
    buckets: HashMap<String, Vec<Arc<PhraseCandidate>>>,
    seen: HashSet<Vec<String>>,
    count: usize,
}

impl PhraseIndex {
    /// Build the index from sentence fragments and keywords.
    ///
    /// Multi-word sentences are indexed as phrases. Single-word sentences
    /// are kept as keyword candidates after the explicit keywords.
    pub fn build<S, K>(sentences: S, keywords: K) -> Self
    where
        S: IntoIterator,
        S::Item: AsRef<str>,
        K: IntoIterator,
        K::Item: AsRef<str>,
    {
        let mut index = Self::default();
        let mut single_word_sentences = Vec::new();

        for sentence in sentences {
            let candidate = PhraseCandidate::new(sentence.as_ref(), PhraseOrigin::Sentence);
            if candidate.len() > 1 {
                index.insert(candidate);
            } else if !candidate.is_empty() {
                single_word_sentences.push(PhraseCandidate {
                    origin: PhraseOrigin::Keyword,
                    ..candidate
                });
            }
        }
        for keyword in keywords {
            index.insert(PhraseCandidate::new(keyword.as_ref(), PhraseOrigin::Keyword));
        }
        for candidate in single_word_sentences {
            index.insert(candidate);
        }

        debug!(
            "phrase index: {} candidates in {} buckets",
            index.count,
            index.buckets.len()
        );
        index
    }

    /// Add a candidate. Returns false for empty or already indexed word sequences.
    pub fn insert(&mut self, candidate: PhraseCandidate) -> bool {
        let Some(first) = candidate.first_word().map(str::to_string) else {
            return false;
        };
        if !self.seen.insert(candidate.words.clone()) {
            return false;
        }
        self.buckets
            .entry(first)
            .or_default()
            .push(Arc::new(candidate));
        self.count += 1;
        true
    }

    /// Candidates whose first word is `word`, in insertion order.
    pub fn candidates_starting_with(&self, word: &str) -> &[Arc<PhraseCandidate>] {
        self.buckets.get(word).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: [&str; 0] = [];

    #[test]
    fn candidate_words_are_normalized() {
        let c = PhraseCandidate::new("  Global Warming, now!  ", PhraseOrigin::Sentence);
        assert_eq!(c.words, vec!["global", "warming", "now"]);
        assert_eq!(c.text, "Global Warming, now!");
    }

    #[test]
    fn shared_first_word_keeps_both() {
        let index = PhraseIndex::build(["global warming is real", "global economy grows"], NONE);
        let bucket = index.candidates_starting_with("global");
        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket[0].words[1], "warming");
        assert_eq!(bucket[1].words[1], "economy");
    }

    #[test]
    fn sentences_precede_keywords_in_bucket() {
        let index = PhraseIndex::build(["machine learning models work"], ["machine learning"]);
        let bucket = index.candidates_starting_with("machine");
        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket[0].origin, PhraseOrigin::Sentence);
        assert_eq!(bucket[1].origin, PhraseOrigin::Keyword);
    }

    #[test]
    fn single_word_sentence_becomes_keyword() {
        let index = PhraseIndex::build(["Indeed."], ["DNA"]);
        let bucket = index.candidates_starting_with("indeed");
        assert_eq!(bucket.len(), 1);
        assert_eq!(bucket[0].origin, PhraseOrigin::Keyword);
        assert_eq!(index.candidates_starting_with("dna").len(), 1);
    }

    #[test]
    fn duplicates_by_normalized_words() {
        let index = PhraseIndex::build(NONE, ["Machine Learning", "machine learning.", "DNA", "dna"]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.candidates_starting_with("machine").len(), 1);
        assert_eq!(index.candidates_starting_with("machine")[0].text, "Machine Learning");
    }

    #[test]
    fn unknown_word_and_empty_phrases() {
        let index = PhraseIndex::build(["", "..."], ["", "!!"]);
        assert!(index.is_empty());
        assert!(index.candidates_starting_with("anything").is_empty());
    }
}
