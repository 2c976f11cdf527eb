//! Stream matcher: finds phrase occurrences in a page's token sequence.
//!
//! The matcher walks tokens left to right. At each position it looks up the
//! candidates starting with the current word and accepts the first one whose
//! remaining words match the following tokens exactly. Accepted tokens are
//! consumed, so spans never overlap. Verification may read into the next
//! page's tokens, but never further.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::phrase_index::{PhraseCandidate, PhraseIndex};
use super::token::Token;

/// What to do with a phrase that only completes on the following page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossPagePolicy {
    /// Highlight the part on each page as its own span.
    #[default]
    Split,
    /// Treat the phrase as not matching.
    Ignore,
}

impl FromStr for CrossPagePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "split" => Ok(Self::Split),
            "ignore" | "none" => Ok(Self::Ignore),
            _ => Err(format!("unknown cross-page policy '{}' (split, ignore)", s)),
        }
    }
}

/// How a span relates to the page boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanContinuation {
    #[default]
    None,
    ContinuesOnNextPage,
    ContinuedFromPreviousPage,
}

/// A verified, non-overlapping phrase occurrence on one page.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSpan {
    pub page: usize,
    pub start: usize,
    pub len: usize,
    pub phrase: Arc<PhraseCandidate>,
    pub continuation: SpanContinuation,
}

impl MatchSpan {
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// The tokens this span covers.
    pub fn tokens<'t>(&self, tokens: &'t [Token]) -> &'t [Token] {
        let end = self.end().min(tokens.len());
        &tokens[self.start.min(end)..end]
    }
}

/// The tail of a phrase that must be highlighted at the top of the next page.
#[derive(Debug, Clone, PartialEq)]
pub struct Carry {
    pub phrase: Arc<PhraseCandidate>,
    pub tokens: usize,
}

/// Spans found on a page, plus any carry into the following page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMatch {
    pub spans: Vec<MatchSpan>,
    pub carry: Option<Carry>,
}

enum Verified {
    Within(usize),
    Crosses { here: usize, next: usize },
}

/// Matches token streams against a phrase index.
#[derive(Debug, Clone, Copy)]
pub struct StreamMatcher<'a> {
    index: &'a PhraseIndex,
    policy: CrossPagePolicy,
}

impl<'a> StreamMatcher<'a> {
    pub fn new(index: &'a PhraseIndex) -> Self {
        Self {
            index,
            policy: CrossPagePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CrossPagePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> CrossPagePolicy {
        self.policy
    }

    /// Match one page.
    ///
    /// `lookahead` is the next page's token sequence, if that page is
    /// available. `carry_in` is the carry returned for the previous page;
    /// the tokens it covers are emitted first and never rescanned.
    pub fn match_page(
        &self,
        page: usize,
        tokens: &[Token],
        lookahead: Option<&[Token]>,
        carry_in: Option<&Carry>,
    ) -> PageMatch {
        let mut result = PageMatch::default();
        let mut i = 0;

        if let Some(carry) = carry_in {
            let len = carry.tokens.min(tokens.len());
            if len > 0 {
                result.spans.push(MatchSpan {
                    page,
                    start: 0,
                    len,
                    phrase: carry.phrase.clone(),
                    continuation: SpanContinuation::ContinuedFromPreviousPage,
                });
            }
            i = len;
        }

        while i < tokens.len() {
            let token = &tokens[i];
            if !token.is_matchable() {
                i += 1;
                continue;
            }

            let mut advanced = false;
            for candidate in self.index.candidates_starting_with(&token.normalized) {
                match self.verify(candidate, tokens, i, lookahead) {
                    Some(Verified::Within(len)) => {
                        debug!(
                            "page {}: matched {:?} at {}..{}",
                            page,
                            candidate.text,
                            i,
                            i + len
                        );
                        result.spans.push(MatchSpan {
                            page,
                            start: i,
                            len,
                            phrase: candidate.clone(),
                            continuation: SpanContinuation::None,
                        });
                        i += len;
                        advanced = true;
                    }
                    Some(Verified::Crosses { here, next }) => {
                        debug!(
                            "page {}: matched {:?} at {}.. continuing {} tokens onto next page",
                            page, candidate.text, i, next
                        );
                        result.spans.push(MatchSpan {
                            page,
                            start: i,
                            len: here,
                            phrase: candidate.clone(),
                            continuation: SpanContinuation::ContinuesOnNextPage,
                        });
                        result.carry = Some(Carry {
                            phrase: candidate.clone(),
                            tokens: next,
                        });
                        i += here;
                        advanced = true;
                    }
                    None => continue,
                }
                break;
            }

            if !advanced {
                i += 1;
            }
        }

        result
    }

    fn verify(
        &self,
        candidate: &PhraseCandidate,
        tokens: &[Token],
        start: usize,
        lookahead: Option<&[Token]>,
    ) -> Option<Verified> {
        for (offset, word) in candidate.words.iter().enumerate() {
            let pos = start + offset;
            let token = match tokens.get(pos) {
                Some(token) => token,
                None => match (self.policy, lookahead) {
                    (CrossPagePolicy::Split, Some(next)) => next.get(pos - tokens.len())?,
                    _ => return None,
                },
            };
            if token.normalized != *word {
                return None;
            }
        }

        let here = tokens.len() - start;
        if candidate.len() <= here {
            Some(Verified::Within(candidate.len()))
        } else {
            Some(Verified::Crosses {
                here,
                next: candidate.len() - here,
            })
        }
    }
}
