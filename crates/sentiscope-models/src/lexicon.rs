//! Fixed sentiment lexicon
//!
//! Used by the heuristic stub backend and by the lexicon explanation path.
//! The two word sets are disjoint.

use sentiscope_core::Sentiment;
use std::collections::HashSet;
use std::sync::OnceLock;

const POSITIVE: &[&str] = &[
    "great",
    "excellent",
    "amazing",
    "wonderful",
    "fantastic",
    "superb",
    "brilliant",
    "outstanding",
    "love",
    "loved",
    "best",
    "perfect",
    "beautiful",
    "enjoy",
    "enjoyed",
    "impressive",
    "stunning",
    "masterpiece",
    "terrific",
    "delightful",
    "recommend",
];

const NEGATIVE: &[&str] = &[
    "bad",
    "terrible",
    "awful",
    "horrible",
    "worst",
    "boring",
    "waste",
    "poor",
    "disappointing",
    "dull",
    "stupid",
    "weak",
    "fail",
    "failed",
    "hate",
    "hated",
    "avoid",
    "mediocre",
    "pathetic",
    "ridiculous",
    "unbearable",
    "unwatchable",
];

pub struct SentimentLexicon {
    positive: HashSet<&'static str>,
    negative: HashSet<&'static str>,
}

/// Positive and negative hit counts over distinct tokens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LexiconCounts {
    pub positive: usize,
    pub negative: usize,
}

impl LexiconCounts {
    /// Signed score in [-1, 1]
    pub fn score(&self) -> f64 {
        let total = (self.positive + self.negative).max(1);
        (self.positive as f64 - self.negative as f64) / total as f64
    }
}

impl SentimentLexicon {
    /// Shared lexicon instance
    pub fn shared() -> &'static SentimentLexicon {
        static LEXICON: OnceLock<SentimentLexicon> = OnceLock::new();
        LEXICON.get_or_init(|| SentimentLexicon {
            positive: POSITIVE.iter().copied().collect(),
            negative: NEGATIVE.iter().copied().collect(),
        })
    }

    /// Polarity of a lowercase word, if it is in either set
    pub fn polarity(&self, word: &str) -> Option<Sentiment> {
        if self.positive.contains(word) {
            Some(Sentiment::Positive)
        } else if self.negative.contains(word) {
            Some(Sentiment::Negative)
        } else {
            None
        }
    }

    /// Count membership of distinct tokens
    pub fn count<'a>(&self, tokens: impl IntoIterator<Item = &'a str>) -> LexiconCounts {
        let distinct: HashSet<&str> = tokens.into_iter().collect();
        let mut counts = LexiconCounts::default();
        for token in distinct {
            match self.polarity(token) {
                Some(Sentiment::Positive) => counts.positive += 1,
                Some(Sentiment::Negative) => counts.negative += 1,
                None => {}
            }
        }
        counts
    }
}
