//! Text normalizer shared by training-time exports and serving
//!
//! Steps, in order: strip HTML-like tags, turn every non-letter into a space,
//! lowercase, split on whitespace, drop stop words, then lemmatize. Without a
//! lemma resource the last step degrades to dropping tokens of length 2 or
//! less. Degraded output differs from what the sparse-linear artifacts were
//! fit on, so the mode is logged and reported by the registry.
//!
//! Non-letters are replaced, not deleted: "don't" becomes the tokens "don" and
//! "t", never "dont". Sparse-linear JSON exports must be fit with this same
//! normalizer, otherwise their contraction entries never match.

use crate::lemmatizer::Lemmatizer;
use crate::stopwords;
use regex::Regex;
use sentiscope_core::Result;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// Which final step the normalizer applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizerMode {
    /// Tokens are reduced to dictionary base forms
    Lemmatized,
    /// No lemma resource; short tokens are dropped instead
    Degraded,
}

pub struct Normalizer {
    tags: Regex,
    non_alpha: Regex,
    lemmatizer: Option<Lemmatizer>,
}

impl Normalizer {
    /// Create a normalizer; `None` runs in degraded mode
    pub fn new(lemmatizer: Option<Lemmatizer>) -> Result<Self> {
        Ok(Self {
            tags: Regex::new(r"<.*?>").map_err(|e| {
                sentiscope_core::Error::config(format!("Failed to compile tag regex: {}", e))
            })?,
            non_alpha: Regex::new(r"[^A-Za-z]").map_err(|e| {
                sentiscope_core::Error::config(format!("Failed to compile letter regex: {}", e))
            })?,
            lemmatizer,
        })
    }

    /// Degraded normalizer (no lemma resource)
    pub fn degraded() -> Result<Self> {
        Self::new(None)
    }

    /// Build from an optional lemma resource path.
    ///
    /// A missing or unreadable resource is not fatal: the normalizer falls
    /// back to degraded mode and says so.
    pub fn from_resource(path: Option<&Path>) -> Result<Self> {
        let lemmatizer = match path {
            Some(path) => match Lemmatizer::from_file(path) {
                Ok(lemmatizer) => {
                    info!(
                        "Normalizer using lemma resource {} ({} lemmas)",
                        path.display(),
                        lemmatizer.len()
                    );
                    Some(lemmatizer)
                }
                Err(e) => {
                    warn!(
                        "Lemma resource {} unavailable ({}); normalizer degraded, \
                         sparse-linear accuracy may drop",
                        path.display(),
                        e
                    );
                    None
                }
            },
            None => {
                warn!(
                    "No lemma resource configured; normalizer degraded, \
                     sparse-linear accuracy may drop"
                );
                None
            }
        };

        Self::new(lemmatizer)
    }

    pub fn mode(&self) -> NormalizerMode {
        if self.lemmatizer.is_some() {
            NormalizerMode::Lemmatized
        } else {
            NormalizerMode::Degraded
        }
    }

    /// Normalized tokens, in order
    pub fn tokens(&self, text: &str) -> Vec<String> {
        let without_tags = self.tags.replace_all(text, "");
        let letters_only = self.non_alpha.replace_all(&without_tags, " ");
        let lowered = letters_only.to_lowercase();

        lowered
            .split_whitespace()
            .filter(|token| !stopwords::is_stop_word(token))
            .filter_map(|token| match &self.lemmatizer {
                Some(lemmatizer) => Some(lemmatizer.lemmatize(token)),
                None if token.len() > 2 => Some(token.to_string()),
                None => None,
            })
            .collect()
    }

    /// Normalized text: tokens joined by single spaces
    pub fn normalize(&self, text: &str) -> String {
        self.tokens(text).join(" ")
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::degraded().expect("Failed to create normalizer")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lemmatized() -> Normalizer {
        let lemmatizer = Lemmatizer::parse("movie\nactor\nplot\nstory\nscene\nfilm\n");
        Normalizer::new(Some(lemmatizer)).unwrap()
    }

    #[test]
    fn test_strips_tags_and_punctuation() {
        let normalizer = Normalizer::degraded().unwrap();
        let out = normalizer.normalize("<br />Great movie!!! 10/10<p>loved</p>");
        assert_eq!(out, "great movie loved");
    }

    #[test]
    fn test_drops_stop_words() {
        let normalizer = Normalizer::degraded().unwrap();
        assert_eq!(
            normalizer.normalize("This movie was not what I expected"),
            "movie expected"
        );
    }

    #[test]
    fn test_apostrophes_split_into_stop_words() {
        let normalizer = lemmatized();
        assert_eq!(normalizer.normalize("I don't like it"), "like");
        assert_eq!(normalizer.tokens("Don't stop"), vec!["stop"]);
        assert!(!normalizer.normalize("wasn't couldn't").contains("wasnt"));
    }

    #[test]
    fn test_lemmatized_mode() {
        let normalizer = lemmatized();
        assert_eq!(normalizer.mode(), NormalizerMode::Lemmatized);
        assert_eq!(
            normalizer.normalize("The actors and their stories; great scenes."),
            "actor story great scene"
        );
    }

    #[test]
    fn test_degraded_mode_drops_short_tokens() {
        let normalizer = Normalizer::degraded().unwrap();
        assert_eq!(normalizer.mode(), NormalizerMode::Degraded);
        assert_eq!(normalizer.normalize("ok go see it now, fantastic"), "see fantastic");
    }

    #[test]
    fn test_non_ascii_letters_become_separators() {
        let normalizer = Normalizer::degraded().unwrap();
        assert_eq!(normalizer.normalize("clichéd naïve plot"), "clich plot");
    }

    #[test]
    fn test_empty_input() {
        let normalizer = lemmatized();
        assert_eq!(normalizer.normalize(""), "");
        assert_eq!(normalizer.normalize("!!! ??? <b></b>"), "");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "This movie was absolutely great and amazing, I loved it!",
            "Terrible, boring, and a complete waste of time.",
            "<br/>The actors' stories were told in 3 scenes...",
            "Predictable and clichéd. Nothing new or interesting to offer audiences.",
        ];
        for normalizer in [lemmatized(), Normalizer::degraded().unwrap()] {
            for input in inputs {
                let once = normalizer.normalize(input);
                assert_eq!(normalizer.normalize(&once), once, "input: {input}");
            }
        }
    }

    #[test]
    fn test_missing_resource_degrades() {
        let normalizer =
            Normalizer::from_resource(Some(Path::new("/nonexistent/lemmas.txt"))).unwrap();
        assert_eq!(normalizer.mode(), NormalizerMode::Degraded);
    }
}
