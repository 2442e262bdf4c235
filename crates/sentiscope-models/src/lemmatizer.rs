//! Dictionary lemmatizer backed by a lemma lexicon file
//!
//! The lexicon has one entry per line: either a known lemma (`movie`) or an
//! irregular form followed by its lemma (`geese goose`). Lines starting with
//! `#` are ignored. Words are reduced with noun morphology: irregular forms
//! first, then suffix substitutions, keeping only candidates that are known
//! lemmas. The shortest candidate wins.

use sentiscope_core::Result;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Noun suffix substitutions, in application order
const NOUN_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("s", ""),
    ("ses", "s"),
    ("ves", "f"),
    ("xes", "x"),
    ("zes", "z"),
    ("ches", "ch"),
    ("shes", "sh"),
    ("men", "man"),
    ("ies", "y"),
];

#[derive(Debug, Clone, Default)]
pub struct Lemmatizer {
    lemmas: HashSet<String>,
    exceptions: HashMap<String, Vec<String>>,
}

impl Lemmatizer {
    /// Load a lemma lexicon from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let lemmatizer = Self::parse(&content);
        if lemmatizer.is_empty() {
            return Err(sentiscope_core::Error::config(format!(
                "Lemma resource {} has no entries",
                path.as_ref().display()
            )));
        }
        Ok(lemmatizer)
    }

    /// Parse lexicon text
    pub fn parse(content: &str) -> Self {
        let mut lemmas = HashSet::new();
        let mut exceptions: HashMap<String, Vec<String>> = HashMap::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut parts = line.split_whitespace().map(str::to_lowercase);
            let Some(first) = parts.next() else { continue };
            let targets: Vec<String> = parts.collect();

            if targets.is_empty() {
                lemmas.insert(first);
            } else {
                for target in &targets {
                    lemmas.insert(target.clone());
                }
                exceptions.entry(first).or_default().extend(targets);
            }
        }

        Self { lemmas, exceptions }
    }

    /// Number of known lemmas
    pub fn len(&self) -> usize {
        self.lemmas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lemmas.is_empty()
    }

    /// Reduce a lowercase word to its base form, or return it unchanged
    pub fn lemmatize(&self, word: &str) -> String {
        self.candidates(word)
            .into_iter()
            .min_by_key(|form| form.len())
            .unwrap_or_else(|| word.to_string())
    }

    fn candidates(&self, word: &str) -> Vec<String> {
        let forms: Vec<String> = match self.exceptions.get(word) {
            Some(irregular) => std::iter::once(word.to_string())
                .chain(irregular.iter().cloned())
                .collect(),
            None => std::iter::once(word.to_string())
                .chain(NOUN_SUBSTITUTIONS.iter().filter_map(|(old, new)| {
                    word.strip_suffix(old).map(|stem| format!("{stem}{new}"))
                }))
                .collect(),
        };

        // first occurrence wins so ties keep rule order
        let mut seen = HashSet::new();
        forms
            .into_iter()
            .filter(|form| self.lemmas.contains(form) && seen.insert(form.clone()))
            .collect()
    }
}
