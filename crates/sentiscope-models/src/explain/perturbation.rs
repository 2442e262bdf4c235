//! Local perturbation explainer
//!
//! Words are removed from the input at random, the model is re-scored on each
//! variant, and a proximity-weighted linear surrogate is fit on the binary
//! keep/remove masks. The surrogate's coefficients are the word weights.

use super::surrogate::Neighborhood;
use crate::config::ExplanationConfig;
use regex::Regex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sentiscope_core::{round_to, Error, ExplanationItem, Result};
use std::collections::HashMap;
use std::ops::Range;

/// Text split into word occurrences, each mapped to a distinct feature
pub struct IndexedText<'t> {
    text: &'t str,
    features: Vec<String>,
    occurrences: Vec<(Range<usize>, usize)>,
}

impl<'t> IndexedText<'t> {
    pub fn new(text: &'t str, word_pattern: &Regex) -> Self {
        let mut features: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut occurrences = Vec::new();

        for m in word_pattern.find_iter(text) {
            let word = m.as_str().to_lowercase();
            let feature = *index.entry(word.clone()).or_insert_with(|| {
                features.push(word);
                features.len() - 1
            });
            occurrences.push((m.range(), feature));
        }

        Self {
            text,
            features,
            occurrences,
        }
    }

    /// Distinct lowercase words, in first-occurrence order
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Rebuild the text without the features whose mask entry is false
    pub fn render(&self, keep: &[bool]) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut cursor = 0;
        for (range, feature) in &self.occurrences {
            if !keep[*feature] {
                out.push_str(&self.text[cursor..range.start]);
                cursor = range.end;
            }
        }
        out.push_str(&self.text[cursor..]);
        out
    }
}

pub struct PerturbationExplainer {
    word_pattern: Regex,
    num_samples: usize,
    kernel_width: f64,
    ridge_alpha: f64,
    seed: Option<u64>,
}

impl PerturbationExplainer {
    pub fn new(config: &ExplanationConfig) -> Result<Self> {
        Ok(Self {
            word_pattern: Regex::new(r"\w+")
                .map_err(|e| Error::config(format!("Failed to compile word regex: {}", e)))?,
            num_samples: config.num_samples.max(2),
            kernel_width: config.kernel_width,
            ridge_alpha: config.ridge_alpha,
            seed: config.seed,
        })
    }

    /// Explain `text` against a batch function returning P(positive) per text
    pub fn explain<F>(
        &self,
        text: &str,
        num_features: usize,
        positive_proba: F,
    ) -> Result<Vec<ExplanationItem>>
    where
        F: Fn(&[String]) -> Result<Vec<f64>>,
    {
        let indexed = IndexedText::new(text, &self.word_pattern);
        let d = indexed.features().len();
        if d == 0 {
            return Err(Error::explanation("text has no words to perturb"));
        }
        if num_features == 0 {
            return Ok(Vec::new());
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let masks = self.sample_masks(d, &mut rng);
        let texts: Vec<String> = masks.iter().map(|mask| indexed.render(mask)).collect();

        let targets = positive_proba(&texts)?;
        if targets.len() != masks.len() {
            return Err(Error::explanation(format!(
                "classifier returned {} scores for {} samples",
                targets.len(),
                masks.len()
            )));
        }
        if targets.iter().any(|p| !p.is_finite()) {
            return Err(Error::explanation("classifier returned non-finite scores"));
        }

        let weights = masks
            .iter()
            .map(|mask| {
                let distance = cosine_distance_to_original(mask) * 100.0;
                self.kernel(distance)
            })
            .collect();

        let neighborhood = Neighborhood {
            masks,
            targets,
            weights,
        };

        let selected = neighborhood.select_features(num_features.min(d), self.ridge_alpha)?;
        let fit = neighborhood.fit_ridge(&selected, self.ridge_alpha)?;

        let mut items: Vec<ExplanationItem> = fit
            .columns
            .iter()
            .zip(&fit.coef)
            .map(|(&column, &coef)| {
                ExplanationItem::new(indexed.features()[column].clone(), round_to(coef, 4))
            })
            .collect();
        items.sort_by(|a, b| b.weight.abs().total_cmp(&a.weight.abs()));

        Ok(items)
    }

    /// Sample 0 keeps everything; the rest each drop 1..=d distinct features
    fn sample_masks(&self, d: usize, rng: &mut StdRng) -> Vec<Vec<bool>> {
        let mut masks = Vec::with_capacity(self.num_samples);
        masks.push(vec![true; d]);

        for _ in 1..self.num_samples {
            let removed = rng.gen_range(1..=d);
            let mut mask = vec![true; d];
            for feature in rand::seq::index::sample(rng, d, removed) {
                mask[feature] = false;
            }
            masks.push(mask);
        }

        masks
    }

    fn kernel(&self, distance: f64) -> f64 {
        (-(distance * distance) / (self.kernel_width * self.kernel_width))
            .exp()
            .sqrt()
    }
}

/// Cosine distance between a binary mask and the all-ones vector
fn cosine_distance_to_original(mask: &[bool]) -> f64 {
    let kept = mask.iter().filter(|&&k| k).count();
    if kept == 0 {
        return 1.0;
    }
    1.0 - (kept as f64 / mask.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explainer(samples: usize) -> PerturbationExplainer {
        PerturbationExplainer::new(&ExplanationConfig {
            num_samples: samples,
            seed: Some(7),
            ..ExplanationConfig::default()
        })
        .unwrap()
    }

    /// 0.5 +/- 0.4 depending on which marker words survive
    fn toy_model(texts: &[String]) -> Result<Vec<f64>> {
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                let words: Vec<&str> = lower.split(|c: char| !c.is_alphanumeric()).collect();
                let mut p = 0.5;
                if words.contains(&"great") {
                    p += 0.4;
                }
                if words.contains(&"boring") {
                    p -= 0.4;
                }
                p
            })
            .collect())
    }

    #[test]
    fn test_render_keeps_separators() {
        let pattern = Regex::new(r"\w+").unwrap();
        let indexed = IndexedText::new("Great, great plot; boring end.", &pattern);
        assert_eq!(indexed.features(), &["great", "plot", "boring", "end"]);
        assert_eq!(indexed.render(&[true; 4]), "Great, great plot; boring end.");
        assert_eq!(indexed.render(&[false, true, true, true]), ",  plot; boring end.");
        assert_eq!(indexed.render(&[true, true, false, false]), "Great, great plot;  .");
    }

    #[test]
    fn test_recovers_marker_words() {
        let items = explainer(400)
            .explain("A great cast but a boring script overall", 4, toy_model)
            .unwrap();
        assert_eq!(items.len(), 4);
        let top: Vec<&str> = items.iter().take(2).map(|i| i.word.as_str()).collect();
        assert!(top.contains(&"great") && top.contains(&"boring"), "{items:?}");

        let weight = |w: &str| items.iter().find(|i| i.word == w).map(|i| i.weight);
        assert!(weight("great").unwrap() > 0.2);
        assert!(weight("boring").unwrap() < -0.2);
    }

    #[test]
    fn test_highest_weights_path() {
        let text = "great boring alpha beta gamma delta epsilon zeta eta theta";
        let items = explainer(300).explain(text, 8, toy_model).unwrap();
        assert_eq!(items.len(), 8);
        let words: Vec<&str> = items.iter().map(|i| i.word.as_str()).collect();
        assert!(words.contains(&"great") && words.contains(&"boring"));
    }

    #[test]
    fn test_duplicates_collapse_and_bound_holds() {
        let items = explainer(200)
            .explain("great GREAT great movie", 10, toy_model)
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_ne!(items[0].word, items[1].word);
    }

    #[test]
    fn test_no_words_is_an_error() {
        assert!(explainer(50).explain("!!! ...", 5, toy_model).is_err());
        assert!(explainer(50).explain("", 5, toy_model).is_err());
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let a = explainer(200).explain("great film, boring ending", 3, toy_model).unwrap();
        let b = explainer(200).explain("great film, boring ending", 3, toy_model).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_classifier_failure_propagates() {
        let failing = |_: &[String]| -> Result<Vec<f64>> { Err(Error::inference("boom")) };
        assert!(explainer(20).explain("great movie", 2, failing).is_err());
    }

    #[test]
    fn test_kernel_and_distance() {
        let e = explainer(10);
        assert_eq!(e.kernel(0.0), 1.0);
        assert!(e.kernel(100.0) < e.kernel(10.0));
        assert_eq!(cosine_distance_to_original(&[true, true]), 0.0);
        assert_eq!(cosine_distance_to_original(&[false, false]), 1.0);
    }
}
