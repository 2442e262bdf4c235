//! Lexicon heuristic explanation
//!
//! Works on raw casefolded words, not normalizer output. Weights are sampled,
//! so two calls on the same text agree on signs and membership but not on
//! magnitudes unless the caller passes a seeded generator.

use crate::lexicon::SentimentLexicon;
use rand::Rng;
use sentiscope_core::{round_to, ExplanationItem, Sentiment};
use std::collections::HashSet;

/// Distinct lowercase ASCII-letter words of length 3 or more, in order
pub fn candidate_words(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_whitespace())
        .collect();

    let mut seen = HashSet::new();
    cleaned
        .split_whitespace()
        .filter(|word| word.len() >= 3)
        .filter(|word| seen.insert(*word))
        .map(str::to_string)
        .collect()
}

/// Lexicon words with sampled signed weights, strongest first
pub fn lexicon_explanation<R: Rng + ?Sized>(
    text: &str,
    num_features: usize,
    rng: &mut R,
) -> Vec<ExplanationItem> {
    let lexicon = SentimentLexicon::shared();

    let mut items: Vec<ExplanationItem> = candidate_words(text)
        .into_iter()
        .filter_map(|word| {
            let weight = match lexicon.polarity(&word)? {
                Sentiment::Positive => rng.gen_range(0.3..=0.9),
                Sentiment::Negative => rng.gen_range(-0.9..=-0.3),
            };
            Some(ExplanationItem::new(word, round_to(weight, 3)))
        })
        .collect();

    items.sort_by(|a, b| b.weight.abs().total_cmp(&a.weight.abs()));
    items.truncate(num_features);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_candidate_words() {
        assert_eq!(
            candidate_words("It's GREAT, great... an ok film!"),
            vec!["its", "great", "film"]
        );
        assert!(candidate_words("").is_empty());
        assert_eq!(candidate_words("naïve café"), vec!["nave", "caf"]);
    }

    #[test]
    fn test_signs_and_ranges() {
        let mut rng = StdRng::seed_from_u64(1);
        let items = lexicon_explanation("great plot, terrible ending", 10, &mut rng);
        assert_eq!(items.len(), 2);
        for item in &items {
            match item.word.as_str() {
                "great" => assert!((0.3..=0.9).contains(&item.weight)),
                "terrible" => assert!((-0.9..=-0.3).contains(&item.weight)),
                other => panic!("unexpected word {other}"),
            }
        }
    }

    #[test]
    fn test_truncates_and_sorts() {
        let mut rng = StdRng::seed_from_u64(3);
        let text = "great excellent amazing wonderful terrible awful boring waste";
        let items = lexicon_explanation(text, 5, &mut rng);
        assert_eq!(items.len(), 5);
        for pair in items.windows(2) {
            assert!(pair[0].weight.abs() >= pair[1].weight.abs());
        }
    }

    #[test]
    fn test_no_lexicon_words() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(lexicon_explanation("the plot happened", 5, &mut rng).is_empty());
    }
}
