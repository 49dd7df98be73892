use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::spelling::{best_fuzzy_match, SpellCorrector};
use crate::store::IndexStore;
use crate::tokenizer::tokenize;

const MAX_SYNONYM_WORDS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionSource {
    /// Fuzzy match against the indexed vocabulary.
    Vocabulary,
    /// General-purpose dictionary fallback.
    Dictionary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub original: String,
    pub corrected: String,
    pub source: CorrectionSource,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessedQuery {
    pub raw: String,
    /// Tokens after spelling correction, in query order.
    pub terms: Vec<String>,
    /// Corrected terms plus their synonyms. Consumers must not rely on order.
    pub expanded: BTreeSet<String>,
    pub corrections: Vec<Correction>,
    /// Corrected query text, present only when a correction happened.
    pub did_you_mean: Option<String>,
}

impl ProcessedQuery {
    /// A query whose terms are used verbatim, bypassing correction and expansion.
    pub fn literal(raw: &str, terms: &[&str]) -> Self {
        let terms: Vec<String> = terms.iter().map(|t| t.to_string()).collect();
        ProcessedQuery {
            raw: raw.to_string(),
            expanded: terms.iter().cloned().collect(),
            terms,
            corrections: Vec::new(),
            did_you_mean: None,
        }
    }
}

/// Turns raw query text into corrected, synonym-expanded search terms.
/// Never fails: a token that can't be corrected passes through unchanged.
pub struct QueryProcessor<'a> {
    store: &'a IndexStore,
    corrector: &'a dyn SpellCorrector,
    fuzzy_threshold: f64,
}

impl<'a> QueryProcessor<'a> {
    pub fn new(store: &'a IndexStore, corrector: &'a dyn SpellCorrector, fuzzy_threshold: f64) -> Self {
        Self { store, corrector, fuzzy_threshold }
    }

    pub fn process(&self, raw: &str) -> ProcessedQuery {
        let synonyms = self.store.synonyms();
        let tokens = tokenize(raw);
        // words of a multi-word synonym ("united states") are kept as typed
        let mut protected = vec![false; tokens.len()];
        for n in 2..=MAX_SYNONYM_WORDS {
            for (start, window) in tokens.windows(n).enumerate() {
                if synonyms.contains(&window.join(" ")) {
                    protected[start..start + n].iter_mut().for_each(|p| *p = true);
                }
            }
        }
        let mut terms = Vec::new();
        let mut corrections = Vec::new();
        for (token, keep) in tokens.into_iter().zip(protected) {
            let correction = if keep { None } else { self.correct(&token) };
            match correction {
                Some(correction) => {
                    terms.push(correction.corrected.clone());
                    corrections.push(correction);
                }
                None => terms.push(token),
            }
        }
        let mut expanded = BTreeSet::new();
        for term in &terms {
            expanded.extend(synonyms.expand(term));
        }
        // multi-word synonyms ("united states") are matched over adjacent terms
        for n in 2..=MAX_SYNONYM_WORDS {
            for window in terms.windows(n) {
                let phrase = window.join(" ");
                if synonyms.contains(&phrase) {
                    expanded.extend(synonyms.expand(&phrase));
                }
            }
        }
        let did_you_mean = (!corrections.is_empty()).then(|| terms.join(" "));
        if !corrections.is_empty() {
            tracing::debug!(query = raw, ?corrections, "corrected query");
        }
        ProcessedQuery { raw: raw.to_string(), terms, expanded, corrections, did_you_mean }
    }

    /// Known term -> unchanged; otherwise fuzzy match against the corpus,
    /// then the general corrector.
    fn correct(&self, token: &str) -> Option<Correction> {
        let vocabulary = self.store.vocabulary();
        if vocabulary.contains(token)
            || self.store.synonyms().contains(token)
            || token.chars().all(|c| c.is_numeric())
        {
            return None;
        }
        if let Some((term, score)) = best_fuzzy_match(token, vocabulary, self.fuzzy_threshold) {
            tracing::trace!(token, term, score, "vocabulary correction");
            return Some(Correction {
                original: token.to_string(),
                corrected: term.to_string(),
                source: CorrectionSource::Vocabulary,
            });
        }
        self.corrector
            .correct(token)
            .filter(|c| !c.is_empty() && c != token)
            .map(|corrected| Correction {
                original: token.to_string(),
                corrected,
                source: CorrectionSource::Dictionary,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::index::build;
    use crate::spelling::{DictionaryCorrector, NoCorrector};
    use crate::synonyms::SynonymTable;

    fn store() -> IndexStore {
        let mut synonyms = SynonymTable::new();
        synonyms.insert("usa", ["united states"]);
        let docs = vec![
            Document::new("a", "Organic Coffee Beans", "Dark roast"),
            Document::new("b", "Running Shoes", "Light trainers").with_origin("United States"),
        ];
        IndexStore::from_built(build(docs), synonyms)
    }

    #[test]
    fn known_terms_are_kept() {
        let s = store();
        let q = QueryProcessor::new(&s, &NoCorrector, 80.0).process("Organic coffee");
        assert_eq!(q.terms, vec!["organic", "coffee"]);
        assert!(q.corrections.is_empty());
        assert!(q.did_you_mean.is_none());
    }

    #[test]
    fn vocabulary_beats_dictionary() {
        let s = store();
        let dict = DictionaryCorrector::from_words([("coffer", 100u64)]);
        let q = QueryProcessor::new(&s, &dict, 80.0).process("cofee");
        assert_eq!(q.terms, vec!["coffee"]);
        assert_eq!(q.corrections[0].source, CorrectionSource::Vocabulary);
        assert_eq!(q.did_you_mean.as_deref(), Some("coffee"));
    }

    #[test]
    fn dictionary_is_the_fallback() {
        let s = store();
        let dict = DictionaryCorrector::from_words([("laptop", 1u64)]);
        let q = QueryProcessor::new(&s, &dict, 80.0).process("lapptop");
        assert_eq!(q.terms, vec!["laptop"]);
        assert_eq!(q.corrections[0].source, CorrectionSource::Dictionary);
    }

    #[test]
    fn uncorrectable_token_passes_through() {
        let s = store();
        let q = QueryProcessor::new(&s, &NoCorrector, 80.0).process("zzzz 2024");
        assert_eq!(q.terms, vec!["zzzz", "2024"]);
        assert!(q.corrections.is_empty());
    }

    #[test]
    fn expansion_keeps_original_token() {
        let s = store();
        let q = QueryProcessor::new(&s, &NoCorrector, 80.0).process("usa shoes");
        assert!(q.expanded.contains("usa"));
        assert!(q.expanded.contains("united states"));
        assert!(q.expanded.contains("shoes"));
    }

    #[test]
    fn multi_word_synonym_expands_back() {
        let s = store();
        let q = QueryProcessor::new(&s, &NoCorrector, 80.0).process("United States");
        assert!(q.expanded.contains("usa"));
        assert!(q.expanded.contains("united states"));
        assert!(q.expanded.contains("united"));
    }

    #[test]
    fn multi_word_synonym_words_are_not_corrected() {
        let mut synonyms = SynonymTable::new();
        synonyms.insert("usa", ["united states"]);
        let docs = vec![
            Document::new("https://shop.dev/product/1", "Denim Jacket", "Classic cut").with_origin("USA"),
            Document::new("https://shop.dev/product/2", "Gift Box", "As stated on the box"),
        ];
        let s = IndexStore::from_built(build(docs), synonyms);
        let q = QueryProcessor::new(&s, &NoCorrector, 80.0).process("united states");
        assert_eq!(q.terms, vec!["united", "states"]);
        assert!(q.corrections.is_empty());
        assert!(q.expanded.contains("usa"));
        assert!(s.matching_documents("usa").contains("https://shop.dev/product/1"));
    }

    #[test]
    fn stopword_only_query_is_empty() {
        let s = store();
        let q = QueryProcessor::new(&s, &NoCorrector, 80.0).process("the and of");
        assert!(q.terms.is_empty());
        assert!(q.expanded.is_empty());
    }
}
