//! Retrieval and ranking.
//!
//! Each expanded term is scored independently on the rayon pool and yields an
//! isolated partial map (url -> contribution). Partials are collected in term
//! order and summed on the calling thread, so no accumulator is shared between
//! tasks and float sums come out the same on every run.

use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::config::{AllTermsOf, MatchMode, ScoringWeights, SearchConfig};
use crate::index::{Field, ReviewStats};
use crate::query::{ProcessedQuery, QueryProcessor};
use crate::results::SearchResponse;
use crate::spelling::{NoCorrector, SpellCorrector};
use crate::store::IndexStore;

/// Per-signal contributions, already weighted. `total()` is the final score.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub bm25: f64,
    pub exact_match: f64,
    pub title_match: f64,
    pub review: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.bm25 + self.exact_match + self.title_match + self.review
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub url: String,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    /// Human-readable trace of the signals that fired.
    pub matches: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    pub total_documents: usize,
    /// Size of the full candidate set, before top-k truncation.
    pub filtered_documents: usize,
    /// Descending by score, ties by ascending URL; at most `top_k` entries.
    pub hits: Vec<ScoredDocument>,
}

#[derive(Debug, Default)]
struct TermHit {
    tf: usize,
    bm25: f64,
    in_title: bool,
    matches: Vec<String>,
}

type TermPartial<'s> = HashMap<&'s str, TermHit>;

#[derive(Debug, Default)]
struct DocTotals {
    bm25: f64,
    title_hits: u32,
    matches: Vec<String>,
}

/// `ln((N - df + 0.5) / (df + 0.5) + 1)`
pub fn bm25_idf(total_docs: usize, df: usize) -> f64 {
    let n = total_docs as f64;
    let df = df as f64;
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

/// Saturating term frequency with length normalization against the assumed average.
pub fn bm25_tf(tf: usize, doc_len: usize, weights: &ScoringWeights) -> f64 {
    let tf = tf as f64;
    let avg = weights.avg_field_len.max(1.0);
    let norm = 1.0 - weights.b + weights.b * (doc_len as f64 / avg);
    tf * (weights.k1 + 1.0) / (tf + weights.k1 * norm)
}

/// Zero for documents without ratings; the count contribution saturates at the cap.
pub fn review_score(stats: Option<&ReviewStats>, weights: &ScoringWeights) -> f64 {
    match stats {
        Some(ReviewStats { total_reviews, average_score: Some(avg), .. }) if *total_reviews > 0 => {
            let count = (*total_reviews).min(weights.review_count_cap) as f64;
            weights.review_weight * (avg * weights.review_avg_weight + count * weights.review_count_weight)
        }
        _ => 0.0,
    }
}

pub struct SearchEngine {
    store: IndexStore,
    corrector: Box<dyn SpellCorrector>,
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new(store: IndexStore, config: SearchConfig) -> Self {
        Self { store, corrector: Box::new(NoCorrector), config }
    }

    pub fn with_corrector(mut self, corrector: Box<dyn SpellCorrector>) -> Self {
        self.corrector = corrector;
        self
    }

    pub fn store(&self) -> &IndexStore { &self.store }

    pub fn config(&self) -> &SearchConfig { &self.config }

    pub fn process(&self, raw: &str) -> ProcessedQuery {
        self.processor(&self.config).process(raw)
    }

    fn processor<'a>(&'a self, config: &SearchConfig) -> QueryProcessor<'a> {
        QueryProcessor::new(&self.store, self.corrector.as_ref(), config.fuzzy_threshold)
    }

    /// Full pipeline with the engine's configuration.
    pub fn search(&self, raw: &str) -> SearchResponse {
        self.search_with(raw, &self.config)
    }

    pub fn search_with(&self, raw: &str, config: &SearchConfig) -> SearchResponse {
        let query = self.processor(config).process(raw);
        let ranking = self.rank(&query, config);
        SearchResponse::from_ranking(&query, &ranking, &self.store)
    }

    pub fn autocomplete(&self, prefix: &str, limit: usize) -> Vec<String> {
        self.store.autocomplete(prefix, limit)
    }

    /// Rank documents for already processed terms. `query.raw` feeds the exact-match bonus.
    pub fn rank(&self, query: &ProcessedQuery, config: &SearchConfig) -> Ranking {
        let total_documents = self.store.total_documents();
        let candidates = self.candidates(query, config);
        let filtered_documents = candidates.len();
        tracing::debug!(query = %query.raw, terms = query.expanded.len(), filtered_documents, "retrieved candidates");
        if candidates.is_empty() {
            return Ranking { total_documents, filtered_documents, hits: Vec::new() };
        }

        let weights = &config.scoring;
        let terms: Vec<&str> = query.expanded.iter().map(String::as_str).collect();
        let partials: Vec<TermPartial> = terms
            .par_iter()
            .map(|term| self.score_term(term, &candidates, weights))
            .collect();

        let mut totals: BTreeMap<&str, DocTotals> = BTreeMap::new();
        for partial in partials {
            for (url, hit) in partial {
                let t = totals.entry(url).or_default();
                t.bm25 += hit.bm25;
                if hit.in_title { t.title_hits += 1; }
                t.matches.extend(hit.matches);
            }
        }

        let needle = query.raw.trim().to_lowercase();
        let mut hits: Vec<ScoredDocument> = totals
            .into_iter()
            .filter_map(|(url, t)| {
                let doc = self.store.document(url)?;
                let mut matches = t.matches;
                let mut breakdown = ScoreBreakdown {
                    bm25: weights.bm25_weight * t.bm25,
                    title_match: weights.title_token_weight * t.title_hits as f64,
                    ..Default::default()
                };
                if !needle.is_empty() {
                    let exact_on = if doc.title.trim().to_lowercase() == needle {
                        Some("title")
                    } else if doc.brand().is_some_and(|b| b.trim().to_lowercase() == needle) {
                        Some("brand")
                    } else {
                        None
                    };
                    if let Some(field) = exact_on {
                        breakdown.exact_match = weights.exact_match_bonus;
                        matches.push(format!("exact match on {field}"));
                    }
                }
                let stats = self.store.reviews(url);
                breakdown.review = review_score(stats, weights);
                if let Some(ReviewStats { total_reviews, average_score: Some(avg), .. }) = stats {
                    matches.push(format!("reviews: {avg:.2} average over {total_reviews}"));
                }
                Some(ScoredDocument { url: url.to_string(), score: breakdown.total(), breakdown, matches })
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.url.cmp(&b.url)));
        hits.truncate(config.top_k);
        Ranking { total_documents, filtered_documents, hits }
    }

    fn candidates<'s>(&'s self, query: &ProcessedQuery, config: &SearchConfig) -> BTreeSet<&'s str> {
        let mut found: BTreeSet<&str> = BTreeSet::new();
        for term in &query.expanded {
            found.extend(self.store.matching_documents(term));
        }
        if config.match_mode == MatchMode::All {
            let required: Vec<&String> = match config.all_terms_of {
                AllTermsOf::Query => query.terms.iter().collect(),
                AllTermsOf::Expanded => query.expanded.iter().collect(),
            };
            if required.is_empty() {
                found.clear();
            }
            for term in required {
                let matching: HashSet<&str> = self.store.matching_documents(term);
                found.retain(|url| matching.contains(url));
            }
        }
        found.retain(|url| {
            let present = self.store.document(url).is_some();
            if !present {
                tracing::debug!(url, "indexed document missing from store, skipping");
            }
            present
        });
        found
    }

    fn score_term<'s>(&'s self, term: &str, candidates: &BTreeSet<&'s str>, weights: &ScoringWeights) -> TermPartial<'s> {
        let mut partial: TermPartial<'s> = HashMap::new();
        let title = self.store.occurrences(Field::Title, term);
        let description = self.store.occurrences(Field::Description, term);
        let df = title.keys().chain(description.keys()).collect::<HashSet<_>>().len();

        for (field, occurrences) in [(Field::Title, &title), (Field::Description, &description)] {
            for (url, count) in occurrences {
                if !candidates.contains(url) { continue; }
                let hit = partial.entry(*url).or_default();
                hit.tf += count;
                hit.in_title |= field == Field::Title;
                hit.matches.push(format!("{} contains '{}' ({}x)", field.as_str(), term, count));
            }
        }
        for field in [Field::Brand, Field::Origin] {
            for url in self.store.value_matches(field, term) {
                if !candidates.contains(url) { continue; }
                partial
                    .entry(url)
                    .or_default()
                    .matches
                    .push(format!("{} matches '{}'", field.as_str(), term));
            }
        }

        if df > 0 {
            let idf = bm25_idf(self.store.total_documents(), df);
            for (url, hit) in partial.iter_mut() {
                if hit.tf > 0 {
                    hit.bm25 = idf * bm25_tf(hit.tf, self.store.doc_length(url), weights);
                }
            }
        }
        partial
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idf_decreases_with_df() {
        assert!(bm25_idf(10, 1) > bm25_idf(10, 5));
        assert!(bm25_idf(10, 10) > 0.0);
    }

    #[test]
    fn tf_saturates() {
        let w = ScoringWeights::default();
        let one = bm25_tf(1, 10, &w);
        let ten = bm25_tf(10, 10, &w);
        let hundred = bm25_tf(100, 10, &w);
        assert!(ten > one);
        assert!(hundred - ten < ten - one);
        assert!(hundred < w.k1 + 1.0);
    }

    #[test]
    fn review_score_caps_count() {
        let w = ScoringWeights::default();
        let stats = |n| ReviewStats { total_reviews: n, average_score: Some(4.0), last_score: Some(4.0) };
        assert_eq!(review_score(Some(&stats(10)), &w), review_score(Some(&stats(500)), &w));
        assert!(review_score(Some(&stats(5)), &w) < review_score(Some(&stats(10)), &w));
        assert_eq!(review_score(None, &w), 0.0);
        let empty = ReviewStats { total_reviews: 0, average_score: None, last_score: None };
        assert_eq!(review_score(Some(&empty), &w), 0.0);
    }
}
