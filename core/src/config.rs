use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Candidate retrieval policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Documents matching at least one expanded term.
    #[default]
    Any,
    /// Documents matching every term of the set chosen by [`AllTermsOf`].
    All,
}

/// Which term set the [`MatchMode::All`] filter requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllTermsOf {
    /// The corrected query tokens, before synonym expansion.
    #[default]
    Query,
    /// Every synonym-expanded term.
    Expanded,
}

impl FromStr for MatchMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "any" => Ok(MatchMode::Any),
            "all" => Ok(MatchMode::All),
            other => Err(format!("unknown match mode '{other}', expected 'any' or 'all'")),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { MatchMode::Any => "any", MatchMode::All => "all" })
    }
}

impl FromStr for AllTermsOf {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "query" => Ok(AllTermsOf::Query),
            "expanded" => Ok(AllTermsOf::Expanded),
            other => Err(format!("unknown term set '{other}', expected 'query' or 'expanded'")),
        }
    }
}

impl fmt::Display for AllTermsOf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { AllTermsOf::Query => "query", AllTermsOf::Expanded => "expanded" })
    }
}

/// Fixed ranking constants.
///
/// final = bm25_weight * BM25
///       + exact_match_bonus (query equals title or brand)
///       + title_token_weight * (query terms found in the title)
///       + review_weight * (average * review_avg_weight + min(count, review_count_cap) * review_count_weight)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub k1: f64,
    pub b: f64,
    /// Assumed average length in tokens of title + description.
    pub avg_field_len: f64,
    pub bm25_weight: f64,
    pub exact_match_bonus: f64,
    pub title_token_weight: f64,
    pub review_avg_weight: f64,
    pub review_count_weight: f64,
    pub review_count_cap: u32,
    pub review_weight: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            k1: 1.5,
            b: 0.75,
            avg_field_len: 300.0,
            bm25_weight: 0.4,
            exact_match_bonus: 2.0,
            title_token_weight: 0.2,
            review_avg_weight: 0.3,
            review_count_weight: 0.1,
            review_count_cap: 10,
            review_weight: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of results materialized per query.
    pub top_k: usize,
    pub match_mode: MatchMode,
    pub all_terms_of: AllTermsOf,
    /// Minimum similarity (0..=100) for a vocabulary spelling correction.
    pub fuzzy_threshold: f64,
    pub scoring: ScoringWeights,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            match_mode: MatchMode::Any,
            all_terms_of: AllTermsOf::Query,
            fuzzy_threshold: 80.0,
            scoring: ScoringWeights::default(),
        }
    }
}
