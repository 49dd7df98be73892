//! Spelling correction for query tokens.
//!
//! Correction is two-tiered: fuzzy matching against the corpus vocabulary comes
//! first (see [`best_fuzzy_match`]), and only when nothing in the corpus is close
//! enough does a general-purpose [`SpellCorrector`] get a chance.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Fallback corrector consulted when the corpus vocabulary has no close match.
pub trait SpellCorrector: Send + Sync {
    /// Returns a replacement for `word`, or `None` to keep it unchanged.
    fn correct(&self, word: &str) -> Option<String>;
}

/// Corrector that never changes anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCorrector;

impl SpellCorrector for NoCorrector {
    fn correct(&self, _word: &str) -> Option<String> { None }
}

/// Similarity of two strings on a 0..=100 scale (normalized Levenshtein).
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// Closest vocabulary term scoring at least `threshold`. Ties go to the
/// lexically smallest term, which is the first seen in a sorted vocabulary.
pub fn best_fuzzy_match<'a, I>(word: &str, vocabulary: I, threshold: f64) -> Option<(&'a str, f64)>
where
    I: IntoIterator<Item = &'a String>,
{
    let len = word.chars().count() as f64;
    let mut best: Option<(&'a str, f64)> = None;
    for candidate in vocabulary {
        // the ratio can't reach the threshold if lengths differ too much
        let clen = candidate.chars().count() as f64;
        if (len - clen).abs() / len.max(clen).max(1.0) * 100.0 > 100.0 - threshold {
            continue;
        }
        let score = similarity_ratio(word, candidate);
        if score < threshold { continue; }
        match best {
            Some((_, s)) if s >= score => {}
            _ => best = Some((candidate.as_str(), score)),
        }
    }
    best
}

const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz";
/// Longest token that gets the edit-distance-2 pass.
const MAX_DISTANCE_TWO_LEN: usize = 20;

/// Dictionary-backed corrector: candidates at edit distance one, then two,
/// restricted to known words and ranked by frequency.
#[derive(Debug, Default, Clone)]
pub struct DictionaryCorrector {
    words: HashMap<String, u64>,
    // in chars
    longest: usize,
}

impl DictionaryCorrector {
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut map = HashMap::new();
        for (w, count) in words {
            *map.entry(w.into().to_lowercase()).or_insert(0) += count;
        }
        let longest = map.keys().map(|w| w.chars().count()).max().unwrap_or(0);
        Self { words: map, longest }
    }

    /// One entry per line: `word` or `word count`. Blank lines and `#` comments are ignored.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') { continue; }
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else { continue };
            let count = parts.next().and_then(|c| c.parse().ok()).unwrap_or(1);
            entries.push((word.to_string(), count));
        }
        Ok(Self::from_words(entries))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let f = File::open(path).with_context(|| format!("opening dictionary {}", path.display()))?;
        let corrector = Self::from_reader(BufReader::new(f))?;
        tracing::info!(path = %path.display(), words = corrector.len(), "loaded spelling dictionary");
        Ok(corrector)
    }

    pub fn len(&self) -> usize { self.words.len() }

    pub fn is_empty(&self) -> bool { self.words.is_empty() }

    fn most_frequent<I: IntoIterator<Item = String>>(&self, candidates: I) -> Option<String> {
        candidates
            .into_iter()
            .filter_map(|c| self.words.get(&c).map(|n| (c, *n)))
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
            .map(|(c, _)| c)
    }
}

impl SpellCorrector for DictionaryCorrector {
    fn correct(&self, word: &str) -> Option<String> {
        if self.words.contains_key(word) { return None; }
        // nothing within two edits can be known
        let len = word.chars().count();
        if len > self.longest + 2 { return None; }
        let first = edits1(word);
        if let Some(best) = self.most_frequent(first.iter().cloned()) {
            return Some(best);
        }
        if len > MAX_DISTANCE_TWO_LEN { return None; }
        self.most_frequent(first.iter().flat_map(|w| edits1(w)))
    }
}

fn edits1(word: &str) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    let n = chars.len();
    let mut out = Vec::with_capacity(54 * n + 25);
    for i in 0..n {
        let mut deleted = chars.clone();
        deleted.remove(i);
        out.push(deleted.into_iter().collect());
    }
    for i in 0..n.saturating_sub(1) {
        let mut swapped = chars.clone();
        swapped.swap(i, i + 1);
        out.push(swapped.into_iter().collect());
    }
    for i in 0..n {
        for c in ALPHABET.chars() {
            let mut replaced = chars.clone();
            replaced[i] = c;
            out.push(replaced.into_iter().collect());
        }
    }
    for i in 0..=n {
        for c in ALPHABET.chars() {
            let mut inserted = chars.clone();
            inserted.insert(i, c);
            out.push(inserted.into_iter().collect());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::time::{Duration, Instant};

    fn vocab(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn fuzzy_finds_close_term() {
        let v = vocab(&["coffee", "cotton", "organic"]);
        let (term, score) = best_fuzzy_match("cofee", &v, 80.0).unwrap();
        assert_eq!(term, "coffee");
        assert!(score >= 80.0);
    }

    #[test]
    fn fuzzy_respects_threshold() {
        let v = vocab(&["laptop"]);
        assert!(best_fuzzy_match("lamp", &v, 80.0).is_none());
    }

    #[test]
    fn dictionary_prefers_frequent_words() {
        let d = DictionaryCorrector::from_words([("shoes", 50u64), ("shows", 10)]);
        assert_eq!(d.correct("shoez").as_deref(), Some("shoes"));
        assert_eq!(d.correct("shoes"), None);
    }

    #[test]
    fn dictionary_reaches_distance_two() {
        let d = DictionaryCorrector::from_words([("keyboard", 1u64)]);
        assert_eq!(d.correct("keybord").as_deref(), Some("keyboard"));
        assert_eq!(d.correct("kyebord").as_deref(), Some("keyboard"));
    }

    #[test]
    fn long_tokens_are_cut_short() {
        let d = DictionaryCorrector::from_words([("keyboard", 1u64)]);
        let start = Instant::now();
        assert_eq!(d.correct(&"q".repeat(60)), None);
        assert!(start.elapsed() < Duration::from_millis(200));

        let long_word = "a".repeat(30);
        let d = DictionaryCorrector::from_words([(long_word.clone(), 1u64)]);
        let start = Instant::now();
        assert_eq!(d.correct(&"b".repeat(30)), None);
        assert!(start.elapsed() < Duration::from_millis(500));
        // distance one still applies to long words
        assert_eq!(d.correct(&format!("{long_word}b")), Some(long_word));
    }

    #[test]
    fn dictionary_file_format() {
        let input = "# words\nbottle 12\nsteel\n\n";
        let d = DictionaryCorrector::from_reader(input.as_bytes()).unwrap();
        assert_eq!(d.len(), 2);
        assert_eq!(d.correct("botle").as_deref(), Some("bottle"));
    }
}
