use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::tokenizer::normalize_phrase;

/// Canonical term -> synonyms. Membership is symmetric for expansion: a term
/// matching either a key or any of its synonyms pulls in the whole group.
///
/// Entries are normalized with [`normalize_phrase`] so they compare equal to
/// tokenized query terms and brand/origin phrase keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Vec<String>>", into = "BTreeMap<String, Vec<String>>")]
pub struct SynonymTable {
    groups: BTreeMap<String, BTreeSet<String>>,
    // member (key or synonym) -> keys of the groups it belongs to
    membership: HashMap<String, BTreeSet<String>>,
}

impl SynonymTable {
    pub fn new() -> Self { Self::default() }

    pub fn insert<I, S>(&mut self, key: &str, synonyms: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let key = normalize_phrase(key);
        if key.is_empty() { return; }
        let members: BTreeSet<String> = synonyms
            .into_iter()
            .map(|s| normalize_phrase(s.as_ref()))
            .filter(|s| !s.is_empty())
            .collect();
        for m in members.iter().chain(std::iter::once(&key)) {
            self.membership.entry(m.clone()).or_default().insert(key.clone());
        }
        self.groups.entry(key).or_default().extend(members);
    }

    pub fn len(&self) -> usize { self.groups.len() }

    pub fn is_empty(&self) -> bool { self.groups.is_empty() }

    /// Whether `term` is a key or synonym of any group.
    pub fn contains(&self, term: &str) -> bool {
        self.membership.contains_key(term)
    }

    pub fn synonyms(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.groups.get(key)
    }

    /// The term itself plus every key and synonym of each group it belongs to.
    pub fn expand(&self, term: &str) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        out.insert(term.to_string());
        if let Some(keys) = self.membership.get(term) {
            for key in keys {
                out.insert(key.clone());
                if let Some(group) = self.groups.get(key) {
                    out.extend(group.iter().cloned());
                }
            }
        }
        out
    }
}

impl From<BTreeMap<String, Vec<String>>> for SynonymTable {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        let mut table = SynonymTable::new();
        for (key, synonyms) in &map {
            table.insert(key, synonyms);
        }
        table
    }
}

impl From<SynonymTable> for BTreeMap<String, Vec<String>> {
    fn from(table: SynonymTable) -> Self {
        table
            .groups
            .into_iter()
            .map(|(k, v)| (k, v.into_iter().collect()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origins() -> SynonymTable {
        let mut t = SynonymTable::new();
        t.insert("usa", ["United States", "America", "US"]);
        t.insert("uk", ["United Kingdom", "Britain"]);
        t
    }

    #[test]
    fn expands_from_key() {
        let e = origins().expand("usa");
        assert!(e.contains("usa"));
        assert!(e.contains("united states"));
        assert!(e.contains("america"));
        assert!(!e.contains("britain"));
    }

    #[test]
    fn expands_from_synonym() {
        let e = origins().expand("united states");
        assert!(e.contains("usa"));
        assert!(e.contains("us"));
    }

    #[test]
    fn unknown_term_passes_through() {
        let e = origins().expand("coffee");
        assert_eq!(e.into_iter().collect::<Vec<_>>(), vec!["coffee".to_string()]);
    }

    #[test]
    fn json_shape_is_key_to_list() {
        let json = r#"{"usa": ["united states", "america"]}"#;
        let t: SynonymTable = serde_json::from_str(json).unwrap();
        assert_eq!(t.len(), 1);
        assert!(t.expand("america").contains("usa"));
    }
}
