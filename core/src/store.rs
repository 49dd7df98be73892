use anyhow::Result;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use crate::document::Document;
use crate::index::{BuiltIndex, Field, IndexSet, ReviewStats};
use crate::persist::{load_docs, load_index_set, load_meta, load_synonyms, IndexPaths, INDEX_VERSION};
use crate::synonyms::SynonymTable;
use crate::tokenizer::tokenize;

/// Everything a query session reads: indexes, the document store, synonyms and
/// derived lookups. Read-only after construction and safe to share across threads.
pub struct IndexStore {
    indexes: IndexSet,
    docs: HashMap<String, Document>,
    synonyms: SynonymTable,
    vocabulary: BTreeSet<String>,
    // tokens in title + description
    doc_lengths: HashMap<String, usize>,
}

impl IndexStore {
    pub fn new(documents: Vec<Document>, indexes: IndexSet, synonyms: SynonymTable) -> Self {
        let doc_lengths = documents
            .iter()
            .map(|d| (d.url.clone(), tokenize(&d.title).len() + tokenize(&d.description).len()))
            .collect();
        let docs = documents.into_iter().map(|d| (d.url.clone(), d)).collect();
        let vocabulary = indexes.vocabulary();
        Self { indexes, docs, synonyms, vocabulary, doc_lengths }
    }

    pub fn from_built(built: BuiltIndex, synonyms: SynonymTable) -> Self {
        Self::new(built.documents, built.indexes, synonyms)
    }

    /// Load a persisted index directory. Any missing index file is an error.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let paths = IndexPaths::new(root);
        let meta = load_meta(&paths)?;
        if meta.version != INDEX_VERSION {
            tracing::warn!(found = meta.version, expected = INDEX_VERSION, "index version mismatch");
        }
        let indexes = load_index_set(&paths)?;
        let docs = load_docs(&paths)?;
        let synonyms = load_synonyms(&paths)?;
        tracing::info!(
            root = %paths.root.display(),
            num_docs = docs.len(),
            synonyms = synonyms.len(),
            created_at = %meta.created_at,
            "loaded index"
        );
        Ok(Self::new(docs, indexes, synonyms))
    }

    pub fn indexes(&self) -> &IndexSet { &self.indexes }

    pub fn synonyms(&self) -> &SynonymTable { &self.synonyms }

    pub fn vocabulary(&self) -> &BTreeSet<String> { &self.vocabulary }

    pub fn total_documents(&self) -> usize { self.docs.len() }

    pub fn document(&self, url: &str) -> Option<&Document> { self.docs.get(url) }

    pub fn doc_length(&self, url: &str) -> usize {
        self.doc_lengths.get(url).copied().unwrap_or(0)
    }

    pub fn reviews(&self, url: &str) -> Option<&ReviewStats> { self.indexes.reviews.get(url) }

    /// Occurrences of `term` per document in a text field. A multi-word term is
    /// matched as a phrase through the positional index.
    pub fn occurrences(&self, field: Field, term: &str) -> HashMap<&str, usize> {
        let mut out = HashMap::new();
        let Some(positional) = self.indexes.positional(field) else { return out };
        let parts: Vec<&str> = term.split(' ').collect();
        let Some(first) = positional.get(parts[0]) else { return out };
        if parts.len() == 1 {
            for (url, positions) in first {
                out.insert(url.as_str(), positions.len());
            }
            return out;
        }
        let mut rest = Vec::with_capacity(parts.len() - 1);
        for part in &parts[1..] {
            match positional.get(*part) {
                Some(postings) => rest.push(postings),
                None => return out,
            }
        }
        for (url, starts) in first {
            let follows: Option<Vec<&Vec<usize>>> = rest.iter().map(|p| p.get(url)).collect();
            let Some(follows) = follows else { continue };
            let count = starts
                .iter()
                .filter(|&&p| follows.iter().enumerate().all(|(i, pos)| pos.binary_search(&(p + i + 1)).is_ok()))
                .count();
            if count > 0 {
                out.insert(url.as_str(), count);
            }
        }
        out
    }

    /// Documents whose brand/origin index holds `term`.
    pub fn value_matches(&self, field: Field, term: &str) -> impl Iterator<Item = &str> {
        self.indexes.inverted(field).get(term).into_iter().flatten().map(String::as_str)
    }

    /// Documents matching `term` in any of title, description, brand or origin.
    pub fn matching_documents(&self, term: &str) -> HashSet<&str> {
        let mut out: HashSet<&str> = HashSet::new();
        for field in [Field::Title, Field::Description] {
            if term.contains(' ') {
                out.extend(self.occurrences(field, term).into_keys());
            } else {
                out.extend(self.indexes.inverted(field).get(term).into_iter().flatten().map(String::as_str));
            }
        }
        out.extend(self.value_matches(Field::Brand, term));
        out.extend(self.value_matches(Field::Origin, term));
        out
    }

    /// Sorted vocabulary terms starting with `prefix` (lowercased), at most `limit`.
    pub fn autocomplete(&self, prefix: &str, limit: usize) -> Vec<String> {
        let prefix = prefix.trim().to_lowercase();
        if prefix.is_empty() { return Vec::new(); }
        self.vocabulary
            .range(prefix.clone()..)
            .take_while(|t| t.starts_with(&prefix))
            .take(limit)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build;

    fn store() -> IndexStore {
        let docs = vec![
            Document::new("a", "Stainless Steel Water Bottle", "A steel bottle for water, steel lid"),
            Document::new("b", "Glass Bottle", "Water in glass").with_origin("United States"),
        ];
        IndexStore::from_built(build(docs), SynonymTable::new())
    }

    #[test]
    fn single_term_occurrences() {
        let s = store();
        let occ = s.occurrences(Field::Description, "steel");
        assert_eq!(occ.get("a"), Some(&2));
        assert!(!occ.contains_key("b"));
    }

    #[test]
    fn phrase_occurrences_need_adjacency() {
        let s = store();
        assert_eq!(s.occurrences(Field::Title, "water bottle").get("a"), Some(&1));
        assert!(s.occurrences(Field::Title, "bottle water").is_empty());
    }

    #[test]
    fn matching_covers_value_fields() {
        let s = store();
        let m = s.matching_documents("united states");
        assert!(m.contains("b"));
        assert!(!m.contains("a"));
    }

    #[test]
    fn autocomplete_lists_prefix_terms() {
        let s = store();
        assert_eq!(s.autocomplete("St", 10), vec!["stainless", "states", "steel"]);
        assert_eq!(s.autocomplete("st", 1), vec!["stainless"]);
        assert!(s.autocomplete("", 5).is_empty());
    }
}
