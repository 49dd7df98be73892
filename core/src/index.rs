use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::document::{dedupe_by_url, extract_product_info, Document};
use crate::tokenizer::{normalize_phrase, tokenize};

/// term -> URLs of documents containing it
pub type InvertedIndex = BTreeMap<String, BTreeSet<String>>;
/// term -> url -> 0-based token positions
pub type PositionalIndex = BTreeMap<String, BTreeMap<String, Vec<usize>>>;
/// feature name -> lowercased value -> URLs
pub type FeaturesIndex = BTreeMap<String, BTreeMap<String, BTreeSet<String>>>;
pub type ReviewsIndex = BTreeMap<String, ReviewStats>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Title,
    Description,
    Brand,
    Origin,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Title, Field::Description, Field::Brand, Field::Origin];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Description => "description",
            Field::Brand => "brand",
            Field::Origin => "origin",
        }
    }

    /// Whether the field is indexed positionally (free text) or by value.
    pub fn is_text(self) -> bool {
        matches!(self, Field::Title | Field::Description)
    }
}

/// Review aggregate for one document. `average_score` and `last_score` are
/// `None` exactly when `total_reviews == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReviewStats {
    pub total_reviews: u32,
    pub average_score: Option<f64>,
    pub last_score: Option<f64>,
}

impl ReviewStats {
    pub fn from_ratings<I: IntoIterator<Item = f64>>(ratings: I) -> Self {
        let mut total = 0u32;
        let mut sum = 0.0f64;
        let mut last = None;
        for r in ratings {
            total += 1;
            sum += r;
            last = Some(r);
        }
        if total == 0 {
            return ReviewStats { total_reviews: 0, average_score: None, last_score: None };
        }
        let average = (sum / total as f64 * 100.0).round() / 100.0;
        ReviewStats { total_reviews: total, average_score: Some(average), last_score: last }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct IndexSet {
    pub title: InvertedIndex,
    pub description: InvertedIndex,
    pub brand: InvertedIndex,
    pub origin: InvertedIndex,
    pub title_positions: PositionalIndex,
    pub description_positions: PositionalIndex,
    pub reviews: ReviewsIndex,
    pub features: FeaturesIndex,
}

impl IndexSet {
    pub fn inverted(&self, field: Field) -> &InvertedIndex {
        match field {
            Field::Title => &self.title,
            Field::Description => &self.description,
            Field::Brand => &self.brand,
            Field::Origin => &self.origin,
        }
    }

    pub fn positional(&self, field: Field) -> Option<&PositionalIndex> {
        match field {
            Field::Title => Some(&self.title_positions),
            Field::Description => Some(&self.description_positions),
            Field::Brand | Field::Origin => None,
        }
    }

    /// Every term known to any of the four inverted indexes.
    pub fn vocabulary(&self) -> BTreeSet<String> {
        Field::ALL
            .iter()
            .flat_map(|f| self.inverted(*f).keys().cloned())
            .collect()
    }
}

/// Output of a batch build: the deduplicated, enriched documents and their indexes.
#[derive(Debug, Clone)]
pub struct BuiltIndex {
    pub documents: Vec<Document>,
    pub indexes: IndexSet,
}

/// Build every index from a document stream. Duplicate URLs collapse to the last record.
pub fn build(documents: Vec<Document>) -> BuiltIndex {
    let mut documents = dedupe_by_url(documents);
    for doc in documents.iter_mut() {
        let (product_id, variant) = extract_product_info(&doc.url);
        doc.product_id = product_id;
        doc.variant = variant;
    }
    let indexes = IndexSet {
        title: inverted_index(&documents, Field::Title),
        description: inverted_index(&documents, Field::Description),
        brand: value_index(&documents, Field::Brand),
        origin: value_index(&documents, Field::Origin),
        title_positions: positional_index(&documents, Field::Title),
        description_positions: positional_index(&documents, Field::Description),
        reviews: reviews_index(&documents),
        features: features_index(&documents),
    };
    tracing::info!(
        num_docs = documents.len(),
        num_terms = indexes.title.len() + indexes.description.len(),
        "built indexes"
    );
    BuiltIndex { documents, indexes }
}

pub fn inverted_index(docs: &[Document], field: Field) -> InvertedIndex {
    let mut index = InvertedIndex::new();
    for doc in docs {
        let Some(text) = doc.field_text(field) else { continue };
        let unique: HashSet<String> = tokenize(text).into_iter().collect();
        for term in unique {
            index.entry(term).or_default().insert(doc.url.clone());
        }
    }
    index
}

/// Brand/origin index: every token of the value plus the whole normalized value,
/// so "United States" is reachable as "united", "states" and "united states".
pub fn value_index(docs: &[Document], field: Field) -> InvertedIndex {
    let mut index = inverted_index(docs, field);
    for doc in docs {
        let Some(text) = doc.field_text(field) else { continue };
        let phrase = normalize_phrase(text);
        if phrase.contains(' ') {
            index.entry(phrase).or_default().insert(doc.url.clone());
        }
    }
    index
}

pub fn positional_index(docs: &[Document], field: Field) -> PositionalIndex {
    let mut index = PositionalIndex::new();
    for doc in docs {
        let Some(text) = doc.field_text(field) else { continue };
        for (pos, term) in tokenize(text).into_iter().enumerate() {
            index.entry(term).or_default().entry(doc.url.clone()).or_default().push(pos);
        }
    }
    index
}

pub fn reviews_index(docs: &[Document]) -> ReviewsIndex {
    docs.iter()
        .map(|doc| (doc.url.clone(), ReviewStats::from_ratings(doc.ratings())))
        .collect()
}

pub fn features_index(docs: &[Document]) -> FeaturesIndex {
    let mut index = FeaturesIndex::new();
    for doc in docs {
        for (feature, value) in &doc.product_features {
            index
                .entry(feature.clone())
                .or_default()
                .entry(value.to_lowercase())
                .or_default()
                .insert(doc.url.clone());
        }
    }
    index
}
