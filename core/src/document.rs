use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::index::Field;

lazy_static! {
    static ref PRODUCT_URL: Regex = Regex::new(r"/product/(\d+)(?:\?variant=(.*))?").expect("valid regex");
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub rating: Option<f64>,
    pub text: Option<String>,
    pub date: Option<String>,
}

/// A crawled product page. Immutable once handed to the index builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    pub title: String,
    pub description: String,
    pub brand: Option<String>,
    pub origin: Option<String>,
    pub product_features: BTreeMap<String, String>,
    pub product_reviews: Vec<Review>,
    /// Derived from the URL by [`extract_product_info`].
    pub product_id: Option<String>,
    pub variant: Option<String>,
}

impl Document {
    pub fn new(url: impl Into<String>, title: impl Into<String>, description: impl Into<String>) -> Self {
        Document {
            url: url.into(),
            title: title.into(),
            description: description.into(),
            brand: None,
            origin: None,
            product_features: BTreeMap::new(),
            product_reviews: Vec::new(),
            product_id: None,
            variant: None,
        }
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_feature(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.product_features.insert(name.into(), value.into());
        self
    }

    pub fn with_ratings(mut self, ratings: &[f64]) -> Self {
        self.product_reviews
            .extend(ratings.iter().map(|r| Review { rating: Some(*r), text: None, date: None }));
        self
    }

    /// Case-insensitive feature lookup.
    pub fn feature(&self, name: &str) -> Option<&str> {
        self.product_features
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Brand field, falling back to the "brand" feature.
    pub fn brand(&self) -> Option<&str> {
        self.brand.as_deref().or_else(|| self.feature("brand"))
    }

    /// Origin field, falling back to the "made in" or "origin" feature.
    pub fn origin(&self) -> Option<&str> {
        self.origin
            .as_deref()
            .or_else(|| self.feature("made in"))
            .or_else(|| self.feature("origin"))
    }

    pub fn field_text(&self, field: Field) -> Option<&str> {
        match field {
            Field::Title => Some(&self.title),
            Field::Description => Some(&self.description),
            Field::Brand => self.brand(),
            Field::Origin => self.origin(),
        }
    }

    /// Ratings in encounter order, ignoring reviews without one.
    pub fn ratings(&self) -> impl Iterator<Item = f64> + '_ {
        self.product_reviews.iter().filter_map(|r| r.rating)
    }
}

/// Wire shape of one crawler record. Everything is optional so that a
/// malformed record can be reported instead of failing the stream.
#[derive(Debug, Deserialize)]
struct RawDocument {
    url: Option<String>,
    title: Option<String>,
    description: Option<String>,
    brand: Option<String>,
    origin: Option<String>,
    #[serde(default)]
    product_features: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    product_reviews: Option<Vec<RawReview>>,
}

#[derive(Debug, Deserialize)]
struct RawReview {
    rating: Option<serde_json::Value>,
    text: Option<String>,
    date: Option<String>,
}

impl RawReview {
    fn into_review(self) -> Review {
        let rating = match self.rating {
            Some(serde_json::Value::Number(n)) => n.as_f64(),
            Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };
        Review { rating, text: self.text, date: self.date }
    }
}

impl RawDocument {
    /// Returns the name of the first missing required field on failure.
    fn validate(self) -> std::result::Result<Document, &'static str> {
        let url = self.url.filter(|u| !u.trim().is_empty()).ok_or("url")?;
        let title = self.title.ok_or("title")?;
        let description = self.description.ok_or("description")?;
        let product_features = self
            .product_features
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| {
                let value = match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, value)
            })
            .collect();
        let product_reviews = self
            .product_reviews
            .unwrap_or_default()
            .into_iter()
            .map(RawReview::into_review)
            .collect();
        Ok(Document {
            url,
            title,
            description,
            brand: self.brand,
            origin: self.origin,
            product_features,
            product_reviews,
            product_id: None,
            variant: None,
        })
    }
}

/// Parse a product URL of the shape `.../product/<id>[?variant=<value>]`.
pub fn extract_product_info(url: &str) -> (Option<String>, Option<String>) {
    match PRODUCT_URL.captures(url) {
        Some(caps) => {
            let id = caps.get(1).map(|m| m.as_str().to_string());
            let variant = caps
                .get(2)
                .map(|m| m.as_str().to_string())
                .filter(|v| !v.is_empty());
            (id, variant)
        }
        None => (None, None),
    }
}

/// Read newline-delimited JSON documents. Blank lines are ignored; unparsable
/// or incomplete records are skipped with a warning. Only I/O errors are fatal.
pub fn read_documents<R: BufRead>(reader: R) -> Result<Vec<Document>> {
    let mut docs = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let raw: RawDocument = match serde_json::from_str(&line) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(line = lineno + 1, %err, "skipping unparsable document");
                continue;
            }
        };
        match raw.validate() {
            Ok(doc) => docs.push(doc),
            Err(field) => tracing::warn!(line = lineno + 1, field, "skipping document with missing field"),
        }
    }
    Ok(docs)
}

pub fn load_documents(path: &Path) -> Result<Vec<Document>> {
    let f = File::open(path).with_context(|| format!("opening documents file {}", path.display()))?;
    read_documents(BufReader::new(f))
}

/// Collapse duplicate URLs: the last record wins but keeps the position of the first.
pub fn dedupe_by_url(docs: Vec<Document>) -> Vec<Document> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<Document> = Vec::with_capacity(docs.len());
    for doc in docs {
        match slots.get(&doc.url) {
            Some(&slot) => {
                tracing::warn!(url = %doc.url, "duplicate document url, keeping the later record");
                out[slot] = doc;
            }
            None => {
                slots.insert(doc.url.clone(), out.len());
                out.push(doc);
            }
        }
    }
    out
}
