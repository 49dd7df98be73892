use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::engine::Ranking;
use crate::query::{Correction, ProcessedQuery};
use crate::store::IndexStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub title: String,
    pub url: String,
    pub description: String,
    pub score: f64,
    pub matches: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub total_documents: usize,
    pub filtered_documents: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// The structured record returned for one query and appended to the history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub metadata: ResponseMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub did_you_mean: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub corrections: Vec<Correction>,
    pub results: Vec<ResultEntry>,
}

impl SearchResponse {
    pub fn from_ranking(query: &ProcessedQuery, ranking: &Ranking, store: &IndexStore) -> Self {
        let results = ranking
            .hits
            .iter()
            .filter_map(|hit| {
                let doc = store.document(&hit.url)?;
                Some(ResultEntry {
                    title: doc.title.clone(),
                    url: hit.url.clone(),
                    description: doc.description.clone(),
                    score: round_score(hit.score),
                    matches: hit.matches.clone(),
                    product_id: doc.product_id.clone(),
                    variant: doc.variant.clone(),
                })
            })
            .collect();
        SearchResponse {
            query: query.raw.clone(),
            metadata: ResponseMetadata {
                total_documents: ranking.total_documents,
                filtered_documents: ranking.filtered_documents,
                timestamp: Some(now_rfc3339()),
            },
            did_you_mean: query.did_you_mean.clone(),
            corrections: query.corrections.clone(),
            results,
        }
    }
}

pub fn round_score(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}

pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

/// Append-only JSON Lines log of search responses.
pub struct QueryHistory {
    path: PathBuf,
    file: Mutex<File>,
}

impl QueryHistory {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            create_dir_all(dir)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening query history {}", path.display()))?;
        Ok(Self { path, file: Mutex::new(file) })
    }

    pub fn path(&self) -> &Path { &self.path }

    pub fn append(&self, response: &SearchResponse) -> Result<()> {
        let mut line = serde_json::to_string(response)?;
        line.push('\n');
        let mut f = self.file.lock();
        f.write_all(line.as_bytes())?;
        f.flush()?;
        Ok(())
    }

    /// Every record in insertion order.
    pub fn read_all<P: AsRef<Path>>(path: P) -> Result<Vec<SearchResponse>> {
        let f = File::open(path.as_ref())?;
        let mut out = Vec::new();
        for line in BufReader::new(f).lines() {
            let line = line?;
            if line.trim().is_empty() { continue; }
            out.push(serde_json::from_str(&line)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(query: &str) -> SearchResponse {
        SearchResponse {
            query: query.to_string(),
            metadata: ResponseMetadata { total_documents: 3, filtered_documents: 1, timestamp: None },
            did_you_mean: None,
            corrections: Vec::new(),
            results: Vec::new(),
        }
    }

    #[test]
    fn history_appends_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/history.jsonl");
        {
            let h = QueryHistory::open(&path).unwrap();
            h.append(&response("first")).unwrap();
        }
        let h = QueryHistory::open(&path).unwrap();
        h.append(&response("second")).unwrap();
        let all = QueryHistory::read_all(&path).unwrap();
        let queries: Vec<&str> = all.iter().map(|r| r.query.as_str()).collect();
        assert_eq!(queries, vec!["first", "second"]);
    }

    #[test]
    fn optional_fields_are_omitted() {
        let json = serde_json::to_value(response("q")).unwrap();
        assert!(json.get("did_you_mean").is_none());
        assert!(json.get("corrections").is_none());
        assert_eq!(json["metadata"]["total_documents"], 3);
    }

    #[test]
    fn scores_round_to_three_places() {
        assert_eq!(round_score(1.23456), 1.235);
    }
}
