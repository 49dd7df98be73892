use crate::document::Document;
use crate::index::{FeaturesIndex, IndexSet, InvertedIndex, PositionalIndex, ReviewsIndex};
use crate::synonyms::SynonymTable;
use anyhow::{bail, Context, Result};
use bincode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const INDEX_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn title(&self) -> PathBuf { self.root.join("title_index.json") }
    pub fn description(&self) -> PathBuf { self.root.join("description_index.json") }
    pub fn brand(&self) -> PathBuf { self.root.join("brand_index.json") }
    pub fn origin(&self) -> PathBuf { self.root.join("origin_index.json") }
    pub fn title_positions(&self) -> PathBuf { self.root.join("title_positional_index.json") }
    pub fn description_positions(&self) -> PathBuf { self.root.join("description_positional_index.json") }
    pub fn reviews(&self) -> PathBuf { self.root.join("reviews_index.json") }
    pub fn features(&self) -> PathBuf { self.root.join("features_index.json") }
    pub fn synonyms(&self) -> PathBuf { self.root.join("origin_synonyms.json") }
    pub fn docs(&self) -> PathBuf { self.root.join("docs.bin") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let json = serde_json::to_string_pretty(value)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

fn open_required(path: &Path) -> Result<File> {
    if !path.exists() {
        bail!("missing index file {}", path.display());
    }
    File::open(path).with_context(|| format!("opening {}", path.display()))
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let mut f = open_required(path)?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let value = serde_json::from_str(&buf).with_context(|| format!("parsing {}", path.display()))?;
    Ok(value)
}

pub fn save_index_set(paths: &IndexPaths, indexes: &IndexSet) -> Result<()> {
    create_dir_all(&paths.root)?;
    save_json(&paths.title(), &indexes.title)?;
    save_json(&paths.description(), &indexes.description)?;
    save_json(&paths.brand(), &indexes.brand)?;
    save_json(&paths.origin(), &indexes.origin)?;
    save_json(&paths.title_positions(), &indexes.title_positions)?;
    save_json(&paths.description_positions(), &indexes.description_positions)?;
    save_json(&paths.reviews(), &indexes.reviews)?;
    save_json(&paths.features(), &indexes.features)?;
    Ok(())
}

pub fn load_index_set(paths: &IndexPaths) -> Result<IndexSet> {
    Ok(IndexSet {
        title: load_json::<InvertedIndex>(&paths.title())?,
        description: load_json::<InvertedIndex>(&paths.description())?,
        brand: load_json::<InvertedIndex>(&paths.brand())?,
        origin: load_json::<InvertedIndex>(&paths.origin())?,
        title_positions: load_json::<PositionalIndex>(&paths.title_positions())?,
        description_positions: load_json::<PositionalIndex>(&paths.description_positions())?,
        reviews: load_json::<ReviewsIndex>(&paths.reviews())?,
        features: load_json::<FeaturesIndex>(&paths.features())?,
    })
}

pub fn save_docs(paths: &IndexPaths, docs: &[Document]) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.docs())?;
    let bytes = bincode::serialize(docs)?;
    f.write_all(&bytes)?;
    Ok(())
}

pub fn load_docs(paths: &IndexPaths) -> Result<Vec<Document>> {
    let mut f = open_required(&paths.docs())?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let docs = bincode::deserialize(&buf).context("decoding document store")?;
    Ok(docs)
}

pub fn save_synonyms(paths: &IndexPaths, synonyms: &SynonymTable) -> Result<()> {
    create_dir_all(&paths.root)?;
    save_json(&paths.synonyms(), synonyms)
}

/// Synonyms are optional: an index without a synonym file expands nothing.
pub fn load_synonyms(paths: &IndexPaths) -> Result<SynonymTable> {
    if !paths.synonyms().exists() {
        tracing::debug!(root = %paths.root.display(), "no synonym table");
        return Ok(SynonymTable::new());
    }
    load_json(&paths.synonyms())
}

/// Read a synonym table from an arbitrary JSON file (`{"key": ["syn", ...]}`).
pub fn read_synonyms_file(path: &Path) -> Result<SynonymTable> {
    let f = File::open(path).with_context(|| format!("opening synonyms {}", path.display()))?;
    let table = serde_json::from_reader(std::io::BufReader::new(f))
        .with_context(|| format!("parsing synonyms {}", path.display()))?;
    Ok(table)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    save_json(&paths.meta(), meta)
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    load_json(&paths.meta())
}

/// Persist a full build: indexes, document store, synonyms and meta.
pub fn save_all(paths: &IndexPaths, docs: &[Document], indexes: &IndexSet, synonyms: &SynonymTable) -> Result<()> {
    save_index_set(paths, indexes)?;
    save_docs(paths, docs)?;
    // written even when empty so a rebuild replaces an older table
    save_synonyms(paths, synonyms)?;
    let meta = MetaFile {
        num_docs: docs.len() as u32,
        created_at: crate::results::now_rfc3339(),
        version: INDEX_VERSION,
    };
    save_meta(paths, &meta)
}
