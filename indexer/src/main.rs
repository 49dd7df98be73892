use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use shopsearch_core::document::load_documents;
use shopsearch_core::index::build;
use shopsearch_core::persist::{read_synonyms_file, save_all, IndexPaths};
use shopsearch_core::{
    AllTermsOf, DictionaryCorrector, IndexStore, MatchMode, QueryHistory, SearchConfig, SearchEngine,
    SearchResponse, SynonymTable,
};
use tracing_subscriber::{EnvFilter, fmt};
use walkdir::WalkDir;

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query the product search index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the indexes from crawled JSONL documents (a file or a directory of them)
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Synonym table to ship with the index, as {"term": ["synonym", ...]}
        #[arg(long)]
        synonyms: Option<PathBuf>,
    },
    /// Run one or more queries against a built index
    Query {
        /// Index directory path
        #[arg(long, default_value = "./index")]
        index: String,
        /// Query text; pass several to run them in order
        #[arg(required = true)]
        queries: Vec<String>,
        /// Number of results to keep per query
        #[arg(long, default_value_t = 10)]
        k: usize,
        /// Candidate policy: any or all
        #[arg(long, default_value_t = MatchMode::Any)]
        mode: MatchMode,
        /// Terms the `all` policy requires: query or expanded
        #[arg(long, default_value_t = AllTermsOf::Query)]
        all_terms_of: AllTermsOf,
        /// Minimum similarity (0-100) for vocabulary spelling corrections
        #[arg(long, default_value_t = 80.0)]
        fuzzy_threshold: f64,
        /// Word list for the fallback spelling corrector (`word [count]` per line)
        #[arg(long)]
        dictionary: Option<PathBuf>,
        /// Append each response to this JSON Lines history file
        #[arg(long)]
        history: Option<PathBuf>,
        /// Print full JSON responses instead of a summary
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, synonyms } => build_index(&input, &output, synonyms.as_deref()),
        Commands::Query { index, queries, k, mode, all_terms_of, fuzzy_threshold, dictionary, history, json } => {
            let config = SearchConfig {
                top_k: k.max(1),
                match_mode: mode,
                all_terms_of,
                fuzzy_threshold,
                ..SearchConfig::default()
            };
            run_queries(&index, &queries, config, dictionary.as_deref(), history.as_deref(), json)
        }
    }
}

fn input_files(input_path: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "jsonl" | "ndjson") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    }
    files
}

fn build_index(input: &str, output: &str, synonyms: Option<&Path>) -> Result<()> {
    let files = input_files(Path::new(input));
    if files.is_empty() {
        bail!("no JSONL input found at {input}");
    }

    let mut documents = Vec::new();
    for file in &files {
        let docs = load_documents(file)?;
        tracing::info!(file = %file.display(), docs = docs.len(), "read documents");
        documents.extend(docs);
    }

    let synonyms = match synonyms {
        Some(path) => read_synonyms_file(path)?,
        None => SynonymTable::new(),
    };

    let built = build(documents);
    let out_paths = IndexPaths::new(output);
    save_all(&out_paths, &built.documents, &built.indexes, &synonyms)?;

    tracing::info!(output, num_docs = built.documents.len(), synonyms = synonyms.len(), "index build complete");
    Ok(())
}

fn run_queries(
    index: &str,
    queries: &[String],
    config: SearchConfig,
    dictionary: Option<&Path>,
    history: Option<&Path>,
    json: bool,
) -> Result<()> {
    let store = IndexStore::open(index)?;
    let mut engine = SearchEngine::new(store, config);
    if let Some(path) = dictionary {
        engine = engine.with_corrector(Box::new(DictionaryCorrector::load(path)?));
    }
    let history = history.map(QueryHistory::open).transpose()?;

    for query in queries {
        let response = engine.search(query);
        if json {
            println!("{}", serde_json::to_string_pretty(&response)?);
        } else {
            print_summary(&response);
        }
        if let Some(h) = &history {
            h.append(&response)?;
        }
    }
    Ok(())
}

fn print_summary(response: &SearchResponse) {
    println!("\n=== Query: {} ===", response.query);
    if let Some(suggestion) = &response.did_you_mean {
        println!("Did you mean: {suggestion}");
    }
    println!(
        "{} of {} documents matched",
        response.metadata.filtered_documents, response.metadata.total_documents
    );
    for (i, hit) in response.results.iter().enumerate() {
        let description: String = hit.description.chars().take(200).collect();
        println!("{}. {} (score: {})", i + 1, hit.title, hit.score);
        println!("   {}", hit.url);
        println!("   {description}");
        for m in &hit.matches {
            println!("   - {m}");
        }
    }
}
