use anyhow::Result;
use axum::{extract::{Query, State}, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use shopsearch_core::{
    AllTermsOf, DictionaryCorrector, IndexStore, MatchMode, QueryHistory, SearchConfig, SearchEngine, SearchResponse,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer, AllowOrigin};

const MAX_K: usize = 100;

/// Startup configuration; the index is loaded once in [`build_app`].
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub index_dir: PathBuf,
    pub history: Option<PathBuf>,
    pub dictionary: Option<PathBuf>,
    pub config: SearchConfig,
}

impl ServerSettings {
    pub fn new<P: Into<PathBuf>>(index_dir: P) -> Self {
        Self { index_dir: index_dir.into(), history: None, dictionary: None, config: SearchConfig::default() }
    }
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub k: Option<usize>,
    pub mode: Option<MatchMode>,
    pub all_terms_of: Option<AllTermsOf>,
}

#[derive(Deserialize)]
pub struct AutocompleteParams {
    pub prefix: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}
fn default_limit() -> usize { 10 }

#[derive(Serialize)]
pub struct AutocompleteResponse {
    pub prefix: String,
    pub suggestions: Vec<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    pub history: Option<Arc<QueryHistory>>,
}

pub fn build_app(settings: ServerSettings) -> Result<Router> {
    // Load indexes at startup; a missing index file aborts here
    let store = IndexStore::open(&settings.index_dir)?;
    let mut engine = SearchEngine::new(store, settings.config);
    if let Some(path) = &settings.dictionary {
        engine = engine.with_corrector(Box::new(DictionaryCorrector::load(path)?));
    }
    let history = settings.history.map(QueryHistory::open).transpose()?.map(Arc::new);
    let state = AppState { engine: Arc::new(engine), history };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Ok(router(state).layer(cors))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/autocomplete", get(autocomplete_handler))
        .with_state(state)
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let mut config = state.engine.config().clone();
    if let Some(k) = params.k { config.top_k = k.clamp(1, MAX_K); }
    if let Some(mode) = params.mode { config.match_mode = mode; }
    if let Some(terms) = params.all_terms_of { config.all_terms_of = terms; }

    // Ranking fans out on the rayon pool; keep it off the async workers.
    let engine = state.engine.clone();
    let history = state.history.clone();
    let response = tokio::task::spawn_blocking(move || {
        let response = engine.search_with(&params.q, &config);
        if let Some(h) = history {
            if let Err(err) = h.append(&response) {
                tracing::warn!(%err, path = %h.path().display(), "failed to append query history");
            }
        }
        response
    })
    .await
    .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;

    tracing::info!(
        query = %response.query,
        filtered = response.metadata.filtered_documents,
        returned = response.results.len(),
        "search"
    );
    Ok(Json(response))
}

pub async fn autocomplete_handler(
    State(state): State<AppState>,
    Query(params): Query<AutocompleteParams>,
) -> Json<AutocompleteResponse> {
    let suggestions = state.engine.autocomplete(&params.prefix, params.limit.min(MAX_K));
    Json(AutocompleteResponse { prefix: params.prefix, suggestions })
}
