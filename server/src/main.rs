use anyhow::Result;
use axum::Router;
use clap::Parser;
use server::{build_app, ServerSettings};
use shopsearch_core::{AllTermsOf, MatchMode, SearchConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Index directory path
    #[arg(long, default_value = "./index")]
    index: PathBuf,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Append every search response to this JSON Lines file
    #[arg(long)]
    history: Option<PathBuf>,
    /// Word list for the fallback spelling corrector
    #[arg(long)]
    dictionary: Option<PathBuf>,
    /// Default number of results per query
    #[arg(long, default_value_t = 10)]
    k: usize,
    /// Default candidate policy: any or all
    #[arg(long, default_value_t = MatchMode::Any)]
    mode: MatchMode,
    /// Terms the `all` policy requires: query or expanded
    #[arg(long, default_value_t = AllTermsOf::Query)]
    all_terms_of: AllTermsOf,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let settings = ServerSettings {
        index_dir: args.index,
        history: args.history,
        dictionary: args.dictionary,
        config: SearchConfig {
            top_k: args.k.max(1),
            match_mode: args.mode,
            all_terms_of: args.all_terms_of,
            ..SearchConfig::default()
        },
    };
    let app: Router = build_app(settings)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
