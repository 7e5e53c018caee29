//! Lookalike server
//!
//! HTTP API serving nearest-neighbor similarity search over a product
//! catalog: search by image URL or free text, add and delete products, and
//! report index readiness while the background build runs.

mod api;
mod state;

use std::path::PathBuf;

use clap::Parser;
use lookalike_core::{config::AppConfig, logging, AppResult};
use lookalike_embed::{create_model, Embedder};
use lookalike_index::{PersistPaths, SearchIndex, SourceRouter};
use state::AppState;

/// Lookalike - product similarity search over precomputed embeddings
#[derive(Parser, Debug)]
#[command(name = "lookalike")]
#[command(about = "Nearest-neighbor similarity search over a product catalog", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to bind the HTTP server to (host:port)
    #[arg(long, env = "LOOKALIKE_BIND", default_value = "0.0.0.0:8000")]
    bind: String,

    /// MySQL DSN for the primary product source
    #[arg(long, env = "MYSQL_URL")]
    mysql_url: Option<String>,

    /// Embedding provider (remote, hash)
    #[arg(long, env = "EMBED_PROVIDER")]
    embed_provider: Option<String>,

    /// Embedding model identifier
    #[arg(long, env = "EMBEDDING_MODEL")]
    embed_model: Option<String>,

    /// Base URL of the remote encoder service
    #[arg(long, env = "EMBED_ENDPOINT")]
    embed_endpoint: Option<String>,

    /// Embedding source policy (auto, image, text)
    #[arg(long, env = "EMBED_SOURCE")]
    embed_source: Option<String>,

    /// Directory for the persisted index artifacts
    #[arg(long, env = "LOOKALIKE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Path to the fallback SQL dump of the products table
    #[arg(long, env = "LOOKALIKE_DUMP_PATH")]
    dump_path: Option<PathBuf>,

    /// Default top_k when a search request does not specify one
    #[arg(long, default_value_t = 5)]
    default_top_k: usize,

    /// Maximum top_k allowed per request
    #[arg(long, default_value_t = 50)]
    max_top_k: usize,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "RUST_LOG")]
    log_level: Option<String>,
}

impl Cli {
    /// Apply CLI flags on top of the loaded configuration.
    fn apply(&self, config: &mut AppConfig) -> AppResult<()> {
        if let Some(url) = &self.mysql_url {
            config.mysql_url = Some(url.clone());
        }
        if let Some(provider) = &self.embed_provider {
            config.embed_provider = provider.clone();
        }
        if let Some(model) = &self.embed_model {
            config.embed_model = model.clone();
        }
        if let Some(endpoint) = &self.embed_endpoint {
            config.embed_endpoint = endpoint.clone();
        }
        if let Some(source) = &self.embed_source {
            config.embed_source = source.parse()?;
        }
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(dump_path) = &self.dump_path {
            config.dump_path = dump_path.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = Some(level.clone());
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load()?;
    cli.apply(&mut config)?;

    logging::init_logging(config.log_level.as_deref())?;
    config.validate()?;
    config.ensure_data_dir()?;

    tracing::info!("Lookalike server starting");
    tracing::debug!("Embedding provider: {}", config.embed_provider);
    tracing::debug!("Embedding model: {}", config.embed_model);
    tracing::debug!(
        "Primary source: {}",
        if config.mysql_url.is_some() {
            "mysql"
        } else {
            "none (dump only)"
        }
    );

    // Loading the model can be slow (remote encoder warm-up); do it before
    // binding so a misconfigured encoder fails fast.
    let model = create_model(&config).await?;
    tracing::info!(
        "Embedding model '{}' ready ({} dimensions)",
        model.model_name(),
        model.dimension()
    );

    let embedder = Embedder::new(model)?;
    let sources = SourceRouter::from_config(&config)?;
    let paths = PersistPaths {
        index_path: config.index_path(),
        mapping_path: config.mapping_path(),
    };

    let index = SearchIndex::new(embedder, sources, config.embed_source, paths);
    // The initial build runs in the background; requests see NotReady until
    // it finishes.
    let _build = index.start();

    let state = AppState {
        index,
        default_top_k: cli.default_top_k,
        max_top_k: cli.max_top_k,
    };

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(&cli.bind).await?;
    tracing::info!("Listening on {}", cli.bind);

    axum::serve(listener, app).await?;

    Ok(())
}
