//! Configuration management for the Lookalike service.
//!
//! This module handles loading and merging configuration from multiple
//! sources:
//! - Environment variables
//! - Command-line flags (applied by the server binary)
//! - Config files (lookalike.yaml)
//!
//! Environment variables override the config file; CLI flags override both.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{AppError, AppResult};

/// Default embedding model name passed to the encoder service.
const DEFAULT_EMBED_MODEL: &str = "clip-vit-b-32";

/// Default base URL for the remote encoder service.
const DEFAULT_EMBED_ENDPOINT: &str = "http://localhost:8501";

/// Embedding source policy: what kind of input an embedding request treats
/// its payload as.
///
/// - `Auto`: URL-shaped inputs are fetched and embedded as images, falling
///   back to text on failure; everything else is embedded as text.
/// - `Image`: input must be a fetchable image URL; no fallback.
/// - `Text`: input is embedded literally; never fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourcePolicy {
    Auto,
    Image,
    Text,
}

impl Default for SourcePolicy {
    fn default() -> Self {
        SourcePolicy::Auto
    }
}

impl FromStr for SourcePolicy {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(SourcePolicy::Auto),
            "image" => Ok(SourcePolicy::Image),
            "text" => Ok(SourcePolicy::Text),
            other => Err(AppError::Config(format!(
                "Unknown embed source policy: '{}'. Supported: auto, image, text",
                other
            ))),
        }
    }
}

impl fmt::Display for SourcePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourcePolicy::Auto => "auto",
            SourcePolicy::Image => "image",
            SourcePolicy::Text => "text",
        };
        f.write_str(s)
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// MySQL DSN for the primary product source. `None` means the service
    /// runs from the fallback dump only.
    pub mysql_url: Option<String>,

    /// Directory holding the persisted index artifacts.
    pub data_dir: PathBuf,

    /// Path to the fallback SQL dump of the products table.
    pub dump_path: PathBuf,

    /// Embedding provider name: "remote" or "hash"
    pub embed_provider: String,

    /// Embedding model identifier (provider-specific)
    pub embed_model: String,

    /// Base URL of the remote encoder service
    pub embed_endpoint: String,

    /// Source policy applied to embedding inputs
    pub embed_source: SourcePolicy,

    /// Log level override
    pub log_level: Option<String>,
}

/// On-disk configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    database: Option<DatabaseSection>,
    embedding: Option<EmbeddingSection>,
    paths: Option<PathsSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DatabaseSection {
    mysql_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EmbeddingSection {
    provider: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
    source: Option<SourcePolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PathsSection {
    data_dir: Option<PathBuf>,
    dump_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mysql_url: None,
            data_dir: PathBuf::from("data"),
            dump_path: PathBuf::from("product_details.sql"),
            embed_provider: "remote".to_string(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            embed_endpoint: DEFAULT_EMBED_ENDPOINT.to_string(),
            embed_source: SourcePolicy::Auto,
            log_level: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional YAML file and environment
    /// variables.
    ///
    /// Environment variables:
    /// - `MYSQL_URL` / `DATABASE_URL`: primary source DSN
    /// - `EMBED_PROVIDER`: embedding provider ("remote", "hash")
    /// - `EMBEDDING_MODEL`: model identifier
    /// - `EMBED_ENDPOINT`: remote encoder base URL
    /// - `EMBED_SOURCE`: source policy (auto, image, text)
    /// - `LOOKALIKE_DATA_DIR`: persistence directory
    /// - `LOOKALIKE_DUMP_PATH`: fallback SQL dump path
    /// - `LOOKALIKE_CONFIG`: config file path (default: lookalike.yaml)
    /// - `RUST_LOG`: log level
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        // YAML config file first so env vars can override it
        let config_path = std::env::var("LOOKALIKE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("lookalike.yaml"));

        if config_path.exists() {
            config.merge_yaml(&config_path)?;
            tracing::debug!("Merged config file {:?}", config_path);
        }

        if let Some(url) = first_env(&["MYSQL_URL", "DATABASE_URL"]) {
            config.mysql_url = Some(url);
        }

        if let Ok(provider) = std::env::var("EMBED_PROVIDER") {
            config.embed_provider = provider;
        }

        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            config.embed_model = model;
        }

        if let Ok(endpoint) = std::env::var("EMBED_ENDPOINT") {
            config.embed_endpoint = endpoint;
        }

        if let Ok(source) = std::env::var("EMBED_SOURCE") {
            config.embed_source = source.parse()?;
        }

        if let Ok(dir) = std::env::var("LOOKALIKE_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        if let Ok(path) = std::env::var("LOOKALIKE_DUMP_PATH") {
            config.dump_path = PathBuf::from(path);
        }

        config.log_level = std::env::var("RUST_LOG").ok();

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&mut self, path: &Path) -> AppResult<()> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        if let Some(db) = file.database {
            if db.mysql_url.is_some() {
                self.mysql_url = db.mysql_url;
            }
        }

        if let Some(embedding) = file.embedding {
            if let Some(provider) = embedding.provider {
                self.embed_provider = provider;
            }
            if let Some(model) = embedding.model {
                self.embed_model = model;
            }
            if let Some(endpoint) = embedding.endpoint {
                self.embed_endpoint = endpoint;
            }
            if let Some(source) = embedding.source {
                self.embed_source = source;
            }
        }

        if let Some(paths) = file.paths {
            if let Some(data_dir) = paths.data_dir {
                self.data_dir = data_dir;
            }
            if let Some(dump_path) = paths.dump_path {
                self.dump_path = dump_path;
            }
        }

        if let Some(logging) = file.logging {
            if logging.level.is_some() {
                self.log_level = logging.level;
            }
        }

        Ok(())
    }

    /// Path to the persisted vector-store blob.
    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join("products_index.bin")
    }

    /// Path to the persisted mapping document.
    pub fn mapping_path(&self) -> PathBuf {
        self.data_dir.join("mapping.json")
    }

    /// Ensure the data directory exists.
    pub fn ensure_data_dir(&self) -> AppResult<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir).map_err(|e| {
                AppError::Config(format!(
                    "Failed to create data directory {:?}: {}",
                    self.data_dir, e
                ))
            })?;
        }
        Ok(())
    }

    /// Validate configuration for the active embedding provider.
    pub fn validate(&self) -> AppResult<()> {
        let known_providers = ["remote", "hash"];
        if !known_providers.contains(&self.embed_provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embed_provider,
                known_providers.join(", ")
            )));
        }

        if self.embed_provider == "remote" && self.embed_endpoint.trim().is_empty() {
            return Err(AppError::Config(
                "Remote embedding provider requires an endpoint".to_string(),
            ));
        }

        Ok(())
    }
}

/// Return the first set environment variable from a list of names.
fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| std::env::var(name).ok())
        .filter(|v| !v.trim().is_empty())
}
