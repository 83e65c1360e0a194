use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::pagination::{CHUNKS_PER_PAGE, PAPERS_PER_PAGE_CHOICES};

/// Environment variable that overrides `[remote].base_url`.
pub const BASE_URL_ENV: &str = "PAPERS_URL";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the bearer token.
    #[serde(default)]
    pub token_env: Option<String>,
    /// Client-side request timeout; `0` leaves requests unbounded.
    #[serde(default)]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token_env: None,
            timeout_secs: 0,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

impl RemoteConfig {
    /// Bearer token read from the configured environment variable, if any.
    pub fn token(&self) -> Option<String> {
        self.token_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    #[serde(default = "default_papers_per_page")]
    pub papers_per_page: usize,
    #[serde(default = "default_chunks_per_page")]
    pub chunks_per_page: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            papers_per_page: default_papers_per_page(),
            chunks_per_page: default_chunks_per_page(),
        }
    }
}

fn default_papers_per_page() -> usize {
    PAPERS_PER_PAGE_CHOICES[0]
}
fn default_chunks_per_page() -> usize {
    CHUNKS_PER_PAGE
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_max_search_page")]
    pub max_search_page: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            max_search_page: default_max_search_page(),
        }
    }
}

/// Result-count choices offered by the search form.
pub const MAX_RESULTS_CHOICES: [usize; 3] = [5, 10, 20];

fn default_max_results() -> usize {
    10
}
fn default_max_search_page() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
        }
    }
}

fn default_max_bytes() -> u64 {
    crate::upload::DEFAULT_MAX_UPLOAD_BYTES
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Uploads in flight at once. `1` keeps the remote ingestion endpoint
    /// to a single outstanding request.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

fn default_concurrency() -> usize {
    1
}

fn default_allowed_extensions() -> Vec<String> {
    crate::upload::ALLOWED_EXTENSIONS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Config {
    /// All defaults; used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    finish(config)
}

/// Like [`load_config`], but a missing file yields [`Config::minimal`].
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        finish(Config::minimal())
    }
}

fn finish(mut config: Config) -> Result<Config> {
    if let Ok(url) = std::env::var(BASE_URL_ENV) {
        if !url.trim().is_empty() {
            config.remote.base_url = url;
        }
    }
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let url = config.remote.base_url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!("remote.base_url must start with http:// or https://, got '{}'", url);
    }

    if !PAPERS_PER_PAGE_CHOICES.contains(&config.catalog.papers_per_page) {
        anyhow::bail!(
            "catalog.papers_per_page must be one of {:?}",
            PAPERS_PER_PAGE_CHOICES
        );
    }
    if config.catalog.chunks_per_page == 0 {
        anyhow::bail!("catalog.chunks_per_page must be > 0");
    }

    if !MAX_RESULTS_CHOICES.contains(&config.search.max_results) {
        anyhow::bail!("search.max_results must be one of {:?}", MAX_RESULTS_CHOICES);
    }
    if config.search.max_search_page == 0 {
        anyhow::bail!("search.max_search_page must be >= 1");
    }

    if config.upload.max_bytes == 0 {
        anyhow::bail!("upload.max_bytes must be > 0");
    }

    if config.ingest.concurrency == 0 {
        anyhow::bail!("ingest.concurrency must be >= 1");
    }
    if config.ingest.allowed_extensions.is_empty() {
        anyhow::bail!("ingest.allowed_extensions must not be empty");
    }
    for ext in &config.ingest.allowed_extensions {
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            anyhow::bail!(
                "ingest.allowed_extensions entries must be bare extensions like \"pdf\", got '{}'",
                ext
            );
        }
    }

    Ok(())
}
