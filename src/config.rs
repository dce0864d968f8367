use crate::storage::{self, StorageManager};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "config.yaml";

const DEFAULT_CATALOG_FILE: &str = "movies.csv";

/// Default semantic search model (bge-base offers +13% accuracy vs MiniLM)
const DEFAULT_SEMANTIC_MODEL: &str = "bge-base-en-v1.5";
const DEFAULT_CACHE_FILE: &str = "vectors.bin";
/// Default model download timeout in seconds
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;
const DEFAULT_SEARCH_TOP_K: usize = 5;
const DEFAULT_SIMILAR_TOP_K: usize = 6;

/// Configuration for the vector index and query engine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SemanticSearchConfig {
    /// Model name for embeddings (e.g., "bge-base-en-v1.5")
    #[serde(default = "default_semantic_model")]
    pub model: String,

    /// File name of the persisted index inside the data directory
    #[serde(default = "default_cache_file")]
    pub cache_file: String,

    /// Timeout for model download in seconds
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Results returned by free-text search when no count is given
    #[serde(default = "default_search_top_k")]
    pub search_top_k: usize,

    /// Results returned by similar-items lookup when no count is given
    #[serde(default = "default_similar_top_k")]
    pub similar_top_k: usize,

    /// Build the index on a background thread as soon as the app starts
    #[serde(default = "default_warm_up")]
    pub warm_up: bool,
}

impl Default for SemanticSearchConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_SEMANTIC_MODEL.to_string(),
            cache_file: DEFAULT_CACHE_FILE.to_string(),
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            search_top_k: DEFAULT_SEARCH_TOP_K,
            similar_top_k: DEFAULT_SIMILAR_TOP_K,
            warm_up: true,
        }
    }
}

fn default_semantic_model() -> String {
    DEFAULT_SEMANTIC_MODEL.to_string()
}

fn default_cache_file() -> String {
    DEFAULT_CACHE_FILE.to_string()
}

fn default_download_timeout_secs() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

fn default_search_top_k() -> usize {
    DEFAULT_SEARCH_TOP_K
}

fn default_similar_top_k() -> usize {
    DEFAULT_SIMILAR_TOP_K
}

fn default_warm_up() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Movie catalog (CSV) relative to the data directory
    #[serde(default = "default_catalog_file")]
    pub catalog_file: String,

    #[serde(default)]
    pub semantic_search: SemanticSearchConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_file: DEFAULT_CATALOG_FILE.to_string(),
            semantic_search: SemanticSearchConfig::default(),
            base_path: String::new(),
        }
    }
}

fn default_catalog_file() -> String {
    DEFAULT_CATALOG_FILE.to_string()
}

impl Config {
    fn validate(&self) -> anyhow::Result<()> {
        if self.catalog_file.trim().is_empty() {
            bail!("catalog_file must not be empty");
        }

        let sem = &self.semantic_search;
        if sem.model.trim().is_empty() {
            bail!("semantic_search.model must not be empty");
        }
        if sem.cache_file.trim().is_empty() {
            bail!("semantic_search.cache_file must not be empty");
        }
        if sem.download_timeout_secs == 0 {
            bail!("semantic_search.download_timeout_secs must be greater than 0");
        }
        if sem.search_top_k == 0 {
            bail!("semantic_search.search_top_k must be greater than 0");
        }
        if sem.similar_top_k == 0 {
            bail!("semantic_search.similar_top_k must be greater than 0");
        }

        Ok(())
    }

    pub fn load_with(base_path: &str) -> anyhow::Result<Self> {
        let store = storage::BackendLocal::new(base_path)
            .with_context(|| format!("failed to open data directory {base_path}"))?;

        // create new if does not exist
        if !store.exists(CONFIG_FILE) {
            log::info!("Writing default {CONFIG_FILE} to {base_path}");
            store.write(
                CONFIG_FILE,
                serde_yml::to_string(&Self::default())?.as_bytes(),
            )?;
        }

        let config_str = String::from_utf8(store.read(CONFIG_FILE)?)
            .context("config file is not valid utf8")?;
        let mut config: Self = serde_yml::from_str(&config_str).context("config is malformed")?;

        config.base_path = base_path.to_string();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let store = storage::BackendLocal::new(&self.base_path)?;

        let config_str = serde_yml::to_string(&self)?;
        store.write(CONFIG_FILE, config_str.as_bytes())?;
        Ok(())
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn catalog_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.base_path).join(&self.catalog_file)
    }
}
