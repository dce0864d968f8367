use std::{
    path::PathBuf,
    sync::Arc,
    thread::JoinHandle,
    time::Duration,
};

use anyhow::{Context, Result};
use homedir::my_home;
use serde::Serialize;

use crate::{
    config::Config,
    movies::{BackendCsv, MovieRepository},
    semantic::{
        EmbeddingModel, EncoderLoader, IndexController, SearchFilters, SearchHit,
        SemanticSearchService, VectorStorage,
    },
    storage,
};

/// Snapshot of index health for `cinedex status`.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    pub model: String,
    pub encoder_loaded: bool,
    /// Full rebuilds run by this process
    pub builds: u64,
    pub indexed_entries: usize,
    pub catalog_records: usize,
    pub cache_exists: bool,
    pub cached_entries: Option<u64>,
    pub cached_catalog_records: Option<u64>,
    pub cache_error: Option<String>,
}

pub struct App {
    config: Config,
    service: Arc<SemanticSearchService>,
}

impl App {
    /// CSV catalog plus fastembed encoder, both rooted at the config's data directory.
    pub fn new(config: Config) -> Result<Self> {
        let repo = Arc::new(BackendCsv::new(config.catalog_path()));
        let sem = &config.semantic_search;
        let loader = EmbeddingModel::loader(
            sem.model.clone(),
            PathBuf::from(config.base_path()),
            Duration::from_secs(sem.download_timeout_secs),
        );
        Self::with_parts(config, repo, loader)
    }

    pub fn with_parts(
        config: Config,
        repo: Arc<dyn MovieRepository>,
        loader: EncoderLoader,
    ) -> Result<Self> {
        let store = Arc::new(
            storage::BackendLocal::new(config.base_path())
                .context("Failed to open data directory")?,
        );
        let sem = &config.semantic_search;
        let controller = Arc::new(IndexController::new(
            repo,
            VectorStorage::new(store, &sem.cache_file),
            &sem.model,
            loader,
        ));

        Ok(Self {
            config,
            service: Arc::new(SemanticSearchService::new(controller)),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn service(&self) -> &Arc<SemanticSearchService> {
        &self.service
    }

    /// Build or load the index on a background thread.
    pub fn spawn_warm_up(&self) -> JoinHandle<()> {
        let service = self.service.clone();
        std::thread::spawn(move || {
            log::info!("Warming up vector index");
            if let Err(e) = service.ensure_ready(false) {
                log::error!("Vector index warm-up failed: {}", e);
            }
        })
    }

    /// Rebuild the index from scratch on a background thread.
    pub fn spawn_rebuild(&self) -> JoinHandle<()> {
        let service = self.service.clone();
        std::thread::spawn(move || {
            log::info!("Starting background vector index rebuild");
            match service.ensure_ready(true) {
                Ok(()) => log::info!("Background vector rebuild finished"),
                Err(e) => log::error!("Background vector rebuild failed: {}", e),
            }
        })
    }

    pub fn search(&self, query: &str, top_k: Option<usize>, filters: &SearchFilters) -> Result<Vec<SearchHit>> {
        let top_k = top_k.unwrap_or(self.config.semantic_search.search_top_k);
        Ok(self.service.search(query, top_k, filters)?)
    }

    pub fn similar(&self, id: u64, top_k: Option<usize>) -> Result<Vec<SearchHit>> {
        let top_k = top_k.unwrap_or(self.config.semantic_search.similar_top_k);
        Ok(self.service.search_by_id(id, top_k)?)
    }

    pub fn status(&self) -> Result<IndexStatus> {
        let controller = self.service.controller();
        let storage = controller.storage();
        let catalog_records = controller.repository().count()?;

        let mut status = IndexStatus {
            model: controller.model_name().to_string(),
            encoder_loaded: controller.is_encoder_loaded(),
            builds: controller.build_count(),
            indexed_entries: controller.indexed_count(),
            catalog_records,
            cache_exists: storage.exists(),
            cached_entries: None,
            cached_catalog_records: None,
            cache_error: None,
        };

        if status.cache_exists {
            match storage.load_header() {
                Ok(header) => {
                    status.cached_entries = Some(header.entry_count);
                    status.cached_catalog_records = Some(header.source_count);
                }
                Err(e) => status.cache_error = Some(e.to_string()),
            }
        }

        Ok(status)
    }

    pub fn clear_cache(&self) -> Result<()> {
        self.service
            .controller()
            .storage()
            .delete()
            .context("Failed to delete vector cache")
    }
}

/// Data directory: `$CINEDEX_BASE_PATH`, else `~/.local/share/cinedex`.
pub fn base_path() -> Result<String> {
    if let Ok(path) = std::env::var("CINEDEX_BASE_PATH") {
        return Ok(path);
    }

    let home = my_home()
        .context("Could not determine home directory")?
        .context("Home directory path is empty")?;
    Ok(format!("{}/.local/share/cinedex", home.to_string_lossy()))
}
