//! Owns the published index generation and decides when to (re)build it.
//!
//! - One build at a time, serialized by `build_lock`
//! - Readers take an `Arc` snapshot and never see a half-built generation
//! - The encoder moves Unloaded -> Loaded exactly once

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use crate::movies::{MovieRepository, RepositoryError};
use crate::semantic::corpus;
use crate::semantic::embeddings::{EmbeddingError, Encoder, EncoderLoader};
use crate::semantic::index::{Generation, IndexError};
use crate::semantic::storage::{model_id_hash, VectorStorage, VectorStorageError};

/// Errors that can occur during semantic search operations.
#[derive(Debug, thiserror::Error)]
pub enum SemanticSearchError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Storage error: {0}")]
    Storage(#[from] VectorStorageError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// How the last `ensure_ready` call was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// A generation was already published
    AlreadyLoaded,
    /// Adopted the persisted cache
    LoadedFromCache,
    /// Encoded the catalog and published a new generation
    Built,
    /// No indexable movies; nothing was published
    EmptyCorpus,
}

pub struct IndexController {
    repo: Arc<dyn MovieRepository>,
    storage: VectorStorage,
    model_name: String,
    model_id: [u8; 32],
    loader: EncoderLoader,
    /// Lazily-initialized encoder. Uses Mutex<Option<_>> instead of OnceLock
    /// because get_or_try_init is unstable.
    encoder: Mutex<Option<Arc<dyn Encoder>>>,
    current: RwLock<Option<Arc<Generation>>>,
    build_lock: Mutex<()>,
    builds: AtomicU64,
}

impl IndexController {
    /// `model_name` must be the name the loader's encoder reports; it keys
    /// the persisted cache so blobs from another model are never adopted.
    pub fn new(
        repo: Arc<dyn MovieRepository>,
        storage: VectorStorage,
        model_name: &str,
        loader: EncoderLoader,
    ) -> Self {
        Self {
            repo,
            storage,
            model_name: model_name.to_string(),
            model_id: model_id_hash(model_name),
            loader,
            encoder: Mutex::new(None),
            current: RwLock::new(None),
            build_lock: Mutex::new(()),
            builds: AtomicU64::new(0),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn storage(&self) -> &VectorStorage {
        &self.storage
    }

    pub fn repository(&self) -> &Arc<dyn MovieRepository> {
        &self.repo
    }

    /// Number of full rebuilds (encode passes) performed so far.
    pub fn build_count(&self) -> u64 {
        self.builds.load(Ordering::SeqCst)
    }

    /// The currently published generation, if any.
    pub fn snapshot(&self) -> Option<Arc<Generation>> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn indexed_count(&self) -> usize {
        self.snapshot().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_encoder_loaded(&self) -> bool {
        self.encoder.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }

    /// Load the encoder on first use. Failure leaves it unloaded so a later
    /// call can retry.
    pub fn encoder(&self) -> Result<Arc<dyn Encoder>, SemanticSearchError> {
        let mut guard = self
            .encoder
            .lock()
            .map_err(|e| SemanticSearchError::Internal(format!("Lock poisoned: {}", e)))?;

        if let Some(encoder) = guard.as_ref() {
            return Ok(encoder.clone());
        }

        let encoder = (self.loader)()?;
        if encoder.name() != self.model_name {
            log::warn!(
                "encoder reports name '{}' but index is keyed by '{}'",
                encoder.name(),
                self.model_name
            );
        }
        *guard = Some(encoder.clone());
        Ok(encoder)
    }

    /// Make sure a fresh generation is published.
    ///
    /// Cheap when an index is already loaded and `force_refresh` is false.
    /// Callers arriving while another thread builds block until it finishes
    /// and then reuse its result.
    pub fn ensure_ready(&self, force_refresh: bool) -> Result<BuildOutcome, SemanticSearchError> {
        if !force_refresh && self.snapshot().is_some() {
            return Ok(BuildOutcome::AlreadyLoaded);
        }

        let _build = self
            .build_lock
            .lock()
            .map_err(|e| SemanticSearchError::Internal(format!("Lock poisoned: {}", e)))?;

        // another caller may have finished a build while we waited
        if !force_refresh && self.snapshot().is_some() {
            return Ok(BuildOutcome::AlreadyLoaded);
        }

        if !force_refresh && self.storage.exists() {
            if let Some(generation) = self.load_cached() {
                self.publish(generation);
                return Ok(BuildOutcome::LoadedFromCache);
            }
        }

        self.rebuild()
    }

    /// Adopt the persisted generation if it decodes and is not stale.
    fn load_cached(&self) -> Option<Generation> {
        let generation = match self.storage.load(&self.model_id) {
            Ok(generation) => generation,
            Err(e) => {
                log::warn!("Failed to load vector cache: {}, rebuilding", e);
                return None;
            }
        };

        let live = match self.repo.count() {
            Ok(count) => count,
            Err(e) => {
                log::warn!("Failed to count catalog records: {}, rebuilding", e);
                return None;
            }
        };

        if generation.source_count() != live {
            log::info!(
                "Vector cache is stale (catalog: {}, cache: {}), rebuilding",
                live,
                generation.source_count()
            );
            return None;
        }

        log::info!("Loaded {} vectors from cache", generation.len());
        Some(generation)
    }

    fn rebuild(&self) -> Result<BuildOutcome, SemanticSearchError> {
        let _span = tracing::info_span!("vector_build", model = %self.model_name).entered();
        let encoder = self.encoder()?;

        log::info!("Building vector index from catalog");
        let started = Instant::now();

        let movies = self.repo.fetch_all()?;
        let corpus = corpus::build_corpus(&movies);
        if corpus.is_empty() {
            log::warn!(
                "No movie has a usable description ({} records), index not built",
                movies.len()
            );
            return Ok(BuildOutcome::EmptyCorpus);
        }

        log::info!(
            "Encoding {} of {} movies ({} dimensions)",
            corpus.len(),
            movies.len(),
            encoder.dimensions()
        );
        let vectors = encoder.encode(&corpus.sentences)?;
        let generation = Arc::new(Generation::new(
            corpus.ids,
            vectors,
            corpus.metadata,
            movies.len(),
        )?);

        self.publish_arc(generation.clone());
        self.builds.fetch_add(1, Ordering::SeqCst);

        if let Err(e) = self.storage.save(&generation, &self.model_id) {
            log::error!("Failed to persist vector cache: {}", e);
        }

        log::info!(
            "Vector index built: {} entries, {} dimensions in {}ms",
            generation.len(),
            generation.dimensions(),
            started.elapsed().as_millis()
        );

        Ok(BuildOutcome::Built)
    }

    fn publish(&self, generation: Generation) {
        self.publish_arc(Arc::new(generation));
    }

    fn publish_arc(&self, generation: Arc<Generation>) {
        match self.current.write() {
            Ok(mut guard) => *guard = Some(generation),
            Err(poisoned) => *poisoned.into_inner() = Some(generation),
        }
    }
}
