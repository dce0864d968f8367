//! Embedding model wrapper for fastembed.
//!
//! Provides a high-level interface for generating embeddings:
//! - The `Encoder` seam the index builder and query engine talk to
//! - Model download with configurable cache directory and timeout
//! - Batch embedding generation with explicit L2 normalization

use fastembed::{InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

/// Default download timeout for model files (5 minutes)
const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Retrieval instruction recommended for English BGE models.
const BGE_EN_QUERY_INSTRUCTION: &str = "Represent this sentence for searching relevant passages: ";

/// Retrieval instruction recommended for Chinese BGE models.
const BGE_ZH_QUERY_INSTRUCTION: &str = "为这个句子生成表示以用于检索相关文章：";

/// Error type for embedding operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Model initialization failed: {0}")]
    InitFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Invalid model name: {0}")]
    InvalidModel(String),
}

/// A text encoder producing unit-length vectors of a fixed dimension.
pub trait Encoder: Send + Sync {
    fn name(&self) -> &str;

    fn dimensions(&self) -> usize;

    /// Encode every text; output rows are L2-normalized and in input order.
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// One-shot constructor for the encoder. Called at most once per successful load.
pub type EncoderLoader = Box<dyn Fn() -> Result<Arc<dyn Encoder>, EmbeddingError> + Send + Sync>;

/// Instruction prefix prepended to search queries for model families trained
/// with one. Documents are encoded without it.
pub fn query_instruction(model_name: &str) -> Option<&'static str> {
    let name = model_name.to_lowercase();
    if !name.contains("bge") {
        return None;
    }
    if name.contains("zh") {
        Some(BGE_ZH_QUERY_INSTRUCTION)
    } else {
        Some(BGE_EN_QUERY_INSTRUCTION)
    }
}

/// Run `init` on its own thread and give up waiting after `timeout`.
///
/// A timed-out thread is detached and left to finish in the background.
fn run_with_timeout<T, F>(timeout: Duration, init: F) -> Result<T, EmbeddingError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, EmbeddingError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("embedding-init".to_string())
        .spawn(move || {
            let _ = tx.send(init());
        })
        .map_err(|e| EmbeddingError::InitFailed(format!("Failed to spawn loader thread: {}", e)))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(EmbeddingError::InitFailed(format!(
            "model was not ready after {}s",
            timeout.as_secs()
        ))),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(EmbeddingError::InitFailed(
            "loader thread exited without a result".to_string(),
        )),
    }
}

/// Scale `v` to unit length in place. Zero vectors are left untouched.
pub fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Wrapper around fastembed's TextEmbedding model.
/// Uses a Mutex because fastembed's embed() requires &mut self.
pub struct EmbeddingModel {
    model: Mutex<TextEmbedding>,
    model_name: String,
    dimensions: usize,
}

impl EmbeddingModel {
    /// Create a new embedding model with the given name.
    ///
    /// The model will be downloaded on first use if not cached.
    /// Models are cached in the `models/` subdirectory of `cache_dir`.
    pub fn new(
        model_name: &str,
        cache_dir: PathBuf,
        download_timeout: Option<Duration>,
    ) -> Result<Self, EmbeddingError> {
        let model_enum = Self::parse_model_name(model_name)?;
        let timeout = download_timeout.unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT);

        let models_dir = cache_dir.join("models");
        std::fs::create_dir_all(&models_dir).map_err(|e| {
            EmbeddingError::InitFailed(format!("Failed to create models directory: {}", e))
        })?;

        log::info!(
            "Loading embedding model '{}' (download timeout {}s)",
            model_name,
            timeout.as_secs()
        );

        let options = InitOptions::new(model_enum)
            .with_cache_dir(models_dir)
            .with_show_download_progress(true);

        let (model, dimensions) = run_with_timeout(timeout, move || {
            let mut model = TextEmbedding::try_new(options)
                .map_err(|e| EmbeddingError::InitFailed(e.to_string()))?;
            let dimensions = Self::probe_dimensions(&mut model)?;
            Ok((model, dimensions))
        })?;
        log::info!("Model '{}' loaded, {} dimensions", model_name, dimensions);

        Ok(Self {
            model: Mutex::new(model),
            model_name: model_name.to_string(),
            dimensions,
        })
    }

    /// Loader that defers `EmbeddingModel::new` until the first build or query.
    pub fn loader(model_name: String, cache_dir: PathBuf, download_timeout: Duration) -> EncoderLoader {
        Box::new(move || {
            let model = EmbeddingModel::new(&model_name, cache_dir.clone(), Some(download_timeout))?;
            Ok(Arc::new(model) as Arc<dyn Encoder>)
        })
    }

    /// Parse model name string to fastembed enum.
    fn parse_model_name(name: &str) -> Result<fastembed::EmbeddingModel, EmbeddingError> {
        match name.to_lowercase().as_str() {
            "all-minilm-l6-v2" | "allminiml6v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
            "bge-small-en-v1.5" | "bgesmallenv15" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
            "bge-base-en-v1.5" | "bgebaseenv15" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
            "bge-large-en-v1.5" | "bgelargeenv15" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
            "bge-small-zh-v1.5" | "bgesmallzhv15" => Ok(fastembed::EmbeddingModel::BGESmallZHV15),
            "multilingual-e5-small" | "multilinguale5small" => {
                Ok(fastembed::EmbeddingModel::MultilingualE5Small)
            }
            _ => Err(EmbeddingError::InvalidModel(format!(
                "Unknown model: {}. Supported models: all-MiniLM-L6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, bge-small-zh-v1.5, multilingual-e5-small",
                name
            ))),
        }
    }

    /// Probe the model to determine embedding dimensions.
    fn probe_dimensions(model: &mut TextEmbedding) -> Result<usize, EmbeddingError> {
        let test_embeddings = model
            .embed(vec!["test"], None)
            .map_err(|e| EmbeddingError::InitFailed(format!("Failed to probe dimensions: {}", e)))?;

        test_embeddings
            .first()
            .map(|v| v.len())
            .ok_or_else(|| EmbeddingError::InitFailed("Model returned no embedding".to_string()))
    }
}

impl Encoder for EmbeddingModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut model = self.model.lock().map_err(|e| {
            EmbeddingError::EmbeddingFailed(format!("Failed to acquire model lock: {}", e))
        })?;

        let mut embeddings = model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;

        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::EmbeddingFailed(format!(
                "expected {} embeddings, model returned {}",
                texts.len(),
                embeddings.len()
            )));
        }

        embeddings.iter_mut().for_each(|v| normalize(v));
        Ok(embeddings)
    }
}
