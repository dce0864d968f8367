//! Test doubles: a deterministic bag-of-words encoder and an in-memory catalog.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::movies::{Movie, MovieRepository, RepositoryError};
use crate::semantic::embeddings::{normalize, EmbeddingError, Encoder, EncoderLoader};

pub const TEST_MODEL: &str = "hash-test-encoder";
const TEST_DIMENSIONS: usize = 64;

pub fn movie(id: u64, description: &str, year: &str) -> Movie {
    Movie {
        id,
        url: format!("https://movies.example/{id}"),
        image: format!("{id}.jpg"),
        title: format!("Movie {id}"),
        rating: Some(7.5),
        votes: Some(100),
        description: description.to_string(),
        year: Some(year.to_string()),
        country: Some(String::new()),
        genre: Some(String::new()),
        director: Some(String::new()),
        cast: Some(String::new()),
    }
}

/// Hashes lowercase words into buckets; texts sharing words score higher.
pub struct HashEncoder {
    name: String,
    fail_encodes: Arc<AtomicBool>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl HashEncoder {
    fn embed_one(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; TEST_DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            v[(hasher.finish() % TEST_DIMENSIONS as u64) as usize] += 1.0;
        }
        if v.iter().all(|x| *x == 0.0) {
            v[0] = 1.0;
        }
        normalize(&mut v);
        v
    }
}

impl Encoder for HashEncoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> usize {
        TEST_DIMENSIONS
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if self.fail_encodes.load(Ordering::SeqCst) {
            return Err(EmbeddingError::EmbeddingFailed("injected failure".to_string()));
        }
        self.seen.lock().unwrap().extend(texts.iter().cloned());
        Ok(texts.iter().map(|t| Self::embed_one(t)).collect())
    }
}

/// Hands out `HashEncoder`s and counts how often it was asked to.
#[derive(Clone)]
pub struct CountingLoader {
    name: String,
    loads: Arc<AtomicUsize>,
    fail_loads: Arc<AtomicBool>,
    fail_encodes: Arc<AtomicBool>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl CountingLoader {
    pub fn new() -> Self {
        Self::named(TEST_MODEL)
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            loads: Arc::new(AtomicUsize::new(0)),
            fail_loads: Arc::new(AtomicBool::new(false)),
            fail_encodes: Arc::new(AtomicBool::new(false)),
            seen: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_encodes(&self, fail: bool) {
        self.fail_encodes.store(fail, Ordering::SeqCst);
    }

    /// Every text passed to `encode` so far.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    pub fn loader(&self) -> EncoderLoader {
        let this = self.clone();
        Box::new(move || {
            if this.fail_loads.load(Ordering::SeqCst) {
                return Err(EmbeddingError::InitFailed("injected failure".to_string()));
            }
            this.loads.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(HashEncoder {
                name: this.name.clone(),
                fail_encodes: this.fail_encodes.clone(),
                seen: this.seen.clone(),
            }) as Arc<dyn Encoder>)
        })
    }
}

/// Catalog held in memory, with fetch counting and failure injection.
pub struct MemoryRepository {
    movies: RwLock<Vec<Movie>>,
    fetches: AtomicUsize,
    fail: AtomicBool,
}

impl MemoryRepository {
    pub fn new(movies: Vec<Movie>) -> Arc<Self> {
        Arc::new(Self {
            movies: RwLock::new(movies),
            fetches: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        })
    }

    pub fn push(&self, movie: Movie) {
        self.movies.write().unwrap().push(movie);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl MovieRepository for MemoryRepository {
    fn fetch_all(&self) -> Result<Vec<Movie>, RepositoryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RepositoryError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected failure",
            )));
        }
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.movies.read().unwrap().clone())
    }

    fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.movies.read().unwrap().len())
    }
}
