//! In-memory vector index with cosine similarity ranking.
//!
//! A `Generation` is the immutable product of one build: a row-major matrix
//! of unit vectors, the movie id of every row, and the display metadata of
//! every row. Row `i` of each of the three always describes the same movie.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::movies::Movie;

/// Display fields needed to render a result without going back to the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieMeta {
    pub title: String,
    pub rating: Option<f32>,
    pub image: String,
    pub url: String,
    pub description: String,
    pub year: Option<String>,
    pub country: Option<String>,
    pub genre: Option<String>,
    pub director: Option<String>,
    pub cast: Option<String>,
}

impl From<&Movie> for MovieMeta {
    fn from(movie: &Movie) -> Self {
        Self {
            title: movie.title.clone(),
            rating: movie.rating,
            image: movie.image.clone(),
            url: movie.url.clone(),
            description: movie.description.clone(),
            year: movie.year.clone(),
            country: movie.country.clone(),
            genre: movie.genre.clone(),
            director: movie.director.clone(),
            cast: movie.cast.clone(),
        }
    }
}

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Misaligned generation: {ids} ids, {rows} vectors, {metadata} metadata entries")]
    Misaligned {
        ids: usize,
        rows: usize,
        metadata: usize,
    },

    #[error("Duplicate movie id {0}")]
    DuplicateId(u64),

    #[error("Generation must have at least one dimension")]
    ZeroDimensions,
}

/// One complete, internally consistent index.
#[derive(Debug, Clone)]
pub struct Generation {
    dimensions: usize,
    /// Row-major, `ids.len() * dimensions` values
    matrix: Vec<f32>,
    ids: Vec<u64>,
    metadata: Vec<MovieMeta>,
    /// Movie id -> row
    rows: HashMap<u64, usize>,
    /// Catalog size at build time (including non-indexable movies)
    source_count: usize,
}

impl Generation {
    /// Assemble a generation from per-row vectors, validating alignment.
    pub fn new(
        ids: Vec<u64>,
        vectors: Vec<Vec<f32>>,
        metadata: Vec<MovieMeta>,
        source_count: usize,
    ) -> Result<Self, IndexError> {
        let dimensions = vectors.first().map(|v| v.len()).unwrap_or_default();
        let mut matrix = Vec::with_capacity(vectors.len() * dimensions);
        for vector in &vectors {
            if vector.len() != dimensions {
                return Err(IndexError::DimensionMismatch {
                    expected: dimensions,
                    got: vector.len(),
                });
            }
            matrix.extend_from_slice(vector);
        }

        Self::from_matrix(dimensions, matrix, ids, metadata, source_count)
    }

    /// Assemble a generation from a flat row-major matrix.
    pub fn from_matrix(
        dimensions: usize,
        matrix: Vec<f32>,
        ids: Vec<u64>,
        metadata: Vec<MovieMeta>,
        source_count: usize,
    ) -> Result<Self, IndexError> {
        if dimensions == 0 {
            return Err(IndexError::ZeroDimensions);
        }

        let row_count = matrix.len() / dimensions;
        if matrix.len() % dimensions != 0 || row_count != ids.len() || ids.len() != metadata.len()
        {
            return Err(IndexError::Misaligned {
                ids: ids.len(),
                rows: row_count,
                metadata: metadata.len(),
            });
        }

        let mut rows = HashMap::with_capacity(ids.len());
        for (row, id) in ids.iter().enumerate() {
            if rows.insert(*id, row).is_some() {
                return Err(IndexError::DuplicateId(*id));
            }
        }

        Ok(Self {
            dimensions,
            matrix,
            ids,
            metadata,
            rows,
            source_count,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn source_count(&self) -> usize {
        self.source_count
    }

    pub fn ids(&self) -> &[u64] {
        &self.ids
    }

    pub fn metadata(&self) -> &[MovieMeta] {
        &self.metadata
    }

    pub fn matrix(&self) -> &[f32] {
        &self.matrix
    }

    pub fn row_of(&self, id: u64) -> Option<usize> {
        self.rows.get(&id).copied()
    }

    pub fn row(&self, row: usize) -> &[f32] {
        &self.matrix[row * self.dimensions..(row + 1) * self.dimensions]
    }

    /// Id and metadata stored at `row`.
    pub fn entry(&self, row: usize) -> (u64, &MovieMeta) {
        (self.ids[row], &self.metadata[row])
    }

    /// Dot product of `query` with every row. Rows and query are unit length,
    /// so this is the cosine similarity.
    pub fn similarities(&self, query: &[f32]) -> Result<Vec<f32>, IndexError> {
        if query.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: query.len(),
            });
        }

        Ok(self
            .matrix
            .par_chunks(self.dimensions)
            .map(|row| dot(query, row))
            .collect())
    }
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Row indices ordered by score, highest first. NaN ranks last.
pub fn rank_descending(scores: &[f32]) -> Vec<usize> {
    let key = |row: usize| {
        let score = scores[row];
        if score.is_nan() {
            f32::NEG_INFINITY
        } else {
            score
        }
    };

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| key(b).total_cmp(&key(a)));
    order
}
