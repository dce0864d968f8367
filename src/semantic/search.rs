//! Query engine: free-text search and similar-movie lookup.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::semantic::controller::{IndexController, SemanticSearchError};
use crate::semantic::corpus::truncate_description;
use crate::semantic::embeddings::query_instruction;
use crate::semantic::filter::SearchFilters;
use crate::semantic::index::{rank_descending, Generation, MovieMeta};

/// Description length shown in free-text search results
const SEARCH_DESCRIPTION_CHARS: usize = 100;
/// Description length shown in similar-movie results
const SIMILAR_DESCRIPTION_CHARS: usize = 60;

/// A ranked movie returned to the serving layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: u64,
    pub title: String,
    pub rating: Option<f32>,
    pub image: String,
    pub description: String,
    pub url: String,
    pub year: Option<String>,
    /// Raw cosine similarity for `search`, 0-100 score for `search_by_id`
    pub similarity: f32,
}

impl SearchHit {
    fn new(id: u64, meta: &MovieMeta, description_chars: usize, similarity: f32) -> Self {
        Self {
            id,
            title: meta.title.clone(),
            rating: meta.rating,
            image: meta.image.clone(),
            description: truncate_description(&meta.description, description_chars),
            url: meta.url.clone(),
            year: meta.year.clone(),
            similarity,
        }
    }
}

/// Cosine 0..1 as a 0..100 score with one decimal.
pub fn percent_score(similarity: f32) -> f32 {
    (similarity * 1000.0).round() / 10.0
}

/// Entry point for queries. Builds the index on demand.
pub struct SemanticSearchService {
    controller: Arc<IndexController>,
}

impl SemanticSearchService {
    pub fn new(controller: Arc<IndexController>) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &Arc<IndexController> {
        &self.controller
    }

    pub fn ensure_ready(&self, force_refresh: bool) -> Result<(), SemanticSearchError> {
        self.controller.ensure_ready(force_refresh).map(|_| ())
    }

    /// Movies most similar to `query`, after attribute filtering.
    ///
    /// Returns an empty list when there is nothing indexed.
    pub fn search(
        &self,
        query: &str,
        top_k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchHit>, SemanticSearchError> {
        self.controller.ensure_ready(false)?;

        let Some(generation) = self.controller.snapshot() else {
            return Ok(vec![]);
        };
        if generation.is_empty() || top_k == 0 {
            return Ok(vec![]);
        }

        let encoder = self.controller.encoder()?;
        let text = match query_instruction(encoder.name()) {
            Some(instruction) => format!("{instruction}{query}"),
            None => query.to_string(),
        };

        let query_vec = encoder
            .encode(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| SemanticSearchError::Internal("encoder returned no vector".to_string()))?;

        let scores = generation.similarities(&query_vec)?;
        Ok(collect_filtered(&generation, &scores, top_k, filters))
    }

    /// Movies most similar to the indexed movie `id`, excluding itself.
    ///
    /// Returns an empty list when `id` is not indexed.
    pub fn search_by_id(&self, id: u64, top_k: usize) -> Result<Vec<SearchHit>, SemanticSearchError> {
        self.controller.ensure_ready(false)?;

        let Some(generation) = self.controller.snapshot() else {
            return Ok(vec![]);
        };
        let Some(row) = generation.row_of(id) else {
            return Ok(vec![]);
        };

        let scores = generation.similarities(generation.row(row))?;
        Ok(collect_neighbours(&generation, &scores, row, top_k))
    }
}

fn collect_filtered(
    generation: &Generation,
    scores: &[f32],
    top_k: usize,
    filters: &SearchFilters,
) -> Vec<SearchHit> {
    let mut hits = Vec::with_capacity(top_k.min(generation.len()));
    for row in rank_descending(scores) {
        if hits.len() >= top_k {
            break;
        }

        let (id, meta) = generation.entry(row);
        if !filters.is_empty() && !filters.accepts(meta) {
            continue;
        }

        hits.push(SearchHit::new(id, meta, SEARCH_DESCRIPTION_CHARS, scores[row]));
    }
    hits
}

fn collect_neighbours(generation: &Generation, scores: &[f32], own_row: usize, top_k: usize) -> Vec<SearchHit> {
    rank_descending(scores)
        .into_iter()
        .filter(|&row| row != own_row)
        .take(top_k)
        .map(|row| {
            let (id, meta) = generation.entry(row);
            SearchHit::new(id, meta, SIMILAR_DESCRIPTION_CHARS, percent_score(scores[row]))
        })
        .collect()
}
