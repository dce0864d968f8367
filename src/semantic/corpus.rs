//! Turns catalog records into embedding input.
//!
//! Each indexable movie becomes one natural-language sentence. Prose such as
//! "directed by X" embeds the relationship between a film and its people
//! better than a `key: value` listing does.

use crate::movies::Movie;
use crate::semantic::index::MovieMeta;

/// Descriptions at or below this many characters (after trimming) are skipped.
pub const MIN_DESCRIPTION_CHARS: usize = 5;

/// Ellipsis suffix appended to truncated descriptions
const TRUNCATION_SUFFIX: &str = "...";

/// Parallel arrays produced from the indexable part of a catalog.
#[derive(Debug, Default)]
pub struct Corpus {
    pub ids: Vec<u64>,
    pub sentences: Vec<String>,
    pub metadata: Vec<MovieMeta>,
}

impl Corpus {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

pub fn is_indexable(movie: &Movie) -> bool {
    movie.description.trim().chars().count() > MIN_DESCRIPTION_CHARS
}

/// Render a movie as a single sentence. Blank attributes are left out.
pub fn render(movie: &Movie) -> String {
    fn present(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    let mut text = format!("Title: «{}»", movie.title.trim());
    if let Some(year) = present(&movie.year) {
        text.push_str(&format!(", released in {year}"));
    }
    if let Some(country) = present(&movie.country) {
        text.push_str(&format!(", produced in {country}"));
    }
    if let Some(genre) = present(&movie.genre) {
        text.push_str(&format!(", genre {genre}"));
    }
    if let Some(director) = present(&movie.director) {
        text.push_str(&format!(". Directed by {director}"));
    }
    if let Some(cast) = present(&movie.cast) {
        text.push_str(&format!(", starring {cast}"));
    }
    text.push_str(&format!(". Plot: {}", movie.description.trim()));
    text
}

/// Keep indexable movies and render them, preserving catalog order.
pub fn build_corpus(movies: &[Movie]) -> Corpus {
    let mut corpus = Corpus::default();
    for movie in movies.iter().filter(|m| is_indexable(m)) {
        corpus.ids.push(movie.id);
        corpus.sentences.push(render(movie));
        corpus.metadata.push(MovieMeta::from(movie));
    }
    corpus
}

/// First `max_chars` characters followed by an ellipsis.
pub fn truncate_description(description: &str, max_chars: usize) -> String {
    let truncated: String = description.chars().take(max_chars).collect();
    format!("{}{}", truncated, TRUNCATION_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: u64, description: &str) -> Movie {
        Movie {
            id,
            title: format!("Movie {id}"),
            description: description.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_indexable_threshold() {
        assert!(!is_indexable(&movie(1, "")));
        assert!(!is_indexable(&movie(1, "  short  ")));
        assert!(!is_indexable(&movie(1, "12345")));
        assert!(is_indexable(&movie(1, "123456")));
        assert!(is_indexable(&movie(1, "Hello world")));
    }

    #[test]
    fn test_indexable_counts_characters_not_bytes() {
        // 3 characters, 9 bytes
        assert!(!is_indexable(&movie(1, "千与千")));
        assert!(is_indexable(&movie(1, "千与千寻的神隐")));
    }

    #[test]
    fn test_render_full_record() {
        let m = Movie {
            id: 1,
            title: "Heat".to_string(),
            description: "A cop hunts a crew of thieves.".to_string(),
            year: Some("1995".to_string()),
            country: Some("USA".to_string()),
            genre: Some("Crime".to_string()),
            director: Some("Michael Mann".to_string()),
            cast: Some("Al Pacino, Robert De Niro".to_string()),
            ..Default::default()
        };

        assert_eq!(
            render(&m),
            "Title: «Heat», released in 1995, produced in USA, genre Crime. \
             Directed by Michael Mann, starring Al Pacino, Robert De Niro. \
             Plot: A cop hunts a crew of thieves."
        );
    }

    #[test]
    fn test_render_omits_missing_and_blank_fields() {
        let m = Movie {
            id: 2,
            title: "Untitled".to_string(),
            description: "Something happens.".to_string(),
            year: Some("".to_string()),
            director: Some("Jane Doe".to_string()),
            ..Default::default()
        };

        assert_eq!(
            render(&m),
            "Title: «Untitled». Directed by Jane Doe. Plot: Something happens."
        );
    }

    #[test]
    fn test_build_corpus_is_aligned_and_filtered() {
        let movies = vec![
            movie(10, "A great story about friendship."),
            movie(11, "tiny"),
            movie(12, "A war film set in 1944."),
        ];

        let corpus = build_corpus(&movies);
        assert_eq!(corpus.ids, vec![10, 12]);
        assert_eq!(corpus.sentences.len(), 2);
        assert_eq!(corpus.metadata.len(), 2);
        assert_eq!(corpus.metadata[1].title, "Movie 12");
        assert!(corpus.sentences[0].contains("friendship"));
    }

    #[test]
    fn test_truncate_description() {
        assert_eq!(truncate_description("abcdef", 3), "abc...");
        assert_eq!(truncate_description("ab", 3), "ab...");
        assert_eq!(truncate_description("千与千寻", 2), "千与...");
    }
}
