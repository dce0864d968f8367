use serde::{Deserialize, Serialize};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Instant,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: u64,

    pub url: String,
    pub image: String,
    pub title: String,
    pub rating: Option<f32>,
    pub votes: Option<u64>,
    pub description: String,

    // `None` when the column is missing from the source row,
    // `Some("")` when it is present but blank.
    pub year: Option<String>,
    pub country: Option<String>,
    pub genre: Option<String>,
    pub director: Option<String>,
    pub cast: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed record at line {line}: {reason}")]
    Malformed { line: u64, reason: String },
}

/// Read-only access to the movie catalog.
pub trait MovieRepository: Send + Sync {
    /// Every record, in storage order.
    fn fetch_all(&self) -> Result<Vec<Movie>, RepositoryError>;

    /// Number of records currently stored.
    fn count(&self) -> Result<usize, RepositoryError>;
}

pub const CSV_HEADERS: [&str; 12] = [
    "id",
    "url",
    "image",
    "title",
    "rating",
    "votes",
    "description",
    "year",
    "country",
    "genre",
    "director",
    "cast",
];

const REQUIRED_COLUMNS: usize = 7;

/// CSV-backed catalog. The file is re-read on every call so counts always
/// reflect what is on disk right now.
#[derive(Debug, Clone)]
pub struct BackendCsv {
    path: PathBuf,
}

impl BackendCsv {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn reader(&self) -> Result<Option<csv::Reader<std::fs::File>>, RepositoryError> {
        match csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_path(&self.path)
        {
            Ok(reader) => Ok(Some(reader)),
            Err(err) => match err.kind() {
                csv::ErrorKind::Io(io) if io.kind() == ErrorKind::NotFound => {
                    log::warn!("catalog {} does not exist, treating as empty", self.path.display());
                    Ok(None)
                }
                _ => Err(err.into()),
            },
        }
    }

    fn parse_record(record: &csv::StringRecord) -> Result<Movie, RepositoryError> {
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        if record.len() < REQUIRED_COLUMNS {
            return Err(RepositoryError::Malformed {
                line,
                reason: format!(
                    "expected at least {REQUIRED_COLUMNS} columns, got {} (missing '{}')",
                    record.len(),
                    CSV_HEADERS[record.len()]
                ),
            });
        }

        let field = |idx: usize| record.get(idx).unwrap_or_default().to_string();
        let optional = |idx: usize| record.get(idx).map(|value| value.trim().to_string());

        let id = field(0)
            .trim()
            .parse::<u64>()
            .map_err(|err| RepositoryError::Malformed {
                line,
                reason: format!("invalid id: {err}"),
            })?;

        Ok(Movie {
            id,
            url: field(1),
            image: field(2),
            title: field(3),
            rating: field(4).trim().parse::<f32>().ok(),
            votes: field(5).trim().parse::<u64>().ok(),
            description: field(6),
            year: optional(7),
            country: optional(8),
            genre: optional(9),
            director: optional(10),
            cast: optional(11),
        })
    }
}

impl MovieRepository for BackendCsv {
    fn fetch_all(&self) -> Result<Vec<Movie>, RepositoryError> {
        let Some(mut reader) = self.reader()? else {
            return Ok(vec![]);
        };

        let now = Instant::now();
        let mut movies = vec![];
        for record in reader.records() {
            movies.push(Self::parse_record(&record?)?);
        }

        log::debug!(
            "took {}ms to read {} movies",
            now.elapsed().as_micros() as f64 / 1000.0,
            movies.len()
        );

        Ok(movies)
    }

    fn count(&self) -> Result<usize, RepositoryError> {
        let Some(mut reader) = self.reader()? else {
            return Ok(0);
        };

        let mut count = 0;
        let mut record = csv::StringRecord::new();
        while reader.read_record(&mut record)? {
            count += 1;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_catalog(dir: &Path, rows: &[&str]) -> PathBuf {
        let path = dir.join("movies.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{}", CSV_HEADERS.join(",")).unwrap();
        for row in rows {
            writeln!(file, "{row}").unwrap();
        }
        path
    }

    #[test]
    fn test_fetch_all_full_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_catalog(
            tmp.path(),
            &[
                "1,https://m/1,img1.jpg,Spirited Away,9.4,1200,A girl wanders into a spirit world.,2001,Japan,Animation,Hayao Miyazaki,Rumi Hiiragi",
                "2,https://m/2,img2.jpg,Heat,8.7,800,Cops and robbers.,1995,USA,Crime,Michael Mann,Al Pacino",
            ],
        );

        let repo = BackendCsv::new(&path);
        let movies = repo.fetch_all().unwrap();
        assert_eq!(movies.len(), 2);
        assert_eq!(repo.count().unwrap(), 2);

        let first = &movies[0];
        assert_eq!(first.id, 1);
        assert_eq!(first.title, "Spirited Away");
        assert_eq!(first.rating, Some(9.4));
        assert_eq!(first.votes, Some(1200));
        assert_eq!(first.year.as_deref(), Some("2001"));
        assert_eq!(first.cast.as_deref(), Some("Rumi Hiiragi"));
    }

    #[test]
    fn test_short_rows_leave_attributes_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_catalog(
            tmp.path(),
            &["7,https://m/7,,Untitled,,,Some long enough description,1999"],
        );

        let movies = BackendCsv::new(&path).fetch_all().unwrap();
        assert_eq!(movies[0].rating, None);
        assert_eq!(movies[0].year.as_deref(), Some("1999"));
        assert_eq!(movies[0].country, None);
        assert_eq!(movies[0].cast, None);
    }

    #[test]
    fn test_row_without_description_is_malformed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_catalog(tmp.path(), &["3,https://m/3,img,Title"]);

        match BackendCsv::new(&path).fetch_all() {
            Err(RepositoryError::Malformed { reason, .. }) => assert!(reason.contains("'rating'")),
            other => panic!("expected malformed row, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_id_is_malformed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_catalog(tmp.path(), &["abc,u,i,t,1,1,description here"]);

        let result = BackendCsv::new(&path).fetch_all();
        assert!(matches!(result, Err(RepositoryError::Malformed { .. })));
    }

    #[test]
    fn test_missing_catalog_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = BackendCsv::new(tmp.path().join("nope.csv"));
        assert!(repo.fetch_all().unwrap().is_empty());
        assert_eq!(repo.count().unwrap(), 0);
    }
}
