//! Read-only book metadata, loaded once at startup.

use crate::{
    error::{ApiError, Result},
    models::{BookRecord, EmotionScores, ALL},
};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::{
    collections::{BTreeSet, HashMap},
    fs::File,
    path::Path,
};
use tracing::{debug, info};

/// Appended to remote cover URLs so every thumbnail renders at the same size.
pub const COVER_SIZE_HINT: &str = "&fife=w800";

pub const REQUIRED_COLUMNS: [&str; 11] = [
    "isbn13",
    "title",
    "authors",
    "description",
    "simple_categories",
    "joy",
    "surprise",
    "anger",
    "fear",
    "sadness",
    "thumbnail",
];

const AUTHOR_DELIMITER: char = ';';

#[derive(Debug, Deserialize)]
struct BookCsvRecord {
    isbn13: String,
    title: Option<String>,
    authors: Option<String>,
    description: Option<String>,
    simple_categories: Option<String>,
    joy: f32,
    surprise: f32,
    anger: f32,
    fear: f32,
    sadness: f32,
    thumbnail: Option<String>,
}

/// Substitute `fallback` for a missing cover and add the display-size hint
/// to remote URLs.
///
/// Idempotent: feeding the output back in returns it unchanged.
pub fn normalize_cover_image(reference: Option<&str>, fallback: &str) -> String {
    let reference = reference.map(str::trim).filter(|r| !r.is_empty());
    let reference = reference.unwrap_or(fallback);

    let is_remote = reference.starts_with("http://") || reference.starts_with("https://");
    if is_remote && !reference.contains(COVER_SIZE_HINT) {
        format!("{}{}", reference, COVER_SIZE_HINT)
    } else {
        reference.to_string()
    }
}

fn split_authors(authors: &str) -> Vec<String> {
    authors
        .split(AUTHOR_DELIMITER)
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

fn to_book_record(row: usize, record: BookCsvRecord, cover_fallback: &str) -> Result<BookRecord> {
    let isbn13 = record.isbn13.trim().parse::<u64>().map_err(|e| {
        ApiError::LoadError(format!(
            "row {}: invalid isbn13 '{}': {}",
            row, record.isbn13, e
        ))
    })?;

    let emotions = EmotionScores {
        joy: record.joy,
        surprise: record.surprise,
        anger: record.anger,
        fear: record.fear,
        sadness: record.sadness,
    };
    let scores = [
        emotions.joy,
        emotions.surprise,
        emotions.anger,
        emotions.fear,
        emotions.sadness,
    ];
    if scores.iter().any(|s| !s.is_finite() || *s < 0.0) {
        return Err(ApiError::LoadError(format!(
            "row {}: emotion scores must be finite and non-negative",
            row
        )));
    }

    Ok(BookRecord {
        isbn13,
        title: record.title.unwrap_or_default().trim().to_string(),
        authors: record.authors.as_deref().map(split_authors).unwrap_or_default(),
        description: record.description.unwrap_or_default(),
        category: record.simple_categories.unwrap_or_default().trim().to_string(),
        emotions,
        cover_image: normalize_cover_image(record.thumbnail.as_deref(), cover_fallback),
    })
}

#[derive(Debug, Default)]
pub struct BookStore {
    records: Vec<BookRecord>,
    by_isbn: HashMap<u64, usize>,
}

impl BookStore {
    /// Build a store from already-normalized records.
    pub fn from_records(records: Vec<BookRecord>) -> Result<Self> {
        let mut by_isbn = HashMap::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            if by_isbn.insert(record.isbn13, idx).is_some() {
                return Err(ApiError::LoadError(format!(
                    "duplicate isbn13 {}",
                    record.isbn13
                )));
            }
        }

        Ok(Self { records, by_isbn })
    }

    /// Load the metadata CSV at `path`.
    ///
    /// Missing covers are replaced with `cover_fallback`.
    pub fn load(path: &Path, cover_fallback: &str) -> Result<Self> {
        info!("Loading book metadata from {}", path.display());

        let file = File::open(path).map_err(|e| {
            ApiError::LoadError(format!("cannot open {}: {}", path.display(), e))
        })?;
        let mut rdr = ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(file);

        let headers = rdr.headers()?.clone();
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|column| !headers.iter().any(|h| h == *column))
            .collect();
        if !missing.is_empty() {
            return Err(ApiError::LoadError(format!(
                "{} is missing required columns: {}",
                path.display(),
                missing.join(", ")
            )));
        }

        let mut records = Vec::new();
        for (idx, result) in rdr.deserialize::<BookCsvRecord>().enumerate() {
            // Header is line 1.
            let row = idx + 2;
            let raw = result?;
            records.push(to_book_record(row, raw, cover_fallback)?);
        }

        let store = Self::from_records(records)?;
        info!(
            "Loaded {} books across {} categories",
            store.len(),
            store.distinct_categories().len()
        );
        debug!("Categories: {:?}", store.distinct_categories());

        Ok(store)
    }

    pub fn get(&self, isbn13: u64) -> Option<&BookRecord> {
        self.by_isbn.get(&isbn13).map(|&idx| &self.records[idx])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BookRecord> {
        self.records.iter()
    }

    /// Sorted, deduplicated category labels.
    pub fn distinct_categories(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.category.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// `"All"` followed by [`BookStore::distinct_categories`].
    pub fn category_choices(&self) -> Vec<String> {
        std::iter::once(ALL.to_string())
            .chain(self.distinct_categories())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FALLBACK: &str = "assets/cover-not-found.svg";
    const HEADER: &str =
        "isbn13,title,authors,description,simple_categories,joy,surprise,anger,fear,sadness,thumbnail";

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_normalize_missing_cover_uses_fallback() {
        assert_eq!(normalize_cover_image(None, FALLBACK), FALLBACK);
        assert_eq!(normalize_cover_image(Some("  "), FALLBACK), FALLBACK);
    }

    #[test]
    fn test_normalize_remote_cover_gets_size_hint() {
        let url = "http://books.google.com/books/content?id=abc&printsec=frontcover";
        assert_eq!(
            normalize_cover_image(Some(url), FALLBACK),
            format!("{}&fife=w800", url)
        );
        assert_eq!(
            normalize_cover_image(Some("covers/local.jpg"), FALLBACK),
            "covers/local.jpg"
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            None,
            Some("https://example.com/c?id=1"),
            Some("covers/local.jpg"),
            Some(""),
        ];
        for input in inputs {
            for fallback in [FALLBACK, "https://cdn.example.com/missing.jpg?x=1"] {
                let once = normalize_cover_image(input, fallback);
                let twice = normalize_cover_image(Some(once.as_str()), fallback);
                assert_eq!(once, twice, "input {:?}", input);
            }
        }
    }

    #[test]
    fn test_load_parses_rows() {
        let file = write_csv(&format!(
            "{}\n\
             9780002005883,Gilead,Marilynne Robinson,A novel about a pastor.,Fiction,0.1,0.2,0.0,0.3,0.9,http://books.google.com/c?id=1\n\
             9780006178736,Rage of Angels,Sidney Sheldon;Tilly Bagshawe,\"A lawyer, a mob boss.\",Fiction,0.5,0.1,0.7,0.6,0.2,\n\
             9780006280897,The Four Loves,C.S. Lewis,,Nonfiction,0.2,0.0,0.0,0.0,0.1,covers/four.jpg\n",
            HEADER
        ));

        let store = BookStore::load(file.path(), FALLBACK).unwrap();
        assert_eq!(store.len(), 3);

        let gilead = store.get(9780002005883).unwrap();
        assert_eq!(gilead.authors, vec!["Marilynne Robinson"]);
        assert_eq!(gilead.cover_image, "http://books.google.com/c?id=1&fife=w800");
        assert_eq!(gilead.emotions.sadness, 0.9);

        let rage = store.get(9780006178736).unwrap();
        assert_eq!(rage.authors, vec!["Sidney Sheldon", "Tilly Bagshawe"]);
        assert_eq!(rage.description, "A lawyer, a mob boss.");
        assert_eq!(rage.cover_image, FALLBACK);

        let loves = store.get(9780006280897).unwrap();
        assert_eq!(loves.description, "");
        assert_eq!(loves.cover_image, "covers/four.jpg");

        assert_eq!(store.distinct_categories(), vec!["Fiction", "Nonfiction"]);
        assert_eq!(
            store.category_choices(),
            vec!["All", "Fiction", "Nonfiction"]
        );
    }

    #[test]
    fn test_extra_columns_ignored() {
        let file = write_csv(
            "isbn13,isbn10,title,authors,description,simple_categories,joy,surprise,anger,fear,sadness,thumbnail,average_rating\n\
             1,0001,T,A,D,Fiction,0,0,0,0,0,,4.5\n",
        );
        let store = BookStore::load(file.path(), FALLBACK).unwrap();
        assert_eq!(store.get(1).unwrap().title, "T");
    }

    #[test]
    fn test_missing_column_is_load_error() {
        let file = write_csv(
            "isbn13,title,authors,description,simple_categories,joy,surprise,anger,fear,thumbnail\n\
             1,T,A,D,Fiction,0,0,0,0,\n",
        );
        match BookStore::load(file.path(), FALLBACK) {
            Err(ApiError::LoadError(msg)) => assert!(msg.contains("sadness")),
            other => panic!("expected LoadError, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let result = BookStore::load(Path::new("/nonexistent/books.csv"), FALLBACK);
        assert!(matches!(result, Err(ApiError::LoadError(_))));
    }

    #[test]
    fn test_malformed_rows_are_load_errors() {
        let bad_isbn = write_csv(&format!("{}\nnot-a-number,T,A,D,F,0,0,0,0,0,\n", HEADER));
        assert!(matches!(
            BookStore::load(bad_isbn.path(), FALLBACK),
            Err(ApiError::LoadError(_))
        ));

        let bad_score = write_csv(&format!("{}\n1,T,A,D,F,high,0,0,0,0,\n", HEADER));
        assert!(matches!(
            BookStore::load(bad_score.path(), FALLBACK),
            Err(ApiError::LoadError(_))
        ));

        let negative = write_csv(&format!("{}\n1,T,A,D,F,-0.5,0,0,0,0,\n", HEADER));
        assert!(matches!(
            BookStore::load(negative.path(), FALLBACK),
            Err(ApiError::LoadError(_))
        ));
    }

    #[test]
    fn test_duplicate_isbn_is_load_error() {
        let file = write_csv(&format!(
            "{}\n1,T,A,D,F,0,0,0,0,0,\n1,U,B,E,F,0,0,0,0,0,\n",
            HEADER
        ));
        assert!(matches!(
            BookStore::load(file.path(), FALLBACK),
            Err(ApiError::LoadError(_))
        ));
    }
}
