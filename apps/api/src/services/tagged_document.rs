//! Text payloads stored in the vector index.
//!
//! Each payload is the book's ISBN-13 followed by its description:
//! `"9780002005883 A novel about ..."`. The recommendation join recovers the
//! identifier from the first whitespace-delimited token, so encoding and
//! decoding must stay in lockstep.

use crate::error::{ApiError, Result};
use std::{fmt, fs, path::Path};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedDocument {
    pub isbn13: u64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    Empty,
    InvalidIdentifier(String),
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadError::Empty => f.write_str("empty index payload"),
            PayloadError::InvalidIdentifier(token) => {
                write!(f, "index payload starts with '{}', not an isbn13", token)
            }
        }
    }
}

impl std::error::Error for PayloadError {}

impl TaggedDocument {
    pub fn new(isbn13: u64, text: impl Into<String>) -> Self {
        Self {
            isbn13,
            text: text.into(),
        }
    }

    /// `"<isbn13> <text>"`
    pub fn encode(&self) -> String {
        if self.text.is_empty() {
            self.isbn13.to_string()
        } else {
            format!("{} {}", self.isbn13, self.text)
        }
    }

    /// Parse a payload produced by [`TaggedDocument::encode`].
    ///
    /// Surrounding whitespace and double quotes are stripped first; some
    /// exports wrap every line in quotes.
    pub fn decode(payload: &str) -> std::result::Result<Self, PayloadError> {
        let payload = payload.trim().trim_matches('"').trim();
        let mut parts = payload.splitn(2, char::is_whitespace);

        let token = parts
            .next()
            .filter(|t| !t.is_empty())
            .ok_or(PayloadError::Empty)?;
        let isbn13 = token
            .parse::<u64>()
            .map_err(|_| PayloadError::InvalidIdentifier(token.to_string()))?;
        let text = parts.next().unwrap_or_default().trim().to_string();

        Ok(Self { isbn13, text })
    }
}

/// Read the tagged description corpus: one payload per line, blank lines skipped.
pub fn load_corpus(path: &Path) -> Result<Vec<TaggedDocument>> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ApiError::LoadError(format!("cannot read {}: {}", path.display(), e)))?;

    let documents = contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            TaggedDocument::decode(line).map_err(|e| {
                ApiError::LoadError(format!("{} line {}: {}", path.display(), idx + 1, e))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    info!(
        "Loaded {} tagged descriptions from {}",
        documents.len(),
        path.display()
    );
    Ok(documents)
}
