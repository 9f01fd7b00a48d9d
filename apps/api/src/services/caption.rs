//! Gallery captions: `"{title} by {authors}: {first 30 words}..."`.

use crate::models::{BookRecord, Recommendation};

pub const DESCRIPTION_WORD_LIMIT: usize = 30;
pub const ELLIPSIS: &str = "...";

/// First [`DESCRIPTION_WORD_LIMIT`] whitespace-delimited words, joined by a
/// single space, followed by `"..."`.
///
/// The ellipsis is appended even when nothing was cut.
pub fn truncate_description(description: &str) -> String {
    let words: Vec<&str> = description
        .split_whitespace()
        .take(DESCRIPTION_WORD_LIMIT)
        .collect();
    format!("{}{}", words.join(" "), ELLIPSIS)
}

/// `"A"`, `"A and B"`, or `"A, B, and C"`.
pub fn format_authors(authors: &[String]) -> String {
    match authors {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{} and {}", first, second),
        [init @ .., last] => format!("{}, and {}", init.join(", "), last),
    }
}

pub fn caption(book: &BookRecord) -> String {
    format!(
        "{} by {}: {}",
        book.title,
        format_authors(&book.authors),
        truncate_description(&book.description)
    )
}

pub fn to_recommendation(book: &BookRecord) -> Recommendation {
    Recommendation {
        image: book.cover_image.clone(),
        caption: caption(book),
    }
}
