//! Field extractors. Every extractor takes normalized (lower-cased) segment
//! text plus its compiled patterns and answers with `Option`s; none of them
//! can fail once the patterns compiled.

pub mod area;
pub mod numeric;
pub mod price;
pub mod rooms;
pub mod transaction;

pub use area::{AreaExtraction, AreaPatterns};
pub use price::{PriceExtraction, PricePatterns};
pub use rooms::{RoomExtraction, RoomPatterns};
pub use transaction::TransactionMatcher;

use crate::error::ConfigError;

pub(crate) fn compile_pattern(src: &str) -> Result<regex::Regex, ConfigError> {
    regex::Regex::new(src).map_err(|source| ConfigError::InvalidPattern {
        pattern: src.to_string(),
        source,
    })
}

pub(crate) fn char_before(text: &str, idx: usize) -> Option<char> {
    text[..idx].chars().next_back()
}

pub(crate) fn char_after(text: &str, idx: usize) -> Option<char> {
    text[idx..].chars().next()
}

/// The last `n` characters of `text[..end]`.
pub(crate) fn window_before(text: &str, end: usize, n: usize) -> &str {
    let head = &text[..end];
    let start = head
        .char_indices()
        .rev()
        .nth(n.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    &head[start..]
}

/// The first `n` characters of `text[start..]`.
pub(crate) fn window_after(text: &str, start: usize, n: usize) -> &str {
    let tail = &text[start..];
    let end = tail.char_indices().nth(n).map(|(i, _)| i).unwrap_or(tail.len());
    &tail[..end]
}

/// Build a regex alternation from configured phrases: lower-cased, deduplicated,
/// longest first so that "habitaciones" wins over "hab", with inner spaces
/// matching any whitespace run.
pub(crate) fn keyword_alternation<S: AsRef<str>>(keywords: &[S]) -> String {
    let mut words: Vec<String> = keywords
        .iter()
        .map(|k| k.as_ref().trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    words.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then_with(|| a.cmp(b)));
    words.dedup();

    words
        .iter()
        .map(|w| {
            w.split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+")
        })
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_alternation_orders_longest_first() {
        let alt = keyword_alternation(&["hab", "Habitaciones", "hab.", "hab"]);
        assert_eq!(alt, r"habitaciones|hab\.|hab");
    }

    #[test]
    fn test_keyword_alternation_spaces() {
        let alt = keyword_alternation(&["se vende"]);
        assert_eq!(alt, r"se\s+vende");
    }

    #[test]
    fn test_windows_respect_char_boundaries() {
        let text = "baño en colonia";
        let idx = text.find("en").unwrap();
        assert_eq!(window_before(text, idx, 3), "ño ");
        assert_eq!(window_after(text, idx, 5), "en co");
        assert_eq!(window_before(text, 2, 10), "ba");
    }

    #[test]
    fn test_char_neighbours() {
        let text = "$ 450/mes";
        assert_eq!(char_before(text, 2), Some(' '));
        assert_eq!(char_after(text, 5), Some('/'));
        assert_eq!(char_after(text, text.len()), None);
    }
}
