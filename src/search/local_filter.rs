//! Case-insensitive substring matching over already-loaded records, and
//! match highlighting for display.

use serde::Serialize;

/// A record the local fallback search can match.
pub trait Searchable {
    /// Field values compared against the search term.
    fn search_fields(&self) -> Vec<&str>;
}

/// Whether any search field contains `term`, ignoring case.
pub fn matches<T: Searchable + ?Sized>(item: &T, term: &str) -> bool {
    let term = term.trim();
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    item.search_fields()
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

/// Records among `items` that match `term`, in their original order.
pub fn filter_local<T: Searchable + Clone>(items: &[T], term: &str) -> Vec<T> {
    items
        .iter()
        .filter(|item| matches(*item, term))
        .cloned()
        .collect()
}

/// A run of text, flagged when it matched the search term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub text: String,
    pub matched: bool,
}

impl Segment {
    fn new(text: &str, matched: bool) -> Self {
        Self {
            text: text.to_string(),
            matched,
        }
    }
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Split `text` into matched and unmatched runs of `term`.
///
/// Matching is char-by-char and case-insensitive; the original casing of
/// `text` is preserved. An empty term yields one unmatched segment.
pub fn highlight(text: &str, term: &str) -> Vec<Segment> {
    let term: Vec<char> = term.trim().chars().collect();
    if term.is_empty() || text.is_empty() {
        return if text.is_empty() {
            Vec::new()
        } else {
            vec![Segment::new(text, false)]
        };
    }

    let indexed: Vec<(usize, char)> = text.char_indices().collect();
    let byte_at = |i: usize| indexed.get(i).map_or(text.len(), |(b, _)| *b);

    let mut segments = Vec::new();
    let mut plain_start = 0;
    let mut i = 0;
    while i + term.len() <= indexed.len() {
        let hit = indexed[i..i + term.len()]
            .iter()
            .zip(&term)
            .all(|((_, c), t)| chars_eq_ignore_case(*c, *t));
        if hit {
            let start = byte_at(i);
            let end = byte_at(i + term.len());
            if start > plain_start {
                segments.push(Segment::new(&text[plain_start..start], false));
            }
            segments.push(Segment::new(&text[start..end], true));
            plain_start = end;
            i += term.len();
        } else {
            i += 1;
        }
    }
    if plain_start < text.len() {
        segments.push(Segment::new(&text[plain_start..], false));
    }
    segments
}
