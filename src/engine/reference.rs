//! Reference-title extraction and catalog resolution
//!
//! Handles the "movies like X" request family: pulls the referenced title
//! out of free text, then resolves it against the catalog with a
//! progressively looser match ladder. An unresolvable reference is not an
//! error; the caller simply proceeds without cultural matching.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{MediaItem, MediaType};
use crate::services::providers::{CatalogProvider, MediaDetails};

/// Extraction patterns, most specific first. First match wins.
static REFERENCE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)(?:movies?|films?|shows?|series|something|anything)\s+(?:just\s+)?like\s+(.+)").unwrap(),
        Regex::new(r"(?i)similar\s+to\s+(.+)").unwrap(),
        Regex::new(r"(?i)in\s+the\s+(?:same\s+)?style\s+of\s+(.+)").unwrap(),
        Regex::new(r"(?i)reminds?\s+me\s+of\s+(.+)").unwrap(),
        Regex::new(r"(?i)same\s+vibe\s+as\s+(.+)").unwrap(),
    ]
});

/// Trailing words that are part of the request, not the title
const TRAILING_WORDS: &[&str] = &["movie", "movies", "film", "films", "show", "shows", "series"];

/// Extract the referenced title from a message, if one is present
pub fn extract_reference_title(text: &str) -> Option<String> {
    let captured = REFERENCE_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())?;

    let mut title = captured.trim().trim_end_matches(['.', '!', '?', ',']).trim();

    // Strip a trailing "movie"/"film"/"show" word: "Baahubali movies" -> "Baahubali"
    loop {
        match TRAILING_WORDS
            .iter()
            .find_map(|word| strip_trailing_word(title, word))
        {
            Some(rest) => title = rest,
            None => break,
        }
    }

    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

/// Case-insensitive strip of one trailing request word. Byte offsets are
/// taken from the original string, so titles with non-ASCII casing (whose
/// lowercase form has a different byte length) are sliced safely. The word
/// must stand alone: "Gameshow" keeps its suffix.
fn strip_trailing_word<'a>(title: &'a str, word: &str) -> Option<&'a str> {
    if title.len() <= word.len() || !title.is_char_boundary(title.len() - word.len()) {
        return None;
    }
    let (head, tail) = title.split_at(title.len() - word.len());
    if tail.eq_ignore_ascii_case(word) && head.ends_with(char::is_whitespace) {
        Some(head.trim_end())
    } else {
        None
    }
}

/// A reference title resolved against the catalog
#[derive(Debug, Clone)]
pub struct ResolvedReference {
    pub item: MediaItem,
    /// Full details when the follow-up lookup succeeded; language and
    /// country data degrade gracefully when it did not
    pub details: Option<MediaDetails>,
}

/// Resolve a reference title against the catalog provider.
///
/// Searches movies before TV (unless the request is TV-only) and picks the
/// best match per media type: exact title, then prefix, then substring, then
/// the first search result.
pub async fn resolve_reference(
    provider: &dyn CatalogProvider,
    title: &str,
    media_type: MediaType,
) -> Option<ResolvedReference> {
    let search_order = match media_type {
        MediaType::Tv => vec![MediaType::Tv],
        MediaType::Movie => vec![MediaType::Movie],
        MediaType::Both => vec![MediaType::Movie, MediaType::Tv],
    };

    for media in search_order {
        let results = match provider.search(media, title, 1).await {
            Ok(page) => page.items,
            Err(e) => {
                tracing::warn!(error = %e, title = %title, "Reference search failed");
                continue;
            }
        };

        if let Some(item) = pick_best_match(&results, title) {
            tracing::info!(
                reference = %title,
                resolved = %item.title,
                id = item.id,
                media_type = %item.media_type,
                "Reference resolved"
            );

            let details = match provider.details(item.media_type, item.id).await {
                Ok(details) => Some(details),
                Err(e) => {
                    tracing::warn!(error = %e, id = item.id, "Reference details lookup failed");
                    None
                }
            };

            return Some(ResolvedReference { item, details });
        }
    }

    tracing::info!(reference = %title, "Reference could not be resolved");
    None
}

/// Exact -> prefix -> substring -> first result
fn pick_best_match(results: &[MediaItem], title: &str) -> Option<MediaItem> {
    if results.is_empty() {
        return None;
    }

    let lower = title.to_lowercase();

    results
        .iter()
        .find(|item| item.title.to_lowercase() == lower)
        .or_else(|| {
            results
                .iter()
                .find(|item| item.title.to_lowercase().starts_with(&lower))
        })
        .or_else(|| {
            results
                .iter()
                .find(|item| item.title.to_lowercase().contains(&lower))
        })
        .or_else(|| results.first())
        .cloned()
}
