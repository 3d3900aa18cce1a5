//! Intent parsing for user messages
//!
//! Keyword-set classification: each intent has a keyword list, a candidate's
//! score is (matching keywords) x (1 / list size) x 100, and the highest
//! scorer wins. Pure and deterministic; malformed input degrades to a
//! low-confidence recommend intent rather than failing.

use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Era, IntentKind, MediaType, Mood, ParsedIntent, GENRES};

/// Score above which greeting/thanks pre-empt the general winner
const SOCIAL_PREEMPT_SCORE: f32 = 50.0;
/// Raw score that maps to full confidence
const CONFIDENCE_SCALE: f32 = 50.0;
const CONFIDENCE_FLOOR: f32 = 0.3;

const INTENT_KEYWORDS: &[(IntentKind, &[&str])] = &[
    (
        IntentKind::Recommend,
        &[
            "recommend",
            "suggest",
            "what should i watch",
            "something to watch",
            "show me",
            "find me",
            "give me",
            "want to watch",
            "in the mood for",
        ],
    ),
    (
        IntentKind::Search,
        &["search", "look up", "looking for", "find a movie called", "find a show called"],
    ),
    (
        IntentKind::Trending,
        &["trending", "popular", "whats hot", "what's hot", "right now", "these days"],
    ),
    (
        IntentKind::TopRated,
        &["top rated", "best rated", "highest rated", "best of all time", "greatest", "masterpiece"],
    ),
    (
        IntentKind::Similar,
        &["like", "similar to", "reminds me of", "in the style of", "same vibe as"],
    ),
    (
        IntentKind::Genre,
        &["genre", "category", "type of movie", "kind of movie"],
    ),
    (
        IntentKind::Watchlist,
        &["watchlist", "my list", "save this", "bookmark", "add to"],
    ),
    (
        IntentKind::Greeting,
        &["hi", "hello", "hey", "good morning", "good evening", "howdy", "namaste"],
    ),
    (
        IntentKind::Thanks,
        &["thanks", "thank you", "thx", "appreciate it", "perfect"],
    ),
];

/// Mood keyword table, separate from the genre aliases the parser also scans
const MOOD_KEYWORDS: &[(Mood, &[&str])] = &[
    (Mood::Feelgood, &["feel good", "feel-good", "uplifting", "wholesome", "happy", "cheerful"]),
    (Mood::Dark, &["dark", "gritty", "bleak", "disturbing"]),
    (Mood::Exciting, &["exciting", "thrilling", "adrenaline", "action packed", "intense"]),
    (Mood::Relaxing, &["relaxing", "chill", "easy watch", "light", "cozy"]),
    (Mood::Emotional, &["emotional", "tearjerker", "cry", "heartbreaking", "touching"]),
    (Mood::Scary, &["scary", "terrifying", "frightening", "spooky"]),
    (Mood::Thoughtful, &["thought provoking", "thought-provoking", "mind bending", "mind-bending", "deep", "cerebral"]),
    (Mood::Romantic, &["romantic", "love story", "date night"]),
];

/// Rating-floor phrases mapped to fixed thresholds
const RATING_PHRASES: &[(&str, f32)] = &[
    ("top rated", 8.0),
    ("best rated", 8.0),
    ("highly rated", 7.0),
    ("well reviewed", 7.0),
    ("well rated", 7.0),
    ("good ratings", 6.5),
];

/// Era presets, checked in order: "latest" must beat the decade patterns so
/// that "latest 90s style" does not land in the nineties bucket by accident.
static ERA_PATTERNS: Lazy<Vec<(Regex, Era)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"\b(latest|newest|recent|new release|this year)\b").unwrap(),
            Era::Latest,
        ),
        (Regex::new(r"\b(2020s|twenties)\b").unwrap(), Era::Y2020s),
        (Regex::new(r"\b(2010s)\b").unwrap(), Era::Y2010s),
        (Regex::new(r"\b(2000s|noughties)\b").unwrap(), Era::Y2000s),
        (
            Regex::new(r"\b(1990s|90s|nineties)\b").unwrap(),
            Era::Y1990s,
        ),
        (
            Regex::new(r"\b(1980s|80s|eighties)\b").unwrap(),
            Era::Y1980s,
        ),
        (
            Regex::new(r"\b(classics?|old school|golden age|vintage)\b").unwrap(),
            Era::Classic,
        ),
    ]
});

static YEAR_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").unwrap());

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "i", "me", "my", "to", "of", "for", "with", "and", "or", "some", "any",
    "that", "this", "is", "are", "was", "it", "in", "on", "at", "do", "you", "can", "watch",
    "movie", "movies", "film", "films", "show", "shows", "series", "tv", "something", "please",
];

/// Parse a raw user message into a structured intent
pub fn parse_intent(text: &str) -> ParsedIntent {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();

    let (kind, raw_score) = classify(&lower, &words);
    let confidence = (raw_score / CONFIDENCE_SCALE).min(1.0).max(CONFIDENCE_FLOOR);

    let (media_type, media_type_explicit) = detect_media_type(&lower);
    let genre_ids = detect_genres(&lower);
    let moods = detect_moods(&lower);
    let era = detect_era(&lower);
    let year = detect_year(&lower);
    let min_rating = detect_min_rating(&lower);
    let keywords = extract_keywords(&words);

    tracing::debug!(
        intent = %kind,
        confidence = confidence,
        genres = ?genre_ids,
        moods = ?moods,
        "Parsed intent"
    );

    ParsedIntent {
        kind,
        media_type,
        media_type_explicit,
        confidence,
        genre_ids,
        moods,
        era,
        year,
        min_rating,
        keywords,
        original_text: text.to_string(),
    }
}

/// Pick the winning intent and its raw score
fn classify(lower: &str, words: &[&str]) -> (IntentKind, f32) {
    let mut best = (IntentKind::Recommend, 0.0f32);
    let mut social: Option<(IntentKind, f32)> = None;

    for (kind, keywords) in INTENT_KEYWORDS {
        let matches = keywords
            .iter()
            .filter(|kw| keyword_matches(lower, words, kw))
            .count();
        if matches == 0 {
            continue;
        }
        let score = matches as f32 * (1.0 / keywords.len() as f32) * 100.0;

        if kind.is_social() {
            if social.map_or(true, |(_, s)| score > s) {
                social = Some((*kind, score));
            }
        } else if score > best.1 {
            best = (*kind, score);
        }
    }

    // Greeting/thanks pre-empt the general winner only above the threshold;
    // below it they still win when nothing else scored at all.
    match social {
        Some((kind, score)) if score > SOCIAL_PREEMPT_SCORE || best.1 == 0.0 => (kind, score),
        _ => best,
    }
}

/// Single-token keywords match on word boundaries so "hi" does not fire
/// inside "this"; phrases match by substring.
fn keyword_matches(lower: &str, words: &[&str], keyword: &str) -> bool {
    if keyword.contains(' ') {
        lower.contains(keyword)
    } else {
        words.iter().any(|w| w.trim_matches(|c: char| !c.is_alphanumeric()) == keyword)
    }
}

fn detect_media_type(lower: &str) -> (MediaType, bool) {
    let wants_movie = lower.contains("movie") || lower.contains("film");
    let wants_tv = lower.contains("show") || lower.contains("series") || lower.contains(" tv");

    match (wants_movie, wants_tv) {
        (true, false) => (MediaType::Movie, true),
        (false, true) => (MediaType::Tv, true),
        (true, true) => (MediaType::Both, true),
        (false, false) => (MediaType::Both, false),
    }
}

/// Case-insensitive substring match of genre names and aliases
fn detect_genres(lower: &str) -> Vec<u16> {
    let mut ids = Vec::new();
    for genre in GENRES {
        let name_hit = lower.contains(&genre.name.to_lowercase());
        let alias_hit = genre.aliases.iter().any(|alias| lower.contains(alias));
        if (name_hit || alias_hit) && !ids.contains(&genre.id) {
            ids.push(genre.id);
        }
    }
    ids
}

fn detect_moods(lower: &str) -> Vec<Mood> {
    let mut moods = Vec::new();
    for (mood, keywords) in MOOD_KEYWORDS {
        if keywords.iter().any(|kw| lower.contains(kw)) && !moods.contains(mood) {
            moods.push(*mood);
        }
    }
    moods
}

fn detect_era(lower: &str) -> Option<Era> {
    ERA_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(lower))
        .map(|(_, era)| *era)
}

fn detect_year(lower: &str) -> Option<i32> {
    let current_year = Utc::now().year();
    YEAR_PATTERN
        .find_iter(lower)
        .filter_map(|m| m.as_str().parse::<i32>().ok())
        .find(|y| (1900..=current_year + 1).contains(y))
}

fn detect_min_rating(lower: &str) -> Option<f32> {
    RATING_PHRASES
        .iter()
        .find(|(phrase, _)| lower.contains(phrase))
        .map(|(_, floor)| *floor)
}

/// Leftover significant words, used for free-text search queries
fn extract_keywords(words: &[&str]) -> Vec<String> {
    words
        .iter()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.len() > 2 && !STOPWORDS.contains(w))
        .map(|w| w.to_string())
        .take(5)
        .collect()
}
