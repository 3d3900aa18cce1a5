use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::MediaType;

/// Action the user is asking for, inferred from free text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Recommend,
    Search,
    Trending,
    TopRated,
    Similar,
    Genre,
    Watchlist,
    Greeting,
    Thanks,
    Unknown,
}

impl IntentKind {
    /// Social intents that never trigger a catalog lookup
    pub fn is_social(&self) -> bool {
        matches!(self, IntentKind::Greeting | IntentKind::Thanks)
    }
}

impl Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IntentKind::Recommend => "recommend",
            IntentKind::Search => "search",
            IntentKind::Trending => "trending",
            IntentKind::TopRated => "top_rated",
            IntentKind::Similar => "similar",
            IntentKind::Genre => "genre",
            IntentKind::Watchlist => "watchlist",
            IntentKind::Greeting => "greeting",
            IntentKind::Thanks => "thanks",
            IntentKind::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Release era bucket matched from free text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Era {
    Latest,
    Y2020s,
    Y2010s,
    Y2000s,
    Y1990s,
    Y1980s,
    Classic,
}

impl Era {
    /// Inclusive year range for discover queries.
    /// `Latest` is relative to the current year; `Classic` is open-ended at
    /// the bottom so it starts at the catalog floor.
    pub fn year_range(&self, current_year: i32) -> (i32, i32) {
        match self {
            Era::Latest => (current_year - 2, current_year),
            Era::Y2020s => (2020, 2029),
            Era::Y2010s => (2010, 2019),
            Era::Y2000s => (2000, 2009),
            Era::Y1990s => (1990, 1999),
            Era::Y1980s => (1980, 1989),
            Era::Classic => (1900, 1979),
        }
    }

    /// Era bucket for a release year, used for history counters
    pub fn from_year(year: i32, current_year: i32) -> Era {
        if year >= current_year - 2 {
            Era::Latest
        } else if year >= 2020 {
            Era::Y2020s
        } else if year >= 2010 {
            Era::Y2010s
        } else if year >= 2000 {
            Era::Y2000s
        } else if year >= 1990 {
            Era::Y1990s
        } else if year >= 1980 {
            Era::Y1980s
        } else {
            Era::Classic
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Era::Latest => "latest",
            Era::Y2020s => "2020s",
            Era::Y2010s => "2010s",
            Era::Y2000s => "2000s",
            Era::Y1990s => "90s",
            Era::Y1980s => "80s",
            Era::Classic => "classic",
        }
    }
}

/// Mood tag matched from free text. Distinct from the genre aliases: moods
/// expand into genre sets at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Feelgood,
    Dark,
    Exciting,
    Relaxing,
    Emotional,
    Scary,
    Thoughtful,
    Romantic,
}

impl Mood {
    /// Genres this mood expands to in discover queries
    pub fn genre_ids(&self) -> &'static [u16] {
        match self {
            Mood::Feelgood => &[35, 10751, 10749],
            Mood::Dark => &[80, 53, 27],
            Mood::Exciting => &[28, 12, 53],
            Mood::Relaxing => &[35, 16, 10751],
            Mood::Emotional => &[18, 10749],
            Mood::Scary => &[27, 53],
            Mood::Thoughtful => &[18, 9648, 878],
            Mood::Romantic => &[10749, 35],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mood::Feelgood => "feel-good",
            Mood::Dark => "dark",
            Mood::Exciting => "exciting",
            Mood::Relaxing => "relaxing",
            Mood::Emotional => "emotional",
            Mood::Scary => "scary",
            Mood::Thoughtful => "thought-provoking",
            Mood::Romantic => "romantic",
        }
    }
}

/// Structured interpretation of a user message. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedIntent {
    pub kind: IntentKind,
    pub media_type: MediaType,
    /// Whether the user actually named a media type, as opposed to the
    /// `Both` default; the ambiguity detector cares about the difference
    pub media_type_explicit: bool,
    pub confidence: f32,
    pub genre_ids: Vec<u16>,
    pub moods: Vec<Mood>,
    pub era: Option<Era>,
    pub year: Option<i32>,
    pub min_rating: Option<f32>,
    pub keywords: Vec<String>,
    pub original_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_kind_serde() {
        assert_eq!(
            serde_json::to_string(&IntentKind::TopRated).unwrap(),
            r#""top_rated""#
        );
        let parsed: IntentKind = serde_json::from_str(r#""greeting""#).unwrap();
        assert_eq!(parsed, IntentKind::Greeting);
    }

    #[test]
    fn test_social_intents() {
        assert!(IntentKind::Greeting.is_social());
        assert!(IntentKind::Thanks.is_social());
        assert!(!IntentKind::Recommend.is_social());
    }

    #[test]
    fn test_era_from_year_buckets() {
        assert_eq!(Era::from_year(2025, 2026), Era::Latest);
        assert_eq!(Era::from_year(2021, 2026), Era::Y2020s);
        assert_eq!(Era::from_year(2015, 2026), Era::Y2010s);
        assert_eq!(Era::from_year(1995, 2026), Era::Y1990s);
        assert_eq!(Era::from_year(1960, 2026), Era::Classic);
    }

    #[test]
    fn test_era_year_range_latest_is_relative() {
        assert_eq!(Era::Latest.year_range(2026), (2024, 2026));
        assert_eq!(Era::Y1990s.year_range(2026), (1990, 1999));
    }

    #[test]
    fn test_mood_expands_to_genres() {
        assert!(Mood::Scary.genre_ids().contains(&27));
        assert!(Mood::Romantic.genre_ids().contains(&10749));
    }
}
