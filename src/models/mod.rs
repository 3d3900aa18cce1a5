use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod cultural;
pub mod intent;

pub use cultural::*;
pub use intent::*;

/// Media type of a catalog title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
    /// Both movies and TV; only valid in requests, never on a concrete item
    Both,
}

impl MediaType {
    /// Concrete media types to query for this request-level value
    pub fn concrete(&self) -> Vec<MediaType> {
        match self {
            MediaType::Both => vec![MediaType::Movie, MediaType::Tv],
            other => vec![*other],
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaType::Movie => write!(f, "movie"),
            MediaType::Tv => write!(f, "tv"),
            MediaType::Both => write!(f, "both"),
        }
    }
}

/// Unique key for a title within a conversation: catalog ID plus media type.
/// TMDB movie and TV ID spaces overlap, so the pair is the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaKey {
    pub id: u64,
    pub media_type: MediaType,
}

/// Catalog-agnostic projection of a title, read-only downstream of query execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaItem {
    pub id: u64,
    pub media_type: MediaType,
    pub title: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: f32,
    pub vote_count: u64,
    pub genre_ids: Vec<u16>,
    pub original_language: Option<String>,
    pub popularity: Option<f32>,
}

impl MediaItem {
    pub fn key(&self) -> MediaKey {
        MediaKey {
            id: self.id,
            media_type: self.media_type,
        }
    }

    /// Four-digit release year, if the release date parses
    pub fn release_year(&self) -> Option<i32> {
        self.release_date
            .as_deref()
            .and_then(|d| d.get(0..4))
            .and_then(|y| y.parse().ok())
    }
}

/// History entry for a title recommended in a previous turn. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendedItem {
    pub id: u64,
    pub media_type: MediaType,
    pub title: String,
    pub genre_ids: Vec<u16>,
    pub release_year: Option<i32>,
    pub vote_average: f32,
    pub recommended_at: DateTime<Utc>,
    pub turn: u32,
}

impl RecommendedItem {
    pub fn from_media(item: &MediaItem, turn: u32) -> Self {
        Self {
            id: item.id,
            media_type: item.media_type,
            title: item.title.clone(),
            genre_ids: item.genre_ids.clone(),
            release_year: item.release_year(),
            vote_average: item.vote_average,
            recommended_at: Utc::now(),
            turn,
        }
    }

    pub fn key(&self) -> MediaKey {
        MediaKey {
            id: self.id,
            media_type: self.media_type,
        }
    }
}

/// Paginated result from the catalog provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub total_pages: u32,
    pub total_results: u64,
}

impl<T> Paginated<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            page: 1,
            total_pages: 0,
            total_results: 0,
        }
    }
}

// ============================================================================
// Genre catalog (TMDB genre IDs)
// ============================================================================

/// Known genre: TMDB ID, display name, and free-text aliases matched by the
/// intent parser (mood labels that expand to this genre included).
pub struct Genre {
    pub id: u16,
    pub name: &'static str,
    pub aliases: &'static [&'static str],
}

pub const GENRES: &[Genre] = &[
    Genre { id: 28, name: "Action", aliases: &["action", "fight", "explosive"] },
    Genre { id: 12, name: "Adventure", aliases: &["adventure", "quest", "journey"] },
    Genre { id: 16, name: "Animation", aliases: &["animation", "animated", "anime", "cartoon"] },
    Genre { id: 35, name: "Comedy", aliases: &["comedy", "funny", "hilarious", "laugh"] },
    Genre { id: 80, name: "Crime", aliases: &["crime", "heist", "gangster", "mafia"] },
    Genre { id: 99, name: "Documentary", aliases: &["documentary", "docu", "real story"] },
    Genre { id: 18, name: "Drama", aliases: &["drama", "emotional", "moving"] },
    Genre { id: 10751, name: "Family", aliases: &["family", "kids", "children"] },
    Genre { id: 14, name: "Fantasy", aliases: &["fantasy", "magic", "magical"] },
    Genre { id: 36, name: "History", aliases: &["history", "historical", "period"] },
    Genre { id: 27, name: "Horror", aliases: &["horror", "scary", "creepy", "haunted"] },
    Genre { id: 10402, name: "Music", aliases: &["music", "musical", "concert"] },
    Genre { id: 9648, name: "Mystery", aliases: &["mystery", "whodunit", "detective"] },
    Genre { id: 10749, name: "Romance", aliases: &["romance", "romantic", "love story"] },
    Genre { id: 878, name: "Science Fiction", aliases: &["sci-fi", "scifi", "science fiction", "space", "futuristic"] },
    Genre { id: 53, name: "Thriller", aliases: &["thriller", "suspense", "tense", "edge of"] },
    Genre { id: 10752, name: "War", aliases: &["war", "battle", "military"] },
    Genre { id: 37, name: "Western", aliases: &["western", "cowboy"] },
];

/// Display name for a genre ID, falling back to the raw number
pub fn genre_name(id: u16) -> String {
    GENRES
        .iter()
        .find(|g| g.id == id)
        .map(|g| g.name.to_string())
        .unwrap_or_else(|| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_serde_lowercase() {
        assert_eq!(serde_json::to_string(&MediaType::Movie).unwrap(), r#""movie""#);
        assert_eq!(serde_json::to_string(&MediaType::Tv).unwrap(), r#""tv""#);

        let parsed: MediaType = serde_json::from_str(r#""tv""#).unwrap();
        assert_eq!(parsed, MediaType::Tv);
    }

    #[test]
    fn test_media_type_concrete() {
        assert_eq!(MediaType::Movie.concrete(), vec![MediaType::Movie]);
        assert_eq!(
            MediaType::Both.concrete(),
            vec![MediaType::Movie, MediaType::Tv]
        );
    }

    #[test]
    fn test_media_key_distinguishes_media_types() {
        let movie = MediaKey { id: 550, media_type: MediaType::Movie };
        let tv = MediaKey { id: 550, media_type: MediaType::Tv };
        assert_ne!(movie, tv);
    }

    #[test]
    fn test_release_year_parsing() {
        let mut item = test_item(1, MediaType::Movie);
        item.release_date = Some("2015-07-10".to_string());
        assert_eq!(item.release_year(), Some(2015));

        item.release_date = Some("bad".to_string());
        assert_eq!(item.release_year(), None);

        item.release_date = None;
        assert_eq!(item.release_year(), None);
    }

    #[test]
    fn test_recommended_item_from_media() {
        let mut item = test_item(42, MediaType::Tv);
        item.release_date = Some("1999-03-31".to_string());
        item.genre_ids = vec![18, 80];

        let rec = RecommendedItem::from_media(&item, 3);
        assert_eq!(rec.id, 42);
        assert_eq!(rec.media_type, MediaType::Tv);
        assert_eq!(rec.release_year, Some(1999));
        assert_eq!(rec.genre_ids, vec![18, 80]);
        assert_eq!(rec.turn, 3);
        assert_eq!(rec.key(), item.key());
    }

    #[test]
    fn test_genre_name_lookup() {
        assert_eq!(genre_name(28), "Action");
        assert_eq!(genre_name(878), "Science Fiction");
        assert_eq!(genre_name(9999), "9999");
    }

    pub(crate) fn test_item(id: u64, media_type: MediaType) -> MediaItem {
        MediaItem {
            id,
            media_type,
            title: format!("Title {}", id),
            poster_path: None,
            backdrop_path: None,
            overview: None,
            release_date: None,
            vote_average: 7.0,
            vote_count: 1000,
            genre_ids: vec![],
            original_language: Some("en".to_string()),
            popularity: Some(50.0),
        }
    }
}
