/// Catalog data provider abstraction
///
/// This module provides a pluggable architecture for content catalog sources
/// (TMDB today, others later). The engine only ever talks to the catalog
/// through this trait, so tests can substitute a mock and the cultural
/// analyzer can be exercised without network access.
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    models::{MediaItem, MediaType, Paginated},
};

pub mod tmdb;

/// Time window for trending lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendingWindow {
    Day,
    Week,
}

/// Sort order for discover queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    PopularityDesc,
    VoteAverageDesc,
    ReleaseDateDesc,
}

/// Parameters for a discover query. All fields optional; an empty set of
/// params is a plain popularity-sorted discover.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoverParams {
    pub genres: Vec<u16>,
    pub exclude_genres: Vec<u16>,
    pub year: Option<i32>,
    /// Inclusive (from, to) release-year range
    pub year_range: Option<(i32, i32)>,
    pub min_rating: Option<f32>,
    pub max_rating: Option<f32>,
    pub min_votes: Option<u64>,
    pub sort_by: Option<SortBy>,
    pub original_language: Option<String>,
    pub exclude_original_language: Option<String>,
    pub region: Option<String>,
    pub page: u32,
}

/// Full detail record for a single title, needed by the cultural analyzer
/// for language and production-country resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaDetails {
    pub item: MediaItem,
    /// ISO 639-1 codes of spoken languages
    pub spoken_languages: Vec<String>,
    /// ISO 3166-1 codes of production countries
    pub production_countries: Vec<String>,
    pub keywords: Vec<String>,
}

/// Read-only content catalog provider
///
/// All operations return paginated results and must not mutate any state.
/// Failures surface as `AppError`; callers in the engine swallow per-query
/// errors and degrade to empty result sets.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Titles trending in the given window
    async fn trending(
        &self,
        media_type: MediaType,
        window: TrendingWindow,
        page: u32,
    ) -> AppResult<Paginated<MediaItem>>;

    /// All-time top-rated titles
    async fn top_rated(&self, media_type: MediaType, page: u32) -> AppResult<Paginated<MediaItem>>;

    /// Free-text title search
    async fn search(
        &self,
        media_type: MediaType,
        query: &str,
        page: u32,
    ) -> AppResult<Paginated<MediaItem>>;

    /// Filtered discovery by genre, language, era, rating
    async fn discover(
        &self,
        media_type: MediaType,
        params: DiscoverParams,
    ) -> AppResult<Paginated<MediaItem>>;

    /// Full details for one title, including languages and countries
    async fn details(&self, media_type: MediaType, id: u64) -> AppResult<MediaDetails>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trending_window_serde() {
        assert_eq!(
            serde_json::to_string(&TrendingWindow::Week).unwrap(),
            r#""week""#
        );
    }

    #[test]
    fn test_discover_params_default_is_empty() {
        let params = DiscoverParams::default();
        assert!(params.genres.is_empty());
        assert_eq!(params.year_range, None);
        assert_eq!(params.page, 0);
    }
}
