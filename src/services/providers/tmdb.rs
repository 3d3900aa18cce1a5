/// TMDB API provider
///
/// Implements the catalog operations over TMDB v3 endpoints:
/// - Trending: /trending/{media_type}/{window}
/// - Top rated: /{media_type}/top_rated
/// - Search: /search/{media_type}
/// - Discover: /discover/{media_type}
/// - Details: /{media_type}/{id}?append_to_response=keywords
///
/// Movie and TV payloads name their fields differently (title vs name,
/// release_date vs first_air_date); the response types below absorb both.
use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{MediaItem, MediaType, Paginated},
    services::providers::{
        CatalogProvider, DiscoverParams, MediaDetails, SortBy, TrendingWindow,
    },
};

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

/// One entry in a TMDB list response (search, discover, trending, top rated)
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbEntry {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub vote_average: f32,
    #[serde(default)]
    pub vote_count: u64,
    #[serde(default)]
    pub genre_ids: Vec<u16>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub popularity: Option<f32>,
}

impl TmdbEntry {
    /// Convert to the catalog-agnostic item model. TMDB movie and TV ID
    /// spaces overlap, so the media type must come from the request context.
    pub fn into_media_item(self, media_type: MediaType) -> MediaItem {
        MediaItem {
            id: self.id,
            media_type,
            title: self.title.or(self.name).unwrap_or_default(),
            poster_path: self.poster_path,
            backdrop_path: self.backdrop_path,
            overview: self.overview,
            release_date: self.release_date.or(self.first_air_date),
            vote_average: self.vote_average,
            vote_count: self.vote_count,
            genre_ids: self.genre_ids,
            original_language: self.original_language,
            popularity: self.popularity,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TmdbListResponse {
    #[serde(default)]
    page: u32,
    results: Vec<TmdbEntry>,
    #[serde(default)]
    total_pages: u32,
    #[serde(default)]
    total_results: u64,
}

#[derive(Debug, Deserialize)]
struct TmdbGenre {
    id: u16,
}

#[derive(Debug, Deserialize)]
struct TmdbLanguage {
    iso_639_1: String,
}

#[derive(Debug, Deserialize)]
struct TmdbCountry {
    iso_3166_1: String,
}

#[derive(Debug, Deserialize)]
struct TmdbKeyword {
    name: String,
}

/// Keyword envelope differs by media type: movies use "keywords",
/// TV uses "results"
#[derive(Debug, Default, Deserialize)]
struct TmdbKeywords {
    #[serde(default)]
    keywords: Vec<TmdbKeyword>,
    #[serde(default)]
    results: Vec<TmdbKeyword>,
}

#[derive(Debug, Deserialize)]
struct TmdbDetailsResponse {
    id: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
    #[serde(default)]
    backdrop_path: Option<String>,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    first_air_date: Option<String>,
    #[serde(default)]
    vote_average: f32,
    #[serde(default)]
    vote_count: u64,
    #[serde(default)]
    genres: Vec<TmdbGenre>,
    #[serde(default)]
    original_language: Option<String>,
    #[serde(default)]
    popularity: Option<f32>,
    #[serde(default)]
    spoken_languages: Vec<TmdbLanguage>,
    #[serde(default)]
    production_countries: Vec<TmdbCountry>,
    #[serde(default)]
    keywords: TmdbKeywords,
}

impl TmdbProvider {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
        }
    }

    /// Path segment for a concrete media type. `Both` is a request-level
    /// value and must be split before reaching the provider.
    fn media_path(media_type: MediaType) -> AppResult<&'static str> {
        match media_type {
            MediaType::Movie => Ok("movie"),
            MediaType::Tv => Ok("tv"),
            MediaType::Both => Err(AppError::InvalidInput(
                "TMDB queries require a concrete media type".to_string(),
            )),
        }
    }

    fn sort_param(sort: SortBy) -> &'static str {
        match sort {
            SortBy::PopularityDesc => "popularity.desc",
            SortBy::VoteAverageDesc => "vote_average.desc",
            SortBy::ReleaseDateDesc => "primary_release_date.desc",
        }
    }

    /// Issues a GET and decodes the standard list envelope
    async fn fetch_list(
        &self,
        url: &str,
        query: &[(String, String)],
        media_type: MediaType,
    ) -> AppResult<Paginated<MediaItem>> {
        let response = self
            .http_client
            .get(url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB API returned status {}: {}",
                status, body
            )));
        }

        let list: TmdbListResponse = response.json().await?;

        Ok(Paginated {
            items: list
                .results
                .into_iter()
                .map(|entry| entry.into_media_item(media_type))
                .collect(),
            page: list.page,
            total_pages: list.total_pages,
            total_results: list.total_results,
        })
    }

    /// Build query parameters for a discover request.
    ///
    /// Discover endpoints default to popularity sort; genre lists are
    /// comma-joined (TMDB treats comma as AND-of-OR which is close enough
    /// for our genre sets). Year ranges map to the primary release date /
    /// first air date gte/lte pair depending on media type.
    fn discover_query(media_type: MediaType, params: &DiscoverParams) -> Vec<(String, String)> {
        let mut query: Vec<(String, String)> = Vec::new();

        if !params.genres.is_empty() {
            query.push(("with_genres".to_string(), join_ids(&params.genres)));
        }
        if !params.exclude_genres.is_empty() {
            query.push(("without_genres".to_string(), join_ids(&params.exclude_genres)));
        }

        let (year_param, from_param, to_param) = match media_type {
            MediaType::Tv => (
                "first_air_date_year",
                "first_air_date.gte",
                "first_air_date.lte",
            ),
            _ => (
                "primary_release_year",
                "primary_release_date.gte",
                "primary_release_date.lte",
            ),
        };

        if let Some(year) = params.year {
            query.push((year_param.to_string(), year.to_string()));
        }
        if let Some((from, to)) = params.year_range {
            query.push((from_param.to_string(), format!("{}-01-01", from)));
            query.push((to_param.to_string(), format!("{}-12-31", to)));
        }
        if let Some(min) = params.min_rating {
            query.push(("vote_average.gte".to_string(), min.to_string()));
        }
        if let Some(max) = params.max_rating {
            query.push(("vote_average.lte".to_string(), max.to_string()));
        }
        if let Some(votes) = params.min_votes {
            query.push(("vote_count.gte".to_string(), votes.to_string()));
        }
        if let Some(lang) = &params.original_language {
            query.push(("with_original_language".to_string(), lang.clone()));
        }
        if let Some(lang) = &params.exclude_original_language {
            query.push(("without_original_language".to_string(), lang.clone()));
        }
        if let Some(region) = &params.region {
            query.push(("region".to_string(), region.clone()));
        }

        let sort = params.sort_by.unwrap_or(SortBy::PopularityDesc);
        query.push(("sort_by".to_string(), Self::sort_param(sort).to_string()));

        let page = params.page.max(1);
        query.push(("page".to_string(), page.to_string()));

        query
    }
}

#[async_trait::async_trait]
impl CatalogProvider for TmdbProvider {
    async fn trending(
        &self,
        media_type: MediaType,
        window: TrendingWindow,
        page: u32,
    ) -> AppResult<Paginated<MediaItem>> {
        let window_path = match window {
            TrendingWindow::Day => "day",
            TrendingWindow::Week => "week",
        };
        let url = format!(
            "{}/trending/{}/{}",
            self.api_url,
            Self::media_path(media_type)?,
            window_path
        );

        let result = self
            .fetch_list(
                &url,
                &[("page".to_string(), page.max(1).to_string())],
                media_type,
            )
            .await?;

        tracing::debug!(
            media_type = %media_type,
            results = result.items.len(),
            provider = "tmdb",
            "Trending fetch completed"
        );

        Ok(result)
    }

    async fn top_rated(&self, media_type: MediaType, page: u32) -> AppResult<Paginated<MediaItem>> {
        let url = format!(
            "{}/{}/top_rated",
            self.api_url,
            Self::media_path(media_type)?
        );

        self.fetch_list(
            &url,
            &[("page".to_string(), page.max(1).to_string())],
            media_type,
        )
        .await
    }

    async fn search(
        &self,
        media_type: MediaType,
        query: &str,
        page: u32,
    ) -> AppResult<Paginated<MediaItem>> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        let url = format!(
            "{}/search/{}",
            self.api_url,
            Self::media_path(media_type)?
        );

        let result = self
            .fetch_list(
                &url,
                &[
                    ("query".to_string(), query.to_string()),
                    ("page".to_string(), page.max(1).to_string()),
                ],
                media_type,
            )
            .await?;

        tracing::info!(
            query = %query,
            media_type = %media_type,
            results = result.items.len(),
            provider = "tmdb",
            "Title search completed"
        );

        Ok(result)
    }

    async fn discover(
        &self,
        media_type: MediaType,
        params: DiscoverParams,
    ) -> AppResult<Paginated<MediaItem>> {
        let url = format!(
            "{}/discover/{}",
            self.api_url,
            Self::media_path(media_type)?
        );

        let query = Self::discover_query(media_type, &params);
        let result = self.fetch_list(&url, &query, media_type).await?;

        tracing::debug!(
            media_type = %media_type,
            genres = ?params.genres,
            language = ?params.original_language,
            results = result.items.len(),
            provider = "tmdb",
            "Discover completed"
        );

        Ok(result)
    }

    async fn details(&self, media_type: MediaType, id: u64) -> AppResult<MediaDetails> {
        let url = format!("{}/{}/{}", self.api_url, Self::media_path(media_type)?, id);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("append_to_response", "keywords"),
            ])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!(
                "TMDB {} {} not found",
                media_type, id
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB API returned status {}: {}",
                status, body
            )));
        }

        let details: TmdbDetailsResponse = response.json().await?;

        let mut keywords: Vec<String> = details
            .keywords
            .keywords
            .iter()
            .chain(details.keywords.results.iter())
            .map(|k| k.name.to_lowercase())
            .collect();
        keywords.dedup();

        let item = MediaItem {
            id: details.id,
            media_type,
            title: details.title.or(details.name).unwrap_or_default(),
            poster_path: details.poster_path,
            backdrop_path: details.backdrop_path,
            overview: details.overview,
            release_date: details.release_date.or(details.first_air_date),
            vote_average: details.vote_average,
            vote_count: details.vote_count,
            genre_ids: details.genres.iter().map(|g| g.id).collect(),
            original_language: details.original_language,
            popularity: details.popularity,
        };

        Ok(MediaDetails {
            item,
            spoken_languages: details
                .spoken_languages
                .into_iter()
                .map(|l| l.iso_639_1)
                .collect(),
            production_countries: details
                .production_countries
                .into_iter()
                .map(|c| c.iso_3166_1)
                .collect(),
            keywords,
        })
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}

fn join_ids(ids: &[u16]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_entry_deserialization() {
        let json = r#"{
            "id": 19995,
            "title": "Avatar",
            "release_date": "2009-12-15",
            "vote_average": 7.6,
            "vote_count": 32000,
            "genre_ids": [28, 12, 878],
            "original_language": "en",
            "popularity": 310.5
        }"#;

        let entry: TmdbEntry = serde_json::from_str(json).unwrap();
        let item = entry.into_media_item(MediaType::Movie);

        assert_eq!(item.id, 19995);
        assert_eq!(item.title, "Avatar");
        assert_eq!(item.release_year(), Some(2009));
        assert_eq!(item.genre_ids, vec![28, 12, 878]);
        assert_eq!(item.original_language.as_deref(), Some("en"));
    }

    #[test]
    fn test_tv_entry_uses_name_and_first_air_date() {
        let json = r#"{
            "id": 1396,
            "name": "Breaking Bad",
            "first_air_date": "2008-01-20",
            "vote_average": 8.9,
            "vote_count": 12000,
            "genre_ids": [18, 80]
        }"#;

        let entry: TmdbEntry = serde_json::from_str(json).unwrap();
        let item = entry.into_media_item(MediaType::Tv);

        assert_eq!(item.title, "Breaking Bad");
        assert_eq!(item.release_year(), Some(2008));
        assert_eq!(item.media_type, MediaType::Tv);
    }

    #[test]
    fn test_discover_query_genres_and_language() {
        let params = DiscoverParams {
            genres: vec![28, 10749],
            original_language: Some("te".to_string()),
            min_rating: Some(6.5),
            page: 2,
            ..Default::default()
        };

        let query = TmdbProvider::discover_query(MediaType::Movie, &params);

        assert!(query.contains(&("with_genres".to_string(), "28,10749".to_string())));
        assert!(query.contains(&("with_original_language".to_string(), "te".to_string())));
        assert!(query.contains(&("vote_average.gte".to_string(), "6.5".to_string())));
        assert!(query.contains(&("page".to_string(), "2".to_string())));
        // Popularity sort is the default when not specified
        assert!(query.contains(&("sort_by".to_string(), "popularity.desc".to_string())));
    }

    #[test]
    fn test_discover_query_year_range_by_media_type() {
        let params = DiscoverParams {
            year_range: Some((1990, 1999)),
            ..Default::default()
        };

        let movie = TmdbProvider::discover_query(MediaType::Movie, &params);
        assert!(movie.contains(&(
            "primary_release_date.gte".to_string(),
            "1990-01-01".to_string()
        )));

        let tv = TmdbProvider::discover_query(MediaType::Tv, &params);
        assert!(tv.contains(&("first_air_date.gte".to_string(), "1990-01-01".to_string())));
        assert!(tv.contains(&("first_air_date.lte".to_string(), "1999-12-31".to_string())));
    }

    #[test]
    fn test_discover_query_page_floor() {
        let params = DiscoverParams::default();
        let query = TmdbProvider::discover_query(MediaType::Movie, &params);
        assert!(query.contains(&("page".to_string(), "1".to_string())));
    }

    #[test]
    fn test_media_path_rejects_both() {
        assert!(TmdbProvider::media_path(MediaType::Both).is_err());
        assert_eq!(TmdbProvider::media_path(MediaType::Tv).unwrap(), "tv");
    }

    #[test]
    fn test_details_keywords_envelope_both_shapes() {
        let movie_shape: TmdbKeywords =
            serde_json::from_str(r#"{"keywords": [{"id": 1, "name": "Epic"}]}"#).unwrap();
        assert_eq!(movie_shape.keywords.len(), 1);

        let tv_shape: TmdbKeywords =
            serde_json::from_str(r#"{"results": [{"id": 2, "name": "revenge"}]}"#).unwrap();
        assert_eq!(tv_shape.results.len(), 1);
    }
}
