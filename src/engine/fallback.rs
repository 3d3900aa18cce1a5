//! Fallback recommendations
//!
//! When the planned queries come back empty (or everything was filtered
//! out), walk a ladder of progressively safer sources: trending, then
//! top-rated, then a plain genre discover. Provider errors are logged and
//! treated as an empty rung, never surfaced to the user.

use crate::models::{MediaItem, MediaType};
use crate::services::providers::{
    CatalogProvider, DiscoverParams, SortBy, TrendingWindow,
};

/// Fetch fallback titles, best source first. Returns an empty vector only
/// when every rung of the ladder failed or came back empty.
pub async fn fetch_fallback(
    provider: &dyn CatalogProvider,
    media_type: MediaType,
    genre_ids: &[u16],
    count: usize,
) -> Vec<MediaItem> {
    let concrete = media_type
        .concrete()
        .into_iter()
        .next()
        .unwrap_or(MediaType::Movie);

    match provider.trending(concrete, TrendingWindow::Week, 1).await {
        Ok(page) if !page.items.is_empty() => {
            tracing::info!(source = "trending", count = page.items.len(), "Fallback hit");
            return truncate(page.items, count);
        }
        Ok(_) => tracing::warn!(source = "trending", "Fallback source empty"),
        Err(e) => tracing::warn!(source = "trending", error = %e, "Fallback source failed"),
    }

    match provider.top_rated(concrete, 1).await {
        Ok(page) if !page.items.is_empty() => {
            tracing::info!(source = "top_rated", count = page.items.len(), "Fallback hit");
            return truncate(page.items, count);
        }
        Ok(_) => tracing::warn!(source = "top_rated", "Fallback source empty"),
        Err(e) => tracing::warn!(source = "top_rated", error = %e, "Fallback source failed"),
    }

    let params = DiscoverParams {
        genres: genre_ids.to_vec(),
        min_votes: Some(100),
        sort_by: Some(SortBy::PopularityDesc),
        page: 1,
        ..Default::default()
    };
    match provider.discover(concrete, params).await {
        Ok(page) if !page.items.is_empty() => {
            tracing::info!(source = "discover", count = page.items.len(), "Fallback hit");
            truncate(page.items, count)
        }
        Ok(_) => {
            tracing::warn!(source = "discover", "Fallback exhausted with no results");
            Vec::new()
        }
        Err(e) => {
            tracing::warn!(source = "discover", error = %e, "Fallback exhausted with error");
            Vec::new()
        }
    }
}

fn truncate(mut items: Vec<MediaItem>, count: usize) -> Vec<MediaItem> {
    items.truncate(count);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::Paginated;
    use crate::services::providers::MockCatalogProvider;

    fn page_of(ids: &[u64]) -> Paginated<MediaItem> {
        Paginated {
            items: ids
                .iter()
                .map(|id| MediaItem {
                    id: *id,
                    media_type: MediaType::Movie,
                    title: format!("Title {}", id),
                    poster_path: None,
                    backdrop_path: None,
                    overview: None,
                    release_date: None,
                    vote_average: 7.0,
                    vote_count: 1000,
                    genre_ids: vec![28],
                    original_language: Some("en".to_string()),
                    popularity: Some(50.0),
                })
                .collect(),
            page: 1,
            total_pages: 1,
            total_results: ids.len() as u64,
        }
    }

    #[tokio::test]
    async fn test_trending_is_first_choice() {
        let mut provider = MockCatalogProvider::new();
        provider
            .expect_trending()
            .returning(|_, _, _| Ok(page_of(&[1, 2, 3])));
        provider.expect_top_rated().never();
        provider.expect_discover().never();

        let items = fetch_fallback(&provider, MediaType::Movie, &[], 2).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, 1);
    }

    #[tokio::test]
    async fn test_falls_through_to_top_rated_on_error() {
        let mut provider = MockCatalogProvider::new();
        provider
            .expect_trending()
            .returning(|_, _, _| Err(AppError::ExternalApi("down".to_string())));
        provider
            .expect_top_rated()
            .returning(|_, _| Ok(page_of(&[9])));

        let items = fetch_fallback(&provider, MediaType::Movie, &[], 5).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 9);
    }

    #[tokio::test]
    async fn test_falls_through_to_discover_on_empty() {
        let mut provider = MockCatalogProvider::new();
        provider
            .expect_trending()
            .returning(|_, _, _| Ok(Paginated::empty()));
        provider
            .expect_top_rated()
            .returning(|_, _| Ok(Paginated::empty()));
        provider
            .expect_discover()
            .withf(|_, params| params.genres == vec![35])
            .returning(|_, _| Ok(page_of(&[42])));

        let items = fetch_fallback(&provider, MediaType::Movie, &[35], 5).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 42);
    }

    #[tokio::test]
    async fn test_exhausted_ladder_returns_empty() {
        let mut provider = MockCatalogProvider::new();
        provider
            .expect_trending()
            .returning(|_, _, _| Err(AppError::ExternalApi("down".to_string())));
        provider
            .expect_top_rated()
            .returning(|_, _| Err(AppError::ExternalApi("down".to_string())));
        provider
            .expect_discover()
            .returning(|_, _| Ok(Paginated::empty()));

        let items = fetch_fallback(&provider, MediaType::Both, &[], 5).await;
        assert!(items.is_empty());
    }
}
