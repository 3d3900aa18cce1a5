//! Conversation orchestrator
//!
//! One `Conversation` per session. Each user message runs the same pipeline:
//! parse intent, score ambiguity, resolve any reference title, generate
//! queries, fetch concurrently, filter, rank for diversity, and record the
//! outcome in history. Social messages and clarification turns short-circuit
//! before any catalog call.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::engine::ambiguity::{self, ClarifyingQuestion};
use crate::engine::cultural::{build_profile, generate_cultural_filters, violates_language_rules};
use crate::engine::diversity::select_diverse;
use crate::engine::fallback::fetch_fallback;
use crate::engine::history::RecommendationHistory;
use crate::engine::intent::parse_intent;
use crate::engine::query::{self, CatalogQuery, QueryKind, QuerySource};
use crate::engine::reference::{extract_reference_title, resolve_reference};
use crate::models::{genre_name, CulturalFilterRules, IntentKind, MediaItem, MediaKey};
use crate::services::providers::CatalogProvider;

const MAX_FOLLOW_UPS: usize = 3;
/// Pages fetched per query, keeps per-turn latency bounded
const MAX_PAGES_PER_QUERY: u32 = 2;

/// One assistant message: text plus the titles backing it
#[derive(Debug, Clone, Serialize)]
pub struct EngineMessage {
    pub text: String,
    pub items: Vec<MediaItem>,
    pub metadata: ResponseMetadata,
}

/// Diagnostic signals attached to every response
#[derive(Debug, Clone, Serialize)]
pub struct ResponseMetadata {
    pub intent: IntentKind,
    pub source: Option<QuerySource>,
    pub reference_title: Option<String>,
    pub ambiguity_score: f32,
    pub fallback_used: bool,
    pub turn: u32,
}

/// Full result of processing one user message
#[derive(Debug, Clone, Serialize)]
pub struct EngineResponse {
    pub message: EngineMessage,
    pub suggested_follow_ups: Vec<String>,
}

/// Session summary exposed through the API
#[derive(Debug, Clone, Serialize)]
pub struct ConversationStats {
    pub turn_count: u32,
    pub total_recommended: usize,
    pub top_genres: Vec<String>,
}

/// A single user's recommendation session
pub struct Conversation {
    provider: Arc<dyn CatalogProvider>,
    history: RecommendationHistory,
    target_count: usize,
}

impl Conversation {
    pub fn new(provider: Arc<dyn CatalogProvider>, target_count: usize) -> Self {
        Self {
            provider,
            history: RecommendationHistory::new(),
            target_count,
        }
    }

    /// Process one user message end to end
    pub async fn process_message(&mut self, text: &str) -> EngineResponse {
        let turn = self.history.start_new_turn();
        let intent = parse_intent(text);

        tracing::info!(
            turn = turn,
            intent = %intent.kind,
            confidence = intent.confidence,
            "Processing message"
        );

        if intent.kind == IntentKind::Thanks {
            return self.social_response(
                "You're welcome! Ask me any time you need something to watch.",
                &intent.kind,
                turn,
            );
        }

        if intent.kind == IntentKind::Watchlist {
            return self.social_response(
                "I can't manage a watchlist yet, but I can keep the recommendations coming!",
                &intent.kind,
                turn,
            );
        }

        let analysis = ambiguity::analyze(&intent, &self.history);

        if intent.kind == IntentKind::Greeting {
            return self.question_response(
                "Hey! I can help you find movies and series you'll love.",
                &analysis.questions,
                intent.kind,
                analysis.score,
                turn,
            );
        }

        if analysis.should_ask {
            return self.question_response(
                "Happy to help! A couple of quick questions first:",
                &analysis.questions,
                intent.kind,
                analysis.score,
                turn,
            );
        }

        let rules = self.history.generate_filter_rules();

        // "movies like X" gets the cultural matching path when the reference
        // resolves; otherwise the plan falls back to plain discovery
        let mut reference_title = None;
        let mut cultural: Option<CulturalFilterRules> = None;
        if let Some(title) = extract_reference_title(text) {
            if let Some(resolved) =
                resolve_reference(self.provider.as_ref(), &title, intent.media_type).await
            {
                let profile = build_profile(&resolved);
                cultural = Some(generate_cultural_filters(&profile, &resolved));
                reference_title = Some(resolved.item.title.clone());
            } else {
                reference_title = Some(title);
            }
        }

        let plan = query::build_plan(&intent, &rules, cultural.as_ref());
        let candidates = self.execute_queries(&plan.queries, cultural.as_ref()).await;

        // A reply belongs to the turn that started it. If the counter moved
        // while fetches were in flight, the results are stale; drop them
        // without touching history.
        if self.history.current_turn() != turn {
            tracing::warn!(
                expected = turn,
                actual = self.history.current_turn(),
                "Turn advanced mid-fetch, discarding stale results"
            );
            return self.social_response(
                "Let me catch up with your latest message first.",
                &intent.kind,
                turn,
            );
        }

        let mut selected: Vec<MediaItem> = select_diverse(
            candidates,
            &self.history,
            &rules,
            self.target_count,
        )
        .into_iter()
        .map(|scored| scored.item)
        .collect();

        let mut fallback_used = false;
        if selected.is_empty() {
            tracing::info!(turn = turn, "No candidates survived, trying fallback");
            let genres = query::effective_genres(&intent, &rules);
            selected = fetch_fallback(
                self.provider.as_ref(),
                intent.media_type,
                &genres,
                self.target_count,
            )
            .await
            .into_iter()
            .filter(|item| !self.history.is_recommended(&item.key()))
            .filter(|item| {
                // Hard language exclusions hold even for fallback results
                cultural
                    .as_ref()
                    .map_or(true, |cultural_rules| !violates_language_rules(item, cultural_rules))
            })
            .collect();
            fallback_used = true;
        }

        if selected.is_empty() {
            return EngineResponse {
                message: EngineMessage {
                    text: "I'm sorry, I couldn't find anything matching that right now. \
                           Could you try a different genre or era?"
                        .to_string(),
                    items: Vec::new(),
                    metadata: ResponseMetadata {
                        intent: intent.kind,
                        source: Some(plan.source),
                        reference_title,
                        ambiguity_score: analysis.score,
                        fallback_used: true,
                        turn,
                    },
                },
                suggested_follow_ups: vec![
                    "Show me what's trending".to_string(),
                    "Surprise me".to_string(),
                ],
            };
        }

        self.history.add_recommendations(&selected);

        let text = if fallback_used {
            "I couldn't find a close match for that, so here are some popular picks instead:"
                .to_string()
        } else if plan.explanation.is_empty() {
            plan.intro.clone()
        } else {
            format!("{} {}", plan.intro, plan.explanation)
        };

        let mut follow_ups = plan.follow_ups.clone();
        if self.history.should_suggest_variety() {
            follow_ups.insert(
                0,
                "You've been on a streak with one genre. Want to try something different?"
                    .to_string(),
            );
        }
        follow_ups.truncate(MAX_FOLLOW_UPS);

        EngineResponse {
            message: EngineMessage {
                text,
                items: selected,
                metadata: ResponseMetadata {
                    intent: intent.kind,
                    source: Some(plan.source),
                    reference_title,
                    ambiguity_score: analysis.score,
                    fallback_used,
                    turn,
                },
            },
            suggested_follow_ups: follow_ups,
        }
    }

    /// Clear all session state
    pub fn reset(&mut self) {
        self.history.reset();
        tracing::info!("Conversation reset");
    }

    pub fn stats(&self) -> ConversationStats {
        let stats = self.history.stats();
        let mut genres: Vec<(u16, usize)> = stats.genre_counts.into_iter().collect();
        genres.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        ConversationStats {
            turn_count: stats.turn_count,
            total_recommended: stats.total_recommended,
            top_genres: genres.into_iter().take(5).map(|(id, _)| genre_name(id)).collect(),
        }
    }

    /// Run all planned queries concurrently, dedupe by key, and drop
    /// candidates that break strict cultural language rules
    async fn execute_queries(
        &self,
        queries: &[CatalogQuery],
        cultural: Option<&CulturalFilterRules>,
    ) -> Vec<MediaItem> {
        let mut handles = Vec::with_capacity(queries.len());
        for query in queries {
            let provider = Arc::clone(&self.provider);
            let query = query.clone();
            let desired = self.target_count * query.fetch_multiplier as usize;
            handles.push(tokio::spawn(async move {
                execute_query(provider, query, desired).await
            }));
        }

        let mut seen: HashSet<MediaKey> = HashSet::new();
        let mut candidates = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(items) => {
                    for item in items {
                        if seen.insert(item.key()) {
                            candidates.push(item);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Query task panicked");
                }
            }
        }

        if let Some(rules) = cultural {
            let before = candidates.len();
            candidates.retain(|item| !violates_language_rules(item, rules));
            if candidates.len() < before {
                tracing::debug!(
                    dropped = before - candidates.len(),
                    "Dropped candidates in excluded languages"
                );
            }
        }

        tracing::debug!(candidates = candidates.len(), "Fetched candidates");
        candidates
    }

    fn social_response(&self, text: &str, kind: &IntentKind, turn: u32) -> EngineResponse {
        EngineResponse {
            message: EngineMessage {
                text: text.to_string(),
                items: Vec::new(),
                metadata: ResponseMetadata {
                    intent: *kind,
                    source: None,
                    reference_title: None,
                    ambiguity_score: 0.0,
                    fallback_used: false,
                    turn,
                },
            },
            suggested_follow_ups: Vec::new(),
        }
    }

    fn question_response(
        &self,
        lead: &str,
        questions: &[ClarifyingQuestion],
        intent: IntentKind,
        score: f32,
        turn: u32,
    ) -> EngineResponse {
        let question_text = questions
            .iter()
            .map(|q| q.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let text = if question_text.is_empty() {
            lead.to_string()
        } else {
            format!("{} {}", lead, question_text)
        };

        // Quick replies come from the highest-priority question
        let follow_ups = questions
            .first()
            .map(|q| q.options.clone())
            .unwrap_or_default();

        EngineResponse {
            message: EngineMessage {
                text,
                items: Vec::new(),
                metadata: ResponseMetadata {
                    intent,
                    source: None,
                    reference_title: None,
                    ambiguity_score: score,
                    fallback_used: false,
                    turn,
                },
            },
            suggested_follow_ups: follow_ups,
        }
    }
}

/// Run one catalog query, paging until enough candidates are collected.
/// Errors are logged and yield whatever was fetched so far.
async fn execute_query(
    provider: Arc<dyn CatalogProvider>,
    query: CatalogQuery,
    desired: usize,
) -> Vec<MediaItem> {
    let mut collected = Vec::new();

    for page in 1..=MAX_PAGES_PER_QUERY {
        let result = match &query.kind {
            QueryKind::Discover(params) => {
                let mut params = params.clone();
                params.page = page;
                provider.discover(query.media_type, params).await
            }
            QueryKind::Search(text) => provider.search(query.media_type, text, page).await,
            QueryKind::Trending => {
                provider
                    .trending(
                        query.media_type,
                        crate::services::providers::TrendingWindow::Week,
                        page,
                    )
                    .await
            }
            QueryKind::TopRated => provider.top_rated(query.media_type, page).await,
        };

        match result {
            Ok(result_page) => {
                let last_page = page >= result_page.total_pages;
                collected.extend(result_page.items);
                if collected.len() >= desired || last_page {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    media_type = %query.media_type,
                    page = page,
                    "Catalog query failed"
                );
                break;
            }
        }
    }

    collected.truncate(desired);
    collected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MediaType, Paginated};
    use crate::services::providers::{MediaDetails, MockCatalogProvider};

    fn item(id: u64, genres: &[u16], language: &str) -> MediaItem {
        MediaItem {
            id,
            media_type: MediaType::Movie,
            title: format!("Title {}", id),
            poster_path: None,
            backdrop_path: None,
            overview: None,
            release_date: Some("2020-06-01".to_string()),
            vote_average: 7.0,
            vote_count: 1000,
            genre_ids: genres.to_vec(),
            original_language: Some(language.to_string()),
            popularity: Some(50.0),
        }
    }

    fn page_of(items: Vec<MediaItem>) -> Paginated<MediaItem> {
        let total = items.len() as u64;
        Paginated {
            items,
            page: 1,
            total_pages: 1,
            total_results: total,
        }
    }

    #[tokio::test]
    async fn test_greeting_short_circuits_catalog() {
        let provider = MockCatalogProvider::new();
        let mut conversation = Conversation::new(Arc::new(provider), 5);

        let response = conversation.process_message("hello").await;
        assert!(response.message.items.is_empty());
        assert_eq!(response.message.metadata.intent, IntentKind::Greeting);
        assert!(!response.suggested_follow_ups.is_empty());
    }

    #[tokio::test]
    async fn test_thanks_short_circuits_catalog() {
        let provider = MockCatalogProvider::new();
        let mut conversation = Conversation::new(Arc::new(provider), 5);

        let response = conversation.process_message("thanks a lot!").await;
        assert!(response.message.items.is_empty());
        assert_eq!(response.message.metadata.intent, IntentKind::Thanks);
    }

    #[tokio::test]
    async fn test_vague_message_asks_instead_of_fetching() {
        let provider = MockCatalogProvider::new();
        let mut conversation = Conversation::new(Arc::new(provider), 5);

        let response = conversation.process_message("something").await;
        assert!(response.message.items.is_empty());
        assert!(response.message.text.contains('?'));
        assert!(!response.suggested_follow_ups.is_empty());
    }

    #[tokio::test]
    async fn test_genre_request_returns_ranked_items() {
        let mut provider = MockCatalogProvider::new();
        provider.expect_discover().returning(|_, _| {
            Ok(page_of(vec![
                item(1, &[28], "en"),
                item(2, &[28, 12], "en"),
                item(3, &[35], "en"),
            ]))
        });
        let mut conversation = Conversation::new(Arc::new(provider), 5);

        let response = conversation.process_message("recommend action movies").await;
        assert!(!response.message.items.is_empty());
        assert!(!response.message.metadata.fallback_used);
        assert_eq!(response.message.metadata.turn, 1);
        assert!(response.suggested_follow_ups.len() <= MAX_FOLLOW_UPS);
    }

    #[tokio::test]
    async fn test_repeat_turn_falls_back_when_everything_excluded() {
        let mut provider = MockCatalogProvider::new();
        provider
            .expect_discover()
            .returning(|_, _| Ok(page_of(vec![item(1, &[28], "en"), item(2, &[28], "en")])));
        provider
            .expect_trending()
            .returning(|_, _, _| Ok(page_of(vec![item(50, &[35], "en"), item(51, &[18], "en")])));
        let mut conversation = Conversation::new(Arc::new(provider), 5);

        let first = conversation.process_message("recommend action movies").await;
        assert!(!first.message.metadata.fallback_used);

        // Second turn gets the identical discover page; everything is
        // already excluded, so the fallback ladder kicks in
        let second = conversation.process_message("more action movies please").await;
        assert!(second.message.metadata.fallback_used);
        assert!(second.message.items.iter().all(|i| i.id >= 50));
    }

    #[tokio::test]
    async fn test_exhausted_fallback_yields_apology() {
        let mut provider = MockCatalogProvider::new();
        provider
            .expect_discover()
            .returning(|_, _| Ok(Paginated::empty()));
        provider
            .expect_trending()
            .returning(|_, _, _| Ok(Paginated::empty()));
        provider
            .expect_top_rated()
            .returning(|_, _| Ok(Paginated::empty()));
        let mut conversation = Conversation::new(Arc::new(provider), 5);

        let response = conversation.process_message("recommend action movies").await;
        assert!(response.message.items.is_empty());
        assert!(response.message.metadata.fallback_used);
        assert!(response.message.text.contains("sorry"));
    }

    #[tokio::test]
    async fn test_reference_request_filters_excluded_language() {
        let mut provider = MockCatalogProvider::new();

        let mut baahubali = item(100, &[28, 18], "te");
        baahubali.title = "Baahubali: The Beginning".to_string();
        baahubali.vote_count = 8000;
        baahubali.popularity = Some(120.0);

        let search_result = baahubali.clone();
        provider
            .expect_search()
            .returning(move |_, _, _| Ok(page_of(vec![search_result.clone()])));

        let details_item = baahubali.clone();
        provider.expect_details().returning(move |_, _| {
            Ok(MediaDetails {
                item: details_item.clone(),
                spoken_languages: vec!["te".to_string()],
                production_countries: vec!["IN".to_string()],
                keywords: vec!["epic".to_string()],
            })
        });

        provider.expect_discover().returning(|_, _| {
            Ok(page_of(vec![
                item(200, &[28], "te"),
                item(201, &[28], "hi"),
                item(202, &[28], "en"),
            ]))
        });

        let mut conversation = Conversation::new(Arc::new(provider), 5);
        let response = conversation
            .process_message("movies like Baahubali")
            .await;

        assert_eq!(
            response.message.metadata.reference_title.as_deref(),
            Some("Baahubali: The Beginning")
        );
        assert!(!response.message.items.is_empty());
        assert!(response
            .message
            .items
            .iter()
            .all(|i| i.original_language.as_deref() != Some("en")));
    }

    #[tokio::test]
    async fn test_cultural_fallback_keeps_language_exclusions() {
        let mut provider = MockCatalogProvider::new();

        let mut baahubali = item(100, &[28, 18], "te");
        baahubali.title = "Baahubali: The Beginning".to_string();
        baahubali.vote_count = 8000;
        baahubali.popularity = Some(120.0);

        let search_result = baahubali.clone();
        provider
            .expect_search()
            .returning(move |_, _, _| Ok(page_of(vec![search_result.clone()])));

        let details_item = baahubali.clone();
        provider.expect_details().returning(move |_, _| {
            Ok(MediaDetails {
                item: details_item.clone(),
                spoken_languages: vec!["te".to_string()],
                production_countries: vec!["IN".to_string()],
                keywords: vec!["epic".to_string()],
            })
        });

        // Primary queries come back empty, forcing the fallback ladder,
        // which serves a mixed-language trending page
        provider
            .expect_discover()
            .returning(|_, _| Ok(Paginated::empty()));
        provider
            .expect_trending()
            .returning(|_, _, _| Ok(page_of(vec![item(500, &[28], "en"), item(501, &[28], "te")])));

        let mut conversation = Conversation::new(Arc::new(provider), 5);
        let response = conversation.process_message("movies like Baahubali").await;

        assert!(response.message.metadata.fallback_used);
        assert!(!response.message.items.is_empty());
        assert!(response
            .message
            .items
            .iter()
            .all(|i| i.original_language.as_deref() != Some("en")));
    }

    #[tokio::test]
    async fn test_reset_and_stats() {
        let mut provider = MockCatalogProvider::new();
        provider
            .expect_discover()
            .returning(|_, _| Ok(page_of(vec![item(1, &[28], "en"), item(2, &[35], "en")])));
        let mut conversation = Conversation::new(Arc::new(provider), 5);

        conversation.process_message("recommend action movies").await;
        let stats = conversation.stats();
        assert_eq!(stats.turn_count, 1);
        assert!(stats.total_recommended > 0);
        assert!(!stats.top_genres.is_empty());

        conversation.reset();
        let stats = conversation.stats();
        assert_eq!(stats.turn_count, 0);
        assert_eq!(stats.total_recommended, 0);
    }
}
