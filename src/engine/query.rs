//! Query generation
//!
//! Maps a parsed intent (plus history-derived filter rules and optional
//! cultural rules) to one or more catalog queries and the response text
//! templates that go with them. The `source` tag on each query only drives
//! response wording, never ranking.

use serde::Serialize;

use crate::engine::history::FilterRules;
use crate::models::{
    genre_name, CulturalFilterRules, IntentKind, MediaType, ParsedIntent, StorytellingStyle,
};
use crate::services::providers::{DiscoverParams, SortBy};

/// Extra candidates requested per target slot when filter rules are active,
/// so the ranker has room to enforce diversity
const FILTERED_FETCH_MULTIPLIER: u32 = 3;
const CULTURAL_FETCH_MULTIPLIER: u32 = 4;
const MAX_SECONDARY_LANGUAGE_QUERIES: usize = 2;

/// Where a query came from; selects response templates only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuerySource {
    Mood,
    Genre,
    Search,
    Trending,
    TopRated,
    Similar,
    Cultural,
    Variety,
    Random,
}

/// Concrete catalog operation a query maps to
#[derive(Debug, Clone, PartialEq)]
pub enum QueryKind {
    Discover(DiscoverParams),
    Search(String),
    Trending,
    TopRated,
}

#[derive(Debug, Clone)]
pub struct CatalogQuery {
    pub media_type: MediaType,
    pub kind: QueryKind,
    pub source: QuerySource,
    pub fetch_multiplier: u32,
}

/// Everything the orchestrator needs for one turn of fetching
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub queries: Vec<CatalogQuery>,
    pub source: QuerySource,
    pub intro: String,
    pub explanation: String,
    pub follow_ups: Vec<String>,
}

/// Build the query plan for a turn
pub fn build_plan(
    intent: &ParsedIntent,
    rules: &FilterRules,
    cultural: Option<&CulturalFilterRules>,
) -> QueryPlan {
    if let Some(cultural_rules) = cultural {
        return cultural_plan(intent, cultural_rules);
    }

    match intent.kind {
        IntentKind::Trending => simple_plan(intent, QueryKind::Trending, QuerySource::Trending),
        IntentKind::TopRated => top_rated_plan(intent),
        IntentKind::Search if !intent.keywords.is_empty() => search_plan(intent),
        IntentKind::Similar => similar_plan(intent, rules),
        _ => discover_plan(intent, rules),
    }
}

/// Genres for the turn: explicit genres plus mood expansions, with cooldown
/// genres removed unless that would leave nothing to query.
pub fn effective_genres(intent: &ParsedIntent, rules: &FilterRules) -> Vec<u16> {
    let mut genres = intent.genre_ids.clone();
    for mood in &intent.moods {
        for id in mood.genre_ids() {
            if !genres.contains(id) {
                genres.push(*id);
            }
        }
    }

    let filtered: Vec<u16> = genres
        .iter()
        .copied()
        .filter(|id| !rules.genre_cooldowns.contains_key(id))
        .collect();

    // Cooldown is advisory: dropping every requested genre would produce a
    // worse answer than repeating one
    if filtered.is_empty() {
        genres
    } else {
        filtered
    }
}

fn base_discover(intent: &ParsedIntent, rules: &FilterRules) -> DiscoverParams {
    use chrono::Datelike;
    let current_year = chrono::Utc::now().year();

    let mut params = DiscoverParams {
        genres: effective_genres(intent, rules),
        min_rating: intent.min_rating,
        min_votes: Some(100),
        sort_by: Some(SortBy::PopularityDesc),
        page: 1,
        ..Default::default()
    };

    if let Some(year) = intent.year {
        params.year = Some(year);
    } else if let Some(era) = intent.era {
        params.year_range = Some(era.year_range(current_year));
    }

    if let Some(band) = &rules.preferred_popularity {
        if params.min_rating.is_none() {
            params.min_rating = Some(band.min_rating);
            params.max_rating = Some(band.max_rating);
        }
    }

    params
}

fn fetch_multiplier(rules: &FilterRules) -> u32 {
    if rules.is_empty() {
        1
    } else {
        FILTERED_FETCH_MULTIPLIER
    }
}

fn discover_plan(intent: &ParsedIntent, rules: &FilterRules) -> QueryPlan {
    let params = base_discover(intent, rules);
    let source = if !intent.moods.is_empty() {
        QuerySource::Mood
    } else if !intent.genre_ids.is_empty() {
        QuerySource::Genre
    } else {
        QuerySource::Random
    };

    let multiplier = fetch_multiplier(rules);
    let queries = intent
        .media_type
        .concrete()
        .into_iter()
        .map(|media_type| CatalogQuery {
            media_type,
            kind: QueryKind::Discover(params.clone()),
            source,
            fetch_multiplier: multiplier,
        })
        .collect();

    let (intro, explanation) = discover_text(intent, source, &params);

    QueryPlan {
        queries,
        source,
        intro,
        explanation,
        follow_ups: default_follow_ups(intent),
    }
}

fn simple_plan(intent: &ParsedIntent, kind: QueryKind, source: QuerySource) -> QueryPlan {
    let queries = intent
        .media_type
        .concrete()
        .into_iter()
        .map(|media_type| CatalogQuery {
            media_type,
            kind: kind.clone(),
            source,
            fetch_multiplier: 1,
        })
        .collect();

    let intro = match source {
        QuerySource::Trending => "Here's what everyone is watching right now:".to_string(),
        _ => "Here you go:".to_string(),
    };

    QueryPlan {
        queries,
        source,
        intro,
        explanation: String::new(),
        follow_ups: default_follow_ups(intent),
    }
}

fn top_rated_plan(intent: &ParsedIntent) -> QueryPlan {
    // Genre-scoped "best of" requests go through discover so the genre
    // filter applies; plain ones use the canonical top-rated lists
    let queries = if intent.genre_ids.is_empty() {
        intent
            .media_type
            .concrete()
            .into_iter()
            .map(|media_type| CatalogQuery {
                media_type,
                kind: QueryKind::TopRated,
                source: QuerySource::TopRated,
                fetch_multiplier: 1,
            })
            .collect()
    } else {
        let params = DiscoverParams {
            genres: intent.genre_ids.clone(),
            min_rating: Some(intent.min_rating.unwrap_or(7.5)),
            min_votes: Some(500),
            sort_by: Some(SortBy::VoteAverageDesc),
            page: 1,
            ..Default::default()
        };
        intent
            .media_type
            .concrete()
            .into_iter()
            .map(|media_type| CatalogQuery {
                media_type,
                kind: QueryKind::Discover(params.clone()),
                source: QuerySource::TopRated,
                fetch_multiplier: 1,
            })
            .collect()
    };

    QueryPlan {
        queries,
        source: QuerySource::TopRated,
        intro: "These are some of the highest-rated titles of all time:".to_string(),
        explanation: String::new(),
        follow_ups: default_follow_ups(intent),
    }
}

fn search_plan(intent: &ParsedIntent) -> QueryPlan {
    let query_text = intent.keywords.join(" ");
    let queries = intent
        .media_type
        .concrete()
        .into_iter()
        .map(|media_type| CatalogQuery {
            media_type,
            kind: QueryKind::Search(query_text.clone()),
            source: QuerySource::Search,
            fetch_multiplier: 1,
        })
        .collect();

    QueryPlan {
        queries,
        source: QuerySource::Search,
        intro: format!("Here's what I found for \"{}\":", query_text),
        explanation: String::new(),
        follow_ups: default_follow_ups(intent),
    }
}

/// Similar-to without a resolved reference: fall back to genre discovery
/// over whatever the user stated explicitly
fn similar_plan(intent: &ParsedIntent, rules: &FilterRules) -> QueryPlan {
    let mut plan = discover_plan(intent, rules);
    plan.source = QuerySource::Similar;
    for query in &mut plan.queries {
        query.source = QuerySource::Similar;
    }
    plan.intro = "I couldn't pin down that exact title, but these should be close:".to_string();
    plan
}

/// Cultural plan: hard language/country rules, a larger candidate pool, and
/// up to two secondary queries for related regional languages
fn cultural_plan(intent: &ParsedIntent, rules: &CulturalFilterRules) -> QueryPlan {
    let media_types = intent.media_type.concrete();
    let mut queries = Vec::new();

    let style_genres = rules
        .allowed_styles
        .first()
        .map(|style| style_genre_ids(*style))
        .unwrap_or_default();

    let base = DiscoverParams {
        genres: style_genres,
        min_rating: Some(6.0),
        // Scale the vote floor with the appeal threshold so a blockbuster
        // reference never surfaces unvetted niche titles
        min_votes: Some(rules.min_mass_appeal as u64 * 10),
        sort_by: Some(SortBy::PopularityDesc),
        original_language: None,
        exclude_original_language: rules.exclude_languages.first().cloned(),
        region: rules.preferred_countries.first().cloned(),
        page: 1,
        ..Default::default()
    };

    let primary_language = rules.preferred_languages.first().cloned();
    for media_type in &media_types {
        queries.push(CatalogQuery {
            media_type: *media_type,
            kind: QueryKind::Discover(DiscoverParams {
                original_language: primary_language.clone(),
                ..base.clone()
            }),
            source: QuerySource::Cultural,
            fetch_multiplier: CULTURAL_FETCH_MULTIPLIER,
        });
    }

    // Secondary queries only exist when the mass-appeal relaxation put more
    // than one language in the preferred set
    for language in rules
        .preferred_languages
        .iter()
        .skip(1)
        .take(MAX_SECONDARY_LANGUAGE_QUERIES)
    {
        queries.push(CatalogQuery {
            media_type: media_types[0],
            kind: QueryKind::Discover(DiscoverParams {
                original_language: Some(language.clone()),
                ..base.clone()
            }),
            source: QuerySource::Cultural,
            fetch_multiplier: 2,
        });
    }

    let themes = if rules.preferred_themes.is_empty() {
        "a similar feel".to_string()
    } else {
        rules.preferred_themes.join(", ")
    };

    QueryPlan {
        queries,
        source: QuerySource::Cultural,
        intro: format!("Since you enjoyed {}, try these:", rules.reference_title),
        explanation: format!(
            "I looked for titles sharing {} with {}.",
            themes, rules.reference_title
        ),
        follow_ups: vec![
            format!("More like {}", rules.reference_title),
            "Something completely different".to_string(),
            "Only the highest rated".to_string(),
        ],
    }
}

/// Genre ids that best approximate a storytelling style in discover queries
fn style_genre_ids(style: StorytellingStyle) -> Vec<u16> {
    match style {
        StorytellingStyle::CommercialMasala => vec![28],
        StorytellingStyle::ActionSpectacle => vec![28],
        StorytellingStyle::EmotionalDrama => vec![18],
        StorytellingStyle::ThrillerSuspense => vec![53],
        StorytellingStyle::Balanced => vec![],
    }
}

fn discover_text(
    intent: &ParsedIntent,
    source: QuerySource,
    params: &DiscoverParams,
) -> (String, String) {
    let genre_list = params
        .genres
        .iter()
        .map(|id| genre_name(*id))
        .collect::<Vec<_>>()
        .join(", ");

    let intro = match source {
        QuerySource::Mood => {
            let mood = intent
                .moods
                .first()
                .map(|m| m.label())
                .unwrap_or("that mood");
            format!("Here are some {} picks for you:", mood)
        }
        QuerySource::Genre => format!("Some {} titles you might enjoy:", genre_list),
        _ => "Here are a few picks you might like:".to_string(),
    };

    let mut notes = Vec::new();
    if !genre_list.is_empty() {
        notes.push(format!("matched on {}", genre_list));
    }
    if let Some(era) = intent.era {
        notes.push(format!("from the {} era", era.label()));
    }
    if let Some(rating) = params.min_rating {
        notes.push(format!("rated {:.1}+", rating));
    }

    let explanation = if notes.is_empty() {
        String::new()
    } else {
        format!("I {}.", notes.join(", "))
    };

    (intro, explanation)
}

fn default_follow_ups(intent: &ParsedIntent) -> Vec<String> {
    let mut follow_ups = vec![
        "Show me something different".to_string(),
        "More like these".to_string(),
    ];
    if intent.media_type == MediaType::Movie {
        follow_ups.push("What about series?".to_string());
    } else {
        follow_ups.push("Only movies, please".to_string());
    }
    follow_ups
}
