//! Per-conversation recommendation history
//!
//! Owned by exactly one `Conversation`; no global state. The turn counter is
//! incremented exactly once per user message via `start_new_turn`, and every
//! window calculation below is relative to that counter, so it must be
//! advanced before any rules are derived for the turn.

use chrono::{Datelike, Utc};
use std::collections::{HashMap, HashSet};

use crate::models::{Era, MediaItem, MediaKey, RecommendedItem};

/// Rolling window (in turns) for genre cooldown calculations
const COOLDOWN_WINDOW: u32 = 3;
/// A genre recommended this many times inside the window enters cooldown
const COOLDOWN_TRIGGER: usize = 2;
/// Window (in turns) for cross-turn similarity penalties
const SIMILARITY_WINDOW: u32 = 2;
const SIMILARITY_THRESHOLD: f32 = 0.7;
/// Fraction of recent items in one genre that triggers a variety suggestion
const VARIETY_DOMINANCE: f32 = 0.6;

const HIGH_RATING: f32 = 7.5;
const MEDIUM_RATING: f32 = 6.0;

/// Substring matching strategy for deriving tags from title text.
/// Single contract so the heuristic tables can be swapped without touching
/// the scoring pipeline.
pub trait TitleMatcher: Send + Sync {
    /// Tags whose keyword groups match the given text
    fn matches(&self, text: &str) -> Vec<&'static str>;
}

/// Franchise keyword groups: a title containing any keyword in a group
/// belongs to that franchise.
const FRANCHISE_GROUPS: &[(&str, &[&str])] = &[
    ("marvel", &["avengers", "iron man", "captain america", "thor", "spider-man", "guardians of the galaxy", "black panther"]),
    ("dc", &["batman", "superman", "justice league", "aquaman", "dark knight", "joker"]),
    ("star-wars", &["star wars", "skywalker", "mandalorian"]),
    ("harry-potter", &["harry potter", "fantastic beasts"]),
    ("fast-furious", &["fast & furious", "fast and furious", "furious"]),
    ("mission-impossible", &["mission: impossible", "mission impossible"]),
    ("james-bond", &["james bond", "007"]),
    ("jurassic", &["jurassic"]),
    ("transformers", &["transformers"]),
    ("middle-earth", &["lord of the rings", "hobbit"]),
    ("baahubali", &["baahubali", "bahubali"]),
    ("kgf", &["kgf"]),
    ("pushpa", &["pushpa"]),
];

/// Default matcher over the fixed franchise keyword groups
pub struct FranchiseMatcher;

impl TitleMatcher for FranchiseMatcher {
    fn matches(&self, text: &str) -> Vec<&'static str> {
        let lower = text.to_lowercase();
        FRANCHISE_GROUPS
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|kw| lower.contains(kw)))
            .map(|(tag, _)| *tag)
            .collect()
    }
}

/// First franchise tag matching a title, if any
pub fn detect_franchise(matcher: &dyn TitleMatcher, title: &str) -> Option<&'static str> {
    matcher.matches(title).into_iter().next()
}

/// Preferred vote-average band derived from history skew
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopularityBand {
    pub min_rating: f32,
    pub max_rating: f32,
    pub label: &'static str,
}

impl PopularityBand {
    /// Band favoring lesser-known titles when history skews blockbuster
    pub fn hidden_gems() -> Self {
        Self {
            min_rating: 5.5,
            max_rating: 7.5,
            label: "hidden-gems",
        }
    }

    /// Band favoring stronger titles when history skews low-rated
    pub fn higher_rated() -> Self {
        Self {
            min_rating: 7.0,
            max_rating: 10.0,
            label: "higher-rated",
        }
    }
}

/// Per-turn derived exclusion and cooldown rules. Recomputed fresh every
/// turn from the rolling history windows; never persisted.
#[derive(Debug, Clone, Default)]
pub struct FilterRules {
    pub exclude_keys: HashSet<MediaKey>,
    /// Genre ID -> turns remaining before it may dominate again (always >= 1)
    pub genre_cooldowns: HashMap<u16, u32>,
    pub franchise_exclusions: Vec<&'static str>,
    pub preferred_popularity: Option<PopularityBand>,
    pub preferred_eras: Vec<Era>,
}

impl FilterRules {
    pub fn is_empty(&self) -> bool {
        self.exclude_keys.is_empty()
            && self.genre_cooldowns.is_empty()
            && self.franchise_exclusions.is_empty()
            && self.preferred_popularity.is_none()
    }
}

/// Session statistics exposed through the API
#[derive(Debug, Clone, serde::Serialize)]
pub struct HistoryStats {
    pub total_recommended: usize,
    pub turn_count: u32,
    pub genre_counts: HashMap<u16, usize>,
}

/// Session-scoped mutable recommendation state
pub struct RecommendationHistory {
    items: Vec<RecommendedItem>,
    recommended_keys: HashSet<MediaKey>,
    turn: u32,
    matcher: Box<dyn TitleMatcher>,
}

impl Default for RecommendationHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl RecommendationHistory {
    pub fn new() -> Self {
        Self::with_matcher(Box::new(FranchiseMatcher))
    }

    pub fn with_matcher(matcher: Box<dyn TitleMatcher>) -> Self {
        Self {
            items: Vec::new(),
            recommended_keys: HashSet::new(),
            turn: 0,
            matcher,
        }
    }

    /// Advance the turn counter. Must be called exactly once per user
    /// message, before any other read for that turn.
    pub fn start_new_turn(&mut self) -> u32 {
        self.turn += 1;
        self.turn
    }

    pub fn current_turn(&self) -> u32 {
        self.turn
    }

    pub fn matcher(&self) -> &dyn TitleMatcher {
        self.matcher.as_ref()
    }

    /// Record a batch of recommendations under the current turn
    pub fn add_recommendations(&mut self, items: &[MediaItem]) {
        for item in items {
            let entry = RecommendedItem::from_media(item, self.turn);
            self.recommended_keys.insert(entry.key());
            self.items.push(entry);
        }

        tracing::debug!(
            added = items.len(),
            total = self.items.len(),
            turn = self.turn,
            "Recorded recommendations"
        );
    }

    pub fn is_recommended(&self, key: &MediaKey) -> bool {
        self.recommended_keys.contains(key)
    }

    /// Derive this turn's exclusion and cooldown rules
    pub fn generate_filter_rules(&self) -> FilterRules {
        FilterRules {
            exclude_keys: self.recommended_keys.clone(),
            genre_cooldowns: self.genre_cooldowns(),
            franchise_exclusions: self.recent_franchises(),
            preferred_popularity: self.preferred_popularity(),
            preferred_eras: self.underrepresented_eras(),
        }
    }

    /// Genres recommended at least COOLDOWN_TRIGGER times in the last
    /// COOLDOWN_WINDOW turns, with remaining turns clamped to >= 1.
    fn genre_cooldowns(&self) -> HashMap<u16, u32> {
        let mut counts: HashMap<u16, usize> = HashMap::new();
        for entry in self.window(COOLDOWN_WINDOW) {
            for genre in &entry.genre_ids {
                *counts.entry(*genre).or_default() += 1;
            }
        }

        let remaining = (COOLDOWN_WINDOW - (self.turn % COOLDOWN_WINDOW)).max(1);
        counts
            .into_iter()
            .filter(|(_, count)| *count >= COOLDOWN_TRIGGER)
            .map(|(genre, _)| (genre, remaining))
            .collect()
    }

    /// Franchises seen in the similarity window, so sequels of what we just
    /// recommended do not come straight back
    fn recent_franchises(&self) -> Vec<&'static str> {
        let mut franchises = Vec::new();
        for entry in self.window(SIMILARITY_WINDOW) {
            if let Some(tag) = detect_franchise(self.matcher.as_ref(), &entry.title) {
                if !franchises.contains(&tag) {
                    franchises.push(tag);
                }
            }
        }
        franchises
    }

    /// Shift toward hidden gems when history skews high-rated, or toward
    /// stronger titles when it skews low
    fn preferred_popularity(&self) -> Option<PopularityBand> {
        if self.items.is_empty() {
            return None;
        }

        let total = self.items.len() as f32;
        let high = self
            .items
            .iter()
            .filter(|i| i.vote_average >= HIGH_RATING)
            .count() as f32;
        let low = self
            .items
            .iter()
            .filter(|i| i.vote_average < MEDIUM_RATING)
            .count() as f32;

        if high / total > 0.7 {
            Some(PopularityBand::hidden_gems())
        } else if low / total > 0.5 {
            Some(PopularityBand::higher_rated())
        } else {
            None
        }
    }

    /// Eras with fewer than 2 occurrences across the whole session
    fn underrepresented_eras(&self) -> Vec<Era> {
        let current_year = Utc::now().year();
        let mut counts: HashMap<Era, usize> = HashMap::new();
        for entry in &self.items {
            if let Some(year) = entry.release_year {
                *counts.entry(Era::from_year(year, current_year)).or_default() += 1;
            }
        }

        [
            Era::Latest,
            Era::Y2020s,
            Era::Y2010s,
            Era::Y2000s,
            Era::Y1990s,
            Era::Y1980s,
            Era::Classic,
        ]
        .into_iter()
        .filter(|era| counts.get(era).copied().unwrap_or(0) < 2)
        .collect()
    }

    /// Weighted similarity of a candidate against the last two turns.
    /// Returns the maximum per-entry score when it crosses the threshold,
    /// otherwise 0 - no partial penalty below the line.
    pub fn get_similarity_penalty(&self, item: &MediaItem) -> f32 {
        let current_year = Utc::now().year();
        let item_era = item.release_year().map(|y| Era::from_year(y, current_year));
        let item_franchise = detect_franchise(self.matcher.as_ref(), &item.title);

        let mut max_score: f32 = 0.0;
        for entry in self.window(SIMILARITY_WINDOW) {
            let genre_overlap = jaccard(&item.genre_ids, &entry.genre_ids);

            let era_match = match (item_era, entry.release_year) {
                (Some(era), Some(year)) if era == Era::from_year(year, current_year) => 1.0,
                _ => 0.0,
            };

            let rating_closeness =
                (1.0 - (item.vote_average - entry.vote_average).abs() / 10.0).max(0.0);

            let franchise_match = match item_franchise {
                Some(tag) if detect_franchise(self.matcher.as_ref(), &entry.title) == Some(tag) => {
                    1.0
                }
                _ => 0.0,
            };

            let score = 0.4 * genre_overlap
                + 0.2 * era_match
                + 0.2 * rating_closeness
                + 0.2 * franchise_match;
            max_score = max_score.max(score);
        }

        if max_score > SIMILARITY_THRESHOLD {
            max_score
        } else {
            0.0
        }
    }

    /// True when one genre dominates the recent window and it is worth
    /// nudging the user toward something different
    pub fn should_suggest_variety(&self) -> bool {
        if self.turn < 3 {
            return false;
        }

        let recent: Vec<&RecommendedItem> = self.window(SIMILARITY_WINDOW).collect();
        if recent.is_empty() {
            return false;
        }

        let mut counts: HashMap<u16, usize> = HashMap::new();
        for entry in &recent {
            for genre in &entry.genre_ids {
                *counts.entry(*genre).or_default() += 1;
            }
        }

        counts
            .values()
            .any(|count| *count as f32 / recent.len() as f32 > VARIETY_DOMINANCE)
    }

    /// Genres the user has seen fewer than `ceiling` times recently, for
    /// clarifying-question option sampling
    pub fn unsaturated_genres(&self, ceiling: usize) -> Vec<u16> {
        let mut counts: HashMap<u16, usize> = HashMap::new();
        for entry in self.window(COOLDOWN_WINDOW) {
            for genre in &entry.genre_ids {
                *counts.entry(*genre).or_default() += 1;
            }
        }

        crate::models::GENRES
            .iter()
            .map(|g| g.id)
            .filter(|id| counts.get(id).copied().unwrap_or(0) < ceiling)
            .collect()
    }

    pub fn stats(&self) -> HistoryStats {
        let mut genre_counts: HashMap<u16, usize> = HashMap::new();
        for entry in &self.items {
            for genre in &entry.genre_ids {
                *genre_counts.entry(*genre).or_default() += 1;
            }
        }

        HistoryStats {
            total_recommended: self.items.len(),
            turn_count: self.turn,
            genre_counts,
        }
    }

    /// Discard all state; used when the conversation is explicitly reset
    pub fn reset(&mut self) {
        self.items.clear();
        self.recommended_keys.clear();
        self.turn = 0;
    }

    /// Entries from the last `turns` completed turns, relative to the
    /// current (in-progress) turn
    fn window(&self, turns: u32) -> impl Iterator<Item = &RecommendedItem> {
        let floor = self.turn.saturating_sub(turns);
        self.items.iter().filter(move |entry| entry.turn > floor)
    }
}

fn jaccard(a: &[u16], b: &[u16]) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let a_set: HashSet<u16> = a.iter().copied().collect();
    let b_set: HashSet<u16> = b.iter().copied().collect();
    let intersection = a_set.intersection(&b_set).count() as f32;
    let union = a_set.union(&b_set).count() as f32;
    intersection / union
}
