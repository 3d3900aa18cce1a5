//! Diversity-aware candidate ranking
//!
//! Greedy selection: every remaining candidate is re-scored against the
//! running selection before each pick, so penalties from what was just
//! selected apply immediately. All scores are clamped to [0, 1] and
//! selection stops once the best remaining candidate scores too low to be
//! worth showing.

use chrono::{Datelike, Utc};
use std::collections::HashSet;

use crate::engine::history::{detect_franchise, FilterRules, RecommendationHistory};
use crate::models::{Era, MediaItem};

/// Per-genre saturation penalty, capped across genres
const GENRE_SATURATION_PENALTY: f32 = 0.15;
const GENRE_SATURATION_CAP: f32 = 0.5;
/// Selected items sharing a genre before that genre counts as saturated
const MAX_SAME_GENRE: usize = 2;
/// Selected items sharing an era before the era penalty applies
const MAX_SAME_ERA: usize = 2;
const ERA_REPETITION_PENALTY: f32 = 0.2;
const FRANCHISE_EXCLUSION_PENALTY: f32 = 0.4;
const BATCH_FRANCHISE_PENALTY: f32 = 0.3;
/// Genre overlap with an already-selected item above this draws a penalty
const BATCH_OVERLAP_THRESHOLD: f32 = 0.7;
const BATCH_OVERLAP_PENALTY: f32 = 0.2;
const HISTORY_SIMILARITY_WEIGHT: f32 = 0.5;
const UNSEEN_GENRE_BOOST: f32 = 0.1;
const PREFERRED_ERA_BOOST: f32 = 0.05;
/// Selection stops when the best remaining candidate scores at or below this
const STOP_SCORE: f32 = 0.2;

/// A candidate with its final diversity score and the signals behind it
#[derive(Debug, Clone)]
pub struct ScoredItem {
    pub item: MediaItem,
    pub score: f32,
    pub breakdown: ScoreBreakdown,
}

#[derive(Debug, Clone, Default)]
pub struct ScoreBreakdown {
    pub genre_saturation: f32,
    pub era_repetition: f32,
    pub franchise_exclusion: f32,
    pub batch_franchise: f32,
    pub batch_overlap: f32,
    pub history_similarity: f32,
    pub freshness_boost: f32,
}

/// Greedily select up to `target` diverse candidates.
///
/// Candidates already recommended this session are dropped up front; the
/// rest are re-scored against the growing selection on every iteration.
pub fn select_diverse(
    candidates: Vec<MediaItem>,
    history: &RecommendationHistory,
    rules: &FilterRules,
    target: usize,
) -> Vec<ScoredItem> {
    let before = candidates.len();
    let mut pool: Vec<MediaItem> = candidates
        .into_iter()
        .filter(|item| !rules.exclude_keys.contains(&item.key()))
        .collect();

    if pool.len() < before {
        tracing::debug!(
            dropped = before - pool.len(),
            remaining = pool.len(),
            "Dropped already-recommended candidates"
        );
    }

    let mut selected: Vec<ScoredItem> = Vec::new();

    while selected.len() < target && !pool.is_empty() {
        let mut best_index = 0;
        let mut best = score_candidate(&pool[0], history, rules, &selected);

        for (index, candidate) in pool.iter().enumerate().skip(1) {
            let scored = score_candidate(candidate, history, rules, &selected);
            if scored.score > best.score {
                best_index = index;
                best = scored;
            }
        }

        if best.score <= STOP_SCORE {
            tracing::debug!(
                best_score = best.score,
                selected = selected.len(),
                "Stopping selection, remaining candidates score too low"
            );
            break;
        }

        pool.swap_remove(best_index);
        selected.push(best);
    }

    selected
}

/// Score one candidate against history rules and the current selection
pub fn score_candidate(
    item: &MediaItem,
    history: &RecommendationHistory,
    rules: &FilterRules,
    selected: &[ScoredItem],
) -> ScoredItem {
    // Excluded candidates are force-scored to zero; the selection loop never
    // picks them even if they slip past the pre-filter
    if rules.exclude_keys.contains(&item.key()) {
        return ScoredItem {
            item: item.clone(),
            score: 0.0,
            breakdown: ScoreBreakdown::default(),
        };
    }

    let current_year = Utc::now().year();
    let mut breakdown = ScoreBreakdown::default();
    let mut score: f32 = 1.0;

    // Genre saturation: cooldown genres and genres already common in the
    // current selection both count, capped so a many-genre title is not
    // annihilated
    let mut saturation = 0.0;
    for genre in &item.genre_ids {
        let in_cooldown = rules.genre_cooldowns.contains_key(genre);
        let batch_count = selected
            .iter()
            .filter(|s| s.item.genre_ids.contains(genre))
            .count();
        if in_cooldown || batch_count >= MAX_SAME_GENRE {
            saturation += GENRE_SATURATION_PENALTY;
        }
    }
    breakdown.genre_saturation = saturation.min(GENRE_SATURATION_CAP);
    score -= breakdown.genre_saturation;

    // Era spread inside the batch
    let item_era = item.release_year().map(|y| Era::from_year(y, current_year));
    if let Some(era) = item_era {
        let same_era = selected
            .iter()
            .filter(|s| {
                s.item.release_year().map(|y| Era::from_year(y, current_year)) == Some(era)
            })
            .count();
        if same_era >= MAX_SAME_ERA {
            breakdown.era_repetition = ERA_REPETITION_PENALTY;
            score -= ERA_REPETITION_PENALTY;
        }
    }

    let franchise = detect_franchise(history.matcher(), &item.title);

    if let Some(tag) = franchise {
        if rules.franchise_exclusions.contains(&tag) {
            breakdown.franchise_exclusion = FRANCHISE_EXCLUSION_PENALTY;
            score -= FRANCHISE_EXCLUSION_PENALTY;
        }

        let in_batch = selected
            .iter()
            .any(|s| detect_franchise(history.matcher(), &s.item.title) == Some(tag));
        if in_batch {
            breakdown.batch_franchise = BATCH_FRANCHISE_PENALTY;
            score -= BATCH_FRANCHISE_PENALTY;
        }
    }

    // Heavy genre overlap with anything already picked
    let overlapping = selected
        .iter()
        .any(|s| genre_overlap(&item.genre_ids, &s.item.genre_ids) > BATCH_OVERLAP_THRESHOLD);
    if overlapping {
        breakdown.batch_overlap = BATCH_OVERLAP_PENALTY;
        score -= BATCH_OVERLAP_PENALTY;
    }

    // Similarity to recent turns, at half weight
    let similarity = history.get_similarity_penalty(item);
    if similarity > 0.0 {
        breakdown.history_similarity = similarity * HISTORY_SIMILARITY_WEIGHT;
        score -= breakdown.history_similarity;
    }

    // Freshness boosts only make sense once there is history to be fresh
    // relative to
    let stats = history.stats();
    if stats.total_recommended > 0 {
        let unseen_genre = item
            .genre_ids
            .iter()
            .any(|g| !stats.genre_counts.contains_key(g));
        if unseen_genre {
            breakdown.freshness_boost += UNSEEN_GENRE_BOOST;
        }
        if let Some(era) = item_era {
            if rules.preferred_eras.contains(&era) {
                breakdown.freshness_boost += PREFERRED_ERA_BOOST;
            }
        }
        score += breakdown.freshness_boost;
    }

    ScoredItem {
        item: item.clone(),
        score: score.clamp(0.0, 1.0),
        breakdown,
    }
}

fn genre_overlap(a: &[u16], b: &[u16]) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let a_set: HashSet<u16> = a.iter().copied().collect();
    let b_set: HashSet<u16> = b.iter().copied().collect();
    let intersection = a_set.intersection(&b_set).count() as f32;
    let union = a_set.union(&b_set).count() as f32;
    intersection / union
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MediaKey, MediaType};
    use std::collections::HashMap;

    fn item(id: u64, genres: &[u16], rating: f32, year: &str) -> MediaItem {
        MediaItem {
            id,
            media_type: MediaType::Movie,
            title: format!("Title {}", id),
            poster_path: None,
            backdrop_path: None,
            overview: None,
            release_date: Some(format!("{}-06-01", year)),
            vote_average: rating,
            vote_count: 1000,
            genre_ids: genres.to_vec(),
            original_language: Some("en".to_string()),
            popularity: Some(50.0),
        }
    }

    #[test]
    fn test_excluded_candidates_never_selected() {
        let history = RecommendationHistory::new();
        let mut rules = FilterRules::default();
        rules.exclude_keys.insert(MediaKey {
            id: 1,
            media_type: MediaType::Movie,
        });

        let candidates = vec![item(1, &[28], 7.0, "2020"), item(2, &[35], 7.0, "2021")];
        let selected = select_diverse(candidates, &history, &rules, 5);

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].item.id, 2);
    }

    #[test]
    fn test_excluded_candidate_force_scored_to_zero() {
        let history = RecommendationHistory::new();
        let mut rules = FilterRules::default();
        rules.exclude_keys.insert(MediaKey {
            id: 7,
            media_type: MediaType::Movie,
        });

        let scored = score_candidate(&item(7, &[28], 8.0, "2020"), &history, &rules, &[]);
        assert_eq!(scored.score, 0.0);
    }

    #[test]
    fn test_cooldown_genre_penalized() {
        let history = RecommendationHistory::new();
        let mut cooldowns = HashMap::new();
        cooldowns.insert(28u16, 2u32);
        let rules = FilterRules {
            genre_cooldowns: cooldowns,
            ..Default::default()
        };

        let cooled = score_candidate(&item(1, &[28], 7.0, "2020"), &history, &rules, &[]);
        let fresh = score_candidate(&item(2, &[35], 7.0, "2020"), &history, &rules, &[]);

        assert!(cooled.score < fresh.score);
        assert!((cooled.breakdown.genre_saturation - GENRE_SATURATION_PENALTY).abs() < 1e-6);
    }

    #[test]
    fn test_genre_saturation_capped() {
        let history = RecommendationHistory::new();
        let mut cooldowns = HashMap::new();
        for genre in [28u16, 35, 18, 53, 27] {
            cooldowns.insert(genre, 2u32);
        }
        let rules = FilterRules {
            genre_cooldowns: cooldowns,
            ..Default::default()
        };

        let scored = score_candidate(
            &item(1, &[28, 35, 18, 53, 27], 7.0, "2020"),
            &history,
            &rules,
            &[],
        );
        assert!((scored.breakdown.genre_saturation - GENRE_SATURATION_CAP).abs() < 1e-6);
    }

    #[test]
    fn test_era_repetition_penalty_after_two_same_era() {
        let history = RecommendationHistory::new();
        let rules = FilterRules::default();

        let candidates = vec![
            item(1, &[28], 7.0, "2015"),
            item(2, &[35], 7.0, "2016"),
            item(3, &[18], 7.0, "2017"),
        ];
        let selected = select_diverse(candidates, &history, &rules, 3);

        assert_eq!(selected.len(), 3);
        // Third pick is the second repeat of the 2010s era
        let third = &selected[2];
        assert!((third.breakdown.era_repetition - ERA_REPETITION_PENALTY).abs() < 1e-6);
    }

    #[test]
    fn test_franchise_exclusion_penalty() {
        let history = RecommendationHistory::new();
        let rules = FilterRules {
            franchise_exclusions: vec!["marvel"],
            ..Default::default()
        };

        let mut avengers = item(1, &[28], 8.0, "2012");
        avengers.title = "The Avengers".to_string();

        let scored = score_candidate(&avengers, &history, &rules, &[]);
        assert!((scored.breakdown.franchise_exclusion - FRANCHISE_EXCLUSION_PENALTY).abs() < 1e-6);
    }

    #[test]
    fn test_same_batch_franchise_and_overlap_penalties() {
        let history = RecommendationHistory::new();
        let rules = FilterRules::default();

        let mut first = item(1, &[28, 12], 8.0, "2012");
        first.title = "The Avengers".to_string();
        let mut second = item(2, &[28, 12], 7.8, "2018");
        second.title = "Avengers: Infinity War".to_string();

        let first_scored = score_candidate(&first, &history, &rules, &[]);
        let second_scored = score_candidate(&second, &history, &rules, &[first_scored]);

        assert!((second_scored.breakdown.batch_franchise - BATCH_FRANCHISE_PENALTY).abs() < 1e-6);
        assert!((second_scored.breakdown.batch_overlap - BATCH_OVERLAP_PENALTY).abs() < 1e-6);
        assert!(second_scored.score < 0.6);
    }

    #[test]
    fn test_history_similarity_at_half_weight() {
        let mut history = RecommendationHistory::new();
        history.start_new_turn();
        history.add_recommendations(&[item(1, &[28, 12], 7.5, "2020")]);
        history.start_new_turn();

        let near_twin = item(2, &[28, 12], 7.4, "2020");
        let rules = FilterRules::default();
        let scored = score_candidate(&near_twin, &history, &rules, &[]);

        let raw = history.get_similarity_penalty(&near_twin);
        assert!(raw > 0.7);
        assert!(
            (scored.breakdown.history_similarity - raw * HISTORY_SIMILARITY_WEIGHT).abs() < 1e-6
        );
    }

    #[test]
    fn test_unseen_genre_boost_requires_history() {
        let mut history = RecommendationHistory::new();
        let rules = FilterRules::default();
        let candidate = item(5, &[99], 7.0, "2020");

        // Empty history: no boost
        let scored = score_candidate(&candidate, &history, &rules, &[]);
        assert_eq!(scored.breakdown.freshness_boost, 0.0);

        history.start_new_turn();
        history.add_recommendations(&[item(1, &[28], 7.0, "2020")]);
        let scored = score_candidate(&candidate, &history, &rules, &[]);
        assert!((scored.breakdown.freshness_boost - UNSEEN_GENRE_BOOST).abs() < 1e-6);
    }

    #[test]
    fn test_selection_stops_when_best_is_too_low() {
        let history = RecommendationHistory::new();
        let mut cooldowns = HashMap::new();
        for genre in [28u16, 35, 18, 53] {
            cooldowns.insert(genre, 2u32);
        }
        let rules = FilterRules {
            genre_cooldowns: cooldowns,
            franchise_exclusions: vec!["marvel"],
            ..Default::default()
        };

        // Saturation cap 0.5 + franchise 0.4 leaves 0.1, below the stop line
        let mut avengers = item(1, &[28, 35, 18, 53], 8.0, "2012");
        avengers.title = "The Avengers".to_string();

        let selected = select_diverse(vec![avengers], &history, &rules, 5);
        assert!(selected.is_empty());
    }

    #[test]
    fn test_scores_clamped() {
        let history = RecommendationHistory::new();
        let mut cooldowns = HashMap::new();
        for genre in [28u16, 35, 18, 53, 27, 12] {
            cooldowns.insert(genre, 2u32);
        }
        let rules = FilterRules {
            genre_cooldowns: cooldowns,
            franchise_exclusions: vec!["marvel", "dc"],
            ..Default::default()
        };

        let mut worst = item(1, &[28, 35, 18, 53, 27, 12], 1.0, "2012");
        worst.title = "The Avengers".to_string();

        let scored = score_candidate(&worst, &history, &rules, &[]);
        assert!(scored.score >= 0.0);
        assert!(scored.score <= 1.0);
    }

    #[test]
    fn test_target_respected() {
        let history = RecommendationHistory::new();
        let rules = FilterRules::default();
        let candidates: Vec<MediaItem> = (1..=10)
            .map(|id| item(id, &[id as u16], 7.0, "2020"))
            .collect();

        let selected = select_diverse(candidates, &history, &rules, 4);
        assert_eq!(selected.len(), 4);
    }
}
