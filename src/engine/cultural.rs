//! Cinematic profiling and cultural filter rules
//!
//! Given a resolved reference title, derives a `CinematicProfile` (narrative
//! scale, storytelling style, audience, mass appeal, themes) and converts it
//! into hard/soft `CulturalFilterRules`. Well-known titles come from an
//! externalized data table; everything else goes through the heuristic
//! scorer. The guiding rule: never answer a mass blockbuster reference with
//! niche content, and never leak excluded-language titles into results.

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;

use crate::engine::reference::ResolvedReference;
use crate::models::{
    AudienceType, CinematicProfile, CulturalFilterRules, MediaItem, NarrativeScale,
    ProductionScale, StorytellingStyle, ThemeFlags, VisualStyle,
};
use crate::services::providers::MediaDetails;

/// Regional film industries with their language families. A reference in
/// any of these languages gets strict language matching with English hard-
/// excluded, so a Telugu blockbuster is never answered with Hollywood.
const REGIONAL_INDUSTRIES: &[(&str, &[&str], &str)] = &[
    ("indian", &["hi", "te", "ta", "kn", "ml", "bn", "mr", "pa"], "IN"),
    ("korean", &["ko"], "KR"),
    ("japanese", &["ja"], "JP"),
    ("chinese", &["zh", "cn"], "CN"),
];

const EPIC_KEYWORDS: &[&str] = &[
    "epic", "war", "kingdom", "battle", "empire", "saga", "dynasty", "conquest",
];

/// Partial profile loaded from the data table; unset fields fall through to
/// the heuristic values.
#[derive(Debug, Clone, Deserialize)]
struct KnownProfile {
    narrative_scale: Option<NarrativeScale>,
    storytelling_style: Option<StorytellingStyle>,
    audience_type: Option<AudienceType>,
    mass_appeal_score: Option<u8>,
    #[serde(default)]
    themes: Option<PartialThemes>,
    production_scale: Option<ProductionScale>,
    visual_style: Option<VisualStyle>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PartialThemes {
    #[serde(default)]
    hero_centric: bool,
    #[serde(default)]
    power_fantasy: bool,
    #[serde(default)]
    patriotic: bool,
    #[serde(default)]
    romantic_subplot: bool,
    #[serde(default)]
    family_drama: bool,
    #[serde(default)]
    revenge: bool,
}

impl From<PartialThemes> for ThemeFlags {
    fn from(partial: PartialThemes) -> Self {
        ThemeFlags {
            hero_centric: partial.hero_centric,
            power_fantasy: partial.power_fantasy,
            patriotic: partial.patriotic,
            romantic_subplot: partial.romantic_subplot,
            family_drama: partial.family_drama,
            revenge: partial.revenge,
        }
    }
}

/// Pre-profiled well-known titles, keyed by lowercase substring of the
/// resolved title. Extendable without touching the heuristics.
static KNOWN_PROFILES: Lazy<HashMap<String, KnownProfile>> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../data/title_profiles.json"))
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to load title profile table");
            HashMap::new()
        })
});

/// Build a cinematic profile for a resolved reference title
pub fn build_profile(reference: &ResolvedReference) -> CinematicProfile {
    let heuristic = heuristic_profile(&reference.item, reference.details.as_ref());

    let title_lower = reference.item.title.to_lowercase();
    let known = KNOWN_PROFILES
        .iter()
        .find(|(key, _)| title_lower.contains(key.as_str()))
        .map(|(_, profile)| profile);

    match known {
        Some(known) => {
            tracing::debug!(title = %reference.item.title, "Using pre-profiled title entry");
            CinematicProfile {
                narrative_scale: known.narrative_scale.unwrap_or(heuristic.narrative_scale),
                storytelling_style: known
                    .storytelling_style
                    .unwrap_or(heuristic.storytelling_style),
                audience_type: known.audience_type.unwrap_or(heuristic.audience_type),
                mass_appeal_score: known
                    .mass_appeal_score
                    .unwrap_or(heuristic.mass_appeal_score),
                themes: known
                    .themes
                    .clone()
                    .map(ThemeFlags::from)
                    .unwrap_or(heuristic.themes),
                production_scale: known.production_scale.unwrap_or(heuristic.production_scale),
                visual_style: known.visual_style.unwrap_or(heuristic.visual_style),
            }
        }
        None => heuristic,
    }
}

/// Heuristic profile scorer for titles not in the data table
fn heuristic_profile(item: &MediaItem, details: Option<&MediaDetails>) -> CinematicProfile {
    let keywords: Vec<&str> = details
        .map(|d| d.keywords.iter().map(String::as_str).collect())
        .unwrap_or_default();
    let overview = item.overview.as_deref().unwrap_or("").to_lowercase();
    let popularity = item.popularity.unwrap_or(0.0);

    let has_epic_text = EPIC_KEYWORDS
        .iter()
        .any(|kw| overview.contains(kw) || keywords.iter().any(|k| k.contains(kw)));

    let narrative_scale = if has_epic_text && (item.vote_count >= 3000 || popularity >= 80.0) {
        NarrativeScale::Epic
    } else if item.vote_count >= 3000 || popularity >= 80.0 {
        NarrativeScale::Large
    } else if item.vote_count >= 500 {
        NarrativeScale::Medium
    } else {
        NarrativeScale::Intimate
    };

    let has = |genre: u16| item.genre_ids.contains(&genre);
    let storytelling_style = if has(28) && (has(10749) || has(35)) {
        StorytellingStyle::CommercialMasala
    } else if has(28) {
        StorytellingStyle::ActionSpectacle
    } else if has(53) || has(9648) {
        StorytellingStyle::ThrillerSuspense
    } else if has(18) {
        StorytellingStyle::EmotionalDrama
    } else {
        StorytellingStyle::Balanced
    };

    let audience_type = if has(10751) || has(16) {
        AudienceType::Family
    } else if matches!(
        storytelling_style,
        StorytellingStyle::CommercialMasala | StorytellingStyle::ActionSpectacle
    ) && item.vote_count >= 2000
    {
        AudienceType::Mass
    } else if has(35) && has(10749) {
        AudienceType::Youth
    } else if has(99) || item.vote_count < 200 {
        AudienceType::Niche
    } else {
        AudienceType::General
    };

    let theme_hit = |needles: &[&str]| {
        needles
            .iter()
            .any(|n| overview.contains(n) || keywords.iter().any(|k| k.contains(n)))
    };

    let themes = ThemeFlags {
        hero_centric: theme_hit(&["hero", "one man", "savior", "legend"]),
        power_fantasy: theme_hit(&["superhero", "chosen one", "invincible", "superpower"]),
        patriotic: theme_hit(&["patriot", "nation", "independence", "freedom fighter"]),
        romantic_subplot: has(10749) || theme_hit(&["love story", "romance"]),
        family_drama: has(10751) || theme_hit(&["family"]),
        revenge: theme_hit(&["revenge", "vengeance", "avenge"]),
    };

    let production_scale = if item.vote_count >= 10_000 || popularity >= 150.0 {
        ProductionScale::Blockbuster
    } else if item.vote_count >= 3000 || popularity >= 80.0 {
        ProductionScale::Big
    } else if item.vote_count >= 500 {
        ProductionScale::Medium
    } else {
        ProductionScale::Small
    };

    let visual_style = if (has(878) || has(14) || has(28)) && narrative_scale >= NarrativeScale::Large
    {
        VisualStyle::Spectacular
    } else if matches!(storytelling_style, StorytellingStyle::ThrillerSuspense) {
        VisualStyle::Stylized
    } else {
        VisualStyle::Grounded
    };

    let mass_appeal_score = mass_appeal(
        narrative_scale,
        storytelling_style,
        audience_type,
        item.vote_count,
        popularity,
    );

    CinematicProfile {
        narrative_scale,
        storytelling_style,
        audience_type,
        mass_appeal_score,
        themes,
        production_scale,
        visual_style,
    }
}

/// Base 50 with additive bonuses per tier, capped to [0, 100]
fn mass_appeal(
    scale: NarrativeScale,
    style: StorytellingStyle,
    audience: AudienceType,
    vote_count: u64,
    popularity: f32,
) -> u8 {
    let mut score: i32 = 50;

    score += match scale {
        NarrativeScale::Epic => 15,
        NarrativeScale::Large => 10,
        _ => 0,
    };
    score += match style {
        StorytellingStyle::CommercialMasala => 15,
        StorytellingStyle::ActionSpectacle => 10,
        _ => 0,
    };
    score += match audience {
        AudienceType::Mass => 15,
        AudienceType::Family => 10,
        AudienceType::Niche => -15,
        _ => 0,
    };
    if vote_count >= 10_000 {
        score += 10;
    } else if vote_count >= 5000 {
        score += 5;
    }
    if popularity >= 100.0 {
        score += 10;
    } else if popularity >= 50.0 {
        score += 5;
    }

    score.clamp(0, 100) as u8
}

/// Convert a profile into hard/soft filter rules for query generation
pub fn generate_cultural_filters(
    profile: &CinematicProfile,
    reference: &ResolvedReference,
) -> CulturalFilterRules {
    let item = &reference.item;
    let language = item
        .original_language
        .clone()
        .or_else(|| {
            reference
                .details
                .as_ref()
                .and_then(|d| d.spoken_languages.first().cloned())
        })
        .unwrap_or_else(|| "en".to_string());

    let industry = REGIONAL_INDUSTRIES
        .iter()
        .find(|(_, langs, _)| langs.contains(&language.as_str()));

    let (preferred_languages, exclude_languages, strict, preferred_countries) = match industry {
        Some((name, family, country)) => {
            // Very broad mass appeal relaxes the single-language rule to the
            // whole industry family; English stays hard-excluded either way.
            let preferred = if profile.mass_appeal_score >= 85 {
                family.iter().map(|l| l.to_string()).collect()
            } else {
                vec![language.clone()]
            };
            tracing::debug!(
                industry = name,
                language = %language,
                relaxed = profile.mass_appeal_score >= 85,
                "Regional industry detected, strict language matching on"
            );
            (
                preferred,
                vec!["en".to_string()],
                true,
                vec![country.to_string()],
            )
        }
        None => (vec![language.clone()], Vec::new(), false, Vec::new()),
    };

    let allowed_scales = match profile.narrative_scale {
        NarrativeScale::Epic => vec![NarrativeScale::Epic, NarrativeScale::Large],
        NarrativeScale::Large => vec![
            NarrativeScale::Large,
            NarrativeScale::Epic,
            NarrativeScale::Medium,
        ],
        NarrativeScale::Medium => vec![
            NarrativeScale::Medium,
            NarrativeScale::Large,
            NarrativeScale::Intimate,
        ],
        NarrativeScale::Intimate => vec![NarrativeScale::Intimate, NarrativeScale::Medium],
    };

    let allowed_styles = match profile.storytelling_style {
        StorytellingStyle::CommercialMasala => vec![
            StorytellingStyle::CommercialMasala,
            StorytellingStyle::ActionSpectacle,
        ],
        StorytellingStyle::ActionSpectacle => vec![
            StorytellingStyle::ActionSpectacle,
            StorytellingStyle::CommercialMasala,
        ],
        StorytellingStyle::EmotionalDrama => vec![
            StorytellingStyle::EmotionalDrama,
            StorytellingStyle::Balanced,
        ],
        StorytellingStyle::ThrillerSuspense => vec![
            StorytellingStyle::ThrillerSuspense,
            StorytellingStyle::Balanced,
        ],
        StorytellingStyle::Balanced => vec![
            StorytellingStyle::Balanced,
            StorytellingStyle::CommercialMasala,
            StorytellingStyle::ActionSpectacle,
            StorytellingStyle::EmotionalDrama,
            StorytellingStyle::ThrillerSuspense,
        ],
    };

    // The threshold scales with the reference's own appeal: a blockbuster
    // reference should not surface niche answers.
    let min_mass_appeal = if profile.mass_appeal_score >= 90 {
        75
    } else if profile.mass_appeal_score >= 80 {
        65
    } else if profile.mass_appeal_score >= 70 {
        55
    } else {
        40
    };

    let active_themes = profile.themes.active();
    let required_themes = if profile.mass_appeal_score >= 90 {
        active_themes.clone()
    } else {
        Vec::new()
    };

    let min_production_scale = match profile.production_scale {
        ProductionScale::Blockbuster => ProductionScale::Big,
        ProductionScale::Big => ProductionScale::Medium,
        _ => ProductionScale::Small,
    };

    CulturalFilterRules {
        preferred_languages,
        exclude_languages,
        strict_language_match: strict,
        preferred_countries,
        exclude_countries: Vec::new(),
        allowed_scales,
        allowed_styles,
        min_mass_appeal,
        required_themes,
        preferred_themes: active_themes,
        min_production_scale,
        reference_title: item.title.clone(),
        reference_id: item.id,
    }
}

/// Hard check used after fetching: a candidate in an excluded language must
/// never appear when strict matching is on.
pub fn violates_language_rules(item: &MediaItem, rules: &CulturalFilterRules) -> bool {
    if !rules.strict_language_match {
        return false;
    }
    match &item.original_language {
        Some(lang) => rules.exclude_languages.iter().any(|ex| ex == lang),
        None => false,
    }
}
