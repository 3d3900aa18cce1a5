use serde::{Deserialize, Serialize};

/// How large the canvas of a story is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeScale {
    Intimate,
    Medium,
    Large,
    Epic,
}

/// Dominant storytelling register of a title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorytellingStyle {
    /// Song-and-spectacle commercial entertainer mixing action, romance and comedy
    CommercialMasala,
    ActionSpectacle,
    EmotionalDrama,
    ThrillerSuspense,
    Balanced,
}

/// Audience a title is primarily made for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudienceType {
    Family,
    Mass,
    Youth,
    Niche,
    General,
}

/// Production budget tier, ordered so comparisons express "at least this big"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductionScale {
    Small,
    Medium,
    Big,
    Blockbuster,
}

/// Visual register of a title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualStyle {
    Grounded,
    Stylized,
    Spectacular,
}

/// Boolean thematic flags derived from a reference title
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeFlags {
    pub hero_centric: bool,
    pub power_fantasy: bool,
    pub patriotic: bool,
    pub romantic_subplot: bool,
    pub family_drama: bool,
    pub revenge: bool,
}

impl ThemeFlags {
    /// Names of the set flags, for justification text and rule matching
    pub fn active(&self) -> Vec<&'static str> {
        let mut themes = Vec::new();
        if self.hero_centric {
            themes.push("hero-centric");
        }
        if self.power_fantasy {
            themes.push("power-fantasy");
        }
        if self.patriotic {
            themes.push("patriotic");
        }
        if self.romantic_subplot {
            themes.push("romantic-subplot");
        }
        if self.family_drama {
            themes.push("family-drama");
        }
        if self.revenge {
            themes.push("revenge");
        }
        themes
    }
}

/// Derived cinematic attributes of a reference title. Computed once per
/// reference resolution; immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CinematicProfile {
    pub narrative_scale: NarrativeScale,
    pub storytelling_style: StorytellingStyle,
    pub audience_type: AudienceType,
    /// 0-100 estimate of how broadly commercial the title is
    pub mass_appeal_score: u8,
    pub themes: ThemeFlags,
    pub production_scale: ProductionScale,
    pub visual_style: VisualStyle,
}

/// Hard and soft constraints derived from a CinematicProfile
#[derive(Debug, Clone, Serialize)]
pub struct CulturalFilterRules {
    /// Languages to query for; hard when `strict_language_match` is set
    pub preferred_languages: Vec<String>,
    /// Languages that must never appear in results
    pub exclude_languages: Vec<String>,
    pub strict_language_match: bool,
    pub preferred_countries: Vec<String>,
    pub exclude_countries: Vec<String>,
    /// Narrative scales acceptable for candidates; always a superset of the
    /// reference's own scale so queries do not collapse to zero results
    pub allowed_scales: Vec<NarrativeScale>,
    pub allowed_styles: Vec<StorytellingStyle>,
    pub min_mass_appeal: u8,
    pub required_themes: Vec<&'static str>,
    pub preferred_themes: Vec<&'static str>,
    pub min_production_scale: ProductionScale,
    /// Title and catalog ID of the reference, for justification text
    pub reference_title: String,
    pub reference_id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrative_scale_ordering() {
        assert!(NarrativeScale::Intimate < NarrativeScale::Epic);
        assert!(NarrativeScale::Large < NarrativeScale::Epic);
    }

    #[test]
    fn test_production_scale_ordering() {
        assert!(ProductionScale::Small < ProductionScale::Blockbuster);
        assert!(ProductionScale::Big >= ProductionScale::Medium);
    }

    #[test]
    fn test_theme_flags_active() {
        let themes = ThemeFlags {
            hero_centric: true,
            revenge: true,
            ..Default::default()
        };
        assert_eq!(themes.active(), vec!["hero-centric", "revenge"]);
        assert!(ThemeFlags::default().active().is_empty());
    }

    #[test]
    fn test_style_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&StorytellingStyle::CommercialMasala).unwrap(),
            r#""commercial_masala""#
        );
        let parsed: NarrativeScale = serde_json::from_str(r#""epic""#).unwrap();
        assert_eq!(parsed, NarrativeScale::Epic);
    }
}
