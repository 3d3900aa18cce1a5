//! Ambiguity scoring and clarifying questions
//!
//! Scores how under-specified a request is before any catalog call is made.
//! The score is additive over independent signals and clamped to [0, 1];
//! clarification is only worth asking when the score is high AND several
//! distinct kinds of information are missing.

use rand::seq::SliceRandom;
use serde::Serialize;

use crate::engine::history::RecommendationHistory;
use crate::models::{genre_name, IntentKind, MediaType, ParsedIntent};

const ASK_THRESHOLD: f32 = 0.6;
const MIN_MISSING_CATEGORIES: usize = 2;
const MAX_QUESTIONS: usize = 2;
/// Genres seen at least this often recently are not offered as options
const GENRE_OPTION_CEILING: usize = 3;

const VAGUE_WORDS: &[&str] = &[
    "something",
    "anything",
    "whatever",
    "not sure",
    "dunno",
    "idk",
    "surprise me",
    "no idea",
];

const SPECIFIC_WORDS: &[&str] = &[
    "called",
    "named",
    "titled",
    "starring",
    "directed by",
    "specifically",
    "exactly",
];

/// Kind of information missing from a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingInfo {
    MediaType,
    GenreOrMood,
    Mood,
    Specificity,
}

/// A clarifying question with quick-reply options. Priority 1 is most
/// important; at most two questions are ever surfaced.
#[derive(Debug, Clone, Serialize)]
pub struct ClarifyingQuestion {
    pub text: String,
    pub options: Vec<String>,
    pub priority: u8,
    pub category: MissingInfo,
}

/// Result of scoring one message for ambiguity
#[derive(Debug, Clone, Serialize)]
pub struct AmbiguityAnalysis {
    pub score: f32,
    pub missing: Vec<MissingInfo>,
    pub questions: Vec<ClarifyingQuestion>,
    pub should_ask: bool,
}

/// Score a parsed intent for ambiguity against the session history
pub fn analyze(intent: &ParsedIntent, history: &RecommendationHistory) -> AmbiguityAnalysis {
    // Greetings get a fixed onboarding flow instead of scoring
    if intent.kind == IntentKind::Greeting {
        return AmbiguityAnalysis {
            score: 0.8,
            missing: vec![MissingInfo::GenreOrMood, MissingInfo::MediaType],
            questions: onboarding_questions(),
            should_ask: false,
        };
    }

    let lower = intent.original_text.to_lowercase();
    let mut score: f32 = 0.0;
    let mut missing = Vec::new();
    let mut questions = Vec::new();

    if VAGUE_WORDS.iter().any(|w| lower.contains(w)) {
        score += 0.2;
        push_missing(&mut missing, MissingInfo::Specificity);
    }

    if SPECIFIC_WORDS.iter().any(|w| lower.contains(w)) {
        score -= 0.2;
    }

    if intent.media_type == MediaType::Both && !intent.media_type_explicit {
        score += 0.1;
        push_missing(&mut missing, MissingInfo::MediaType);
        questions.push(media_type_question());
    }

    if intent.genre_ids.is_empty() && intent.moods.is_empty() {
        score += 0.25;
        push_missing(&mut missing, MissingInfo::GenreOrMood);
        questions.push(genre_question(history));
    }

    if matches!(intent.kind, IntentKind::Recommend | IntentKind::Genre)
        && intent.moods.is_empty()
        && intent.genre_ids.is_empty()
    {
        score += 0.15;
        push_missing(&mut missing, MissingInfo::Mood);
    }

    if intent.confidence < 0.4 {
        score += 0.3;
        push_missing(&mut missing, MissingInfo::Specificity);
    }

    let word_count = intent.original_text.split_whitespace().count();
    if word_count <= 3 && !intent.kind.is_social() {
        score += 0.15;
    }

    let score = score.clamp(0.0, 1.0);

    let should_ask = score >= ASK_THRESHOLD
        && missing.len() >= MIN_MISSING_CATEGORIES
        && !intent.kind.is_social();

    questions.sort_by_key(|q| q.priority);
    questions.truncate(MAX_QUESTIONS);

    tracing::debug!(
        score = score,
        missing = ?missing,
        should_ask = should_ask,
        "Ambiguity analysis"
    );

    AmbiguityAnalysis {
        score,
        missing,
        questions,
        should_ask,
    }
}

fn push_missing(missing: &mut Vec<MissingInfo>, info: MissingInfo) {
    if !missing.contains(&info) {
        missing.push(info);
    }
}

fn media_type_question() -> ClarifyingQuestion {
    ClarifyingQuestion {
        text: "Are you in the mood for a movie or a series?".to_string(),
        options: vec![
            "A movie".to_string(),
            "A series".to_string(),
            "Either works".to_string(),
        ],
        priority: 2,
        category: MissingInfo::MediaType,
    }
}

/// Genre question offering genres the user has not been saturated with
fn genre_question(history: &RecommendationHistory) -> ClarifyingQuestion {
    let candidates = history.unsaturated_genres(GENRE_OPTION_CEILING);
    let mut rng = rand::thread_rng();
    let mut sampled: Vec<u16> = candidates
        .choose_multiple(&mut rng, 4)
        .copied()
        .collect();
    // History can theoretically saturate everything; fall back to a fixed trio
    if sampled.is_empty() {
        sampled = vec![28, 35, 18];
    }

    ClarifyingQuestion {
        text: "What kind of titles are you after?".to_string(),
        options: sampled.into_iter().map(genre_name).collect(),
        priority: 1,
        category: MissingInfo::GenreOrMood,
    }
}

fn onboarding_questions() -> Vec<ClarifyingQuestion> {
    vec![
        ClarifyingQuestion {
            text: "What are you in the mood for today?".to_string(),
            options: vec![
                "Something exciting".to_string(),
                "Something feel-good".to_string(),
                "Something scary".to_string(),
                "Surprise me".to_string(),
            ],
            priority: 1,
            category: MissingInfo::GenreOrMood,
        },
        ClarifyingQuestion {
            text: "Movies or series?".to_string(),
            options: vec![
                "Movies".to_string(),
                "Series".to_string(),
                "Both".to_string(),
            ],
            priority: 2,
            category: MissingInfo::MediaType,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::intent::parse_intent;

    #[test]
    fn test_something_scores_high_ambiguity() {
        let history = RecommendationHistory::new();
        let intent = parse_intent("something");
        let analysis = analyze(&intent, &history);

        assert!(analysis.score >= 0.6);
        assert!(analysis.missing.len() >= 2);
        assert!(analysis.missing.contains(&MissingInfo::GenreOrMood));
        assert!(analysis.should_ask);
        assert!(!analysis.questions.is_empty());
        assert!(analysis.questions.len() <= 2);
    }

    #[test]
    fn test_specific_request_not_ambiguous() {
        let history = RecommendationHistory::new();
        let intent = parse_intent("recommend a 90s action movie like Die Hard with great ratings");
        let analysis = analyze(&intent, &history);

        assert!(analysis.score < 0.6);
        assert!(!analysis.should_ask);
    }

    #[test]
    fn test_greeting_forces_onboarding() {
        let history = RecommendationHistory::new();
        let intent = parse_intent("hello");
        let analysis = analyze(&intent, &history);

        assert_eq!(analysis.score, 0.8);
        // Greetings carry their own fixed question set but never trip the
        // clarification gate
        assert!(!analysis.should_ask);
        assert_eq!(analysis.questions.len(), 2);
    }

    #[test]
    fn test_thanks_never_prompts() {
        let history = RecommendationHistory::new();
        let intent = parse_intent("thanks");
        let analysis = analyze(&intent, &history);
        assert!(!analysis.should_ask);
    }

    #[test]
    fn test_score_clamped_to_unit_interval() {
        let history = RecommendationHistory::new();
        let intent = parse_intent("idk");
        let analysis = analyze(&intent, &history);
        assert!(analysis.score <= 1.0);
        assert!(analysis.score >= 0.0);
    }

    #[test]
    fn test_questions_ranked_by_priority() {
        let history = RecommendationHistory::new();
        let intent = parse_intent("something");
        let analysis = analyze(&intent, &history);

        // Genre question (priority 1) must come before media type (2)
        let priorities: Vec<u8> = analysis.questions.iter().map(|q| q.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort();
        assert_eq!(priorities, sorted);
    }

    #[test]
    fn test_genre_question_options_bounded() {
        let history = RecommendationHistory::new();
        let question = genre_question(&history);
        assert!(question.options.len() >= 2);
        assert!(question.options.len() <= 6);
    }

    #[test]
    fn test_mood_only_request_skips_genre_question() {
        let history = RecommendationHistory::new();
        let intent = parse_intent("something scary for movie night");
        let analysis = analyze(&intent, &history);

        assert!(!analysis
            .missing
            .contains(&MissingInfo::GenreOrMood));
    }
}
