// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyword and pattern based intent classification.
//!
//! Maps a player utterance to an intent, a complexity level, the tier the
//! cascade should start at, a confidence, and any entities the patterns
//! captured. Pure and deterministic: no I/O, no model calls, never fails.

use std::collections::HashMap;
use std::sync::LazyLock;

use hachi_core::{
    ClassifiedRequest, CompanionRequest, ComplexityLevel, HachiError, IntentCategory,
    ProcessingTier, RequestType,
};
use regex::Regex;
use tracing::debug;

/// Confidence when the client told us the request type.
const DIRECT_CONFIDENCE: f32 = 0.8;
/// Confidence when a pattern table matched.
const PATTERN_CONFIDENCE: f32 = 0.9;
/// Confidence of the general-hint default.
const AMBIGUOUS_CONFIDENCE: f32 = 0.5;

/// Intent patterns in priority order: the first match wins.
///
/// Each entry names the entity its first capture group fills, if any.
const INTENT_TABLE: &[(IntentCategory, &str, Option<&str>)] = &[
    // Vocabulary
    (
        IntentCategory::VocabularyHelp,
        r#"how do (?:i|you) say ['"]?(.+?)['"]? in japanese"#,
        Some("word"),
    ),
    (
        IntentCategory::VocabularyHelp,
        r#"what does ['"]?(.+?)['"]? mean"#,
        Some("word"),
    ),
    (
        IntentCategory::VocabularyHelp,
        r#"what is the meaning of ['"]?(.+?)['"]?\s*\??$"#,
        Some("word"),
    ),
    (
        IntentCategory::VocabularyHelp,
        r#"translate ['"]?(.+?)['"]? (?:in)?to japanese"#,
        Some("word"),
    ),
    (
        IntentCategory::VocabularyHelp,
        r#"what(?:'s| is) (?:the )?japanese (?:word )?for ['"]?(.+?)['"]?\s*\??$"#,
        Some("word"),
    ),
    // Grammar
    (
        IntentCategory::GrammarExplanation,
        r"difference between (.+?)\s*\??$",
        Some("grammar_point"),
    ),
    (
        IntentCategory::GrammarExplanation,
        r#"particle ['"]?(\w+)['"]?"#,
        Some("grammar_point"),
    ),
    (
        IntentCategory::GrammarExplanation,
        r#"when (?:should|do) (?:i|you) use ['"]?(.+?)['"]?\s*\??$"#,
        Some("grammar_point"),
    ),
    (
        IntentCategory::GrammarExplanation,
        r"explain (?:the )?(.+?) grammar",
        Some("grammar_point"),
    ),
    (IntentCategory::GrammarExplanation, r"\bgrammar\b", None),
    // Directions
    (
        IntentCategory::DirectionGuidance,
        r"where is (?:the )?(.+?)\s*\??$",
        Some("location"),
    ),
    (
        IntentCategory::DirectionGuidance,
        r"how do i get to (?:the )?(.+?)\s*\??$",
        Some("location"),
    ),
    (
        IntentCategory::DirectionGuidance,
        r"which way (?:is|to) (?:the )?(.+?)\s*\??$",
        Some("location"),
    ),
    (
        IntentCategory::DirectionGuidance,
        r"\b(?:find|locate) (?:the )?(.+?)\s*\??$",
        Some("location"),
    ),
    // Translation checks
    (
        IntentCategory::TranslationConfirmation,
        r#"is ['"](.+?)['"] (?:correct|right)"#,
        Some("text"),
    ),
    (
        IntentCategory::TranslationConfirmation,
        r#"did i say ['"]?(.+?)['"]? (?:right|correctly)"#,
        Some("text"),
    ),
    (
        IntentCategory::TranslationConfirmation,
        r#"^translate ['"]?(.+?)['"]?\s*\??$"#,
        Some("text"),
    ),
    (
        IntentCategory::TranslationConfirmation,
        r"what does this (?:sign |text |say)",
        None,
    ),
    // Tickets
    (
        IntentCategory::TicketInfo,
        r"ticket to ([\p{L}\-]+)",
        Some("destination"),
    ),
    (
        IntentCategory::TicketInfo,
        r"\b(?:how much|price|cost|buy|purchase)\b.*\btickets?\b",
        None,
    ),
    (
        IntentCategory::TicketInfo,
        r"\btickets?\b.*\b(?:cost|price|how much)\b",
        None,
    ),
    (IntentCategory::TicketInfo, r"\bfare\b", None),
    // Small talk
    (
        IntentCategory::CasualChat,
        r"^(?:hi|hello|hey|good (?:morning|afternoon|evening)|konnichiwa)\b",
        None,
    ),
    (
        IntentCategory::CasualChat,
        r"how are you|who are you|thank(?:s| you)|arigatou",
        None,
    ),
    // Hints
    (IntentCategory::GeneralHint, r"\b(?:help|hint|stuck)\b", None),
    (
        IntentCategory::GeneralHint,
        r"what (?:should|do) i do|next step|what now",
        None,
    ),
];

struct IntentPattern {
    intent: IntentCategory,
    regex: Regex,
    entity: Option<&'static str>,
}

static INTENT_PATTERNS: LazyLock<Vec<IntentPattern>> = LazyLock::new(|| {
    INTENT_TABLE
        .iter()
        .map(|(intent, pattern, entity)| IntentPattern {
            intent: *intent,
            regex: Regex::new(&format!("(?i){pattern}")).unwrap(),
            entity: *entity,
        })
        .collect()
});

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"“「]([^'"”」]+)['"”」]"#).unwrap());

static PARTICLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)particle ['"]?(\w+)['"]?"#).unwrap());

static STATION_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(platform \d+|ticket (?:office|counter|machine)|exit|entrance|gate \w+)\b")
        .unwrap()
});

static MEANING_QUESTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)what does .+ mean").unwrap());

/// Bare requests for help, answered cheaply.
const BARE_HELP: &[&str] = &["help", "hint", "help me", "a hint", "give me a hint"];

const MODERATE_PHRASES: &[&str] = &["difference between", "explain", "how does", "in this context"];

const ADVANCED_GRAMMAR: &[&str] = &[
    "conditional",
    "passive",
    "causative",
    "honorific",
    "keigo",
    "volitional",
    "subjunctive",
];

const CONJUNCTIONS: &[&str] = &["and", "or", "but", "because", "so"];

/// Locations where questions tend to involve more than one step.
const BUSY_LOCATIONS: &[&str] = &["platform_transfer", "ticket_office"];

/// Outcome of classifying one utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub intent: IntentCategory,
    pub complexity: ComplexityLevel,
    pub tier: ProcessingTier,
    pub confidence: f32,
    pub entities: HashMap<String, String>,
}

struct IntentMatch {
    intent: IntentCategory,
    confidence: f32,
    entities: HashMap<String, String>,
}

/// Pattern-table classifier. Stateless and cheap to share.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a request.
    pub fn classify(&self, request: &CompanionRequest) -> Classification {
        let input = request.player_input.trim();

        let mut matched = match match_intent(request.request_type, input) {
            Ok(found) => found,
            Err(err) => {
                debug!(
                    request_id = request.request_id.as_str(),
                    error = %err,
                    "no intent pattern matched, defaulting to general hint"
                );
                IntentMatch {
                    intent: IntentCategory::GeneralHint,
                    confidence: AMBIGUOUS_CONFIDENCE,
                    entities: HashMap::new(),
                }
            }
        };
        extract_secondary(matched.intent, input, &mut matched.entities);

        let complexity = score_complexity(input, matched.intent, request);
        let tier = complexity.preferred_tier();

        debug!(
            request_id = request.request_id.as_str(),
            intent = %matched.intent,
            complexity = %complexity,
            tier = %tier,
            confidence = matched.confidence,
            "request classified"
        );

        Classification {
            intent: matched.intent,
            complexity,
            tier,
            confidence: matched.confidence,
            entities: matched.entities,
        }
    }

    /// Classify and wrap the request for the cascade.
    pub fn classify_request(&self, request: CompanionRequest) -> ClassifiedRequest {
        let classification = self.classify(&request);
        ClassifiedRequest {
            request,
            intent: classification.intent,
            complexity: classification.complexity,
            processing_tier: classification.tier,
            confidence: classification.confidence,
            extracted_entities: classification.entities,
        }
    }
}

fn direct_intent(request_type: RequestType) -> Option<IntentCategory> {
    match request_type {
        RequestType::Vocabulary => Some(IntentCategory::VocabularyHelp),
        RequestType::Grammar => Some(IntentCategory::GrammarExplanation),
        RequestType::Direction => Some(IntentCategory::DirectionGuidance),
        RequestType::Translation => Some(IntentCategory::TranslationConfirmation),
        RequestType::Ticket => Some(IntentCategory::TicketInfo),
        RequestType::Hint => Some(IntentCategory::GeneralHint),
        RequestType::Assistance => None,
    }
}

/// Pick the intent, or report the input as ambiguous.
fn match_intent(request_type: RequestType, input: &str) -> Result<IntentMatch, HachiError> {
    if let Some(intent) = direct_intent(request_type) {
        // The client already said what this is; patterns only supply entities.
        let entities = INTENT_PATTERNS
            .iter()
            .filter(|p| p.intent == intent)
            .find_map(|p| capture(p, input))
            .unwrap_or_default();
        return Ok(IntentMatch {
            intent,
            confidence: DIRECT_CONFIDENCE,
            entities,
        });
    }

    INTENT_PATTERNS
        .iter()
        .find_map(|p| {
            capture(p, input).map(|entities| IntentMatch {
                intent: p.intent,
                confidence: PATTERN_CONFIDENCE,
                entities,
            })
        })
        .ok_or(HachiError::ClassificationAmbiguous {
            confidence: AMBIGUOUS_CONFIDENCE,
        })
}

/// Match one pattern, returning the captured entity (possibly none).
fn capture(pattern: &IntentPattern, input: &str) -> Option<HashMap<String, String>> {
    let caps = pattern.regex.captures(input)?;
    let mut entities = HashMap::new();
    if let Some(name) = pattern.entity
        && let Some(value) = caps.get(1).and_then(|m| clean_capture(m.as_str()))
    {
        entities.insert(name.to_string(), value);
    }
    Some(entities)
}

fn clean_capture(raw: &str) -> Option<String> {
    let trimmed = raw
        .trim()
        .trim_matches(|c: char| matches!(c, '\'' | '"' | '?' | '!' | '.' | ',' | '“' | '”' | '「' | '」'))
        .trim();
    let trimmed = trimmed
        .strip_prefix("the ")
        .or_else(|| trimmed.strip_prefix("The "))
        .unwrap_or(trimmed);
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Fill entities the intent usually carries but its pattern did not capture.
fn extract_secondary(intent: IntentCategory, input: &str, entities: &mut HashMap<String, String>) {
    let quoted = || {
        QUOTED
            .captures(input)
            .and_then(|c| c.get(1))
            .and_then(|m| clean_capture(m.as_str()))
    };

    match intent {
        IntentCategory::VocabularyHelp if !entities.contains_key("word") => {
            if let Some(word) = quoted() {
                entities.insert("word".to_string(), word);
            }
        }
        IntentCategory::GrammarExplanation if !entities.contains_key("grammar_point") => {
            let point = PARTICLE
                .captures(input)
                .and_then(|c| c.get(1))
                .and_then(|m| clean_capture(m.as_str()))
                .or_else(quoted);
            if let Some(point) = point {
                entities.insert("grammar_point".to_string(), point);
            }
        }
        IntentCategory::DirectionGuidance if !entities.contains_key("location") => {
            if let Some(m) = STATION_LOCATION.find(input) {
                entities.insert("location".to_string(), m.as_str().to_lowercase());
            }
        }
        IntentCategory::TranslationConfirmation if !entities.contains_key("text") => {
            if let Some(text) = quoted() {
                entities.insert("text".to_string(), text);
            }
        }
        _ => {}
    }
}

/// Score each complexity level and pick the highest. Ties go to the simpler level.
fn score_complexity(
    input: &str,
    intent: IntentCategory,
    request: &CompanionRequest,
) -> ComplexityLevel {
    let lower = input.to_lowercase();
    let words: Vec<&str> = lower
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .collect();
    let word_count = words.len();

    let mut simple = 0.0_f32;
    let mut moderate = 0.0_f32;
    let mut complex = 0.0_f32;

    if word_count < 8 {
        simple += 1.0;
    }
    if MEANING_QUESTION.is_match(&lower) {
        simple += 1.0;
    }
    if lower.contains("where is") {
        simple += 1.0;
    }
    if BARE_HELP.contains(&lower.trim_end_matches(['?', '!', '.']).trim()) {
        simple += 1.0;
    }

    if (8..15).contains(&word_count) {
        moderate += 1.0;
    }
    moderate += MODERATE_PHRASES
        .iter()
        .filter(|p| lower.contains(*p))
        .count() as f32;

    if word_count >= 15 {
        complex += 1.0;
    }
    if words.contains(&"if") && words.contains(&"would") {
        complex += 1.0;
    }
    if words.iter().filter(|w| CONJUNCTIONS.contains(*w)).count() > 2 {
        complex += 1.0;
    }
    if ADVANCED_GRAMMAR.iter().any(|term| lower.contains(term)) {
        complex += 1.0;
    }

    match intent {
        IntentCategory::VocabularyHelp => simple += 1.0,
        IntentCategory::GrammarExplanation => moderate += 1.0,
        _ => {}
    }
    if BUSY_LOCATIONS.contains(&request.game_context.player_location.as_str()) {
        moderate += 0.5;
    }
    if request
        .game_context
        .language_proficiency
        .get("vocabulary")
        .is_some_and(|p| *p < 0.3)
    {
        simple += 0.5;
    }

    if complex > moderate && complex > simple {
        ComplexityLevel::Complex
    } else if moderate > simple {
        ComplexityLevel::Moderate
    } else {
        ComplexityLevel::Simple
    }
}
