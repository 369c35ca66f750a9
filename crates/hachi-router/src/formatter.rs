// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shapes raw tier text into the response the game client renders.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::Utc;
use hachi_core::api::{
    Animation, CompanionResponse, CompanionState, Dialogue, EmotionalState, GameStateDelta,
    Highlight, HighlightEffect, LearningMoment, QuestProgress, ResponseMeta, Suggestion, UiHints,
};
use hachi_core::{ClassifiedRequest, IntentCategory, ProcessingTier, FALLBACK_APOLOGY};
use regex::Regex;

/// First run of kana/kanji, allowing single spaces between words.
static JAPANESE_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\p{Hiragana}\p{Katakana}\p{Han}ー]+(?:[ 　][\p{Hiragana}\p{Katakana}\p{Han}ー]+)*")
        .unwrap()
});

/// Parenthesized romaji directly after the Japanese run.
static ROMAJI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\(([A-Za-z][A-Za-z' \-]*)\)").unwrap());

const TARGET_HIGHLIGHT_MS: u32 = 3_000;
const DIRECTION_HIGHLIGHT_MS: u32 = 5_000;

/// Builds [`CompanionResponse`]s for one companion character.
#[derive(Debug, Clone)]
pub struct ResponseFormatter {
    character_name: String,
}

impl ResponseFormatter {
    pub fn new(character_name: impl Into<String>) -> Self {
        Self {
            character_name: character_name.into(),
        }
    }

    pub fn format(
        &self,
        raw: &str,
        request: &ClassifiedRequest,
        tier: ProcessingTier,
        response_id: &str,
    ) -> CompanionResponse {
        let text = raw.trim().to_string();
        let (japanese_text, pronunciation) = extract_japanese(&text);
        let apologising = text == FALLBACK_APOLOGY;

        let (animation, emotional_state) = if apologising {
            (Animation::Idle, EmotionalState::Apologetic)
        } else {
            expression_for(request.intent)
        };

        let vocabulary_unlocked = match (&japanese_text, request.intent) {
            (Some(jp), IntentCategory::VocabularyHelp) if !apologising => vec![jp.clone()],
            _ => Vec::new(),
        };

        CompanionResponse {
            dialogue: Dialogue {
                text,
                japanese_text,
                pronunciation,
                character_name: self.character_name.clone(),
            },
            companion: CompanionState {
                animation,
                emotional_state,
            },
            ui: UiHints {
                highlights: highlights_for(request),
                suggestions: suggestions_for(request),
            },
            game_state: GameStateDelta {
                learning_moments: learning_moments_for(request),
                quest_progress: quest_progress_for(request),
                vocabulary_unlocked,
            },
            meta: ResponseMeta {
                response_id: response_id.to_string(),
                processing_tier: tier,
                timestamp: Utc::now(),
            },
        }
    }
}

/// Split out the first Japanese phrase and its romaji reading, if present.
pub fn extract_japanese(text: &str) -> (Option<String>, Option<String>) {
    let Some(run) = JAPANESE_RUN.find(text) else {
        return (None, None);
    };
    let pronunciation = ROMAJI
        .captures(&text[run.end()..])
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string());
    (Some(run.as_str().to_string()), pronunciation)
}

fn expression_for(intent: IntentCategory) -> (Animation, EmotionalState) {
    match intent {
        IntentCategory::VocabularyHelp => (Animation::Happy, EmotionalState::Helpful),
        IntentCategory::GrammarExplanation => (Animation::Thinking, EmotionalState::Helpful),
        IntentCategory::DirectionGuidance => (Animation::Pointing, EmotionalState::Helpful),
        IntentCategory::TranslationConfirmation => {
            (Animation::Thinking, EmotionalState::Encouraging)
        }
        IntentCategory::TicketInfo => (Animation::Pointing, EmotionalState::Helpful),
        IntentCategory::CasualChat => (Animation::Excited, EmotionalState::Curious),
        IntentCategory::GeneralHint => (Animation::Thinking, EmotionalState::Encouraging),
    }
}

fn suggestion(text: &str, action: &str, params: &[(&str, &str)]) -> Suggestion {
    Suggestion {
        text: text.to_string(),
        action: action.to_string(),
        params: params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>(),
    }
}

fn suggestions_for(request: &ClassifiedRequest) -> Vec<Suggestion> {
    match request.intent {
        IntentCategory::VocabularyHelp => match request.entity("word") {
            Some(word) => vec![
                suggestion(
                    "Show me the kanji",
                    "ask",
                    &[("text", &format!("Show me the kanji for {word}"))],
                ),
                suggestion(
                    "Use it in a sentence",
                    "ask",
                    &[("text", &format!("Give me an example with {word}"))],
                ),
            ],
            None => vec![suggestion("Ask about another word", "ask", &[])],
        },
        IntentCategory::GrammarExplanation => vec![suggestion(
            "Give me an example",
            "ask",
            &[("text", "Can you give me an example?")],
        )],
        IntentCategory::DirectionGuidance => match request.entity("location") {
            Some(location) => vec![suggestion("Take me there", "navigate", &[("location", location)])],
            None => vec![suggestion("Look at the station map", "examine", &[("target", "station_map")])],
        },
        IntentCategory::TicketInfo => vec![
            suggestion("How much is it?", "ask", &[("text", "How much is a ticket?")]),
            suggestion(
                "Practice buying a ticket",
                "practice",
                &[("phrase", "kippu wo kudasai")],
            ),
        ],
        IntentCategory::TranslationConfirmation => {
            vec![suggestion("Try another sentence", "ask", &[])]
        }
        IntentCategory::CasualChat => vec![suggestion("Give me a hint", "hint", &[])],
        IntentCategory::GeneralHint => vec![suggestion("Another hint", "hint", &[])],
    }
}

fn highlights_for(request: &ClassifiedRequest) -> Vec<Highlight> {
    let mut highlights = Vec::new();
    if let Some(target) = request.request.target_entity.as_deref().filter(|t| !t.is_empty()) {
        highlights.push(Highlight {
            id: target.to_string(),
            effect: HighlightEffect::Pulse,
            duration: TARGET_HIGHLIGHT_MS,
        });
    }
    if request.intent == IntentCategory::DirectionGuidance {
        let destination = request
            .request
            .target_location
            .as_deref()
            .filter(|l| !l.is_empty())
            .or_else(|| request.entity("location"));
        if let Some(destination) = destination {
            highlights.push(Highlight {
                id: destination.trim().to_lowercase().replace(' ', "_"),
                effect: HighlightEffect::Arrow,
                duration: DIRECTION_HIGHLIGHT_MS,
            });
        }
    }
    highlights
}

fn learning_moments_for(request: &ClassifiedRequest) -> Vec<LearningMoment> {
    [("word", "vocabulary"), ("grammar_point", "grammar"), ("text", "translation")]
        .into_iter()
        .filter_map(|(key, kind)| {
            request.entity(key).map(|value| LearningMoment {
                id: format!("{kind}:{}", value.to_lowercase()),
                kind: kind.to_string(),
                content: value.to_string(),
            })
        })
        .collect()
}

fn quest_progress_for(request: &ClassifiedRequest) -> Option<QuestProgress> {
    let game = &request.request.game_context;
    Some(QuestProgress {
        quest_id: game.current_quest.clone()?,
        step: game.quest_step.clone()?,
    })
}
