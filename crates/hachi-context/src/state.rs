// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Detect whether an utterance opens a new topic or continues the last one.

use std::sync::LazyLock;

use hachi_core::ConversationContext;
use regex::RegexSet;

/// Where an utterance sits relative to the conversation so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    NewTopic,
    FollowUp,
    Clarification,
}

impl ConversationState {
    /// Extra instruction handed to LLM tiers for this state.
    pub fn prompt_guidance(self) -> Option<&'static str> {
        match self {
            ConversationState::NewTopic => None,
            ConversationState::FollowUp => Some(
                "The player is following up on your previous answer. Build on it instead of repeating it.",
            ),
            ConversationState::Clarification => Some(
                "The player did not understand your previous answer. Explain it again more simply, with one short example.",
            ),
        }
    }
}

static FOLLOW_UP: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"^what about\b",
        r"^how about\b",
        r"^and\b",
        r"tell me more",
        r"what else",
        r"another (?:example|one|word)",
        r"can you explain more",
        r"^(?:also|then)\b",
    ])
    .unwrap_or_else(|_| RegexSet::empty())
});

static CLARIFICATION: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"i don'?t (?:understand|get it)",
        r"what do you mean",
        r"(?:explain|say) (?:that|it) again",
        r"i'?m (?:confused|lost)",
        r"^huh\b",
        r"^what\?$",
        r"too (?:hard|difficult)",
    ])
    .unwrap_or_else(|_| RegexSet::empty())
});

/// Classify `input` against the conversation history.
///
/// With no history every utterance is a new topic. Clarification wins over
/// follow-up when both match.
pub fn detect_state(input: &str, context: &ConversationContext) -> ConversationState {
    let Some(last) = context.last_turn() else {
        return ConversationState::NewTopic;
    };

    let lower = input.trim().to_lowercase();
    if CLARIFICATION.is_match(&lower) {
        return ConversationState::Clarification;
    }
    if FOLLOW_UP.is_match(&lower) {
        return ConversationState::FollowUp;
    }

    let mentions_prior_entity = last
        .entities
        .values()
        .filter(|v| v.len() > 2)
        .any(|v| lower.contains(&v.to_lowercase()));
    if mentions_prior_entity {
        ConversationState::FollowUp
    } else {
        ConversationState::NewTopic
    }
}
