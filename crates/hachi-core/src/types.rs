// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request, classification, and conversation types shared by every Hachi crate.

use std::collections::{HashMap, VecDeque};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::error::HachiError;

/// Processing tiers, ordered by cost and capability.
///
/// The derived `Ord` follows declaration order, so `Rule < Tier1 < Tier2 < Tier3`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub enum ProcessingTier {
    /// Scripted templates. Cheapest, always available unless disabled.
    #[serde(rename = "rule")]
    #[strum(serialize = "rule")]
    Rule,
    /// Local decision-tree walker.
    #[serde(rename = "tier_1")]
    #[strum(serialize = "tier_1")]
    Tier1,
    /// Local LLM (Ollama).
    #[serde(rename = "tier_2")]
    #[strum(serialize = "tier_2")]
    Tier2,
    /// Cloud LLM (Anthropic).
    #[serde(rename = "tier_3")]
    #[strum(serialize = "tier_3")]
    Tier3,
}

impl ProcessingTier {
    /// All tiers in ascending order.
    pub const ALL: [ProcessingTier; 4] = [
        ProcessingTier::Rule,
        ProcessingTier::Tier1,
        ProcessingTier::Tier2,
        ProcessingTier::Tier3,
    ];

    /// The next tier down the cascade, or `None` below `Rule`.
    pub fn lower(self) -> Option<ProcessingTier> {
        match self {
            ProcessingTier::Tier3 => Some(ProcessingTier::Tier2),
            ProcessingTier::Tier2 => Some(ProcessingTier::Tier1),
            ProcessingTier::Tier1 => Some(ProcessingTier::Rule),
            ProcessingTier::Rule => None,
        }
    }

    /// Iterate `self`, then every lower tier down to `Rule`.
    pub fn cascade_from(self) -> impl Iterator<Item = ProcessingTier> {
        std::iter::successors(Some(self), |tier| tier.lower())
    }

    /// Zero-based rank used for attempt-count arithmetic.
    pub fn rank(self) -> usize {
        self as usize
    }
}

impl FromStr for ProcessingTier {
    type Err = HachiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rule" => Ok(ProcessingTier::Rule),
            "tier_1" | "tier1" => Ok(ProcessingTier::Tier1),
            "tier_2" | "tier2" => Ok(ProcessingTier::Tier2),
            "tier_3" | "tier3" => Ok(ProcessingTier::Tier3),
            other => Err(HachiError::UnknownTier(other.to_string())),
        }
    }
}

/// What the player is trying to do.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IntentCategory {
    VocabularyHelp,
    GrammarExplanation,
    DirectionGuidance,
    TranslationConfirmation,
    TicketInfo,
    CasualChat,
    GeneralHint,
}

/// How hard the request looks, which drives tier selection.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ComplexityLevel {
    Simple,
    Moderate,
    Complex,
}

impl ComplexityLevel {
    /// The tier a request of this complexity should start at.
    pub fn preferred_tier(self) -> ProcessingTier {
        match self {
            ComplexityLevel::Simple => ProcessingTier::Tier1,
            ComplexityLevel::Moderate => ProcessingTier::Tier2,
            ComplexityLevel::Complex => ProcessingTier::Tier3,
        }
    }
}

/// The kind of help the game client asked for.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RequestType {
    #[default]
    Assistance,
    Hint,
    Vocabulary,
    Grammar,
    Direction,
    Translation,
    Ticket,
}

/// Language the player typed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Japanese,
}

/// Where the player is and what they are doing in the game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameContext {
    pub player_location: String,
    pub current_quest: Option<String>,
    pub quest_step: Option<String>,
    pub nearby_entities: Vec<String>,
    pub last_interaction: Option<String>,
    /// Skill area (`vocabulary`, `grammar`, ...) to a 0.0-1.0 proficiency estimate.
    pub language_proficiency: HashMap<String, f32>,
}

/// A single player utterance. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanionRequest {
    pub request_id: String,
    pub player_input: String,
    pub request_type: RequestType,
    pub timestamp: DateTime<Utc>,
    pub player_id: String,
    pub session_id: String,
    pub conversation_id: Option<String>,
    pub game_context: GameContext,
    pub target_entity: Option<String>,
    pub target_location: Option<String>,
    pub language: Option<Language>,
}

impl CompanionRequest {
    /// Create a request with a fresh id and the current timestamp.
    pub fn new(player_input: impl Into<String>, request_type: RequestType) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            player_input: player_input.into(),
            request_type,
            timestamp: Utc::now(),
            player_id: "anonymous".to_string(),
            session_id: String::new(),
            conversation_id: None,
            game_context: GameContext::default(),
            target_entity: None,
            target_location: None,
            language: None,
        }
    }

    pub fn with_player(mut self, player_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        self.player_id = player_id.into();
        self.session_id = session_id.into();
        self
    }

    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn with_game_context(mut self, game_context: GameContext) -> Self {
        self.game_context = game_context;
        self
    }

    pub fn with_target_entity(mut self, entity: impl Into<String>) -> Self {
        self.target_entity = Some(entity.into());
        self
    }

    pub fn with_target_location(mut self, location: impl Into<String>) -> Self {
        self.target_location = Some(location.into());
        self
    }

    /// The conversation this request belongs to.
    ///
    /// Falls back to the session id, then to the player id, so every request
    /// lands in some bounded history.
    pub fn conversation_key(&self) -> String {
        if let Some(id) = self.conversation_id.as_deref().filter(|id| !id.is_empty()) {
            return id.to_string();
        }
        if !self.session_id.is_empty() {
            return self.session_id.clone();
        }
        self.player_id.clone()
    }
}

/// A request annotated by the intent classifier. Read-only downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedRequest {
    pub request: CompanionRequest,
    pub intent: IntentCategory,
    pub complexity: ComplexityLevel,
    pub processing_tier: ProcessingTier,
    pub confidence: f32,
    pub extracted_entities: HashMap<String, String>,
}

impl ClassifiedRequest {
    /// Look up an extracted entity, ignoring empty captures.
    pub fn entity(&self, key: &str) -> Option<&str> {
        self.extracted_entities
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn request_id(&self) -> &str {
        &self.request.request_id
    }

    pub fn player_input(&self) -> &str {
        &self.request.player_input
    }
}

/// One recorded request/response exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub request_id: String,
    pub player_input: String,
    pub response_text: String,
    pub intent: IntentCategory,
    pub processing_tier: ProcessingTier,
    #[serde(default)]
    pub entities: HashMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Build a turn from a classified request and the text the cascade returned.
    pub fn from_exchange(
        request: &ClassifiedRequest,
        response_text: impl Into<String>,
        tier: ProcessingTier,
    ) -> Self {
        Self {
            request_id: request.request.request_id.clone(),
            player_input: request.request.player_input.clone(),
            response_text: response_text.into(),
            intent: request.intent,
            processing_tier: tier,
            entities: request.extracted_entities.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// Per-conversation state. Tier processors receive a read-only snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub conversation_id: String,
    pub player_id: String,
    pub player_language_level: String,
    pub current_location: String,
    pub request_history: VecDeque<Turn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationContext {
    pub fn new(
        conversation_id: impl Into<String>,
        player_id: impl Into<String>,
        player_language_level: impl Into<String>,
        current_location: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            conversation_id: conversation_id.into(),
            player_id: player_id.into(),
            player_language_level: player_language_level.into(),
            current_location: current_location.into(),
            request_history: VecDeque::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The most recent `n` turns, oldest first.
    pub fn recent_turns(&self, n: usize) -> impl Iterator<Item = &Turn> {
        let skip = self.request_history.len().saturating_sub(n);
        self.request_history.iter().skip(skip)
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.request_history.back()
    }
}


#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::ProcessingTier;

    fn any_tier() -> impl Strategy<Value = ProcessingTier> {
        prop::sample::select(ProcessingTier::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn cascade_never_climbs(start in any_tier()) {
            let order: Vec<_> = start.cascade_from().collect();
            prop_assert_eq!(order.len(), start.rank() + 1);
            prop_assert_eq!(order[0], start);
            prop_assert_eq!(*order.last().unwrap(), ProcessingTier::Rule);
            for pair in order.windows(2) {
                prop_assert!(pair[1] < pair[0]);
            }
        }
    }
}
