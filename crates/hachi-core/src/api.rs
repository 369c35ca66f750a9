// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the `/companion/assist` HTTP contract.
//!
//! Field names are camelCase on the wire. The response types derive
//! [`JsonSchema`] so formatted output can be validated against a published
//! schema in tests and by game clients.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::{
    CompanionRequest, GameContext, Language, ProcessingTier, RequestType,
};

/// Body of `POST /companion/assist`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssistRequest {
    pub player_id: String,
    pub session_id: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub game_context: GameContextDto,
    pub request: RequestBody,
}

/// Game-side context supplied with each request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameContextDto {
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub current_quest: Option<String>,
    #[serde(default)]
    pub quest_step: Option<String>,
    #[serde(default)]
    pub nearby_entities: Vec<String>,
    #[serde(default)]
    pub last_interaction: Option<String>,
    #[serde(default)]
    pub language_proficiency: HashMap<String, f32>,
}

/// The player's actual ask.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    #[serde(rename = "type", default)]
    pub request_type: RequestType,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub target_entity: Option<String>,
    #[serde(default)]
    pub target_location: Option<String>,
    #[serde(default)]
    pub language: Option<Language>,
}

impl AssistRequest {
    /// Convert the wire body into the internal immutable request.
    ///
    /// A request without text borrows its input from the target entity or
    /// location so the classifier always has something to look at.
    pub fn into_companion_request(self) -> CompanionRequest {
        let input = self
            .request
            .text
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.request.target_entity.clone())
            .or_else(|| self.request.target_location.clone())
            .unwrap_or_default();

        let game_context = GameContext {
            player_location: self.game_context.location,
            current_quest: self.game_context.current_quest,
            quest_step: self.game_context.quest_step,
            nearby_entities: self.game_context.nearby_entities,
            last_interaction: self.game_context.last_interaction,
            language_proficiency: self.game_context.language_proficiency,
        };

        let mut request = CompanionRequest::new(input, self.request.request_type)
            .with_player(self.player_id, self.session_id)
            .with_game_context(game_context);
        request.conversation_id = self.conversation_id;
        request.target_entity = self.request.target_entity;
        request.target_location = self.request.target_location;
        request.language = self.request.language;
        request
    }
}

/// Formatted companion reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanionResponse {
    pub dialogue: Dialogue,
    pub companion: CompanionState,
    pub ui: UiHints,
    pub game_state: GameStateDelta,
    pub meta: ResponseMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Dialogue {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub japanese_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pronunciation: Option<String>,
    pub character_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanionState {
    pub animation: Animation,
    pub emotional_state: EmotionalState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Animation {
    Idle,
    Happy,
    Thinking,
    Pointing,
    Excited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum EmotionalState {
    Neutral,
    Helpful,
    Encouraging,
    Curious,
    Apologetic,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UiHints {
    pub highlights: Vec<Highlight>,
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub id: String,
    pub effect: HighlightEffect,
    /// Milliseconds.
    pub duration: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HighlightEffect {
    Pulse,
    Glow,
    Bounce,
    Arrow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub text: String,
    pub action: String,
    #[serde(default)]
    pub params: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameStateDelta {
    pub learning_moments: Vec<LearningMoment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quest_progress: Option<QuestProgress>,
    pub vocabulary_unlocked: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LearningMoment {
    pub id: String,
    pub kind: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestProgress {
    pub quest_id: String,
    pub step: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub response_id: String,
    pub processing_tier: ProcessingTier,
    pub timestamp: DateTime<Utc>,
}

/// JSON Schema for [`CompanionResponse`], as published to game clients.
pub fn response_schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(CompanionResponse))
        .unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assist_request_parses_camel_case() {
        let body = serde_json::json!({
            "playerId": "p1",
            "sessionId": "s1",
            "gameContext": { "location": "ticket_office", "nearbyEntities": ["ticket_machine"] },
            "request": { "type": "vocabulary", "text": "What does 'kippu' mean?", "language": "english" }
        });
        let parsed: AssistRequest = serde_json::from_value(body).unwrap();
        let req = parsed.into_companion_request();
        assert_eq!(req.player_id, "p1");
        assert_eq!(req.request_type, RequestType::Vocabulary);
        assert_eq!(req.game_context.player_location, "ticket_office");
        assert_eq!(req.language, Some(Language::English));
        assert_eq!(req.player_input, "What does 'kippu' mean?");
    }

    #[test]
    fn missing_text_falls_back_to_target_entity() {
        let body = serde_json::json!({
            "playerId": "p1",
            "sessionId": "s1",
            "request": { "type": "assistance", "targetEntity": "ticket_machine" }
        });
        let parsed: AssistRequest = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.into_companion_request().player_input, "ticket_machine");
    }

    #[test]
    fn unknown_request_type_is_rejected() {
        let body = serde_json::json!({
            "playerId": "p1",
            "sessionId": "s1",
            "request": { "type": "dance" }
        });
        assert!(serde_json::from_value::<AssistRequest>(body).is_err());
    }

    #[test]
    fn schema_names_top_level_sections() {
        let schema = response_schema();
        let props = &schema["properties"];
        for key in ["dialogue", "companion", "ui", "gameState", "meta"] {
            assert!(props.get(key).is_some(), "schema missing {key}");
        }
    }
}
