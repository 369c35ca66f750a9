// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end request handling: classify, load context, cascade, format, record.
//!
//! Words in `vocabularyUnlocked` are the ones the player meets for the
//! first time; repeats only update the [`VocabularyTracker`].

use std::sync::Arc;
use std::time::Instant;

use hachi_config::HachiConfig;
use hachi_context::{detect_state, open_store, ConversationManager, ConversationState, VocabularyTracker};
use hachi_core::api::CompanionResponse;
use hachi_core::{
    ClassifiedRequest, CompanionRequest, ConversationContext, HachiError, Turn,
};
use tracing::{info, warn};

use crate::cascade::{CascadeController, CascadeOutcome};
use crate::classifier::IntentClassifier;
use crate::formatter::ResponseFormatter;
use crate::recording;
use crate::registry::ProcessorRegistry;

/// Everything produced while handling one request.
#[derive(Debug, Clone)]
pub struct HandledRequest {
    pub classified: ClassifiedRequest,
    pub cascade: CascadeOutcome,
    pub response: CompanionResponse,
}

/// Glue between the HTTP layer and the routing pipeline.
pub struct RequestHandler {
    classifier: IntentClassifier,
    cascade: CascadeController,
    conversations: ConversationManager,
    formatter: ResponseFormatter,
    vocabulary: VocabularyTracker,
    default_language_level: String,
}

impl RequestHandler {
    pub fn new(
        cascade: CascadeController,
        conversations: ConversationManager,
        formatter: ResponseFormatter,
        default_language_level: impl Into<String>,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(),
            cascade,
            conversations,
            formatter,
            vocabulary: VocabularyTracker::new(),
            default_language_level: default_language_level.into(),
        }
    }

    /// Production wiring from configuration.
    pub async fn from_config(config: &HachiConfig) -> Result<Self, HachiError> {
        let registry = Arc::new(ProcessorRegistry::from_config(config));
        let store = open_store(&config.conversation).await?;
        Ok(Self::new(
            CascadeController::new(registry, config),
            ConversationManager::new(store, config.conversation.max_history),
            ResponseFormatter::new(&config.companion.name),
            &config.companion.default_language_level,
        ))
    }

    pub fn registry(&self) -> &ProcessorRegistry {
        self.cascade.registry()
    }

    pub fn conversations(&self) -> &ConversationManager {
        &self.conversations
    }

    pub fn vocabulary(&self) -> &VocabularyTracker {
        &self.vocabulary
    }

    /// Handle a request and return only the formatted response.
    pub async fn handle(&self, request: CompanionRequest) -> Result<CompanionResponse, HachiError> {
        Ok(self.handle_detailed(request).await?.response)
    }

    /// Handle a request, keeping the classification and cascade trail.
    ///
    /// Conversation store failures are logged and do not fail the request.
    /// Only a misconfigured cascade ([`HachiError::UnknownTier`]) is returned
    /// as an error.
    pub async fn handle_detailed(
        &self,
        request: CompanionRequest,
    ) -> Result<HandledRequest, HachiError> {
        let start = Instant::now();
        let classified = self.classifier.classify_request(request);
        recording::record_request(classified.intent);
        let context = self.load_context(&classified).await;
        let state = detect_state(classified.player_input(), &context);

        let cascade = self.cascade.run(&classified, &context).await?;

        let response_id = uuid::Uuid::new_v4().to_string();
        let mut response = self
            .formatter
            .format(&cascade.text, &classified, cascade.tier, &response_id);
        self.track_vocabulary(&classified, state, &mut response.game_state.vocabulary_unlocked);

        let turn = Turn::from_exchange(&classified, cascade.text.clone(), cascade.tier);
        if let Err(err) = self.conversations.update(context, turn).await {
            warn!(
                request_id = classified.request_id(),
                error = %err,
                "failed to record conversation turn"
            );
        }

        info!(
            request_id = classified.request_id(),
            intent = %classified.intent,
            preferred_tier = %classified.processing_tier,
            tier = %cascade.tier,
            attempts = cascade.attempts.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "companion request handled"
        );

        Ok(HandledRequest {
            classified,
            cascade,
            response,
        })
    }

    async fn load_context(&self, classified: &ClassifiedRequest) -> ConversationContext {
        let request = &classified.request;
        let conversation_id = request.conversation_key();
        let level = self.language_level(classified);
        let location = &request.game_context.player_location;

        match self
            .conversations
            .get_or_create(&conversation_id, &request.player_id, &level, location)
            .await
        {
            Ok(context) => context,
            Err(err) => {
                warn!(
                    request_id = classified.request_id(),
                    conversation_id = conversation_id.as_str(),
                    error = %err,
                    "conversation store unavailable, using a fresh context"
                );
                ConversationContext::new(conversation_id, &request.player_id, level, location)
            }
        }
    }

    /// Record each taught word and keep only first encounters.
    ///
    /// A clarification request counts as not having understood the word.
    fn track_vocabulary(
        &self,
        classified: &ClassifiedRequest,
        state: ConversationState,
        words: &mut Vec<String>,
    ) {
        let player = classified.request.player_id.as_str();
        let understood = state != ConversationState::Clarification;
        words.retain(|word| self.vocabulary.record_encounter(player, word, understood));
    }

    /// Learner level from the client's proficiency estimates, or the configured default.
    fn language_level(&self, classified: &ClassifiedRequest) -> String {
        let scores = &classified.request.game_context.language_proficiency;
        if scores.is_empty() {
            return self.default_language_level.clone();
        }
        let mean = scores.values().sum::<f32>() / scores.len() as f32;
        let level = match mean {
            m if m < 0.3 => "beginner",
            m if m < 0.7 => "intermediate",
            _ => "advanced",
        };
        level.to_string()
    }
}
