// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local LLM tier for the Hachi companion, backed by Ollama.
//!
//! [`Tier2Processor`] builds a prompt from the conversation, sends it to
//! Ollama's `/api/generate`, and returns normalized reply text.

pub mod client;
pub mod error;
pub mod normalize;
pub mod types;

use std::time::Instant;

use async_trait::async_trait;
use hachi_config::HachiConfig;
use hachi_context::PromptBuilder;
use hachi_core::{ClassifiedRequest, ConversationContext, HachiError, ProcessingTier, Processor};
use tracing::{debug, info};

pub use client::OllamaClient;
pub use error::{OllamaError, OllamaErrorKind};
pub use normalize::normalize_response;

const TIER2_INSTRUCTIONS: &str =
    "Reply only with what you would say to the player, as plain text. Do not prefix it with your name.";

/// Processor for [`ProcessingTier::Tier2`].
pub struct Tier2Processor {
    client: OllamaClient,
    prompts: PromptBuilder,
}

impl Tier2Processor {
    pub fn new(config: &HachiConfig) -> Result<Self, HachiError> {
        let client = OllamaClient::new(&config.tier2)?;
        let prompts = PromptBuilder::new(&config.companion.name, config.conversation.prompt_turns)
            .with_extra_instructions(TIER2_INSTRUCTIONS);
        info!(
            model = config.tier2.model.as_str(),
            base_url = config.tier2.base_url.as_str(),
            "ollama tier initialized"
        );
        Ok(Self { client, prompts })
    }

    /// Creates a processor with an existing client.
    pub fn with_client(client: OllamaClient, prompts: PromptBuilder) -> Self {
        Self { client, prompts }
    }
}

#[async_trait]
impl Processor for Tier2Processor {
    fn tier(&self) -> ProcessingTier {
        ProcessingTier::Tier2
    }

    fn name(&self) -> &str {
        "ollama"
    }

    async fn process(
        &self,
        request: &ClassifiedRequest,
        context: &ConversationContext,
    ) -> Result<String, HachiError> {
        let prompt = self.prompts.build(request, context);
        let start = Instant::now();
        let text = self.client.generate(&prompt).await?;
        debug!(
            request_id = request.request_id(),
            model = self.client.model(),
            conversation_state = ?self.prompts.state_for(request, context),
            prompt_chars = prompt.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "ollama reply generated"
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use hachi_core::{CompanionRequest, ComplexityLevel, IntentCategory, RequestType};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn classified() -> ClassifiedRequest {
        ClassifiedRequest {
            request: CompanionRequest::new(
                "What is the difference between wa and ga?",
                RequestType::Grammar,
            ),
            intent: IntentCategory::GrammarExplanation,
            complexity: ComplexityLevel::Moderate,
            processing_tier: ProcessingTier::Tier2,
            confidence: 0.9,
            extracted_entities: HashMap::new(),
        }
    }

    fn processor(base_url: &str) -> Tier2Processor {
        let mut config = HachiConfig::default();
        config.tier2.base_url = base_url.to_string();
        let client = OllamaClient::new(&config.tier2)
            .unwrap()
            .with_retry_delay(Duration::from_millis(10));
        Tier2Processor::with_client(
            client,
            PromptBuilder::new("Hachi", 3).with_extra_instructions(TIER2_INSTRUCTIONS),
        )
    }

    #[tokio::test]
    async fn prompt_reaches_ollama_and_reply_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_string_contains("difference between wa and ga"))
            .and(body_string_contains("You are Hachi"))
            // NDJSON served as text/plain: the body shape, not the header, decides.
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "{\"response\":\"は (wa) marks the topic. \"}\n{\"response\":\"が (ga) marks the subject.\",\"done\":true}\n",
            ))
            .mount(&server)
            .await;

        let ctx = ConversationContext::new("c", "p", "beginner", "ticket_office");
        let text = processor(&server.uri()).process(&classified(), &ctx).await.unwrap();
        assert_eq!(text, "は (wa) marks the topic. が (ga) marks the subject.");
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn reply_log_carries_conversation_state() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "は (wa) marks the topic.",
                "done": true
            })))
            .mount(&server)
            .await;

        let ctx = ConversationContext::new("c", "p", "beginner", "");
        processor(&server.uri()).process(&classified(), &ctx).await.unwrap();
        assert!(logs_contain("conversation_state=NewTopic"));
    }

    #[tokio::test]
    async fn failures_surface_as_tier2_processing_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({ "error": "model not found" })))
            .mount(&server)
            .await;

        let ctx = ConversationContext::new("c", "p", "beginner", "");
        let err = processor(&server.uri()).process(&classified(), &ctx).await.unwrap_err();
        assert!(matches!(
            err,
            HachiError::TierProcessing {
                tier: ProcessingTier::Tier2,
                ..
            }
        ));
        assert!(err.is_cascade_recoverable());
    }
}
