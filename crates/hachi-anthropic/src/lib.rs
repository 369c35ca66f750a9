// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cloud LLM tier for the Hachi companion, backed by the Anthropic Messages API.
//!
//! [`Tier3Processor`] sends a richer prompt than the local tier, cleans the
//! reply with the shared normalization helper, and enforces a daily token
//! quota.

pub mod client;
pub mod quota;
pub mod types;

use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;
use hachi_config::HachiConfig;
use hachi_context::{clean_reply, PromptBuilder};
use hachi_core::{ClassifiedRequest, ConversationContext, HachiError, ProcessingTier, Processor};
use tracing::{debug, info};

pub use client::AnthropicClient;
pub use quota::UsageQuota;

use crate::types::{ApiMessage, MessageRequest};

const TIER3_SYSTEM: &str = "You are the voice of a companion character in a Japanese-learning text adventure. \
Stay in character, stay on topic, and answer with only the words the character says.";

const TIER3_INSTRUCTIONS: &str = "\
If the question involves several ideas, explain them one at a time, beginner first. \
When you compare two words or particles, give one short example of each.";

/// Processor for [`ProcessingTier::Tier3`].
///
/// API key resolution order: config -> `ANTHROPIC_API_KEY` env var -> error.
pub struct Tier3Processor {
    client: AnthropicClient,
    prompts: PromptBuilder,
    max_tokens: u32,
    temperature: f32,
    quota: Mutex<UsageQuota>,
}

impl Tier3Processor {
    pub fn new(config: &HachiConfig) -> Result<Self, HachiError> {
        let tier3 = &config.tier3;
        let api_key = resolve_api_key(&tier3.api_key)?;
        let client = AnthropicClient::new(
            &api_key,
            &tier3.api_version,
            &tier3.model,
            &tier3.base_url,
            config.tier_timeout(ProcessingTier::Tier3),
        )?;

        info!(model = tier3.model.as_str(), "anthropic tier initialized");

        Ok(Self::with_client(
            client,
            rich_prompts(config),
            tier3.max_tokens,
            tier3.temperature,
            UsageQuota::new(tier3.daily_token_quota),
        ))
    }

    /// Creates a processor with an existing client.
    pub fn with_client(
        client: AnthropicClient,
        prompts: PromptBuilder,
        max_tokens: u32,
        temperature: f32,
        quota: UsageQuota,
    ) -> Self {
        Self {
            client,
            prompts,
            max_tokens,
            temperature,
            quota: Mutex::new(quota),
        }
    }

    fn check_quota(&self) -> Result<(), HachiError> {
        self.quota
            .lock()
            .map_err(|_| HachiError::Internal("token quota lock poisoned".into()))?
            .check()
    }

    fn record_usage(&self, tokens: u64) -> Result<(), HachiError> {
        self.quota
            .lock()
            .map_err(|_| HachiError::Internal("token quota lock poisoned".into()))?
            .record(tokens);
        Ok(())
    }
}

/// The cloud tier sees twice as much history as the local one.
fn rich_prompts(config: &HachiConfig) -> PromptBuilder {
    PromptBuilder::new(&config.companion.name, config.conversation.prompt_turns * 2)
        .with_extra_instructions(TIER3_INSTRUCTIONS)
}

#[async_trait]
impl Processor for Tier3Processor {
    fn tier(&self) -> ProcessingTier {
        ProcessingTier::Tier3
    }

    fn name(&self) -> &str {
        "anthropic"
    }

    async fn process(
        &self,
        request: &ClassifiedRequest,
        context: &ConversationContext,
    ) -> Result<String, HachiError> {
        self.check_quota()?;

        let message_request = MessageRequest {
            model: self.client.default_model().to_string(),
            messages: vec![ApiMessage::user(self.prompts.build(request, context))],
            system: Some(TIER3_SYSTEM.to_string()),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let start = Instant::now();
        let response = self.client.complete_message(&message_request).await?;
        self.record_usage(response.usage.total())?;

        let text = clean_reply(&response.text()).map_err(|defect| HachiError::TierProcessing {
            tier: ProcessingTier::Tier3,
            message: format!("unusable reply: {defect}"),
            source: Some(Box::new(defect)),
        })?;

        debug!(
            request_id = request.request_id(),
            model = response.model.as_str(),
            conversation_state = ?self.prompts.state_for(request, context),
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "anthropic reply generated"
        );
        Ok(text)
    }
}

/// Resolves the API key from config or environment.
fn resolve_api_key(config_key: &Option<String>) -> Result<String, HachiError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
        HachiError::Config(
            "Anthropic API key not found. Set tier3.api_key in config or ANTHROPIC_API_KEY environment variable.".into(),
        )
    })
}
