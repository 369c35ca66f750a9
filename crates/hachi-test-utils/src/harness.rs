// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the complete request pipeline with the real rule
//! and decision-tree tiers, mocked LLM tiers, and an in-memory conversation
//! store. `ask()` drives one utterance through it.

use std::sync::Arc;
use std::time::Duration;

use hachi_config::HachiConfig;
use hachi_context::{ConversationManager, MemoryStore};
use hachi_core::{CompanionRequest, HachiError, ProcessingTier, RequestType};
use hachi_router::{
    CascadeController, HandledRequest, ProcessorRegistry, RequestHandler, ResponseFormatter,
};

use crate::mock_processor::MockProcessor;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: HachiConfig,
    tier2: MockProcessor,
    tier3: MockProcessor,
    timeouts: Vec<(ProcessingTier, Duration)>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = HachiConfig::default();
        config.set_tier_enabled(ProcessingTier::Tier3, true);
        Self {
            config,
            tier2: MockProcessor::replying(ProcessingTier::Tier2, "mock tier 2 reply"),
            tier3: MockProcessor::replying(ProcessingTier::Tier3, "mock tier 3 reply"),
            timeouts: Vec::new(),
        }
    }

    /// Replace the configuration. Tier enable flags and timeouts are taken from it.
    pub fn with_config(mut self, config: HachiConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the mock standing in for the Ollama tier.
    pub fn with_tier2(mut self, mock: MockProcessor) -> Self {
        self.tier2 = mock;
        self
    }

    /// Set the mock standing in for the Anthropic tier.
    pub fn with_tier3(mut self, mock: MockProcessor) -> Self {
        self.tier3 = mock;
        self
    }

    pub fn disable_tier(mut self, tier: ProcessingTier) -> Self {
        self.config.set_tier_enabled(tier, false);
        self
    }

    /// Override one tier's cascade deadline.
    pub fn with_timeout(mut self, tier: ProcessingTier, timeout: Duration) -> Self {
        self.timeouts.push((tier, timeout));
        self
    }

    /// Build the test harness.
    pub fn build(self) -> TestHarness {
        let tier2 = Arc::new(self.tier2);
        let tier3 = Arc::new(self.tier3);

        let mut registry = ProcessorRegistry::from_config(&self.config);
        registry
            .register_processor(ProcessingTier::Tier2, tier2.clone())
            .register_processor(ProcessingTier::Tier3, tier3.clone());

        let mut cascade = CascadeController::new(Arc::new(registry), &self.config);
        for (tier, timeout) in self.timeouts {
            cascade = cascade.with_timeout(tier, timeout);
        }

        let handler = RequestHandler::new(
            cascade,
            ConversationManager::new(
                Arc::new(MemoryStore::new()),
                self.config.conversation.max_history,
            ),
            ResponseFormatter::new(&self.config.companion.name),
            &self.config.companion.default_language_level,
        );

        TestHarness {
            handler: Arc::new(handler),
            tier2,
            tier3,
            config: self.config,
        }
    }
}

/// A complete request pipeline with mocked LLM tiers.
pub struct TestHarness {
    /// The wired request handler.
    pub handler: Arc<RequestHandler>,
    /// Mock in the Tier2 slot.
    pub tier2: Arc<MockProcessor>,
    /// Mock in the Tier3 slot.
    pub tier3: Arc<MockProcessor>,
    /// Configuration the harness was built from.
    pub config: HachiConfig,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Send one free-text utterance as `test-player` in session `test-session`.
    pub async fn ask(&self, text: &str) -> Result<HandledRequest, HachiError> {
        self.send(
            CompanionRequest::new(text, RequestType::Assistance)
                .with_player("test-player", "test-session"),
        )
        .await
    }

    /// Send a fully built request.
    pub async fn send(&self, request: CompanionRequest) -> Result<HandledRequest, HachiError> {
        self.handler.handle_detailed(request).await
    }
}
