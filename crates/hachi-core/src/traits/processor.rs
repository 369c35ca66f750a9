// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tier processor trait shared by the rule, decision-tree, and LLM tiers.

use async_trait::async_trait;

use crate::error::HachiError;
use crate::types::{ClassifiedRequest, ConversationContext, ProcessingTier};

/// A processor that turns a classified request into companion text.
///
/// Processors are built once per tier by the registry and shared across
/// requests, so they must be `Send + Sync`. The conversation snapshot is
/// read-only; recording the turn is the handler's job.
#[async_trait]
pub trait Processor: Send + Sync + 'static {
    /// The tier this processor serves.
    fn tier(&self) -> ProcessingTier;

    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Produce raw reply text for the request.
    async fn process(
        &self,
        request: &ClassifiedRequest,
        context: &ConversationContext,
    ) -> Result<String, HachiError>;
}
