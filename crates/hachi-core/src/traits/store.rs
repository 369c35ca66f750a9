// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence seam for conversation history.

use async_trait::async_trait;

use crate::error::HachiError;
use crate::types::ConversationContext;

/// Backend that persists conversation contexts by id.
///
/// Writes are whole-context replacements. Two concurrent writers for the
/// same id race and the later `save` wins.
#[async_trait]
pub trait ConversationStore: Send + Sync + 'static {
    async fn load(&self, conversation_id: &str) -> Result<Option<ConversationContext>, HachiError>;

    async fn save(&self, context: &ConversationContext) -> Result<(), HachiError>;
}
