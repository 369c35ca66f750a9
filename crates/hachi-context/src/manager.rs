// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded per-conversation history.

use std::sync::Arc;

use chrono::Utc;
use hachi_core::{ConversationContext, ConversationStore, HachiError, Turn};
use tracing::debug;

/// Owns conversation history and its bound.
///
/// The manager does not lock per conversation: concurrent requests for the
/// same id each read a snapshot, append their own turn, and save. The last
/// save wins and the other turn is lost.
#[derive(Clone)]
pub struct ConversationManager {
    store: Arc<dyn ConversationStore>,
    max_history: usize,
}

impl ConversationManager {
    /// `max_history` is clamped to at least one turn.
    pub fn new(store: Arc<dyn ConversationStore>, max_history: usize) -> Self {
        Self {
            store,
            max_history: max_history.max(1),
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Load the conversation, or create and persist a fresh one.
    ///
    /// An existing conversation keeps its history but picks up the player's
    /// current location.
    pub async fn get_or_create(
        &self,
        conversation_id: &str,
        player_id: &str,
        language_level: &str,
        location: &str,
    ) -> Result<ConversationContext, HachiError> {
        if let Some(mut existing) = self.store.load(conversation_id).await? {
            if !location.is_empty() && existing.current_location != location {
                existing.current_location = location.to_string();
            }
            return Ok(existing);
        }

        let context = ConversationContext::new(conversation_id, player_id, language_level, location);
        self.store.save(&context).await?;
        debug!(conversation_id, player_id, "conversation created");
        Ok(context)
    }

    /// Append a turn, evict the oldest beyond the bound, and persist.
    pub async fn update(
        &self,
        mut context: ConversationContext,
        turn: Turn,
    ) -> Result<ConversationContext, HachiError> {
        context.request_history.push_back(turn);
        while context.request_history.len() > self.max_history {
            context.request_history.pop_front();
        }
        context.updated_at = Utc::now();
        self.store.save(&context).await?;
        Ok(context)
    }

    /// Current history for a conversation, oldest first. Empty if unknown.
    pub async fn history(&self, conversation_id: &str) -> Result<Vec<Turn>, HachiError> {
        Ok(self
            .store
            .load(conversation_id)
            .await?
            .map(|ctx| ctx.request_history.into_iter().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use hachi_core::{IntentCategory, ProcessingTier};
    use proptest::prelude::*;

    use super::*;
    use crate::store::MemoryStore;

    fn turn(i: usize) -> Turn {
        Turn {
            request_id: format!("r{i}"),
            player_input: format!("question {i}"),
            response_text: format!("answer {i}"),
            intent: IntentCategory::GeneralHint,
            processing_tier: ProcessingTier::Rule,
            entities: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    fn manager(bound: usize) -> ConversationManager {
        ConversationManager::new(Arc::new(MemoryStore::new()), bound)
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let m = manager(10);
        let a = m.get_or_create("c1", "p1", "beginner", "platform_1").await.unwrap();
        let b = m.get_or_create("c1", "p1", "beginner", "platform_1").await.unwrap();
        assert_eq!(a.created_at, b.created_at);
    }

    #[tokio::test]
    async fn location_is_refreshed_on_existing_conversation() {
        let m = manager(10);
        m.get_or_create("c1", "p1", "beginner", "platform_1").await.unwrap();
        let ctx = m.get_or_create("c1", "p1", "beginner", "ticket_office").await.unwrap();
        assert_eq!(ctx.current_location, "ticket_office");
    }

    #[tokio::test]
    async fn n_plus_one_updates_evict_oldest() {
        let m = manager(3);
        let mut ctx = m.get_or_create("c1", "p1", "beginner", "").await.unwrap();
        for i in 0..4 {
            ctx = m.update(ctx, turn(i)).await.unwrap();
        }
        let ids: Vec<_> = m
            .history("c1")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.request_id)
            .collect();
        assert_eq!(ids, vec!["r1", "r2", "r3"]);
    }

    #[tokio::test]
    async fn unknown_conversation_has_empty_history() {
        assert!(manager(3).history("ghost").await.unwrap().is_empty());
    }

    #[test]
    fn zero_bound_is_clamped() {
        assert_eq!(manager(0).max_history(), 1);
    }

    proptest! {
        #[test]
        fn history_never_exceeds_bound(bound in 1usize..8, updates in 0usize..30) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let m = manager(bound);
                let mut ctx = m.get_or_create("c", "p", "beginner", "").await.unwrap();
                for i in 0..updates {
                    ctx = m.update(ctx, turn(i)).await.unwrap();
                    assert!(ctx.request_history.len() <= bound);
                }
                assert_eq!(ctx.request_history.len(), updates.min(bound));
                if updates > 0 {
                    let newest = format!("r{}", updates - 1);
                    assert_eq!(ctx.request_history.back().map(|t| t.request_id.clone()), Some(newest));
                }
            });
        }
    }
}
