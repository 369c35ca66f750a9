// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation context for the Hachi companion.
//!
//! - [`ConversationManager`]: bounded per-conversation turn history
//! - [`MemoryStore`] / [`JsonFileStore`]: persistence backends
//! - [`detect_state`]: new topic, follow-up, or clarification
//! - [`PromptBuilder`]: prompt assembly for the LLM tiers
//! - [`clean_reply`]: thinking-markup removal and reply sanity checks
//! - [`VocabularyTracker`]: per-player word encounters and mastery

pub mod manager;
pub mod prompt;
pub mod reply;
pub mod state;
pub mod store;
pub mod vocabulary;

use std::path::PathBuf;
use std::sync::Arc;

use hachi_config::model::{ConversationConfig, StoreKind};
use hachi_core::{ConversationStore, HachiError};

pub use manager::ConversationManager;
pub use prompt::PromptBuilder;
pub use reply::{clean_reply, strip_thinking, ReplyDefect};
pub use state::{detect_state, ConversationState};
pub use store::{JsonFileStore, MemoryStore};
pub use vocabulary::{MasterySummary, VocabularyTracker, WordProgress};

/// Build the store selected by configuration.
pub async fn open_store(config: &ConversationConfig) -> Result<Arc<dyn ConversationStore>, HachiError> {
    match config.store {
        StoreKind::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreKind::File => {
            let dir = match &config.store_dir {
                Some(dir) => PathBuf::from(dir),
                None => dirs::data_dir()
                    .ok_or_else(|| {
                        HachiError::Config(
                            "conversation.store_dir is unset and no data directory was found"
                                .into(),
                        )
                    })?
                    .join("hachi")
                    .join("conversations"),
            };
            Ok(Arc::new(JsonFileStore::open(dir).await?))
        }
    }
}
