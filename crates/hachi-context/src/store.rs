// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation store backends: in-memory and one-JSON-file-per-conversation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use hachi_core::{ConversationContext, ConversationStore, HachiError};
use tracing::{debug, warn};

/// Process-lifetime store backed by a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    conversations: DashMap<String, ConversationContext>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn load(&self, conversation_id: &str) -> Result<Option<ConversationContext>, HachiError> {
        Ok(self
            .conversations
            .get(conversation_id)
            .map(|entry| entry.value().clone()))
    }

    async fn save(&self, context: &ConversationContext) -> Result<(), HachiError> {
        self.conversations
            .insert(context.conversation_id.clone(), context.clone());
        Ok(())
    }
}

/// Store that writes each conversation to `<dir>/<encoded id>.json`.
///
/// Writes go to a temporary sibling and are renamed into place, so a reader
/// never sees a half-written file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Create the store, creating `dir` if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, HachiError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        debug!(dir = %dir.display(), "conversation file store ready");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, conversation_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_id(conversation_id)))
    }
}

/// Filesystem-safe, one-to-one file stem for a conversation id.
///
/// `[A-Za-z0-9-]` is kept as is; every other byte, `_` included, becomes
/// `_XX` (uppercase hex). Since `_` only ever starts an escape, two distinct
/// ids never share a file.
fn encode_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("_{byte:02X}"));
        }
    }
    out
}

#[async_trait]
impl ConversationStore for JsonFileStore {
    async fn load(&self, conversation_id: &str) -> Result<Option<ConversationContext>, HachiError> {
        let path = self.path_for(conversation_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let context: ConversationContext = serde_json::from_slice(&bytes)?;
                // Case-insensitive filesystems can still fold two ids together.
                if context.conversation_id != conversation_id {
                    warn!(
                        requested = conversation_id,
                        stored = context.conversation_id.as_str(),
                        path = %path.display(),
                        "ignoring conversation file recorded for another id"
                    );
                    return Ok(None);
                }
                Ok(Some(context))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, context: &ConversationContext) -> Result<(), HachiError> {
        let path = self.path_for(&context.conversation_id);
        let tmp = path.with_extension(format!("json.{}.tmp", std::process::id()));
        let bytes = serde_json::to_vec_pretty(context)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.load("c1").await.unwrap().is_none());
        let ctx = ConversationContext::new("c1", "p1", "beginner", "station");
        store.save(&ctx).await.unwrap();
        assert_eq!(store.load("c1").await.unwrap(), Some(ctx));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ConversationContext::new("session/42", "p1", "beginner", "ticket_office");
        {
            let store = JsonFileStore::open(dir.path()).await.unwrap();
            store.save(&ctx).await.unwrap();
        }
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        let loaded = store.load("session/42").await.unwrap().unwrap();
        assert_eq!(loaded.current_location, "ticket_office");
        assert!(dir.path().join("session_2F42.json").exists());
    }

    #[tokio::test]
    async fn file_store_missing_id_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        assert!(store.load("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        std::fs::write(dir.path().join("bad.json"), b"{not json").unwrap();
        let err = store.load("bad").await.unwrap_err();
        assert!(matches!(err, HachiError::Storage { .. }));
    }

    #[test]
    fn encoded_ids_are_path_safe() {
        assert_eq!(encode_id("../etc/passwd"), "_2E_2E_2Fetc_2Fpasswd");
        assert_eq!(encode_id("abc-123"), "abc-123");
        assert_eq!(encode_id("駅"), "_E9_A7_85");
    }

    #[test]
    fn lookalike_ids_get_distinct_files() {
        let ids = ["room/1", "room_1", "room.1", "room 1", "room_2F1"];
        let encoded: std::collections::HashSet<_> = ids.iter().map(|id| encode_id(id)).collect();
        assert_eq!(encoded.len(), ids.len());
    }

    #[tokio::test]
    async fn lookalike_ids_do_not_share_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        let alice = ConversationContext::new("room/1", "alice", "beginner", "platform_3");
        store.save(&alice).await.unwrap();

        for other in ["room_1", "room.1", "room_2F1"] {
            assert!(store.load(other).await.unwrap().is_none(), "{other}");
        }
        let loaded = store.load("room/1").await.unwrap().unwrap();
        assert_eq!(loaded.player_id, "alice");
    }

    #[tokio::test]
    async fn record_for_another_id_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        let alice = ConversationContext::new("room-1", "alice", "beginner", "platform_3");
        let bytes = serde_json::to_vec(&alice).unwrap();
        std::fs::write(dir.path().join("room-2.json"), bytes).unwrap();

        assert!(store.load("room-2").await.unwrap().is_none());
    }
}
