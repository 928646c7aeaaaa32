//! Conversation persistence interface
//!
//! Conversation history lives in an external store. The chat client only
//! needs to list a user's conversations and to remember which vendor
//! conversation a stored conversation continues.

use crate::error::{ChatError, ChatResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Conversation listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub user_id: String,
    pub user_email: String,

    /// Vendor conversation this one continues, once known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_conversation_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_preview: Option<String>,
}

/// Backing store for conversation history
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Conversations owned by `user_id`, most recently updated first
    async fn conversations_for_user(&self, user_id: &str) -> ChatResult<Vec<ConversationSummary>>;

    /// Record the vendor conversation id for a stored conversation
    async fn set_vendor_conversation_id(
        &self,
        conversation_id: &str,
        vendor_conversation_id: &str,
    ) -> ChatResult<()>;
}

/// In-memory [`ConversationStore`]
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<String, ConversationSummary>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a conversation
    pub async fn upsert(&self, conversation: ConversationSummary) {
        self.conversations
            .write()
            .await
            .insert(conversation.id.clone(), conversation);
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn conversations_for_user(&self, user_id: &str) -> ChatResult<Vec<ConversationSummary>> {
        let conversations = self.conversations.read().await;
        let mut owned: Vec<ConversationSummary> = conversations
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(owned)
    }

    async fn set_vendor_conversation_id(
        &self,
        conversation_id: &str,
        vendor_conversation_id: &str,
    ) -> ChatResult<()> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations.get_mut(conversation_id).ok_or_else(|| {
            ChatError::Configuration(format!("Unknown conversation: {}", conversation_id))
        })?;
        conversation.vendor_conversation_id = Some(vendor_conversation_id.to_string());
        conversation.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn summary(id: &str, user: &str, updated_at: DateTime<Utc>) -> ConversationSummary {
        ConversationSummary {
            id: id.to_string(),
            user_id: user.to_string(),
            user_email: format!("{}@example.com", user),
            vendor_conversation_id: None,
            created_at: updated_at,
            updated_at,
            last_message_preview: None,
        }
    }

    #[tokio::test]
    async fn test_lists_user_conversations_newest_first() {
        let store = InMemoryConversationStore::new();
        let now = Utc::now();
        store.upsert(summary("old", "alice", now - Duration::hours(2))).await;
        store.upsert(summary("new", "alice", now)).await;
        store.upsert(summary("other", "bob", now)).await;

        let listed = store.conversations_for_user("alice").await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn test_set_vendor_conversation_id() {
        let store = InMemoryConversationStore::new();
        store.upsert(summary("c1", "alice", Utc::now())).await;

        store.set_vendor_conversation_id("c1", "vendor-9").await.unwrap();
        let listed = store.conversations_for_user("alice").await.unwrap();
        assert_eq!(listed[0].vendor_conversation_id.as_deref(), Some("vendor-9"));

        assert!(store.set_vendor_conversation_id("missing", "x").await.is_err());
    }
}
