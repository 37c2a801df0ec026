use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::chat::repo::{self, ChatMessage};

/// Where a plan's conversation is kept.
#[async_trait]
pub trait MessageLog: Send + Sync {
    async fn insert_message(
        &self,
        plan_id: Uuid,
        role: &str,
        content: &str,
        action: Option<&Value>,
    ) -> anyhow::Result<ChatMessage>;

    /// The last `limit` messages, oldest first.
    async fn recent_messages(&self, plan_id: Uuid, limit: i64) -> anyhow::Result<Vec<ChatMessage>>;
}

#[async_trait]
impl MessageLog for PgPool {
    async fn insert_message(
        &self,
        plan_id: Uuid,
        role: &str,
        content: &str,
        action: Option<&Value>,
    ) -> anyhow::Result<ChatMessage> {
        repo::insert_message(self, plan_id, role, content, action).await
    }

    async fn recent_messages(&self, plan_id: Uuid, limit: i64) -> anyhow::Result<Vec<ChatMessage>> {
        repo::recent_messages(self, plan_id, limit).await
    }
}

#[cfg(test)]
#[async_trait]
impl MessageLog for crate::plans::store::memory::MemoryStore {
    async fn insert_message(
        &self,
        plan_id: Uuid,
        role: &str,
        content: &str,
        action: Option<&Value>,
    ) -> anyhow::Result<ChatMessage> {
        let msg = ChatMessage {
            id: Uuid::new_v4(),
            plan_id,
            role: role.to_string(),
            content: content.to_string(),
            action: action.cloned(),
            created_at: time::OffsetDateTime::now_utc(),
        };
        self.tables().messages.push(msg.clone());
        Ok(msg)
    }

    async fn recent_messages(&self, plan_id: Uuid, limit: i64) -> anyhow::Result<Vec<ChatMessage>> {
        let t = self.tables();
        let mine: Vec<&ChatMessage> = t.messages.iter().filter(|m| m.plan_id == plan_id).collect();
        let skip = mine.len().saturating_sub(limit.max(0) as usize);
        Ok(mine.into_iter().skip(skip).cloned().collect())
    }
}
