use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ChatMessage {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub role: String,
    pub content: String,
    pub action: Option<serde_json::Value>, // edits the assistant applied, if any
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
