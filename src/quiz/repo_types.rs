use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct QuizCard {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub card_type: String,
    pub question: String,
    pub difficulty: String,
    pub category: String,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct QuizAttempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub card_id: Uuid,
    pub completed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
}

/// A completed attempt joined with the card it was for.
#[derive(Debug, Clone, FromRow)]
pub struct AttemptWithCard {
    pub id: Uuid,
    pub card_type: String,
    pub category: String,
    pub completed_at: OffsetDateTime,
}
