use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

pub use crate::chat::repo_types::{ChatMessage, ROLE_ASSISTANT, ROLE_USER};

pub async fn insert_message(
    db: &PgPool,
    plan_id: Uuid,
    role: &str,
    content: &str,
    action: Option<&serde_json::Value>,
) -> anyhow::Result<ChatMessage> {
    let row = sqlx::query_as::<_, ChatMessage>(
        r#"
        INSERT INTO chat_messages (plan_id, role, content, action)
        VALUES ($1, $2, $3, $4)
        RETURNING id, plan_id, role, content, action, created_at
        "#,
    )
    .bind(plan_id)
    .bind(role)
    .bind(content)
    .bind(action)
    .fetch_one(db)
    .await
    .context("insert chat message")?;
    Ok(row)
}

/// Whole conversation of a plan, oldest first.
pub async fn list_messages(db: &PgPool, plan_id: Uuid) -> anyhow::Result<Vec<ChatMessage>> {
    let rows = sqlx::query_as::<_, ChatMessage>(
        r#"
        SELECT id, plan_id, role, content, action, created_at
          FROM chat_messages
         WHERE plan_id = $1
         ORDER BY created_at ASC
        "#,
    )
    .bind(plan_id)
    .fetch_all(db)
    .await
    .context("list chat messages")?;
    Ok(rows)
}

/// The last `limit` messages of a plan, oldest first.
pub async fn recent_messages(
    db: &PgPool,
    plan_id: Uuid,
    limit: i64,
) -> anyhow::Result<Vec<ChatMessage>> {
    let mut rows = sqlx::query_as::<_, ChatMessage>(
        r#"
        SELECT id, plan_id, role, content, action, created_at
          FROM chat_messages
         WHERE plan_id = $1
         ORDER BY created_at DESC
         LIMIT $2
        "#,
    )
    .bind(plan_id)
    .bind(limit)
    .fetch_all(db)
    .await
    .context("recent chat messages")?;
    rows.reverse();
    Ok(rows)
}
