use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

pub use crate::quiz::repo_types::{AttemptWithCard, QuizAttempt, QuizCard};

const CARD_COLUMNS: &str = "id, card_type, question, difficulty, category, is_active, created_at";

/// Active cards, optionally of one type, minus the excluded ids.
pub async fn active_cards(
    db: &PgPool,
    card_type: Option<&str>,
    exclude: &[Uuid],
) -> anyhow::Result<Vec<QuizCard>> {
    let sql = format!(
        "SELECT {CARD_COLUMNS} FROM quiz_cards
          WHERE is_active
            AND ($1::text IS NULL OR card_type = $1)
            AND NOT (id = ANY($2))"
    );
    let rows = sqlx::query_as::<_, QuizCard>(&sql)
        .bind(card_type)
        .bind(exclude)
        .fetch_all(db)
        .await
        .context("list quiz cards")?;
    Ok(rows)
}

pub async fn find_card(db: &PgPool, card_id: Uuid) -> anyhow::Result<Option<QuizCard>> {
    let sql = format!("SELECT {CARD_COLUMNS} FROM quiz_cards WHERE id = $1");
    let row = sqlx::query_as::<_, QuizCard>(&sql)
        .bind(card_id)
        .fetch_optional(db)
        .await
        .context("find quiz card")?;
    Ok(row)
}

/// Card ids of the user's latest attempts, newest first.
pub async fn recent_card_ids(db: &PgPool, user_id: Uuid, limit: i64) -> anyhow::Result<Vec<Uuid>> {
    let ids = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT card_id
          FROM quiz_attempts
         WHERE user_id = $1
         ORDER BY completed_at DESC
         LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(db)
    .await
    .context("recent quiz attempts")?;
    Ok(ids)
}

pub async fn insert_attempt(
    db: &PgPool,
    user_id: Uuid,
    card_id: Uuid,
    completed: bool,
) -> anyhow::Result<QuizAttempt> {
    let row = sqlx::query_as::<_, QuizAttempt>(
        r#"
        INSERT INTO quiz_attempts (user_id, card_id, completed, completed_at)
        VALUES ($1, $2, $3, now())
        RETURNING id, user_id, card_id, completed, completed_at
        "#,
    )
    .bind(user_id)
    .bind(card_id)
    .bind(completed)
    .fetch_one(db)
    .await
    .context("insert quiz attempt")?;
    Ok(row)
}

/// Completed attempts with their card, newest first.
pub async fn completed_attempts(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<AttemptWithCard>> {
    let rows = sqlx::query_as::<_, AttemptWithCard>(
        r#"
        SELECT a.id, c.card_type, c.category, a.completed_at
          FROM quiz_attempts a
          JOIN quiz_cards c ON c.id = a.card_id
         WHERE a.user_id = $1 AND a.completed
         ORDER BY a.completed_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list completed quiz attempts")?;
    Ok(rows)
}

pub async fn count_cards(db: &PgPool) -> anyhow::Result<i64> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM quiz_cards")
        .fetch_one(db)
        .await
        .context("count quiz cards")?;
    Ok(n)
}
