use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{error, info, instrument};

use crate::{
    auth::AuthUser,
    plans::handlers::internal,
    quiz::{
        dto::{CardQuery, CardType, CompleteRequest, CompleteResponse, QuizStats},
        repo::{self, QuizCard},
        services::{build_stats, draw_card},
    },
    state::AppState,
};

pub fn quiz_routes() -> Router<AppState> {
    Router::new()
        .route("/quiz/card", get(get_card))
        .route("/quiz/complete", post(complete_card))
        .route("/quiz/stats", get(get_stats))
}

#[instrument(skip(state))]
pub async fn get_card(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<CardQuery>,
) -> Result<Json<QuizCard>, (StatusCode, String)> {
    let card_type = match q.card_type.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(CardType::parse(raw).ok_or((
            StatusCode::BAD_REQUEST,
            r#"Invalid card type. Must be "truth" or "dare""#.to_string(),
        ))?),
    };

    let card = draw_card(&state, user_id, card_type)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "draw_card failed");
            internal(e)
        })?
        .ok_or((StatusCode::NOT_FOUND, "No quiz cards available".to_string()))?;
    Ok(Json(card))
}

#[instrument(skip(state, payload))]
pub async fn complete_card(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Option<Json<CompleteRequest>>,
) -> Result<Json<CompleteResponse>, (StatusCode, String)> {
    let Json(payload) = payload.unwrap_or_default();
    let card_id = payload
        .card_id
        .ok_or((StatusCode::BAD_REQUEST, "Invalid cardId".to_string()))?;

    repo::find_card(&state.db, card_id)
        .await
        .map_err(|e| {
            error!(error = %e, %card_id, "find_card failed");
            internal(e)
        })?
        .ok_or((StatusCode::NOT_FOUND, "Quiz card not found".to_string()))?;

    let completed = payload.completed.unwrap_or(true);
    let attempt = repo::insert_attempt(&state.db, user_id, card_id, completed)
        .await
        .map_err(|e| {
            error!(error = %e, %card_id, "insert_attempt failed");
            internal(e)
        })?;

    info!(%user_id, %card_id, completed, "quiz card completed");
    Ok(Json(CompleteResponse {
        success: true,
        attempt,
    }))
}

#[instrument(skip(state))]
pub async fn get_stats(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<QuizStats>, (StatusCode, String)> {
    let attempts = repo::completed_attempts(&state.db, user_id)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "completed_attempts failed");
            internal(e)
        })?;
    Ok(Json(build_stats(&attempts, OffsetDateTime::now_utc())))
}
