use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    chat::{
        dto::{ChatRequest, ChatResponse, HistoryResponse},
        repo,
        services::{handle_message, ChatError},
    },
    plans::{
        dto::PlanView,
        handlers::{internal, owned_plan},
        services::{compute_summary, group_by_meal},
    },
    profile,
    state::AppState,
};

pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/chatbot/message", post(send_message))
        .route("/chatbot/history/:plan_id", get(history))
}

#[instrument(skip(state, payload))]
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Option<Json<ChatRequest>>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    let Json(payload) = payload.unwrap_or_default();
    let message = payload
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty());
    let (Some(plan_id), Some(message)) = (payload.plan_id, message) else {
        return Err((
            StatusCode::BAD_REQUEST,
            "Plan ID and message are required".into(),
        ));
    };

    let plan = owned_plan(&state, user_id, plan_id).await?;

    let profile = profile::repo::find_profile(&state.db, user_id)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "find_profile failed");
            internal(e)
        })?;
    let goal = profile.as_ref().and_then(|p| p.goal.as_deref());
    let diet_type = profile.as_ref().and_then(|p| p.diet_type.as_deref());

    let outcome = handle_message(&state.db, state.llm.as_ref(), &plan, goal, diet_type, message)
        .await
        .map_err(|e| match e {
            ChatError::Model(e) => {
                error!(error = %e, %plan_id, "chat model call failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "Failed to process message".to_string(),
                )
            }
            ChatError::Storage(e) => {
                error!(error = %e, %plan_id, "chat storage failed");
                internal(e)
            }
        })?;

    let summary = compute_summary(&plan, &outcome.items);
    let grouped_foods = group_by_meal(&outcome.items);
    Ok(Json(ChatResponse {
        message: outcome.reply,
        plan: PlanView {
            plan,
            food_items: outcome.items,
        },
        summary,
        grouped_foods,
        actions: outcome.actions,
    }))
}

#[instrument(skip(state))]
pub async fn history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(plan_id): Path<Uuid>,
) -> Result<Json<HistoryResponse>, (StatusCode, String)> {
    let plan = owned_plan(&state, user_id, plan_id).await?;
    let messages = repo::list_messages(&state.db, plan.id)
        .await
        .map_err(|e| {
            error!(error = %e, %plan_id, "list_messages failed");
            internal(e)
        })?;
    Ok(Json(HistoryResponse { messages }))
}
