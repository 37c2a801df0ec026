use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    plans::{
        dto::{
            ActivePlanResponse, CreatePlanRequest, CreatePlanResponse, NoActivePlan, PlanView,
            RecommendationRequest, RecommendationResponse, ToggleRequest, ToggleResponse,
        },
        repo::{self, Plan},
        services::{
            build_recommendation_prompt, compute_summary, generate_plan, group_by_meal,
            split_recommendations, GeneratePlanError,
        },
    },
    profile,
    state::AppState,
};

pub fn plan_routes() -> Router<AppState> {
    Router::new()
        .route("/plans", post(create_plan))
        .route("/plans/active", get(get_active_plan))
        .route("/foods/:id/toggle", post(toggle_food))
        .route("/ai/recommendations", post(recommendations))
}

pub(crate) fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// Loads a plan and checks it belongs to the caller.
pub(crate) async fn owned_plan(
    state: &AppState,
    user_id: Uuid,
    plan_id: Uuid,
) -> Result<Plan, (StatusCode, String)> {
    let plan = repo::find_plan(&state.db, plan_id)
        .await
        .map_err(|e| {
            error!(error = %e, %plan_id, "find_plan failed");
            internal(e)
        })?
        .ok_or((StatusCode::NOT_FOUND, "Plan not found".to_string()))?;

    if plan.user_id != user_id {
        warn!(%user_id, %plan_id, "plan belongs to another user");
        return Err((StatusCode::FORBIDDEN, "Forbidden".into()));
    }
    Ok(plan)
}

#[instrument(skip(state, payload))]
pub async fn create_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Option<Json<CreatePlanRequest>>,
) -> Result<Json<CreatePlanResponse>, (StatusCode, String)> {
    let Json(payload) = payload.unwrap_or_default();

    let row = profile::repo::find_profile(&state.db, user_id)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "find_profile failed");
            internal(e)
        })?
        .ok_or((StatusCode::NOT_FOUND, "User not found".to_string()))?;
    let Some(profile) = row.to_profile() else {
        warn!(%user_id, "plan requested with incomplete profile");
        return Err((
            StatusCode::BAD_REQUEST,
            "Complete your profile before generating a plan".into(),
        ));
    };

    let (plan, items) = match generate_plan(
        &state.db,
        state.llm.as_ref(),
        user_id,
        &profile,
        payload.name,
    )
    .await
    {
        Ok(v) => v,
        Err(GeneratePlanError::Storage(e)) => {
            error!(error = %e, %user_id, "storing plan failed");
            return Err(internal(e));
        }
        Err(GeneratePlanError::Model(e)) => {
            error!(error = %e, %user_id, "model call failed");
            return Err((
                StatusCode::BAD_GATEWAY,
                "Failed to generate meal plan from AI".into(),
            ));
        }
        Err(e) => {
            warn!(error = %e, %user_id, "unusable model output");
            return Err((
                StatusCode::BAD_GATEWAY,
                "Failed to generate meal plan. Please try again. The AI did not return valid meal data".into(),
            ));
        }
    };

    let summary = compute_summary(&plan, &items);
    Ok(Json(CreatePlanResponse {
        plan: PlanView {
            plan,
            food_items: items,
        },
        summary,
    }))
}

#[instrument(skip(state))]
pub async fn get_active_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Response {
    let plan = match repo::find_active_plan(&state.db, user_id).await {
        Ok(Some(p)) => p,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(NoActivePlan {
                    message: "No active plan found",
                    has_no_plan: true,
                }),
            )
                .into_response();
        }
        Err(e) => {
            error!(error = %e, %user_id, "find_active_plan failed");
            return internal(e).into_response();
        }
    };

    let items = match repo::list_items(&state.db, plan.id).await {
        Ok(items) => items,
        Err(e) => {
            error!(error = %e, plan_id = %plan.id, "list_items failed");
            return internal(e).into_response();
        }
    };

    let summary = compute_summary(&plan, &items);
    let grouped_foods = group_by_meal(&items);
    Json(ActivePlanResponse {
        plan: PlanView {
            plan,
            food_items: items,
        },
        summary,
        grouped_foods,
    })
    .into_response()
}

#[instrument(skip(state, payload))]
pub async fn toggle_food(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<ToggleRequest>>,
) -> Result<Json<ToggleResponse>, (StatusCode, String)> {
    let Json(payload) = payload.unwrap_or_default();

    let item = repo::find_item(&state.db, id)
        .await
        .map_err(|e| {
            error!(error = %e, %id, "find_item failed");
            internal(e)
        })?
        .ok_or((StatusCode::NOT_FOUND, "Food item not found".to_string()))?;

    let plan = owned_plan(&state, user_id, item.plan_id).await?;

    let consumed = payload.is_consumed.unwrap_or(true);
    let food_item = repo::set_consumed(&state.db, id, consumed)
        .await
        .map_err(|e| {
            error!(error = %e, %id, "set_consumed failed");
            internal(e)
        })?;

    let items = repo::list_items(&state.db, plan.id)
        .await
        .map_err(internal)?;

    info!(%user_id, food_id = %id, consumed, "food item toggled");
    Ok(Json(ToggleResponse {
        food_item,
        summary: compute_summary(&plan, &items),
    }))
}

#[instrument(skip(state, payload))]
pub async fn recommendations(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Option<Json<RecommendationRequest>>,
) -> Result<Json<RecommendationResponse>, (StatusCode, String)> {
    let Json(payload) = payload.unwrap_or_default();
    let preferences = payload.preferences.unwrap_or_else(|| "healthy".into());
    let goals = payload.goals.unwrap_or_else(|| "weight loss".into());

    let text = state
        .llm
        .generate(&build_recommendation_prompt(&preferences, &goals))
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "recommendation model call failed");
            (
                StatusCode::BAD_GATEWAY,
                "Error generating meal plan".to_string(),
            )
        })?;

    Ok(Json(RecommendationResponse {
        recommendations: split_recommendations(&text),
    }))
}
