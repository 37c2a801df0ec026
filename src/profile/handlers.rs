use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::AuthUser,
    profile::{
        dto::{CheckProfileResponse, CheckProfileUser, ProfileRequest, ProfileResponse},
        repo::{self, ProfileRow},
        services::build_profile,
    },
    state::AppState,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/user/profile", get(get_profile).post(save_profile))
        .route("/user/check-profile", get(check_profile))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileRow>, (StatusCode, String)> {
    match repo::find_profile(&state.db, user_id).await {
        Ok(Some(row)) => Ok(Json(row)),
        Ok(None) => Err((StatusCode::NOT_FOUND, "User not found".into())),
        Err(e) => {
            error!(error = %e, %user_id, "find_profile failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn save_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ProfileRequest>,
) -> Result<Json<ProfileResponse>, (StatusCode, String)> {
    let profile = build_profile(payload).map_err(|msg| {
        warn!(%user_id, reason = %msg, "invalid profile");
        (StatusCode::BAD_REQUEST, msg)
    })?;

    match repo::save_profile(&state.db, user_id, &profile).await {
        Ok(Some(_)) => {
            info!(%user_id, calories = profile.targets.calories, "profile saved");
            Ok(Json(ProfileResponse {
                message: "Profile updated successfully",
                profile,
            }))
        }
        Ok(None) => Err((StatusCode::NOT_FOUND, "User not found".into())),
        Err(e) => {
            error!(error = %e, %user_id, "save_profile failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

#[instrument(skip(state))]
pub async fn check_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<CheckProfileResponse>, (StatusCode, String)> {
    let row = repo::find_profile(&state.db, user_id).await.map_err(|e| {
        error!(error = %e, %user_id, "find_profile failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    let Some(row) = row else {
        return Ok(Json(CheckProfileResponse {
            profile_completed: false,
            user: None,
        }));
    };

    let profile = row.to_profile();
    let profile_completed = profile.is_some();
    Ok(Json(CheckProfileResponse {
        profile_completed,
        user: Some(CheckProfileUser {
            name: row.name,
            email: row.email,
            profile,
        }),
    }))
}
