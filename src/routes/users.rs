use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{
    api::{ApiJson, ApiPath, ApiQuery, ApiResponse, AppState, AuthUser},
    error::{AppError, AppResult},
    models::{PublicProfile, UpdateProfileInput, User, UserStats},
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileQuery {
    #[serde(default)]
    include_stats: bool,
}

#[derive(Debug, Deserialize)]
pub struct UserSearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<UserStats>,
}

/// Handler for the caller's own profile, optionally with list statistics
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<ProfileQuery>,
) -> AppResult<Json<ApiResponse<ProfileResponse>>> {
    let profile = state
        .users
        .get_current_user(&user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let stats = if query.include_stats {
        Some(state.users.get_user_stats(&user.id).await?)
    } else {
        None
    };

    Ok(Json(ApiResponse::success(ProfileResponse {
        user: profile,
        stats,
    })))
}

pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<UpdateProfileInput>,
) -> AppResult<Json<ApiResponse<User>>> {
    let updated = state.users.update_profile(&user.id, &input).await?;
    Ok(Json(ApiResponse::success(updated)))
}

pub async fn delete_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    state.users.delete_account(&user.id).await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": true }),
    )))
}

pub async fn search(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<UserSearchQuery>,
) -> AppResult<Json<ApiResponse<Vec<PublicProfile>>>> {
    let users = state.users.search_users(&query.q, &user.id).await?;
    Ok(Json(ApiResponse::success(users)))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> AppResult<Json<ApiResponse<PublicProfile>>> {
    let profile = state
        .users
        .get_user_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(ApiResponse::success(profile)))
}
