use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::{ApiJson, ApiPath, ApiQuery, ApiResponse, AppState, AuthUser},
    error::AppResult,
    middleware::request_id::RequestId,
    models::{FriendListItem, FriendWithStats, Friendship, FriendshipStatusInfo},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendFilter {
    #[default]
    All,
    Pending,
    Sent,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendsQuery {
    #[serde(default)]
    include_stats: bool,
    #[serde(default)]
    status: FriendFilter,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum FriendsPayload {
    Plain(Vec<FriendListItem>),
    WithStats(Vec<FriendWithStats>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequestBody {
    user_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendAction {
    Accept,
    Reject,
}

#[derive(Debug, Deserialize)]
pub struct RespondBody {
    action: FriendAction,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub id: Uuid,
    pub removed: bool,
}

/// Handler for the caller's friends, received requests or sent requests
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<FriendsQuery>,
) -> AppResult<Json<ApiResponse<FriendsPayload>>> {
    let payload = match query.status {
        FriendFilter::Pending => {
            FriendsPayload::Plain(state.friends.get_pending_requests(&user.id).await?)
        }
        FriendFilter::Sent => FriendsPayload::Plain(state.friends.get_sent_requests(&user.id).await?),
        FriendFilter::All if query.include_stats => {
            FriendsPayload::WithStats(state.friends.get_friends_with_stats(&user.id).await?)
        }
        FriendFilter::All => FriendsPayload::Plain(state.friends.get_friends(&user.id).await?),
    };

    Ok(Json(ApiResponse::success(payload)))
}

pub async fn send(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    user: AuthUser,
    ApiJson(body): ApiJson<SendRequestBody>,
) -> AppResult<(StatusCode, Json<ApiResponse<Friendship>>)> {
    tracing::info!(
        request_id = %request_id,
        user_id = %user.id,
        target_id = %body.user_id,
        "Sending friend request"
    );

    let friendship = state
        .friends
        .send_friend_request(&user.id, &body.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(friendship))))
}

pub async fn respond(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<RespondBody>,
) -> AppResult<Json<ApiResponse<Friendship>>> {
    let friendship = match body.action {
        FriendAction::Accept => state.friends.accept_request(&user.id, id).await?,
        FriendAction::Reject => state.friends.reject_request(&user.id, id).await?,
    };
    Ok(Json(ApiResponse::success(friendship)))
}

pub async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<RemovedResponse>>> {
    state.friends.remove_or_cancel(&user.id, id).await?;
    Ok(Json(ApiResponse::success(RemovedResponse { id, removed: true })))
}

pub async fn status(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(other_id): ApiPath<String>,
) -> AppResult<Json<ApiResponse<FriendshipStatusInfo>>> {
    let status = state
        .friends
        .check_friendship_status(&user.id, &other_id)
        .await?;
    Ok(Json(ApiResponse::success(status)))
}
