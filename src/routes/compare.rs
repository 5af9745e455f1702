use axum::{extract::State, Extension, Json};
use serde::Deserialize;

use crate::{
    api::{ApiQuery, ApiResponse, AppState, AuthUser},
    error::AppResult,
    middleware::request_id::RequestId,
    services::comparison::{self, TitleComparison},
};

#[derive(Debug, Default, Deserialize)]
pub struct CompareQuery {
    q: Option<String>,
}

/// Handler for the cross-friend agreement ranking
pub async fn compare_all(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<CompareQuery>,
) -> AppResult<Json<ApiResponse<Vec<TitleComparison>>>> {
    tracing::info!(request_id = %request_id, user_id = %user.id, "Building comparison");

    let comparisons = comparison::compare_with_friends(
        &state.animes,
        &state.friends,
        &state.users,
        &user.id,
        query.q.as_deref(),
    )
    .await?;

    Ok(Json(ApiResponse::success(comparisons)))
}
