use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::{ApiJson, ApiMeta, ApiPath, ApiQuery, ApiResponse, AppState, AuthUser},
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{
        AddAnimeInput, AnimeMetadata, JikanAnime, ListComparison, ListOptions, SortBy, SortOrder,
        UpdateAnimeInput, UserAnimeDetails, UserAnimeEntry,
    },
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    page: Option<u32>,
    limit: Option<u32>,
    sort_by: Option<SortBy>,
    sort_order: Option<SortOrder>,
}

impl ListQuery {
    fn options(&self) -> ListOptions {
        ListOptions::new(
            self.page.unwrap_or(1),
            self.limit.unwrap_or(ListOptions::DEFAULT_LIMIT),
            self.sort_by.unwrap_or_default(),
            self.sort_order.unwrap_or_default(),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
    #[serde(default = "default_search_limit")]
    limit: u32,
}

fn default_search_limit() -> u32 {
    10
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub id: Uuid,
    pub deleted: bool,
}

/// Handler for listing the caller's anime
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> AppResult<Json<ApiResponse<Vec<UserAnimeDetails>>>> {
    let options = query.options();
    let (items, total) = state.animes.list_for_user(&user.id, &options).await?;
    Ok(Json(ApiResponse::paginated(
        items,
        ApiMeta::for_page(&options, total),
    )))
}

pub async fn get_one(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<UserAnimeDetails>>> {
    let entry = state.animes.get_one(&user.id, id).await?;
    Ok(Json(ApiResponse::success(entry)))
}

/// Handler for adding an anime to the caller's list
pub async fn add(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    user: AuthUser,
    ApiJson(input): ApiJson<AddAnimeInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<UserAnimeEntry>>)> {
    tracing::info!(
        request_id = %request_id,
        user_id = %user.id,
        mal_id = input.mal_id,
        "Adding anime to list"
    );

    let entry = state.animes.add_to_list(&user.id, &input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(entry))))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<UpdateAnimeInput>,
) -> AppResult<Json<ApiResponse<UserAnimeEntry>>> {
    let entry = state.animes.update_entry(&user.id, id, &patch).await?;
    Ok(Json(ApiResponse::success(entry)))
}

pub async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<DeletedResponse>>> {
    let deleted = state.animes.remove_from_list(&user.id, id).await?;
    Ok(Json(ApiResponse::success(DeletedResponse { id, deleted })))
}

/// Handler for external anime search
pub async fn search(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    _user: AuthUser,
    ApiQuery(params): ApiQuery<SearchQuery>,
) -> AppResult<Json<ApiResponse<Vec<JikanAnime>>>> {
    tracing::info!(request_id = %request_id, query = %params.q, "Searching anime");

    let results = state.animes.search(&params.q, params.limit).await?;
    Ok(Json(ApiResponse::success(results)))
}

pub async fn metadata(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(mal_id): ApiPath<i32>,
) -> AppResult<Json<ApiResponse<AnimeMetadata>>> {
    let metadata = state.animes.get_metadata(mal_id).await?;
    Ok(Json(ApiResponse::success(metadata)))
}

/// Handler for comparing the caller's list with one accepted friend's
pub async fn compare(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(other_id): ApiPath<String>,
) -> AppResult<Json<ApiResponse<ListComparison>>> {
    if !state.friends.are_friends(&user.id, &other_id).await? {
        return Err(AppError::NotFound("Friend not found".to_string()));
    }

    let comparison = state.animes.compare(&user.id, &other_id).await?;
    Ok(Json(ApiResponse::success(comparison)))
}
