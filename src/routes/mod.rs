use axum::{
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    api::AppState,
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
};

pub mod animes;
pub mod compare;
pub mod friends;
pub mod users;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
}

/// Authenticated API routes
fn api_routes() -> Router<AppState> {
    Router::new()
        // Anime list
        .route("/animes", get(animes::list).post(animes::add))
        .route("/animes/search", get(animes::search))
        .route("/animes/metadata/:mal_id", get(animes::metadata))
        .route("/animes/compare/:user_id", get(animes::compare))
        .route(
            "/animes/:id",
            get(animes::get_one)
                .put(animes::update)
                .delete(animes::remove),
        )
        // Friends
        .route("/friends", get(friends::list).post(friends::send))
        .route("/friends/status/:user_id", get(friends::status))
        .route(
            "/friends/:id",
            axum::routing::put(friends::respond).delete(friends::remove),
        )
        // Users
        .route(
            "/users/me",
            get(users::me).put(users::update_me).delete(users::delete_me),
        )
        .route("/users/search", get(users::search))
        .route("/users/:id", get(users::get_by_id))
        // Cross-friend comparison
        .route("/compare", get(compare::compare_all))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
