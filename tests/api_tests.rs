use std::sync::Arc;
use std::time::Duration;

use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

use omoi_api::{
    api::{AppState, Claims, JwtVerifier},
    create_router,
    db::MemoryStore,
    error::{AppError, AppResult},
    models::JikanAnime,
    services::{AnimeProvider, SearchThrottle},
};

const SECRET: &str = "test-secret";

/// Serves fixed titles; ids at or above 90000 behave like a provider 404
struct StubProvider;

fn stub_anime(mal_id: i32) -> JikanAnime {
    serde_json::from_value(json!({
        "mal_id": mal_id,
        "title": format!("Anime {:02}", mal_id),
        "type": "TV",
        "genres": [{ "name": "Action" }],
    }))
    .unwrap()
}

#[async_trait::async_trait]
impl AnimeProvider for StubProvider {
    async fn search(&self, _query: &str, limit: u32) -> AppResult<Vec<JikanAnime>> {
        Ok((1..=limit as i32).map(stub_anime).collect())
    }

    async fn fetch_anime(&self, mal_id: i32) -> AppResult<JikanAnime> {
        if mal_id >= 90000 {
            return Err(AppError::ExternalApi(
                "Jikan API returned status 404 Not Found".to_string(),
            ));
        }
        Ok(stub_anime(mal_id))
    }
}

struct TestApp {
    server: TestServer,
}

impl TestApp {
    async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        store.insert_user("alice", "alice@example.com", Some("Alice")).await;
        store.insert_user("bob", "bob@example.com", Some("Bob")).await;
        store.insert_user("carol", "carol@example.com", None).await;

        let state = AppState::new(
            store,
            Arc::new(StubProvider),
            Arc::new(SearchThrottle::new(Duration::ZERO)),
            chrono::Duration::days(7),
            JwtVerifier::new(SECRET),
        );
        let server = tokio_test::assert_ok!(TestServer::new(create_router(state)));
        Self { server }
    }
}

fn token(user_id: &str) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn as_user(request: TestRequest, user_id: &str) -> TestRequest {
    request.add_header(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token(user_id))).unwrap(),
    )
}

async fn add_anime(app: &TestApp, user_id: &str, mal_id: i32, rating: i16) -> Value {
    let response = as_user(app.server.post("/animes"), user_id)
        .json(&json!({
            "malId": mal_id,
            "userRating": rating,
            "animationRating": 4
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["data"].clone()
}

async fn befriend(app: &TestApp, requester: &str, addressee: &str) {
    let response = as_user(app.server.post("/friends"), requester)
        .json(&json!({ "userId": addressee }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let id = response.json::<Value>()["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    as_user(app.server.put(&format!("/friends/{}", id)), addressee)
        .json(&json!({ "action": "accept" }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;
    let response = app.server.get("/health").await;
    response.assert_status_ok();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new().await;

    let response = app.server.get("/animes").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let response = app
        .server
        .get("/animes")
        .add_header(AUTHORIZATION, HeaderValue::from_static("Bearer not-a-jwt"))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_add_get_and_duplicate() {
    let app = TestApp::new().await;

    let created = add_anime(&app, "alice", 5114, 6).await;
    let id = created["id"].as_str().unwrap();
    assert_eq!(created["userRating"], 6);

    let response = as_user(app.server.get(&format!("/animes/{}", id)), "alice").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["userRating"], 6);
    assert_eq!(body["data"]["animationRating"], 4);
    assert_eq!(body["data"]["anime"]["title"], "Anime 5114");

    let response = as_user(app.server.post("/animes"), "alice")
        .json(&json!({ "malId": 5114, "userRating": 1, "animationRating": 1 }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["error"]["code"], "ALREADY_EXISTS");

    let response = as_user(app.server.get(&format!("/animes/{}", id)), "alice").await;
    assert_eq!(response.json::<Value>()["data"]["userRating"], 6);
}

#[tokio::test]
async fn test_invalid_input_is_validation_error() {
    let app = TestApp::new().await;

    let response = as_user(app.server.post("/animes"), "alice")
        .json(&json!({ "malId": 1, "userRating": 7, "animationRating": 3 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"]["code"], "VALIDATION_ERROR");

    let response = as_user(app.server.post("/animes"), "alice")
        .json(&json!({ "userRating": 3 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"]["code"], "VALIDATION_ERROR");

    let response = as_user(app.server.get("/animes/not-a-uuid"), "alice").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_provider_failure_aborts_add() {
    let app = TestApp::new().await;

    let response = as_user(app.server.post("/animes"), "alice")
        .json(&json!({ "malId": 90001, "userRating": 4, "animationRating": 4 }))
        .await;
    response.assert_status(StatusCode::BAD_GATEWAY);
    assert_eq!(
        response.json::<Value>()["error"]["code"],
        "EXTERNAL_API_ERROR"
    );

    let response = as_user(app.server.get("/animes"), "alice").await;
    assert_eq!(response.json::<Value>()["meta"]["total"], 0);
}

#[tokio::test]
async fn test_pagination_meta() {
    let app = TestApp::new().await;
    for mal_id in 1..=25 {
        add_anime(&app, "alice", mal_id, 3).await;
    }

    let response = as_user(
        app.server.get("/animes?page=2&limit=10&sortBy=title&sortOrder=asc"),
        "alice",
    )
    .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["meta"]["total"], 25);
    assert_eq!(body["meta"]["page"], 2);
    assert_eq!(body["meta"]["limit"], 10);
    assert_eq!(body["meta"]["hasMore"], true);
    assert_eq!(body["data"].as_array().unwrap().len(), 10);
    assert_eq!(body["data"][0]["anime"]["title"], "Anime 11");

    let response = as_user(app.server.get("/animes?page=3&limit=10"), "alice").await;
    let body: Value = response.json();
    assert_eq!(body["meta"]["hasMore"], false);
    assert_eq!(body["data"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_entries_are_private() {
    let app = TestApp::new().await;
    let created = add_anime(&app, "alice", 1, 5).await;
    let id = created["id"].as_str().unwrap();

    let response = as_user(app.server.get(&format!("/animes/{}", id)), "bob").await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = as_user(app.server.delete(&format!("/animes/{}", id)), "bob").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["deleted"], false);

    let response = as_user(app.server.get(&format!("/animes/{}", id)), "alice").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_search_requires_three_characters() {
    let app = TestApp::new().await;

    let response = as_user(app.server.get("/animes/search?q=ab"), "alice").await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = as_user(app.server.get("/animes/search?q=naruto&limit=3"), "alice").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_friend_request_flow() {
    let app = TestApp::new().await;

    let response = as_user(app.server.post("/friends"), "alice")
        .json(&json!({ "userId": "bob" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let id = response.json::<Value>()["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = as_user(app.server.post("/friends"), "bob")
        .json(&json!({ "userId": "alice" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    let response = as_user(app.server.put(&format!("/friends/{}", id)), "alice")
        .json(&json!({ "action": "accept" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = as_user(app.server.get("/friends?status=sent"), "alice").await;
    assert_eq!(response.json::<Value>()["data"][0]["friendId"], "bob");

    let response = as_user(app.server.put(&format!("/friends/{}", id)), "bob")
        .json(&json!({ "action": "accept" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["status"], "accepted");

    let response = as_user(app.server.get("/friends"), "alice").await;
    let body: Value = response.json();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["friendName"], "Bob");

    let response = as_user(app.server.get("/friends/status/bob"), "alice").await;
    let body: Value = response.json();
    assert_eq!(body["data"]["status"], "accepted");
    assert_eq!(body["data"]["isRequester"], true);

    as_user(app.server.delete(&format!("/friends/{}", id)), "bob")
        .await
        .assert_status_ok();
    let response = as_user(app.server.get("/friends"), "alice").await;
    assert!(response.json::<Value>()["data"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_self_request_rejected() {
    let app = TestApp::new().await;
    let response = as_user(app.server.post("/friends"), "alice")
        .json(&json!({ "userId": "alice" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_profile_with_stats() {
    let app = TestApp::new().await;
    add_anime(&app, "alice", 1, 5).await;
    add_anime(&app, "alice", 2, 4).await;
    befriend(&app, "alice", "bob").await;

    let response = as_user(app.server.get("/users/me?includeStats=true"), "alice").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["displayName"], "Alice");
    assert_eq!(body["data"]["stats"]["totalAnimes"], 2);
    assert_eq!(body["data"]["stats"]["averageRating"], 4.5);
    assert_eq!(body["data"]["stats"]["totalFriends"], 1);

    let response = as_user(app.server.put("/users/me"), "alice")
        .json(&json!({ "displayName": "Alice Liddell" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["displayName"], "Alice Liddell");

    let response = as_user(app.server.get("/users/me"), "nobody").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_search_excludes_caller() {
    let app = TestApp::new().await;

    let response = as_user(app.server.get("/users/search?q=ex"), "alice").await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = as_user(app.server.get("/users/search?q=example"), "alice").await;
    response.assert_status_ok();
    let ids: Vec<String> = response.json::<Value>()["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["bob", "carol"]);
}

#[tokio::test]
async fn test_compare_requires_friendship() {
    let app = TestApp::new().await;
    add_anime(&app, "alice", 1, 5).await;
    add_anime(&app, "bob", 1, 2).await;

    let response = as_user(app.server.get("/animes/compare/bob"), "alice").await;
    response.assert_status(StatusCode::NOT_FOUND);

    befriend(&app, "alice", "bob").await;
    let response = as_user(app.server.get("/animes/compare/bob"), "alice").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["common"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_compare_all_ranks_shared_titles() {
    let app = TestApp::new().await;
    add_anime(&app, "alice", 1, 1).await;
    add_anime(&app, "alice", 2, 4).await;
    add_anime(&app, "alice", 3, 4).await;
    add_anime(&app, "bob", 1, 6).await;
    add_anime(&app, "bob", 2, 5).await;
    add_anime(&app, "carol", 2, 4).await;
    befriend(&app, "alice", "bob").await;
    befriend(&app, "carol", "alice").await;

    let response = as_user(app.server.get("/compare"), "alice").await;
    response.assert_status_ok();
    let rows = response.json::<Value>()["data"].as_array().unwrap().clone();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["title"], "Anime 02");
    assert_eq!(rows[0]["ratings"].as_array().unwrap().len(), 3);
    assert_eq!(rows[1]["title"], "Anime 01");
    assert_eq!(rows[1]["stdDev"], 2.5);
    assert_eq!(rows[1]["agreement"], "divergent opinions");

    let response = as_user(app.server.get("/compare?q=anime%2001"), "alice").await;
    let rows = response.json::<Value>()["data"].as_array().unwrap().clone();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["ratings"][1]["person"], "Bob");
}

#[tokio::test]
async fn test_delete_account() {
    let app = TestApp::new().await;
    add_anime(&app, "carol", 1, 3).await;

    as_user(app.server.delete("/users/me"), "carol")
        .await
        .assert_status_ok();

    let response = as_user(app.server.get("/users/me"), "carol").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let response = as_user(app.server.get("/animes"), "carol").await;
    assert_eq!(response.json::<Value>()["meta"]["total"], 0);
}
