//! In-process mock of the backend REST API.
//!
//! Every request is recorded as `"METHOD /path"` together with its bearer
//! token so tests can assert on what the client actually sent.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use polis::api::ApiClient;
use polis::config::ApiConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub route: String,
    pub bearer: Option<String>,
}

#[derive(Debug)]
pub struct MockState {
    pub username: String,
    pub fail_join: bool,
    pub fail_logout: bool,
    pub fail_like: bool,
    pub requests: Vec<Recorded>,
    pub last_profile_body: Option<String>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            username: "alice".into(),
            fail_join: false,
            fail_logout: false,
            fail_like: false,
            requests: Vec::new(),
            last_profile_body: None,
        }
    }
}

#[derive(Clone, Default)]
pub struct Mock {
    inner: Arc<Mutex<MockState>>,
}

impl Mock {
    pub fn with<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        f(&mut self.inner.lock().unwrap())
    }

    pub fn routes(&self) -> Vec<String> {
        self.with(|s| s.requests.iter().map(|r| r.route.clone()).collect())
    }

    pub fn last_request(&self) -> Option<Recorded> {
        self.with(|s| s.requests.last().cloned())
    }
}

pub struct MockServer {
    pub base_url: String,
    pub mock: Mock,
}

impl MockServer {
    pub fn api(&self) -> ApiClient {
        ApiClient::new(&ApiConfig {
            base_url: self.base_url.clone(),
            ..Default::default()
        })
        .unwrap()
    }
}

pub async fn spawn() -> MockServer {
    let mock = Mock::default();
    let app = Router::new().nest("/api", router()).layer(middleware::from_fn_with_state(
        mock.clone(),
        record,
    ));
    let app = app.with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockServer {
        base_url: format!("http://{}/api", addr),
        mock,
    }
}

fn router() -> Router<Mock> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/logout", post(logout))
        .route("/auth/refresh", post(refresh))
        .route("/users/me", get(me))
        .route("/users/profile/{username}", get(profile))
        .route("/users/update-username", put(update_username))
        .route("/users/update-profile", put(update_profile))
        .route("/users/search", get(search))
        .route("/follow/{id}", post(follow).delete(unfollow))
        .route("/follow/status/{id}", get(follow_status))
        .route("/follow/followers/{id}", get(follow_list))
        .route("/follow/following/{id}", get(follow_list))
        .route("/communities", get(communities))
        .route("/communities/{id}", get(community))
        .route(
            "/communities/{id}/posts",
            get(community_posts).post(create_community_post),
        )
        .route("/communities/{id}/join", post(join))
        .route("/communities/{id}/leave", delete(leave))
        .route("/posts/user/{id}", get(user_posts))
        .route("/posts/{id}/like", post(like))
        .route("/posts/{id}/save", post(save))
        .route("/posts/{id}/share", post(share))
        .route("/posts/{id}/comments", get(comments).post(add_comment))
}

async fn record(State(mock): State<Mock>, req: Request, next: Next) -> Response {
    let route = format!(
        "{} {}",
        req.method(),
        req.uri()
            .path_and_query()
            .map(|p| p.as_str().trim_start_matches("/api"))
            .unwrap_or_default()
    );
    let bearer = bearer(req.headers());
    mock.with(|s| s.requests.push(Recorded { route, bearer }));
    next.run(req).await
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn post_json(id: i64, content: &str) -> Value {
    json!({
        "id": id,
        "author": { "id": 4, "username": "erin" },
        "content": content,
        "likes": 4,
        "isLiked": false,
        "createdAt": "2025-01-15T12:00:00",
        "hashtags": ["civic"]
    })
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] != "pw" {
        return error(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }
    Json(json!({
        "token": "t1",
        "user": { "id": 7, "username": "alice", "email": "a@x.com" }
    }))
    .into_response()
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["username"] == "taken" {
        return error(StatusCode::CONFLICT, "Username already exists");
    }
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "User registered successfully" })),
    )
        .into_response()
}

async fn logout(State(mock): State<Mock>) -> Response {
    if mock.with(|s| s.fail_logout) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    StatusCode::OK.into_response()
}

async fn refresh(headers: HeaderMap) -> Response {
    match bearer(&headers) {
        Some(_) => Json(json!({ "token": "t2" })).into_response(),
        None => error(StatusCode::UNAUTHORIZED, "Missing token"),
    }
}

async fn me(State(mock): State<Mock>, headers: HeaderMap) -> Response {
    if bearer(&headers).is_none() {
        return error(StatusCode::UNAUTHORIZED, "Missing token");
    }
    let username = mock.with(|s| s.username.clone());
    Json(json!({
        "id": 7,
        "username": username,
        "email": null,
        "displayName": "Alice",
        "bio": ""
    }))
    .into_response()
}

async fn profile(Path(username): Path<String>) -> Response {
    if username != "erin" {
        return error(StatusCode::NOT_FOUND, "User not found");
    }
    Json(json!({
        "id": 4,
        "username": "erin",
        "displayName": "Erin",
        "followersCount": 12,
        "followingCount": 3,
        "isFollowing": false
    }))
    .into_response()
}

async fn update_username(State(mock): State<Mock>, Json(body): Json<Value>) -> Response {
    let username = body["username"].as_str().unwrap_or_default().to_string();
    if username == "taken_name" {
        return error(StatusCode::CONFLICT, "Username already taken");
    }
    mock.with(|s| s.username = username.clone());
    Json(json!({ "success": true, "message": "Username updated", "username": username }))
        .into_response()
}

async fn update_profile(State(mock): State<Mock>, headers: HeaderMap, body: Bytes) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !content_type.starts_with("multipart/form-data") {
        return error(StatusCode::BAD_REQUEST, "Expected multipart body");
    }
    let body = String::from_utf8_lossy(&body).into_owned();
    mock.with(|s| s.last_profile_body = Some(body));
    Json(json!({
        "success": true,
        "message": "Profile updated",
        "profileImageUrl": "/uploads/7.png"
    }))
    .into_response()
}

#[derive(Deserialize)]
struct SearchQuery {
    query: String,
}

async fn search(Query(q): Query<SearchQuery>) -> Response {
    let users: Vec<Value> = ["erin", "eric"]
        .iter()
        .enumerate()
        .filter(|(_, name)| name.starts_with(&q.query))
        .map(|(i, name)| json!({ "id": i as i64 + 4, "username": name }))
        .collect();
    Json(users).into_response()
}

async fn follow(Path(id): Path<i64>) -> Response {
    if id == 99 {
        return error(StatusCode::BAD_REQUEST, "Cannot follow yourself");
    }
    Json(json!({ "isFollowing": true, "followersCount": 13, "followingCount": 3 })).into_response()
}

async fn unfollow(Path(_id): Path<i64>) -> Response {
    StatusCode::NO_CONTENT.into_response()
}

async fn follow_status(Path(id): Path<i64>) -> Response {
    if id == 500 {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Json(json!({ "isFollowing": true, "followersCount": 12, "followingCount": 3 })).into_response()
}

#[derive(Deserialize)]
struct PageQuery {
    page: Option<u32>,
}

async fn follow_list(Path(id): Path<i64>, Query(q): Query<PageQuery>) -> Response {
    Json(json!([{
        "id": id + 100,
        "username": format!("page{}", q.page.unwrap_or(0)),
        "isFollowing": false
    }]))
    .into_response()
}

fn community_json(id: &str, name: &str, members: u64) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": format!("Talk about {}", name),
        "members": members,
        "rules": null
    })
}

async fn communities() -> Response {
    Json(json!([
        community_json("budget", "Budget", 10),
        community_json("transit", "Transit", 5),
        community_json("schools", "Schools", 2),
        community_json("broken", "Broken", 0),
    ]))
    .into_response()
}

async fn community(Path(id): Path<String>) -> Response {
    match id.as_str() {
        "budget" => Json(community_json("budget", "Budget", 10)).into_response(),
        "broken" => Json(community_json("broken", "Broken", 0)).into_response(),
        _ => error(StatusCode::NOT_FOUND, "Community not found"),
    }
}

async fn community_posts(Path(id): Path<String>) -> Response {
    if id == "broken" {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Json(json!([post_json(1, "Budget hearing #civic")])).into_response()
}

async fn create_community_post(Path(_id): Path<String>, Json(body): Json<Value>) -> Response {
    let content = body["content"].as_str().unwrap_or_default();
    (StatusCode::CREATED, Json(post_json(50, content))).into_response()
}

async fn join(State(mock): State<Mock>, Path(_id): Path<String>) -> Response {
    if mock.with(|s| s.fail_join) {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Could not join community");
    }
    Json(json!({ "success": true, "memberCount": 42, "isJoined": true })).into_response()
}

async fn leave(Path(_id): Path<String>) -> Response {
    StatusCode::NO_CONTENT.into_response()
}

async fn user_posts(Path(id): Path<i64>) -> Response {
    Json(json!([post_json(id * 10, "First #post"), post_json(id * 10 + 1, "Second")]))
        .into_response()
}

async fn like(State(mock): State<Mock>, Path(_id): Path<i64>) -> Response {
    if mock.with(|s| s.fail_like) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    Json(json!({ "likesCount": 9, "isLiked": true })).into_response()
}

async fn save(Path(_id): Path<i64>) -> Response {
    Json(json!({ "saved": true })).into_response()
}

async fn share(Path(_id): Path<i64>) -> Response {
    StatusCode::OK.into_response()
}

async fn comments(Path(_id): Path<i64>) -> Response {
    Json(json!([
        { "id": 1, "content": "Agreed", "user": { "username": "erin" } },
        { "id": 2, "content": "Reply", "author": "dana", "parentCommentId": 1 }
    ]))
    .into_response()
}

async fn add_comment(Path(_id): Path<i64>, Json(body): Json<Value>) -> Response {
    (
        StatusCode::CREATED,
        Json(json!({
            "id": 3,
            "content": body["content"],
            "user": { "username": "alice" },
            "parentCommentId": body.get("parentCommentId").cloned().unwrap_or(Value::Null)
        })),
    )
        .into_response()
}
