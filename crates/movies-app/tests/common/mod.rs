#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use movies_app::state::{AppConfig, AppState};
use tempfile::TempDir;
use tower::ServiceExt as _;
use tower_cookies::{CookieManagerLayer, Key};

/// Fresh database in a temp dir, migrated and seeded.
pub async fn init_pool() -> (movies_dal::Pool, TempDir) {
    let dir = TempDir::with_prefix("movies_app_").unwrap();
    let url = format!("sqlite://{}/movies.db", dir.path().display());
    let pool = movies_dal::new_pool(&url).await.unwrap();
    movies_dal::migrate(&pool).await.unwrap();
    (pool, dir)
}

/// Application router as assembled by the server, without the static and trace layers.
pub fn app(state: AppState) -> Router {
    movies_app::movies::router(&state)
        .merge(movies_app::hello_world::router())
        .layer(CookieManagerLayer::new())
        .with_state(state)
}

pub async fn init_app() -> (Router, TempDir) {
    let (pool, dir) = init_pool().await;
    (app(AppState::new(AppConfig::default(), pool)), dir)
}

pub fn app_with_key(pool: movies_dal::Pool, key: Key) -> Router {
    app(AppState::with_key(AppConfig::default(), pool, key))
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body.to_vec())
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, _, body) = send(app, get(uri, None)).await;
    (status, serde_json::from_slice(&body).unwrap())
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, cookie: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

/// Opens create form, returns anti-forgery cookie and token.
pub async fn open_form(app: &Router) -> (String, String) {
    let (status, headers, body) = send(app, get("/Movies/Create", None)).await;
    assert_eq!(status, StatusCode::OK);
    let cookie = headers[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    let view: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(view["view"], "Movies/Create");
    let token = view["antiforgery_token"].as_str().unwrap().to_string();
    (cookie, token)
}
