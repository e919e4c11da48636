mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use common::{app_with_key, get, init_app, init_pool, open_form, post_form, send};
use movies_app::antiforgery::FORM_FIELD;
use tower_cookies::Key;
use tracing::info;
use tracing_test::traced_test;

async fn movies(app: &Router, uri: &str) -> Vec<serde_json::Value> {
    let (status, _, body) = send(app, get(uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    let view: serde_json::Value = serde_json::from_slice(&body).unwrap();
    view["model"]["movies"].as_array().unwrap().clone()
}

#[tokio::test]
#[traced_test]
async fn test_index_filters() {
    let (app, _dir) = init_app().await;

    let (status, _, body) = send(&app, get("/Movies", None)).await;
    assert_eq!(status, StatusCode::OK);
    let view: serde_json::Value = serde_json::from_slice(&body).unwrap();
    info!("Index view: {view}");
    assert_eq!(view["view"], "Movies/Index");
    assert_eq!(view["model"]["genres"], serde_json::json!(["Crime, Drama", "Drama"]));
    assert!(view.get("antiforgery_token").is_none());

    let found = movies(&app, "/Movies?movieGenre=Drama").await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["title"], "The Shawshank Redemption");

    let found = movies(&app, "/Movies/Index?searchString=God&movieGenre=Drama").await;
    assert!(found.is_empty());

    let found = movies(&app, "/Movies?searchString=%25").await;
    assert!(found.is_empty());
}

#[tokio::test]
#[traced_test]
async fn test_create_and_edit() {
    let (app, _dir) = init_app().await;
    let (cookie, token) = open_form(&app).await;

    let body = format!(
        "title=Rio+Bravo&release_date=1959-04-04&genre=Western&price=7.50&{FORM_FIELD}={token}&id=42"
    );
    let (status, headers, _) = send(&app, post_form("/Movies/Create", &cookie, body)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(headers[header::LOCATION], "/Movies");

    let all = movies(&app, "/Movies").await;
    assert_eq!(all.len(), 3);
    let id = all[2]["id"].as_i64().unwrap();
    // submitted id is not bound on create
    assert_ne!(id, 42);
    assert_eq!(all[2]["price"], "7.50");
    assert!(all[2]["rating"].is_null());

    let body = format!(
        "id={id}&title=Rio+Bravo&release_date=1959-04-04&genre=Western&price=200&{FORM_FIELD}={token}"
    );
    let (status, _, body) = send(&app, post_form(&format!("/Movies/Edit/{id}"), &cookie, body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let view: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(view["view"], "Movies/Edit");
    assert!(view["errors"]["price"].is_array());
    assert_eq!(view["antiforgery_token"], token.as_str());

    let body = format!(
        "id={id}&title=Rio+Bravo&release_date=1959-04-04&genre=Western&price=19.99&rating=PG&{FORM_FIELD}={token}"
    );
    let (status, _, _) = send(&app, post_form(&format!("/Movies/Edit/{id}"), &cookie, body)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);

    let (status, _, body) = send(&app, get(&format!("/Movies/Details/{id}"), None)).await;
    assert_eq!(status, StatusCode::OK);
    let view: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(view["model"]["price"], "19.99");
    assert_eq!(view["model"]["rating"], "PG");
}

#[tokio::test]
#[traced_test]
async fn test_edit_id_mismatch() {
    let (app, _dir) = init_app().await;
    let (cookie, token) = open_form(&app).await;

    let body = format!(
        "id=2&title=Changed&release_date=1972-03-24&genre=Drama&price=9.99&{FORM_FIELD}={token}"
    );
    let (status, _, _) = send(&app, post_form("/Movies/Edit/1", &cookie, body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let body = format!(
        "id=99&title=Changed&release_date=1972-03-24&genre=Drama&price=9.99&{FORM_FIELD}={token}"
    );
    let (status, _, _) = send(&app, post_form("/Movies/Edit/99", &cookie, body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let all = movies(&app, "/Movies").await;
    assert!(all.iter().all(|m| m["title"] != "Changed"));
}

#[tokio::test]
#[traced_test]
async fn test_delete() {
    let (app, _dir) = init_app().await;
    let (cookie, token) = open_form(&app).await;

    let (status, _, _) = send(
        &app,
        post_form("/Movies/Delete/1", &cookie, format!("{FORM_FIELD}=wrong")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(movies(&app, "/Movies").await.len(), 2);

    for uri in ["/Movies/Delete/1", "/Movies/Delete/1", "/Movies/Delete/abc"] {
        let (status, headers, _) =
            send(&app, post_form(uri, &cookie, format!("{FORM_FIELD}={token}"))).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(headers[header::LOCATION], "/Movies");
    }
    let all = movies(&app, "/Movies").await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0]["id"], 2);
}

#[tokio::test]
#[traced_test]
async fn test_token_in_header() {
    let (app, _dir) = init_app().await;
    let (cookie, token) = open_form(&app).await;

    let request = Request::builder()
        .method("POST")
        .uri("/Movies/Delete/2")
        .header(header::COOKIE, &cookie)
        .header(movies_app::antiforgery::HEADER, &token)
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(movies(&app, "/Movies").await.len(), 1);
}

#[tokio::test]
#[traced_test]
async fn test_token_needs_no_server_state() {
    let (pool, _dir) = init_pool().await;
    let key = Key::generate();
    let issuing = app_with_key(pool.clone(), key.clone());
    let (cookie, token) = open_form(&issuing).await;

    // a fresh instance with the same key accepts the token
    let fresh = app_with_key(pool.clone(), key);
    let (status, _, _) = send(
        &fresh,
        post_form("/Movies/Delete/2", &cookie, format!("{FORM_FIELD}={token}")),
    )
    .await;
    assert_eq!(status, StatusCode::SEE_OTHER);

    // cookie signed by another key is rejected
    let other = app_with_key(pool, Key::generate());
    let (status, _, _) = send(
        &other,
        post_form("/Movies/Delete/1", &cookie, format!("{FORM_FIELD}={token}")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[traced_test]
async fn test_tampered_cookie() {
    let (app, _dir) = init_app().await;
    let (cookie, token) = open_form(&app).await;
    let (name, value) = cookie.split_once('=').unwrap();

    // value without signature prefix, as a client could forge it
    let forged = format!("{name}={}", &value[value.len() - token.len()..]);
    assert!(forged.ends_with(&token));
    let (status, _, _) = send(
        &app,
        post_form("/Movies/Delete/1", &forged, format!("{FORM_FIELD}={token}")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // cookie issued again for the same client keeps the token
    let (status, headers, body) = send(&app, get("/Movies/Edit/1", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers.contains_key(header::SET_COOKIE));
    let view: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(view["antiforgery_token"], token.as_str());
}
