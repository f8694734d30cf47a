use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, DEMO_PASSWORD, DEMO_USERNAME, LOGIN_PATH};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<&str>) -> Request<String> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(body.unwrap_or_default().to_string()).unwrap()
}

async fn send(app: &Router, req: Request<String>) -> axum::response::Response {
    app.clone().oneshot(req).await.unwrap()
}

async fn login(app: &Router) -> String {
    let creds = json!({"username": DEMO_USERNAME, "password": DEMO_PASSWORD}).to_string();
    let resp = send(app, request("POST", LOGIN_PATH, None, Some(&creds))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    body["token"].as_str().unwrap().to_string()
}

// --- auth ---

#[tokio::test]
async fn login_issues_token_and_identity() {
    let app = app(&["masters/bins"]);
    let creds = json!({"username": DEMO_USERNAME, "password": DEMO_PASSWORD}).to_string();
    let resp = send(&app, request("POST", LOGIN_PATH, None, Some(&creds))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert_eq!(body["role"], "admin");
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let app = app(&["masters/bins"]);
    let creds = json!({"username": DEMO_USERNAME, "password": "nope"}).to_string();
    let resp = send(&app, request("POST", LOGIN_PATH, None, Some(&creds))).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn resources_require_bearer() {
    let app = app(&["masters/bins"]);
    let resp = send(&app, request("GET", "/masters/bins/", None, None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = send(&app, request("GET", "/masters/bins/", Some("made-up"), None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- paths ---

#[tokio::test]
async fn missing_trailing_slash_is_not_found() {
    let app = app(&["masters/bins"]);
    let token = login(&app).await;
    let resp = send(&app, request("GET", "/masters/bins", Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_collection_is_not_found() {
    let app = app(&["masters/bins"]);
    let token = login(&app).await;
    let resp = send(&app, request("GET", "/masters/rockets/", Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- list ---

#[tokio::test]
async fn list_is_bare_array_without_page() {
    let app = app(&["masters/bins"]);
    let token = login(&app).await;
    let resp = send(&app, request("GET", "/masters/bins/", Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!([]));
}

#[tokio::test]
async fn list_is_paginated_with_page() {
    let app = app(&["masters/bins"]);
    let token = login(&app).await;
    for i in 0..3 {
        let body = json!({"name": format!("B{i}")}).to_string();
        send(&app, request("POST", "/masters/bins/", Some(&token), Some(&body))).await;
    }
    let resp = send(
        &app,
        request("GET", "/masters/bins/?page=1&page_size=2", Some(&token), None),
    )
    .await;
    let page = body_json(resp).await;
    assert_eq!(page["count"], 3);
    assert_eq!(page["results"].as_array().unwrap().len(), 2);
    assert_eq!(page["next"], "?page=2");
    assert!(page["previous"].is_null());
}

#[tokio::test]
async fn huge_page_numbers_give_an_empty_page() {
    let app = app(&["masters/bins"]);
    let token = login(&app).await;
    let body = json!({"name": "B0"}).to_string();
    send(&app, request("POST", "/masters/bins/", Some(&token), Some(&body))).await;

    for query in [format!("page={}&page_size=2", usize::MAX), format!("page=3&page_size={}", usize::MAX)] {
        let uri = format!("/masters/bins/?{query}");
        let resp = send(&app, request("GET", &uri, Some(&token), None)).await;
        assert_eq!(resp.status(), StatusCode::OK, "{query}");
        let page = body_json(resp).await;
        assert_eq!(page["count"], 1, "{query}");
        assert!(page["results"].as_array().unwrap().is_empty(), "{query}");
        assert!(page["next"].is_null(), "{query}");
    }
}

// --- actions ---

#[tokio::test]
async fn action_post_echoes_payload() {
    let app = app(&["masters/bins"]);
    let token = login(&app).await;
    let resp = send(
        &app,
        request("POST", "/masters/bins/bulk-sync/", Some(&token), Some(r#"{"ids":[1]}"#)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["action"], "bulk-sync");
    assert_eq!(body["received"], json!({"ids": [1]}));
}

#[tokio::test]
async fn action_get_has_no_payload() {
    let app = app(&["masters/bins"]);
    let token = login(&app).await;
    let resp = send(&app, request("GET", "/masters/bins/summary/", Some(&token), None)).await;
    let body = body_json(resp).await;
    assert_eq!(body["action"], "summary");
    assert!(body.get("received").is_none());
}

// --- full CRUD lifecycle ---

#[tokio::test]
async fn crud_lifecycle() {
    let app = app(&["masters/bins"]);
    let token = login(&app).await;

    // create
    let resp = send(
        &app,
        request("POST", "/masters/bins/", Some(&token), Some(r#"{"name":"B1"}"#)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body_json(resp).await;
    assert_eq!(created["name"], "B1");
    let id = created["id"].as_u64().unwrap();

    // get
    let resp = send(&app, request("GET", &format!("/masters/bins/{id}/"), Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, created);

    // update
    let resp = send(
        &app,
        request(
            "PUT",
            &format!("/masters/bins/{id}/"),
            Some(&token),
            Some(r#"{"name":"B1-renamed"}"#),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = body_json(resp).await;
    assert_eq!(updated["name"], "B1-renamed");
    assert_eq!(updated["id"], id);

    // delete
    let resp = send(&app, request("DELETE", &format!("/masters/bins/{id}/"), Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // get after delete - 404
    let resp = send(&app, request("GET", &format!("/masters/bins/{id}/"), Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // list after delete - empty
    let resp = send(&app, request("GET", "/masters/bins/", Some(&token), None)).await;
    assert_eq!(body_json(resp).await, json!([]));
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = app(&["masters/bins"]);
    let token = login(&app).await;
    let resp = send(&app, request("POST", "/masters/bins/", Some(&token), Some("{not json"))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
