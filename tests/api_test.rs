//! Router-level tests using axum's oneshot utilities.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use camstation::server::create_router;
use common::TestHarness;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

/// Helper to get response body as string
async fn body_to_string(body: Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let h = TestHarness::new();
    let app = create_router(h.ctx.clone(), None);

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unauthorized_body_shape() {
    let h = TestHarness::new();
    let app = create_router(h.ctx.clone(), None);

    let response = app
        .oneshot(Request::get("/api/recording/status").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = serde_json::from_str(&body_to_string(response.into_body()).await).unwrap();
    assert_eq!(body["code"], "unauthorized");
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn test_recording_status_when_idle() {
    let h = TestHarness::new();
    let token = h.user_token();
    let app = create_router(h.ctx.clone(), None);

    let response = app
        .oneshot(
            Request::get("/api/recording/status")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_to_string(response.into_body()).await).unwrap();
    assert_eq!(body["recording"], false);
    assert!(body["filename"].is_null());
}

#[tokio::test]
async fn test_openapi_json_served() {
    let h = TestHarness::new();
    let app = create_router(h.ctx.clone(), None);

    let response = app
        .oneshot(Request::get("/api/openapi.json").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let doc: Value = serde_json::from_str(&body_to_string(response.into_body()).await).unwrap();
    assert!(doc["paths"]["/api/cameras/{id}/record/start"].is_object());
    assert!(doc["paths"]["/api/auth/login"].is_object());
}

#[tokio::test]
async fn test_unknown_api_route_is_404() {
    let h = TestHarness::new();
    let token = h.admin_token();
    let app = create_router(h.ctx.clone(), None);

    let response = app
        .oneshot(
            Request::get("/api/nothing-here")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_static_spa_fallback() {
    let h = TestHarness::new();
    let web = tempfile::tempdir().unwrap();
    std::fs::write(web.path().join("index.html"), "<html>camstation</html>").unwrap();
    std::fs::write(web.path().join("app.js"), "console.log(1)").unwrap();
    let app = create_router(h.ctx.clone(), Some(web.path().to_path_buf()));

    let response = app
        .clone()
        .oneshot(Request::get("/app.js").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_string(response.into_body()).await, "console.log(1)");

    // Client-side routes like /admin fall back to index.html.
    let response = app
        .oneshot(Request::get("/admin").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(
        body_to_string(response.into_body()).await,
        "<html>camstation</html>"
    );
}
