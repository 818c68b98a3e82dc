//! Recording control and saved-recording routes over HTTP.
#![cfg(unix)]

mod common;

use camstation_db::queries::recordings;
use common::{ScriptBackend, TestHarness};
use reqwest::StatusCode;
use serde_json::Value;

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

async fn post_json(addr: std::net::SocketAddr, path: &str, token: &str) -> (StatusCode, Value) {
    let resp = client()
        .post(format!("http://{addr}{path}"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap_or(Value::Null))
}

async fn get_json(addr: std::net::SocketAddr, path: &str, token: &str) -> (StatusCode, Value) {
    let resp = client()
        .get(format!("http://{addr}{path}"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_start_stop_persists_recording() {
    let (h, addr) = TestHarness::new().serve().await;
    let token = h.user_token();
    let camera = h.create_camera("Front door");

    let (status, body) =
        post_json(addr, &format!("/api/cameras/{}/record/start", camera.id), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["started"], true);
    assert_eq!(body["already_recording"], false);
    let filename = body["filename"].as_str().unwrap().to_string();
    assert!(common::is_recording_filename(&filename), "{filename}");

    let (_, status_body) = get_json(addr, "/api/recording/status", &token).await;
    assert_eq!(status_body["recording"], true);
    assert_eq!(status_body["filename"], filename.as_str());
    assert_eq!(status_body["camera_id"], camera.id.to_string());

    let (status, body) =
        post_json(addr, &format!("/api/cameras/{}/record/stop", camera.id), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stopped"], true);
    assert_eq!(body["filename"], filename.as_str());
    assert_eq!(body["outcome"], "graceful");
    assert_eq!(body["recording"]["camera_id"], camera.id.to_string());
    assert_eq!(body["recording"]["available"], true);

    let rows = recordings::list_recordings(&h.conn(), Some(camera.id)).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].filename.as_deref(), Some(filename.as_str()));
    assert!(h.recordings_dir().join(&filename).exists());

    let (_, status_body) = get_json(addr, "/api/recording/status", &token).await;
    assert_eq!(status_body["recording"], false);
}

#[tokio::test]
async fn test_double_start_reports_already_recording() {
    let (h, addr) = TestHarness::new().serve().await;
    let token = h.user_token();
    let camera = h.create_camera("Garage");
    let start = format!("/api/cameras/{}/record/start", camera.id);

    let (_, first) = post_json(addr, &start, &token).await;
    let (status, second) = post_json(addr, &start, &token).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["started"], false);
    assert_eq!(second["already_recording"], true);
    assert_eq!(second["filename"], first["filename"]);

    h.ctx.recorder.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_when_idle_saves_nothing() {
    let (h, addr) = TestHarness::new().serve().await;
    let token = h.user_token();
    let camera = h.create_camera("Hall");

    let (status, body) =
        post_json(addr, &format!("/api/cameras/{}/record/stop", camera.id), &token).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stopped"], false);
    assert!(body["filename"].is_null());
    assert!(recordings::list_recordings(&h.conn(), None).unwrap().is_empty());
}

#[tokio::test]
async fn test_stop_after_camera_deleted_clears_session() {
    let (h, addr) = TestHarness::new().serve().await;
    let token = h.user_token();
    let admin = h.admin_token();
    let camera = h.create_camera("Shed");

    let (status, body) =
        post_json(addr, &format!("/api/cameras/{}/record/start", camera.id), &token).await;
    assert_eq!(status, StatusCode::OK);
    let filename = body["filename"].as_str().unwrap().to_string();

    let resp = client()
        .delete(format!("http://{addr}/api/cameras/{}", camera.id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let (status, body) =
        post_json(addr, &format!("/api/cameras/{}/record/stop", camera.id), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stopped"], true);
    assert_eq!(body["filename"], filename.as_str());
    assert!(body["recording"].is_null());

    assert!(!h.ctx.recorder.is_recording().await);
    assert!(recordings::list_recordings(&h.conn(), None).unwrap().is_empty());
    assert!(h.recordings_dir().join(&filename).exists());
}

#[tokio::test]
async fn test_stop_attributes_recording_to_starting_camera() {
    let (h, addr) = TestHarness::new().serve().await;
    let token = h.user_token();
    let started_on = h.create_camera("Driveway");
    let stopped_on = h.create_camera("Backyard");

    post_json(addr, &format!("/api/cameras/{}/record/start", started_on.id), &token).await;
    let (status, body) =
        post_json(addr, &format!("/api/cameras/{}/record/stop", stopped_on.id), &token).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recording"]["camera_id"], started_on.id.to_string());
    assert_eq!(
        recordings::list_recordings(&h.conn(), Some(started_on.id)).unwrap().len(),
        1
    );
    assert!(recordings::list_recordings(&h.conn(), Some(stopped_on.id))
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_unknown_camera_is_404() {
    let (h, addr) = TestHarness::new().serve().await;
    let token = h.user_token();
    let missing = camstation_common::CameraId::new();

    let (status, body) =
        post_json(addr, &format!("/api/cameras/{missing}/record/start"), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    let (status, _) = post_json(addr, "/api/cameras/not-a-uuid/record/stop", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert!(!h.ctx.recorder.is_recording().await);
}

#[tokio::test]
async fn test_encoder_spawn_failure_is_500() {
    let (h, addr) = TestHarness::with_backend(ScriptBackend::missing_binary())
        .serve()
        .await;
    let token = h.user_token();
    let camera = h.create_camera("Porch");

    let (status, body) =
        post_json(addr, &format!("/api/cameras/{}/record/start", camera.id), &token).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "recording_error");
    assert!(!h.ctx.recorder.is_recording().await);
}

#[tokio::test]
async fn test_recording_routes_require_login() {
    let (h, addr) = TestHarness::new().serve().await;
    let camera = h.create_camera("Yard");

    let resp = client()
        .post(format!("http://{addr}/api/cameras/{}/record/start", camera.id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(!h.ctx.recorder.is_recording().await);
}

#[tokio::test]
async fn test_list_recordings_is_admin_only() {
    let (h, addr) = TestHarness::new().serve().await;
    let user = h.user_token();
    let admin = h.admin_token();
    let a = h.create_camera("A");
    let b = h.create_camera("B");
    {
        let conn = h.conn();
        recordings::create_recording(&conn, a.id, "webcam_record_20240101_000000.mp4").unwrap();
        recordings::create_recording(&conn, b.id, "webcam_record_20240101_000001.mp4").unwrap();
    }

    let (status, _) = get_json(addr, "/api/recordings", &user).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = get_json(addr, "/api/recordings", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = get_json(addr, &format!("/api/recordings?camera_id={}", a.id), &admin).await;
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["camera_id"], a.id.to_string());
    assert_eq!(list[0]["available"], false);

    let (status, _) = get_json(addr, "/api/recordings?camera_id=bogus", &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn seed_file(h: &TestHarness, name: &str, contents: &[u8]) -> String {
    std::fs::write(h.recordings_dir().join(name), contents).unwrap();
    let camera = h.create_camera("Seeded");
    recordings::create_recording(&h.conn(), camera.id, name)
        .unwrap()
        .id
        .to_string()
}

#[tokio::test]
async fn test_play_serves_file_with_range() {
    let (h, addr) = TestHarness::new().serve().await;
    let admin = h.admin_token();
    let id = seed_file(&h, "webcam_record_20240101_120000.mp4", b"0123456789");

    let resp = client()
        .get(format!("http://{addr}/api/recordings/{id}/play"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "video/mp4");
    assert_eq!(resp.headers()["accept-ranges"], "bytes");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"0123456789");

    let resp = client()
        .get(format!("http://{addr}/api/recordings/{id}/play"))
        .bearer_auth(&admin)
        .header("Range", "bytes=2-5")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(resp.headers()["content-range"], "bytes 2-5/10");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"2345");

    let resp = client()
        .get(format!("http://{addr}/api/recordings/{id}/play"))
        .bearer_auth(&admin)
        .header("Range", "bytes=50-")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
}

#[tokio::test]
async fn test_download_sets_attachment() {
    let (h, addr) = TestHarness::new().serve().await;
    let admin = h.admin_token();
    let id = seed_file(&h, "webcam_record_20240101_130000.mp4", b"video");

    let resp = client()
        .get(format!("http://{addr}/api/recordings/{id}/download"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp.headers()["content-disposition"].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment"), "{disposition}");
    assert!(disposition.contains("webcam_record_20240101_130000.mp4"));
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"video");
}

#[tokio::test]
async fn test_play_missing_file_is_404() {
    let (h, addr) = TestHarness::new().serve().await;
    let admin = h.admin_token();
    let camera = h.create_camera("Gone");
    let rec = recordings::create_recording(&h.conn(), camera.id, "webcam_record_20200101_000000.mp4")
        .unwrap();

    let (status, _) = get_json(addr, &format!("/api/recordings/{}/play", rec.id), &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get_json(addr, "/api/recordings/not-a-uuid/play", &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_traversal_filename_is_rejected() {
    let (h, addr) = TestHarness::new().serve().await;
    let admin = h.admin_token();
    let camera = h.create_camera("Sneaky");
    let rec = recordings::create_recording(&h.conn(), camera.id, "../secret.mp4").unwrap();

    let (status, body) = get_json(addr, &format!("/api/recordings/{}/download", rec.id), &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn test_delete_removes_file_and_row() {
    let (h, addr) = TestHarness::new().serve().await;
    let admin = h.admin_token();
    let name = "webcam_record_20240101_140000.mp4";
    let id = seed_file(&h, name, b"bytes");

    let resp = client()
        .delete(format!("http://{addr}/api/recordings/{id}"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(!h.recordings_dir().join(name).exists());
    assert!(recordings::list_recordings(&h.conn(), None).unwrap().is_empty());

    let resp = client()
        .delete(format!("http://{addr}/api/recordings/{id}"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
