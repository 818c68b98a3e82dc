//! Camera registry routes over HTTP.

mod common;

use camstation_db::queries::recordings;
use common::TestHarness;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn test_admin_creates_and_lists_cameras() {
    let (h, addr) = TestHarness::new().serve().await;
    let admin = h.admin_token();
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{addr}/api/cameras"))
        .bearer_auth(&admin)
        .json(&json!({ "name": "  Back yard ", "location": "Garden" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = resp.json().await.unwrap();
    assert_eq!(created["name"], "Back yard");
    assert_eq!(created["source"], "webcam");
    assert_eq!(created["location"], "Garden");

    let resp = client
        .post(format!("http://{addr}/api/cameras"))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Side", "source": "webcam:2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Regular users can see the list.
    let user = h.user_token();
    let list: Value = client
        .get(format!("http://{addr}/api/cameras"))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let names: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"Back yard"));
    assert!(names.contains(&"Side"));

    let id = created["id"].as_str().unwrap();
    let one: Value = client
        .get(format!("http://{addr}/api/cameras/{id}"))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(one["id"], id);
}

#[tokio::test]
async fn test_create_camera_validation() {
    let (h, addr) = TestHarness::new().serve().await;
    let admin = h.admin_token();
    let client = reqwest::Client::new();

    for payload in [
        json!({ "name": "   " }),
        json!({ "name": "IP cam", "source": "rtsp://10.0.0.5/stream" }),
        json!({ "name": "Bad index", "source": "webcam:one" }),
    ] {
        let resp = client
            .post(format!("http://{addr}/api/cameras"))
            .bearer_auth(&admin)
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{payload}");
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["code"], "validation_error");
    }
}

#[tokio::test]
async fn test_unknown_camera_is_404() {
    let (h, addr) = TestHarness::new().serve().await;
    let user = h.user_token();
    let client = reqwest::Client::new();

    let missing = camstation_common::CameraId::new();
    for id in [missing.to_string(), "garbage".to_string()] {
        let resp = client
            .get(format!("http://{addr}/api/cameras/{id}"))
            .bearer_auth(&user)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_delete_camera_removes_its_recordings() {
    let (h, addr) = TestHarness::new().serve().await;
    let admin = h.admin_token();
    let camera = h.create_camera("Attic");
    recordings::create_recording(&h.conn(), camera.id, "webcam_record_20240101_000000.mp4").unwrap();
    let client = reqwest::Client::new();

    let resp = client
        .delete(format!("http://{addr}/api/cameras/{}", camera.id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(recordings::list_recordings(&h.conn(), None).unwrap().is_empty());

    let resp = client
        .delete(format!("http://{addr}/api/cameras/{}", camera.id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_cannot_delete_camera() {
    let (h, addr) = TestHarness::new().serve().await;
    let user = h.user_token();
    let camera = h.create_camera("Shed");

    let resp = reqwest::Client::new()
        .delete(format!("http://{addr}/api/cameras/{}", camera.id))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
