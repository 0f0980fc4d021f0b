mod common;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use team_classifier::{create_router, ClassificationService, RuntimeGate};
use tower::ServiceExt;

fn app() -> (tempfile::TempDir, Router) {
    common::init();
    let dir = tempfile::tempdir().unwrap();
    let paths = common::write_artifacts(dir.path());
    let service = ClassificationService::builder()
        .with_gate(Arc::new(RuntimeGate::new()))
        .with_artifacts(&paths)
        .unwrap()
        .with_default_k(2)
        .unwrap()
        .build()
        .unwrap();
    (dir, create_router(Arc::new(service)))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn test_top_teams_returns_json_array() {
    let (_dir, app) = app();
    let (status, body) = get(app, "/topTeams?description=payroll%20salary%20missing").await;
    assert_eq!(status, StatusCode::OK);
    let teams: Vec<String> = serde_json::from_slice(&body).unwrap();
    assert_eq!(teams.len(), 2);
    assert_eq!(teams[0], "HR Systems");
}

#[tokio::test]
async fn test_explicit_k() {
    let (_dir, app) = app();
    let (status, body) = get(app, "/topTeams?description=vpn&k=10").await;
    assert_eq!(status, StatusCode::OK);
    let teams: Vec<String> = serde_json::from_slice(&body).unwrap();
    assert_eq!(teams.len(), 4);
    assert_eq!(teams[0], "Networking");
}

#[tokio::test]
async fn test_legacy_route() {
    let (_dir, app) = app();
    let (status, body) = get(app, "/TeamClassifier?description=printer").await;
    assert_eq!(status, StatusCode::OK);
    let teams: Vec<String> = serde_json::from_slice(&body).unwrap();
    assert_eq!(teams[0], "Desktop Support");
}

#[tokio::test]
async fn test_missing_or_blank_description_is_bad_request() {
    for uri in ["/topTeams", "/topTeams?description=", "/topTeams?description=%20%20"] {
        let (_dir, app) = app();
        let (status, body) = get(app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(String::from_utf8(body).unwrap(), "Description cannot be empty");
    }
}

#[tokio::test]
async fn test_zero_k_is_bad_request() {
    let (_dir, app) = app();
    let (status, _) = get(app, "/topTeams?description=vpn&k=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_and_info() {
    let (_dir, app) = app();
    let (status, body) = get(app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");

    let (status, body) = get(app, "/info").await;
    assert_eq!(status, StatusCode::OK);
    let info: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(info["num_classes"], 4);
    assert_eq!(info["feature_dimension"], 8);
    assert_eq!(info["default_k"], 2);
    assert_eq!(info["artifacts"][0]["kind"], "vectorizer");
}
