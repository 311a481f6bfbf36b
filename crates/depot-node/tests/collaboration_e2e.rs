//! End-to-end tests for pull request endpoints.

use axum::{body::Body, http::Request};
use depot_node::api::{create_router, AppState, USER_HEADER};
use depot_node::config::Config;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

fn create_test_app() -> (axum::Router, TempDir) {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.storage.data_dir = dir.path().to_path_buf();
    (create_router(AppState::from_config(&config).unwrap()), dir)
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn request(method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(USER_HEADER, user);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Creates a public repository owned by alice and returns its pulls URI.
async fn setup(app: &axum::Router) -> String {
    let response = app
        .clone()
        .oneshot(request("POST", "/api/repos", Some("alice"), Some(json!({"name": "project"}))))
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let repo = json_body(response).await;
    format!("/api/repos/{}/pulls", repo["id"].as_str().unwrap())
}

fn proposal(title: &str, source: &str) -> Value {
    json!({
        "title": title,
        "description": "Implements the requested feature",
        "source_branch": source,
        "target_branch": "main"
    })
}

#[tokio::test]
async fn test_create_and_list_pull_requests() {
    let (app, _dir) = create_test_app();
    let pulls = setup(&app).await;

    for (i, branch) in ["feature-a", "feature-b"].iter().enumerate() {
        let response = app
            .clone()
            .oneshot(request("POST", &pulls, Some("bob"), Some(proposal("Add feature", branch))))
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        let pr = json_body(response).await;
        assert_eq!(pr["number"], i as u64 + 1);
        assert_eq!(pr["status"], "open");
        assert_eq!(pr["author"], "bob");
    }

    let response = app
        .clone()
        .oneshot(request("GET", &pulls, None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let prs = json_body(response).await;
    let numbers: Vec<_> = prs
        .as_array()
        .unwrap()
        .iter()
        .map(|pr| pr["number"].as_u64().unwrap())
        .collect();
    assert_eq!(numbers, vec![2, 1]);

    let response = app
        .clone()
        .oneshot(request("GET", &format!("{}?status=merged", pulls), None, None))
        .await
        .unwrap();
    assert!(json_body(response).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_validation() {
    let (app, _dir) = create_test_app();
    let pulls = setup(&app).await;

    let response = app
        .clone()
        .oneshot(request("POST", &pulls, None, Some(proposal("Anonymous", "feature"))))
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = app
        .clone()
        .oneshot(request("POST", &pulls, Some("bob"), Some(proposal("Loop", "main"))))
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = app
        .clone()
        .oneshot(request("POST", &pulls, Some("bob"), Some(proposal("  ", "feature"))))
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = app
        .clone()
        .oneshot(request("GET", &format!("{}/99", pulls), None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_pr_lifecycle_merge() {
    let (app, _dir) = create_test_app();
    let pulls = setup(&app).await;

    let response = app
        .clone()
        .oneshot(request("POST", &pulls, Some("bob"), Some(proposal("Add feature", "feature"))))
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let pr_uri = format!("{}/1", pulls);

    // The author may edit without write access.
    let response = app
        .clone()
        .oneshot(request("PATCH", &pr_uri, Some("bob"), Some(json!({"title": "Add the feature"}))))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(json_body(response).await["title"], "Add the feature");

    // Others need write access.
    let response = app
        .clone()
        .oneshot(request("PATCH", &pr_uri, Some("carol"), Some(json!({"title": "Hijack"}))))
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // Merging needs write access too.
    let response = app
        .clone()
        .oneshot(request("POST", &format!("{}/merge", pr_uri), Some("bob"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = app
        .clone()
        .oneshot(request("POST", &format!("{}/merge", pr_uri), Some("alice"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let merged = json_body(response).await;
    assert_eq!(merged["status"], "merged");
    assert_eq!(merged["merged_by"], "alice");

    let response = app
        .clone()
        .oneshot(request("POST", &format!("{}/merge", pr_uri), Some("alice"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    let response = app
        .clone()
        .oneshot(request("PATCH", &pr_uri, Some("alice"), Some(json!({"status": "closed"}))))
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    let response = app
        .clone()
        .oneshot(request("GET", &pr_uri, None, None))
        .await
        .unwrap();
    let pr = json_body(response).await;
    assert_eq!(pr["merged_by"], "alice");
    assert_eq!(pr["merged_at"], merged["merged_at"]);
}

#[tokio::test]
async fn test_close_and_reopen() {
    let (app, _dir) = create_test_app();
    let pulls = setup(&app).await;
    app.clone()
        .oneshot(request("POST", &pulls, Some("bob"), Some(proposal("Try", "experiment"))))
        .await
        .unwrap();
    let pr_uri = format!("{}/1", pulls);

    let response = app
        .clone()
        .oneshot(request("PATCH", &pr_uri, Some("bob"), Some(json!({"status": "closed"}))))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let closed = json_body(response).await;
    assert_eq!(closed["status"], "closed");
    assert!(closed["closed_at"].is_string());

    let response = app
        .clone()
        .oneshot(request("POST", &format!("{}/merge", pr_uri), Some("alice"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    let response = app
        .clone()
        .oneshot(request("PATCH", &pr_uri, Some("bob"), Some(json!({"status": "open"}))))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let reopened = json_body(response).await;
    assert_eq!(reopened["status"], "open");
    assert!(reopened["closed_at"].is_null());
}
