//! End-to-end tests for the Git LFS endpoints.

use axum::{body::Body, http::Request};
use depot_node::api::{create_router, AppState, USER_HEADER};
use depot_node::config::Config;
use depot_storage::Oid;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const PUBLIC_URL: &str = "http://depot.test";
const LFS_JSON: &str = "application/vnd.git-lfs+json";

fn create_test_app() -> (axum::Router, TempDir) {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.storage.data_dir = dir.path().to_path_buf();
    config.server.public_url = PUBLIC_URL.to_string();
    config.lfs.signing_secret = "test-secret".to_string();
    config.lfs.max_object_size = 1024;
    (create_router(AppState::from_config(&config).unwrap()), dir)
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn json_body(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn lfs_request(method: &str, uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", LFS_JSON)
        .header("accept", LFS_JSON);
    if let Some(user) = user {
        builder = builder.header(USER_HEADER, user);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Strips the public URL so presigned hrefs can be replayed against the router.
fn local(href: &str) -> String {
    href.strip_prefix(PUBLIC_URL).unwrap().to_string()
}

async fn create_repo(app: &axum::Router, lfs_enabled: bool) -> String {
    let response = app
        .clone()
        .oneshot(lfs_request(
            "POST",
            "/api/repos",
            Some("alice"),
            json!({
                "name": format!("assets-{}", lfs_enabled),
                "visibility": "private",
                "lfs_enabled": lfs_enabled
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let repo = json_body(response).await;
    format!("/api/repos/{}", repo["id"].as_str().unwrap())
}

#[tokio::test]
async fn test_upload_verify_download_flow() {
    let (app, _dir) = create_test_app();
    let repo = create_repo(&app, true).await;
    let data = b"binary asset contents".to_vec();
    let oid = Oid::compute(&data).to_hex();
    let size = data.len();

    // Batch upload hands out upload and verify actions.
    let response = app
        .clone()
        .oneshot(lfs_request(
            "POST",
            &format!("{}/lfs/objects/batch", repo),
            Some("alice"),
            json!({"operation": "upload", "transfers": ["basic"], "objects": [{"oid": oid, "size": size}]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], LFS_JSON);
    let batch = json_body(response).await;
    assert_eq!(batch["transfer"], "basic");
    let actions = &batch["objects"][0]["actions"];
    let upload_href = actions["upload"]["href"].as_str().unwrap();
    assert_eq!(
        actions["verify"]["href"],
        format!("{}{}/lfs/verify", PUBLIC_URL, repo)
    );
    assert!(actions["upload"]["expires_in"].as_u64().unwrap() > 0);

    // Transfer the bytes.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(local(upload_href))
                .header("content-type", "application/octet-stream")
                .body(Body::from(data.clone()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Verify with the wrong size, then the right one.
    let response = app
        .clone()
        .oneshot(lfs_request(
            "POST",
            &format!("{}/lfs/verify", repo),
            Some("alice"),
            json!({"oid": oid, "size": size + 1}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let message = json_body(response).await["message"].as_str().unwrap().to_string();
    assert!(message.contains(&format!("expected {} bytes", size + 1)));
    assert!(message.contains(&format!("found {} bytes", size)));

    let response = app
        .clone()
        .oneshot(lfs_request(
            "POST",
            &format!("{}/lfs/verify", repo),
            Some("alice"),
            json!({"oid": oid, "size": size}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // A second upload batch needs no transfer.
    let response = app
        .clone()
        .oneshot(lfs_request(
            "POST",
            &format!("{}/lfs/objects/batch", repo),
            Some("alice"),
            json!({"operation": "upload", "objects": [{"oid": oid, "size": size}]}),
        ))
        .await
        .unwrap();
    let batch = json_body(response).await;
    assert_eq!(batch["objects"][0]["authenticated"], true);
    assert!(batch["objects"][0].get("actions").is_none());

    // Download through the presigned URL.
    let response = app
        .clone()
        .oneshot(lfs_request(
            "POST",
            &format!("{}/lfs/objects/batch", repo),
            Some("alice"),
            json!({"operation": "download", "objects": [{"oid": oid, "size": size}]}),
        ))
        .await
        .unwrap();
    let batch = json_body(response).await;
    let download_href = batch["objects"][0]["actions"]["download"]["href"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(local(&download_href))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(body_bytes(response).await, data);

    // A download URL does not authorize uploads.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(local(&download_href))
                .body(Body::from(data.clone()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
    assert!(json_body(response).await["message"].is_string());
}

#[tokio::test]
async fn test_batch_errors() {
    let (app, _dir) = create_test_app();
    let disabled = create_repo(&app, false).await;
    let repo = create_repo(&app, true).await;

    let response = app
        .clone()
        .oneshot(lfs_request(
            "POST",
            &format!("{}/lfs/objects/batch", disabled),
            Some("alice"),
            json!({"operation": "download", "objects": []}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    assert_eq!(response.headers()["content-type"], LFS_JSON);
    assert!(json_body(response).await["message"].is_string());

    // Private repository, anonymous caller.
    let response = app
        .clone()
        .oneshot(lfs_request(
            "POST",
            &format!("{}/lfs/objects/batch", repo),
            None,
            json!({"operation": "download", "objects": []}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = app
        .clone()
        .oneshot(lfs_request(
            "POST",
            &format!("{}/lfs/objects/batch", repo),
            Some("alice"),
            json!({"operation": "upload", "objects": [
                {"oid": "not-an-oid", "size": 1},
                {"oid": Oid::compute(b"big").to_hex(), "size": 4096},
                {"oid": Oid::compute(b"ok").to_hex(), "size": 2}
            ]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let batch = json_body(response).await;
    assert_eq!(batch["objects"][0]["error"]["code"], 422);
    assert_eq!(batch["objects"][0]["error"]["message"], "invalid object id");
    assert_eq!(batch["objects"][1]["error"]["code"], 422);
    assert!(batch["objects"][2]["actions"]["upload"].is_object());

    let response = app
        .clone()
        .oneshot(lfs_request(
            "POST",
            &format!("{}/lfs/objects/batch", repo),
            Some("alice"),
            json!({"operation": "download", "objects": [{"oid": Oid::compute(b"gone").to_hex(), "size": 4}]}),
        ))
        .await
        .unwrap();
    let batch = json_body(response).await;
    assert_eq!(batch["objects"][0]["error"]["code"], 404);
}

#[tokio::test]
async fn test_tampered_signature_rejected() {
    let (app, _dir) = create_test_app();
    let oid = Oid::compute(b"x").to_hex();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/lfs/objects/{}?expires=99999999999&sig=deadbeef", oid))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn test_lock_lifecycle() {
    let (app, _dir) = create_test_app();
    let repo = create_repo(&app, true).await;
    let locks = format!("{}/lfs/locks", repo);

    // Give bob write access.
    let response = app
        .clone()
        .oneshot(lfs_request(
            "POST",
            &format!("{}/collaborators", repo),
            Some("alice"),
            json!({"user": "bob", "permission": "write"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let response = app
        .clone()
        .oneshot(lfs_request("POST", &locks, Some("bob"), json!({"path": "art/hero.psd"})))
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let lock = json_body(response).await["lock"].clone();
    assert_eq!(lock["path"], "art/hero.psd");
    assert_eq!(lock["owner"]["name"], "bob");
    let lock_id = lock["id"].as_str().unwrap().to_string();

    // Locked path conflicts, even for the repository owner.
    let response = app
        .clone()
        .oneshot(lfs_request("POST", &locks, Some("alice"), json!({"path": "art/hero.psd"})))
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
    let conflict = json_body(response).await;
    assert_eq!(conflict["lock"]["id"], lock_id.as_str());
    assert!(conflict["message"].is_string());

    app.clone()
        .oneshot(lfs_request("POST", &locks, Some("alice"), json!({"path": "level.bin"})))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("{}?path=art/hero.psd", locks))
                .header(USER_HEADER, "alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let list = json_body(response).await;
    assert_eq!(list["locks"].as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(lfs_request("POST", &format!("{}/verify", locks), Some("bob"), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let verification = json_body(response).await;
    assert_eq!(verification["ours"].as_array().unwrap().len(), 1);
    assert_eq!(verification["theirs"].as_array().unwrap().len(), 1);
    assert_eq!(verification["theirs"][0]["path"], "level.bin");

    // alice does not hold bob's lock and must force.
    let unlock = format!("{}/{}/unlock", locks, lock_id);
    let response = app
        .clone()
        .oneshot(lfs_request("POST", &unlock, Some("alice"), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    // bob has write but not admin, so he cannot force alice's lock.
    let response = app
        .clone()
        .oneshot(lfs_request("GET", &locks, Some("bob"), json!({})))
        .await
        .unwrap();
    let list = json_body(response).await;
    let alice_lock = list["locks"]
        .as_array()
        .unwrap()
        .iter()
        .find(|l| l["owner"]["name"] == "alice")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();
    let response = app
        .clone()
        .oneshot(lfs_request(
            "POST",
            &format!("{}/{}/unlock", locks, alice_lock),
            Some("bob"),
            json!({"force": true}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    let response = app
        .clone()
        .oneshot(lfs_request("POST", &unlock, Some("alice"), json!({"force": true})))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(json_body(response).await["lock"]["id"], lock_id.as_str());

    let response = app
        .clone()
        .oneshot(lfs_request("POST", &unlock, Some("bob"), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}
