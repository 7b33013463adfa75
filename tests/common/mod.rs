#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use classroom_backend::{
    config::Config,
    repositories::MemoryStore,
    routes,
    storage::{BlobStore, LocalBlobStore},
    AppState,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value as JsonValue;
use tempfile::TempDir;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test_secret_key";
pub const BOUNDARY: &str = "----classroom-test-boundary";
pub const INSTRUCTOR: i64 = 10;
pub const OTHER_INSTRUCTOR: i64 = 11;
pub const STUDENT: i64 = 20;

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub uploads: TempDir,
}

pub fn test_config(uploads_dir: &Path) -> Config {
    Config {
        server_address: "127.0.0.1:0".into(),
        database_url: String::new(),
        jwt_secret: JWT_SECRET.into(),
        uploads_dir: uploads_dir.to_path_buf(),
        public_base_url: "http://files.test".into(),
        blob_timeout: Duration::from_millis(500),
        api_rps: 1_000,
        max_upload_bytes: 1024 * 1024,
        log_format: None,
    }
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(|uploads, max_size| Arc::new(LocalBlobStore::new(uploads, max_size)))
}

/// Builds the app over a blob store made from the temp upload dir and size cap.
pub fn spawn_app_with(
    blobs: impl FnOnce(&Path, usize) -> Arc<dyn BlobStore>,
) -> TestApp {
    let uploads = tempfile::tempdir().expect("tempdir");
    let config = test_config(uploads.path());
    let store = Arc::new(MemoryStore::new());
    store.add_user(STUDENT, "Sam Student", "sam@example.com").expect("seed student");
    store.add_user(STUDENT + 1, "Alex Other", "alex@example.com").expect("seed student");
    let blobs = blobs(uploads.path(), config.max_upload_bytes);
    let state = AppState::with_store(config, store.clone(), blobs);
    TestApp {
        router: routes::app(state),
        store,
        uploads,
    }
}

pub fn token(user_id: i64, role: &str) -> String {
    let claims = classroom_backend::middleware::auth::Claims {
        sub: user_id.to_string(),
        exp: 4_000_000_000,
        role: Some(role.to_string()),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes()))
        .expect("encode token")
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(method: &str, uri: &str, bearer: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .expect("request")
}

pub fn json_request(method: &str, uri: &str, bearer: &str, body: &JsonValue) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn get_request(uri: &str, bearer: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
        .body(Body::empty())
        .expect("request")
}

pub async fn send(router: &Router, req: Request<Body>) -> (StatusCode, JsonValue) {
    let res = router.clone().oneshot(req).await.expect("response");
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
    };
    (status, json)
}

/// Creates an activity owned by [`INSTRUCTOR`] and returns its id.
pub async fn create_activity(
    app: &TestApp,
    config: &str,
    files: &[(&str, &str)],
) -> (i64, JsonValue) {
    let mut parts = vec![
        Part::Text("title", "Week 1 essay"),
        Part::Text("description", "Write about ownership"),
        Part::Text("type", "assignment"),
        Part::Text("config", config),
    ];
    for (name, data) in files {
        parts.push(Part::File("files", name, data.as_bytes()));
    }
    let (status, body) = send(
        &app.router,
        multipart_request("POST", "/api/activities", &token(INSTRUCTOR, "instructor"), &parts),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create activity: {}", body);
    (body["id"].as_i64().expect("activity id"), body)
}
