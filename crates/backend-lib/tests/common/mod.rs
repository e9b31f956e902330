//! Test utilities for the HTTP integration tests
//!
//! Every test gets its own in-memory credential and object stores, so tests
//! run in parallel without sharing state.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method, Request, Response,
    },
    Router,
};
use easymeal_backend_lib::{
    config::{Secret, Settings},
    create_router,
    media::MemoryObjectStore,
    store::MemoryCredentialStore,
    AppState,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret-key";
pub const INTERNAL_OBJECT_URL: &str = "http://minio:9000/photos";
const BOUNDARY: &str = "easymeal-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub credentials: MemoryCredentialStore,
    pub objects: MemoryObjectStore,
}

/// Build the router over fresh in-memory backends
pub fn setup_test_app() -> TestApp {
    let mut settings = Settings::default();
    settings.auth.secret_key = Secret::new(TEST_SECRET);

    let credentials = MemoryCredentialStore::new();
    let objects = MemoryObjectStore::with_base_url(INTERNAL_OBJECT_URL);
    let state = Arc::new(AppState::new(
        settings,
        Arc::new(credentials.clone()),
        Arc::new(objects.clone()),
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        credentials,
        objects,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Create a temporary account and return its token
    pub async fn temp_token(&self) -> String {
        let response = self.send(json_request(Method::POST, "/temp-account", None, None)).await;
        assert_eq!(response.status(), 200);
        let body = json_body(response).await;
        assert_eq!(body["token_type"], "bearer");
        body["access_token"].as_str().unwrap().to_string()
    }
}

pub fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn multipart_request(
    token: Option<&str>,
    field: &str,
    filename: &str,
    content_type: &str,
    bytes: &[u8],
) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/photo")
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"));
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn json_body(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// A small JPEG-looking payload of `len` bytes
pub fn fake_jpeg(len: usize) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.resize(len, 0x42);
    bytes
}
