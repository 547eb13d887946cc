/// Common test utilities and fixtures
use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use std::sync::Arc;
use tape_core::ManualClock;
use tape_server::{
    config::ServerConfig,
    router,
    services::MemoryBlobStore,
    state::{AppState, Stores},
};
use tape_storage::MemoryStore;
use tower::util::ServiceExt;

pub const BOUNDARY: &str = "tape-test-boundary";

/// Router over in-memory stores and a manual clock
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub blobs: Arc<MemoryBlobStore>,
    pub clock: Arc<ManualClock>,
}

/// Response pieces collected from a oneshot call
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }
}

/// Identity returned by the register endpoint
pub struct TestUser {
    pub user_id: String,
    pub token: String,
}

pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.auth.jwt_secret = "test-secret-key".to_string();
    config.auth.bcrypt_cost = 4;
    config.stream.chunk_size = 1024;
    config
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let blobs = Arc::new(MemoryBlobStore::with_read_chunk(700));
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        ));

        let (app_state, _reaper) = AppState::build(
            &test_config(),
            Stores::shared(store.clone()),
            blobs.clone(),
            clock.clone(),
        );

        Self {
            router: router(app_state),
            store,
            blobs,
            clock,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn register(&self, email: &str, name: &str) -> TestUser {
        let response = self
            .send(form_request("/user/register", &[("email", email), ("name", name), ("password", "pw123")]))
            .await;
        assert_eq!(response.status, StatusCode::CREATED);

        let json = response.json();
        TestUser {
            user_id: json["user_id"].as_str().unwrap().to_string(),
            token: json["token"].as_str().unwrap().to_string(),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.send(form_request("/user/login", &[("email", email), ("password", password)]))
            .await
    }

    /// Upload `data` as an mp3 and return the new audio id
    pub async fn upload(&self, user: &TestUser, name: &str, data: &[u8]) -> String {
        let response = self
            .send(upload_request(&user.user_id, &user.token, name, "audio/mpeg", data))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.json().as_str().unwrap().to_string()
    }
}

pub fn form_request(uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
    let body = fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, form_encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    Request::builder()
        .uri(uri)
        .method("POST")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

fn form_encode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'*' => (b as char).to_string(),
            b' ' => "+".to_string(),
            other => format!("%{:02X}", other),
        })
        .collect()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .method(method)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn authed_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(method)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub fn upload_request(
    user_id: &str,
    token: &str,
    name: &str,
    content_type: &str,
    data: &[u8],
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}.mp3\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(
        format!(
            "\r\n--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\n{name}\r\n--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"duration\"\r\n\r\n42.0\r\n--{BOUNDARY}--\r\n"
        )
        .as_bytes(),
    );

    Request::builder()
        .uri(format!("/audio/upload/{}", user_id))
        .method("POST")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Deterministic payload larger than a few relay chunks
pub fn sample_audio(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}
