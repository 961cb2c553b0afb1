#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode, header},
};
use serde_json::Value;
use tower::ServiceExt;

use zaki::config::Config;
use zaki::router::{ZakiState, zaki_router};

pub const ADMIN_KEY: &str = "admin-key";
pub const PASSWORD: &str = "sesame-123";

pub fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.basic.admin_key = ADMIN_KEY.to_string();
    cfg.basic.insecure_cookie = true;
    cfg
}

pub async fn test_state() -> ZakiState {
    let storage = zaki::db::connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    ZakiState::new(storage, &test_config()).expect("state")
}

pub async fn test_app() -> (Router, ZakiState) {
    let state = test_state().await;
    (zaki_router(state.clone()), state)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// `name=value` of the session cookie set by this response, if any.
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("zaki_session="))
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }
}

pub async fn send(app: &Router, req: Request<Body>) -> TestResponse {
    let resp = app.clone().oneshot(req).await.expect("request failed");
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    TestResponse {
        status,
        headers,
        body,
    }
}

pub fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("failed to build request")
}

/// Register `email` and sign in. Returns `(user id, cookie)`.
pub async fn register(app: &Router, email: &str) -> (String, String) {
    let creds = serde_json::json!({ "email": email, "password": PASSWORD });
    let resp = send(app, json_request("POST", "/api/auth/signup", None, &creds)).await;
    assert_eq!(resp.status, StatusCode::CREATED, "signup failed: {:?}", resp.body);
    let user_id = resp.body["user"]["id"]
        .as_str()
        .expect("user id in signup response")
        .to_string();

    let resp = send(app, json_request("POST", "/api/auth/signin", None, &creds)).await;
    assert_eq!(resp.status, StatusCode::OK, "signin failed: {:?}", resp.body);
    let cookie = resp.session_cookie().expect("session cookie");
    (user_id, cookie)
}

pub async fn ask(app: &Router, cookie: &str, question: &str) -> TestResponse {
    let body = serde_json::json!({ "question": question });
    send(app, json_request("POST", "/api/user/questions", Some(cookie), &body)).await
}
