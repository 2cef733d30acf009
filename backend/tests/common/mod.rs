#![allow(dead_code)]

use axum::body::Body;
use axum::Router;
use http::{Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Send a request through the router and decode the JSON body, if any.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }

    let body = match body {
        Some(value) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Register a userinfo response for `token` on the mock provider.
pub async fn mount_user(server: &MockServer, token: &str, claims: Value) {
    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(claims))
        .mount(server)
        .await;
}

/// Reject every token the other mocks do not recognise.
pub async fn mount_reject_unknown_tokens(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .respond_with(ResponseTemplate::new(401))
        .with_priority(u8::MAX)
        .mount(server)
        .await;
}

pub fn future_expiry() -> String {
    (chrono::Utc::now() + chrono::Duration::hours(1)).to_rfc3339()
}

pub fn past_expiry() -> String {
    (chrono::Utc::now() - chrono::Duration::minutes(5)).to_rfc3339()
}

pub fn alice_claims() -> Value {
    json!({"sub": "alice", "email": "alice@example.com", "preferred_username": "alice"})
}

pub fn bob_claims() -> Value {
    json!({"sub": "bob", "email": "bob@example.com"})
}
