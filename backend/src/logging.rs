use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Middleware that logs every HTTP request: INFO normally, WARN for 5xx.
///
/// The Authorization header is never logged; only whether one was sent.
pub async fn request_logger(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let authenticated = request
        .headers()
        .contains_key(axum::http::header::AUTHORIZATION);

    let response = next.run(request).await;

    let status = response.status();
    let duration_ms = start.elapsed().as_millis();

    if status.is_server_error() {
        tracing::warn!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = %duration_ms,
            authenticated,
            "HTTP request failed"
        );
    } else {
        tracing::info!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = %duration_ms,
            authenticated,
            "HTTP request"
        );
    }

    response
}
