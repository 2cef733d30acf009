//! HTTP-facing error type.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::AuthError;
use crate::clipboard::ClipboardError;
use crate::store::StoreError;

/// Every failure a request can end with.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Server misconfiguration; never the caller's fault.
    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Gone(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    UpstreamUnreachable(String),

    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Gone(_) => StatusCode::GONE,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::Configuration(_) => "configuration_error",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Gone(_) => "gone",
            ApiError::Validation(_) => "invalid_request",
            ApiError::UpstreamUnreachable(_) => "upstream_unreachable",
            ApiError::BadGateway(_) => "bad_gateway",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Configuration(msg) => ApiError::Configuration(msg),
            AuthError::Unauthorized(msg) => ApiError::Unauthorized(msg),
            AuthError::InvalidRequest(msg) => ApiError::Validation(msg),
            AuthError::UpstreamUnreachable(msg) => ApiError::UpstreamUnreachable(msg),
            AuthError::BadGateway(msg) => ApiError::BadGateway(msg),
        }
    }
}

impl From<ClipboardError> for ApiError {
    fn from(e: ClipboardError) -> Self {
        let message = e.to_string();
        match e {
            ClipboardError::NotFound(_) => ApiError::NotFound(message),
            ClipboardError::Expired => ApiError::Gone(message),
            ClipboardError::Forbidden(_) => ApiError::Forbidden(message),
            ClipboardError::Unauthorized(_) => ApiError::Unauthorized(message),
            ClipboardError::Invalid(_) => ApiError::Validation(message),
            ClipboardError::IdSpaceExhausted => ApiError::Internal(message),
            ClipboardError::Store(store) => store.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error_type = self.error_type(), "{}", self);
        }

        let body = Json(json!({
            "error": {
                "type": self.error_type(),
                "message": self.to_string()
            }
        }));

        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_is_server_error() {
        let err: ApiError = AuthError::Configuration("missing".to_string()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_upstream_failures_are_bad_gateway() {
        let unreachable: ApiError = AuthError::UpstreamUnreachable("down".to_string()).into();
        let bad: ApiError = AuthError::BadGateway("garbage".to_string()).into();
        assert_eq!(unreachable.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(bad.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_clipboard_errors_map_to_statuses() {
        let cases = [
            (ClipboardError::NotFound("ABC123".to_string()), StatusCode::NOT_FOUND),
            (ClipboardError::Expired, StatusCode::GONE),
            (ClipboardError::Forbidden("no"), StatusCode::FORBIDDEN),
            (ClipboardError::Unauthorized("login"), StatusCode::UNAUTHORIZED),
            (ClipboardError::Invalid("bad"), StatusCode::UNPROCESSABLE_ENTITY),
            (ClipboardError::IdSpaceExhausted, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_unauthorized_response_has_challenge() {
        let response = ApiError::Unauthorized("Authentication required.".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
    }
}
