use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use super::{AuthError, UserInfoVerifier};
use crate::error::ApiError;
use crate::models::user::AuthenticatedUser;
use crate::AppState;

/// Turns an optional bearer credential into a user.
pub struct UserResolver {
    enabled: bool,
    verifier: Arc<UserInfoVerifier>,
}

impl UserResolver {
    pub fn new(enabled: bool, verifier: Arc<UserInfoVerifier>) -> Self {
        Self { enabled, verifier }
    }

    /// A verified user, or an error when none can be produced.
    pub async fn require(&self, token: Option<&str>) -> Result<AuthenticatedUser, AuthError> {
        if !self.enabled {
            return Err(AuthError::Configuration(
                "OAuth2 authentication is not enabled on this server.".to_string(),
            ));
        }

        let token = token.ok_or_else(|| AuthError::Unauthorized("Authentication required.".to_string()))?;
        self.verifier.verify(token).await
    }

    /// The verified user if a credential was sent. A credential that fails
    /// verification is still an error.
    pub async fn optional(&self, token: Option<&str>) -> Result<Option<AuthenticatedUser>, AuthError> {
        match token {
            Some(token) if self.enabled => self.verifier.verify(token).await.map(Some),
            _ => Ok(None),
        }
    }
}

/// Extract the credential of an `Authorization: Bearer <token>` header.
///
/// Other schemes and malformed headers yield `None`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, credentials) = value.trim().split_once(' ')?;
    let credentials = credentials.trim();

    if scheme.eq_ignore_ascii_case("bearer") && !credentials.is_empty() {
        Some(credentials)
    } else {
        None
    }
}

/// Handler argument for routes that require an authenticated caller.
pub struct CurrentUser(pub AuthenticatedUser);

/// Handler argument for routes where authentication is optional.
pub struct MaybeUser(pub Option<AuthenticatedUser>);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = state.users.require(bearer_token(&parts.headers)).await?;
        Ok(CurrentUser(user))
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = state.users.optional(bearer_token(&parts.headers)).await?;
        Ok(MaybeUser(user))
    }
}
