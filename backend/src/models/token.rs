use serde::{Deserialize, Serialize};

use crate::models::user::AuthenticatedUser;

/// Body of `POST /auth/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenExchangeRequest {
    pub code: String,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub code_verifier: Option<String>,
}

/// Provider token plus the identity it resolves to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenExchangeResponse {
    pub access_token: String,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub user: AuthenticatedUser,
}
