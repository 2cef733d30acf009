use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use super::extract::ApiJson;
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::models::token::{TokenExchangeRequest, TokenExchangeResponse};
use crate::models::user::AuthenticatedUser;
use crate::AppState;

/// POST /auth/token - exchange an authorization code for a token and user
async fn exchange_token(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<TokenExchangeRequest>,
) -> Result<Json<TokenExchangeResponse>, ApiError> {
    let response = state.token_exchange.exchange(&request).await?;
    Ok(Json(response))
}

/// GET /auth/user - the user behind the bearer token
async fn current_user(CurrentUser(user): CurrentUser) -> Json<AuthenticatedUser> {
    Json(user)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/token", post(exchange_token))
        .route("/auth/user", get(current_user))
}
