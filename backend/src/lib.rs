pub mod auth;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod routes;
pub mod store;
pub mod test_util;

pub use crate::auth::{AuthError, TokenExchange, UserInfoVerifier, UserResolver};
pub use crate::clipboard::{ClipboardError, ClipboardService};
pub use crate::config::Config;
pub use crate::error::ApiError;
pub use crate::models::clipboard::{Clipboard, ClipboardCreate, ClipboardUpdate, ListQuery};
pub use crate::models::token::{TokenExchangeRequest, TokenExchangeResponse};
pub use crate::models::user::AuthenticatedUser;
pub use crate::store::{ClipboardStore, StoreError};

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{middleware, Router};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::CorsConfig;

/// Shared application state, built once at startup.
pub struct AppState {
    pub config: Config,
    /// Resolves bearer tokens to users.
    pub users: UserResolver,
    /// Authorization-code relay to the provider.
    pub token_exchange: TokenExchange,
    pub clipboards: ClipboardService,
}

impl AppState {
    pub fn new(config: Config, clipboards: ClipboardService) -> Result<Self, AuthError> {
        let verifier = Arc::new(UserInfoVerifier::new(config.oauth2.clone())?);
        let users = UserResolver::new(config.oauth2.enabled, verifier.clone());
        let token_exchange = TokenExchange::new(config.oauth2.clone(), verifier)?;

        Ok(Self {
            config,
            users,
            token_exchange,
            clipboards,
        })
    }
}

/// Build the CORS layer from the configured origins.
pub fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    match cors.origin_list() {
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                        None
                    }
                })
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(AllowMethods::mirror_request())
                .allow_headers(AllowHeaders::mirror_request())
                .allow_credentials(true)
        }
    }
}

/// Build the full application router.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors);

    Router::new()
        .merge(routes::health::router())
        .merge(routes::auth::router())
        .merge(routes::clipboard::router())
        .with_state(state)
        .layer(middleware::from_fn(logging::request_logger))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
