//! Delegated OAuth2 authentication.
//!
//! Bearer tokens are checked against the provider's userinfo endpoint and
//! authorization codes are relayed to its token endpoint.

mod extract;
mod token;
mod userinfo;

pub use extract::{bearer_token, CurrentUser, MaybeUser, UserResolver};
pub use token::{coerce_expires_in, TokenExchange};
pub use userinfo::UserInfoVerifier;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    UpstreamUnreachable(String),
    #[error("{0}")]
    BadGateway(String),
}
