use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};

use super::AuthError;
use crate::config::OAuth2Config;
use crate::models::user::AuthenticatedUser;

/// Validates bearer tokens by asking the provider's userinfo endpoint who
/// they belong to. Nothing is cached: every call goes to the provider.
pub struct UserInfoVerifier {
    http_client: Client,
    settings: OAuth2Config,
}

impl UserInfoVerifier {
    pub fn new(settings: OAuth2Config) -> Result<Self, AuthError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| AuthError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            settings,
        })
    }

    pub async fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let userinfo_url = self
            .settings
            .userinfo_url()
            .ok_or_else(|| AuthError::Configuration("OAuth2 userinfo URL is not configured.".to_string()))?;

        let response = self
            .http_client
            .get(userinfo_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Userinfo request to {} failed: {}", userinfo_url, e);
                AuthError::UpstreamUnreachable("Unable to reach OAuth2 service.".to_string())
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::debug!("Userinfo endpoint rejected bearer token");
            return Err(AuthError::Unauthorized(
                "Invalid authentication credentials.".to_string(),
            ));
        }

        if !status.is_success() {
            tracing::warn!("Userinfo endpoint returned {}", status);
            return Err(AuthError::BadGateway(format!(
                "Unable to fetch OAuth2 user info: {}",
                status.as_u16()
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            tracing::warn!("Failed to read userinfo response: {}", e);
            AuthError::BadGateway("OAuth2 user info response could not be read.".to_string())
        })?;

        let claims = match serde_json::from_slice::<Value>(&body) {
            Ok(Value::Object(claims)) => claims,
            _ => {
                return Err(AuthError::BadGateway(
                    "OAuth2 user info response is not valid JSON.".to_string(),
                ))
            }
        };

        self.user_from_claims(claims)
    }

    fn user_from_claims(&self, claims: Map<String, Value>) -> Result<AuthenticatedUser, AuthError> {
        let user = AuthenticatedUser::from_claims(claims).ok_or_else(|| {
            AuthError::Unauthorized("User info response missing identifier.".to_string())
        })?;

        if let Some(expected) = self.settings.audience() {
            if user.claims.get("aud").is_some_and(|aud| !audience_matches(aud, expected)) {
                return Err(AuthError::Unauthorized(
                    "Token audience does not match the configured audience.".to_string(),
                ));
            }
        }

        if let Some(expected) = self.settings.issuer() {
            let mismatched = user
                .claims
                .get("iss")
                .is_some_and(|iss| !claim_is_absent(iss) && iss.as_str() != Some(expected));
            if mismatched {
                return Err(AuthError::Unauthorized(
                    "Token issuer does not match the configured issuer.".to_string(),
                ));
            }
        }

        Ok(user)
    }
}

/// `null` and empty values are treated as "claim not present".
fn claim_is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn audience_matches(aud: &Value, expected: &str) -> bool {
    match aud {
        _ if claim_is_absent(aud) => true,
        Value::String(s) => s == expected,
        Value::Array(items) => items.iter().any(|item| item.as_str() == Some(expected)),
        _ => false,
    }
}
