use std::sync::Arc;
use std::time::Duration;

use reqwest::header::LOCATION;
use reqwest::{redirect, Client, Response, StatusCode};
use serde_json::{Map, Value};

use super::{AuthError, UserInfoVerifier};
use crate::config::OAuth2Config;
use crate::models::token::{TokenExchangeRequest, TokenExchangeResponse};

/// Relays authorization codes to the provider's token endpoint.
///
/// Redirects are handled by hand: at most one hop is followed, as a GET for
/// `303 See Other` and as a repeated form POST for every other redirect.
pub struct TokenExchange {
    http_client: Client,
    settings: OAuth2Config,
    verifier: Arc<UserInfoVerifier>,
}

/// Token endpoint parameters that must all be configured.
struct Endpoint<'a> {
    token_url: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
}

impl TokenExchange {
    pub fn new(settings: OAuth2Config, verifier: Arc<UserInfoVerifier>) -> Result<Self, AuthError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| AuthError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            settings,
            verifier,
        })
    }

    /// Exchange an authorization code for an access token and resolve the
    /// user it belongs to. Either both succeed or the exchange fails.
    pub async fn exchange(
        &self,
        request: &TokenExchangeRequest,
    ) -> Result<TokenExchangeResponse, AuthError> {
        if request.code.is_empty() {
            return Err(AuthError::InvalidRequest("code must not be empty".to_string()));
        }
        if request.code_verifier.as_deref() == Some("") {
            return Err(AuthError::InvalidRequest(
                "code_verifier must not be empty".to_string(),
            ));
        }

        let endpoint = self.endpoint()?;
        let redirect_uri = request
            .redirect_uri
            .as_deref()
            .filter(|uri| !uri.is_empty())
            .or(self.settings.redirect_uri())
            .ok_or_else(|| {
                AuthError::Configuration("OAuth2 redirect URI is not configured.".to_string())
            })?;

        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", request.code.as_str()),
            ("redirect_uri", redirect_uri),
            ("client_id", endpoint.client_id),
            ("client_secret", endpoint.client_secret),
        ];
        if let Some(code_verifier) = request.code_verifier.as_deref() {
            form.push(("code_verifier", code_verifier));
        }
        if let Some(scope) = self.settings.scope() {
            form.push(("scope", scope));
        }

        let mut response = self
            .http_client
            .post(endpoint.token_url)
            .form(&form)
            .send()
            .await
            .map_err(unreachable)?;

        if is_redirect(response.status()) {
            response = self.follow_redirect(response, &form).await?;
        }

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AuthError::Unauthorized(
                "Authorization code is invalid or expired.".to_string(),
            ));
        }
        if !status.is_success() {
            tracing::warn!("Token endpoint returned {}", status);
            return Err(AuthError::BadGateway(format!(
                "Token endpoint returned unexpected status {}.",
                status.as_u16()
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            tracing::warn!("Failed to read token response: {}", e);
            AuthError::BadGateway("Token endpoint response could not be read.".to_string())
        })?;
        let token_response: Map<String, Value> = match serde_json::from_slice(&body) {
            Ok(Value::Object(map)) => map,
            _ => {
                return Err(AuthError::BadGateway(
                    "Token endpoint response is not valid JSON.".to_string(),
                ))
            }
        };

        let access_token = string_field(&token_response, "access_token").ok_or_else(|| {
            AuthError::BadGateway("Token endpoint response missing access_token.".to_string())
        })?;

        let user = self.verifier.verify(&access_token).await?;
        tracing::info!("Exchanged authorization code for user {}", user.user_id);

        Ok(TokenExchangeResponse {
            access_token,
            token_type: string_field(&token_response, "token_type"),
            expires_in: coerce_expires_in(token_response.get("expires_in")),
            refresh_token: string_field(&token_response, "refresh_token"),
            scope: string_field(&token_response, "scope"),
            user,
        })
    }

    fn endpoint(&self) -> Result<Endpoint<'_>, AuthError> {
        if !self.settings.enabled {
            return Err(AuthError::Configuration(
                "OAuth2 authentication is not enabled on this server.".to_string(),
            ));
        }

        let token_url = self.settings.token_url().ok_or_else(|| {
            AuthError::Configuration("OAuth2 token URL is not configured.".to_string())
        })?;

        match (self.settings.client_id(), self.settings.client_secret()) {
            (Some(client_id), Some(client_secret)) => Ok(Endpoint {
                token_url,
                client_id,
                client_secret,
            }),
            _ => Err(AuthError::Configuration(
                "OAuth2 client credentials are not configured.".to_string(),
            )),
        }
    }

    /// Issue the single follow-up request for a redirect response. Whatever
    /// the follow-up returns is final, even another redirect.
    async fn follow_redirect(
        &self,
        response: Response,
        form: &[(&str, &str)],
    ) -> Result<Response, AuthError> {
        let status = response.status();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                AuthError::BadGateway(
                    "Token endpoint redirected without a location header.".to_string(),
                )
            })?;

        let target = response.url().join(location).map_err(|e| {
            AuthError::BadGateway(format!("Token endpoint redirected to an invalid location: {}", e))
        })?;

        tracing::debug!("Token endpoint redirected ({}) to {}", status.as_u16(), target);

        let follow_up = if status == StatusCode::SEE_OTHER {
            self.http_client.get(target)
        } else {
            self.http_client.post(target).form(form)
        };

        follow_up.send().await.map_err(unreachable)
    }
}

fn unreachable(e: reqwest::Error) -> AuthError {
    tracing::warn!("Token endpoint request failed: {}", e);
    AuthError::UpstreamUnreachable("Unable to reach OAuth2 service.".to_string())
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Normalize the provider's `expires_in`: numbers are truncated to whole
/// seconds, digit strings are parsed, anything else is dropped.
pub fn coerce_expires_in(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!("120"), Some(120))]
    #[case(json!(45.0), Some(45))]
    #[case(json!(3600), Some(3600))]
    #[case(json!(59.9), Some(59))]
    #[case(json!("abc"), None)]
    #[case(json!("12a"), None)]
    #[case(json!(""), None)]
    #[case(json!("-5"), None)]
    #[case(json!(null), None)]
    #[case(json!(true), None)]
    #[case(json!([1]), None)]
    fn test_coerce_expires_in(#[case] input: Value, #[case] expected: Option<i64>) {
        assert_eq!(coerce_expires_in(Some(&input)), expected);
    }

    #[test]
    fn test_coerce_expires_in_missing() {
        assert_eq!(coerce_expires_in(None), None);
    }

    #[rstest]
    #[case(301, true)]
    #[case(302, true)]
    #[case(303, true)]
    #[case(307, true)]
    #[case(308, true)]
    #[case(200, false)]
    #[case(304, false)]
    #[case(401, false)]
    fn test_is_redirect(#[case] code: u16, #[case] expected: bool) {
        assert_eq!(is_redirect(StatusCode::from_u16(code).unwrap()), expected);
    }

    fn exchange_with(settings: OAuth2Config) -> TokenExchange {
        let verifier = Arc::new(UserInfoVerifier::new(settings.clone()).unwrap());
        TokenExchange::new(settings, verifier).unwrap()
    }

    fn full_settings() -> OAuth2Config {
        OAuth2Config {
            enabled: true,
            token_url: Some("http://127.0.0.1:1/token".to_string()),
            userinfo_url: Some("http://127.0.0.1:1/userinfo".to_string()),
            client_id: Some("client".to_string()),
            client_secret: Some("secret".to_string()),
            redirect_uri: Some("http://localhost/callback".to_string()),
            ..Default::default()
        }
    }

    fn code_request(code: &str) -> TokenExchangeRequest {
        TokenExchangeRequest {
            code: code.to_string(),
            redirect_uri: None,
            code_verifier: None,
        }
    }

    #[tokio::test]
    async fn test_disabled_oauth2_is_configuration_error() {
        let settings = OAuth2Config {
            enabled: false,
            ..full_settings()
        };
        let err = exchange_with(settings)
            .exchange(&code_request("abc"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Configuration(msg) if msg.contains("not enabled")));
    }

    #[tokio::test]
    async fn test_missing_client_secret_is_configuration_error() {
        let settings = OAuth2Config {
            client_secret: None,
            ..full_settings()
        };
        let err = exchange_with(settings)
            .exchange(&code_request("abc"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Configuration(msg) if msg.contains("credentials")));
    }

    #[tokio::test]
    async fn test_missing_redirect_uri_is_configuration_error() {
        let settings = OAuth2Config {
            redirect_uri: None,
            ..full_settings()
        };
        let err = exchange_with(settings)
            .exchange(&code_request("abc"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Configuration(msg) if msg.contains("redirect URI")));
    }

    #[tokio::test]
    async fn test_empty_code_is_invalid_request() {
        let err = exchange_with(full_settings())
            .exchange(&code_request(""))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_unreachable_token_endpoint() {
        let err = exchange_with(full_settings())
            .exchange(&code_request("abc"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UpstreamUnreachable(_)));
    }
}
