//! Fixtures shared by unit and integration tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::clipboard::{generate_clipboard_id, ClipboardService, IdGenerator};
use crate::config::{Config, DatabaseConfig, LoggingConfig, OAuth2Config};
use crate::models::clipboard::Clipboard;
use crate::models::user::AuthenticatedUser;
use crate::store::ClipboardStore;
use crate::AppState;

pub const TEST_CLIENT_ID: &str = "test-client";
pub const TEST_CLIENT_SECRET: &str = "test-secret";
pub const TEST_REDIRECT_URI: &str = "http://localhost:3000/callback";

/// Configuration with OAuth2 disabled and an in-memory database.
pub fn test_config() -> Config {
    Config {
        database: DatabaseConfig {
            url: ":memory:".to_string(),
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
        ..Default::default()
    }
}

/// OAuth2 settings pointing at a mock provider rooted at `provider_uri`.
pub fn test_oauth2_config(provider_uri: &str) -> OAuth2Config {
    OAuth2Config {
        enabled: true,
        userinfo_url: Some(format!("{}/userinfo", provider_uri)),
        token_url: Some(format!("{}/token", provider_uri)),
        redirect_uri: Some(TEST_REDIRECT_URI.to_string()),
        client_id: Some(TEST_CLIENT_ID.to_string()),
        client_secret: Some(TEST_CLIENT_SECRET.to_string()),
        ..Default::default()
    }
}

pub fn memory_store() -> ClipboardStore {
    ClipboardStore::new(":memory:").expect("Failed to open in-memory store")
}

pub fn test_service() -> ClipboardService {
    ClipboardService::new(memory_store())
}

pub fn test_state(config: Config) -> Arc<AppState> {
    let clipboards = ClipboardService::new(
        ClipboardStore::new(&config.database.url).expect("Failed to open store"),
    );
    Arc::new(AppState::new(config, clipboards).expect("Failed to build state"))
}

/// A generator handing out `codes` in order, then random codes.
pub fn scripted_ids(codes: &[&str]) -> IdGenerator {
    let codes: Mutex<VecDeque<String>> =
        Mutex::new(codes.iter().map(|c| c.to_string()).collect());
    Box::new(move || {
        codes
            .lock()
            .expect("scripted id lock poisoned")
            .pop_front()
            .unwrap_or_else(generate_clipboard_id)
    })
}

pub fn test_claims(user_id: &str, email: Option<&str>) -> Map<String, Value> {
    let mut claims = Map::new();
    claims.insert("sub".to_string(), json!(user_id));
    if let Some(email) = email {
        claims.insert("email".to_string(), json!(email));
    }
    claims
}

pub fn test_user(user_id: &str, email: Option<&str>) -> AuthenticatedUser {
    AuthenticatedUser::from_claims(test_claims(user_id, email)).expect("claims carry a sub")
}

pub fn test_clipboard(code: &str, owner: Option<&str>, is_public: bool) -> Clipboard {
    Clipboard {
        id: 1,
        clipboard_id: code.to_string(),
        content: "content".to_string(),
        created_at: Utc::now(),
        updated_at: None,
        expires_at: None,
        is_encrypted: false,
        encryption_key: None,
        owner: owner.map(String::from),
        is_public,
    }
}
