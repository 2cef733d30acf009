use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A stored clipboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clipboard {
    /// Row id assigned by the store
    pub id: i64,
    /// Public 6-character code
    pub clipboard_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_encrypted: bool,
    pub encryption_key: Option<String>,
    /// Owning user id, `None` for ownerless clipboards
    #[serde(rename = "user")]
    pub owner: Option<String>,
    pub is_public: bool,
}

impl Clipboard {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }
}

/// Body of `POST /clipboard/`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClipboardCreate {
    pub content: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_encrypted: bool,
    #[serde(default)]
    pub encryption_key: Option<String>,
    /// Requested owner, by user id or email
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

impl ClipboardCreate {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            expires_at: None,
            is_encrypted: false,
            encryption_key: None,
            user: None,
            is_public: false,
        }
    }
}

/// Body of `PUT /clipboard/{id}`.
///
/// Absent fields are left alone. For the nullable columns the outer `Option`
/// records presence and the inner one the value, so `"user": null` clears the
/// owner while a missing `user` key does not touch it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClipboardUpdate {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub expires_at: Option<Option<DateTime<Utc>>>,
    #[serde(default)]
    pub is_encrypted: Option<bool>,
    #[serde(default, deserialize_with = "present")]
    pub encryption_key: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub user: Option<Option<String>>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Query string of `GET /clipboard/`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
        }
    }
}

fn default_limit() -> u32 {
    100
}
