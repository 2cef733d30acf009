use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity resolved from the OAuth2 provider's userinfo endpoint.
///
/// Built fresh for every request; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// Stable identifier (`sub`, `id` or `user_id` claim)
    pub user_id: String,
    pub email: Option<String>,
    pub username: Option<String>,
    /// The full userinfo document.
    pub claims: Map<String, Value>,
}

impl AuthenticatedUser {
    /// Build a user from a userinfo document. Returns `None` when the
    /// document carries no usable identifier claim.
    pub fn from_claims(claims: Map<String, Value>) -> Option<Self> {
        let user_id = ["sub", "id", "user_id"]
            .iter()
            .find_map(|key| claims.get(*key).and_then(identifier))?;

        let email = string_claim(&claims, "email");
        let username =
            string_claim(&claims, "username").or_else(|| string_claim(&claims, "preferred_username"));

        Some(Self {
            user_id,
            email,
            username,
            claims,
        })
    }

    /// Whether `identifier` names this user, by id or by email.
    pub fn is_known_as(&self, identifier: &str) -> bool {
        self.user_id == identifier || self.email.as_deref() == Some(identifier)
    }
}

fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

fn string_claim(claims: &Map<String, Value>, key: &str) -> Option<String> {
    claims
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("claims must be an object"),
        }
    }

    #[test]
    fn test_sub_claim_wins() {
        let user = AuthenticatedUser::from_claims(claims(json!({
            "sub": "abc",
            "id": "ignored",
            "email": "a@example.com",
            "preferred_username": "alice"
        })))
        .unwrap();
        assert_eq!(user.user_id, "abc");
        assert_eq!(user.email.as_deref(), Some("a@example.com"));
        assert_eq!(user.username.as_deref(), Some("alice"));
        assert_eq!(user.claims.get("id"), Some(&json!("ignored")));
    }

    #[test]
    fn test_falls_back_to_id_then_user_id() {
        let user = AuthenticatedUser::from_claims(claims(json!({"sub": "", "id": 42}))).unwrap();
        assert_eq!(user.user_id, "42");

        let user = AuthenticatedUser::from_claims(claims(json!({"user_id": "u-1"}))).unwrap();
        assert_eq!(user.user_id, "u-1");
    }

    #[test]
    fn test_username_preferred_over_preferred_username() {
        let user = AuthenticatedUser::from_claims(claims(json!({
            "sub": "abc",
            "username": "first",
            "preferred_username": "second"
        })))
        .unwrap();
        assert_eq!(user.username.as_deref(), Some("first"));
    }

    #[test]
    fn test_missing_identifier_is_none() {
        assert!(AuthenticatedUser::from_claims(claims(json!({"email": "a@example.com"}))).is_none());
        assert!(AuthenticatedUser::from_claims(claims(json!({"sub": null}))).is_none());
    }

    #[test]
    fn test_is_known_as_matches_id_or_email() {
        let user = AuthenticatedUser::from_claims(claims(json!({
            "sub": "abc",
            "email": "a@example.com"
        })))
        .unwrap();
        assert!(user.is_known_as("abc"));
        assert!(user.is_known_as("a@example.com"));
        assert!(!user.is_known_as("someone-else"));
    }
}
