use chrono::Utc;

use super::{access, generate_clipboard_id, ClipboardError, MAX_ID_ATTEMPTS};
use crate::models::clipboard::{Clipboard, ClipboardCreate, ClipboardUpdate, ListQuery};
use crate::models::user::AuthenticatedUser;
use crate::store::{ClipboardStore, NewClipboard, StoreError};

/// Source of candidate clipboard codes.
pub type IdGenerator = Box<dyn Fn() -> String + Send + Sync>;

/// Clipboard CRUD with access control applied.
///
/// Each operation is one unit of work against the store: the lookup, the
/// access decision and the write share a transaction.
pub struct ClipboardService {
    store: ClipboardStore,
    generate_id: IdGenerator,
}

impl ClipboardService {
    pub fn new(store: ClipboardStore) -> Self {
        Self::with_id_generator(store, Box::new(generate_clipboard_id))
    }

    pub fn with_id_generator(store: ClipboardStore, generate_id: IdGenerator) -> Self {
        Self { store, generate_id }
    }

    /// Create a clipboard under a fresh code.
    ///
    /// A code taken by a concurrent creator shows up as a unique violation
    /// and is retried with a new code, up to [`MAX_ID_ATTEMPTS`] times.
    pub fn create(
        &self,
        request: ClipboardCreate,
        caller: Option<&AuthenticatedUser>,
    ) -> Result<Clipboard, ClipboardError> {
        if request.content.is_empty() {
            return Err(ClipboardError::Invalid("content must not be empty"));
        }

        let owner = match request.user.as_deref().filter(|u| !u.is_empty()) {
            Some(requested) => Some(access::claim_owner(requested, caller)?),
            None => None,
        };
        access::check_lifetime(request.expires_at.is_some(), caller)?;

        let mut new = NewClipboard {
            clipboard_id: String::new(),
            content: request.content,
            created_at: Utc::now(),
            expires_at: request.expires_at,
            is_encrypted: request.is_encrypted,
            encryption_key: request.encryption_key,
            owner,
            is_public: request.is_public,
        };

        for attempt in 1..=MAX_ID_ATTEMPTS {
            new.clipboard_id = (self.generate_id)();

            match self.store.transaction(|tx| tx.insert(&new)) {
                Ok(clipboard) => {
                    tracing::info!(
                        clipboard_id = %clipboard.clipboard_id,
                        owner = clipboard.owner.as_deref().unwrap_or("-"),
                        "Created clipboard"
                    );
                    return Ok(clipboard);
                }
                Err(StoreError::DuplicateId(code)) => {
                    tracing::debug!("Clipboard code {} taken (attempt {})", code, attempt);
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::error!("No free clipboard code after {} attempts", MAX_ID_ATTEMPTS);
        Err(ClipboardError::IdSpaceExhausted)
    }

    /// Fetch a clipboard. An expired one is deleted on the spot and reported
    /// as gone; expiry is checked before visibility.
    pub fn read(
        &self,
        clipboard_id: &str,
        caller: Option<&AuthenticatedUser>,
    ) -> Result<Clipboard, ClipboardError> {
        let now = Utc::now();

        let found = self
            .store
            .transaction(|tx| -> Result<Option<Clipboard>, ClipboardError> {
                let clipboard = tx
                    .find(clipboard_id)?
                    .ok_or_else(|| ClipboardError::NotFound(clipboard_id.to_string()))?;

                if clipboard.is_expired_at(now) {
                    tx.delete(clipboard_id)?;
                    return Ok(None);
                }
                Ok(Some(clipboard))
            })?;

        let clipboard = found.ok_or_else(|| {
            tracing::info!("Deleted expired clipboard {}", clipboard_id);
            ClipboardError::Expired
        })?;

        if !access::can_view(&clipboard, caller) {
            return Err(ClipboardError::Forbidden("Clipboard is private."));
        }

        Ok(clipboard)
    }

    /// Public clipboards plus the caller's own. Expired rows are not swept.
    pub fn list(
        &self,
        query: &ListQuery,
        caller: Option<&AuthenticatedUser>,
    ) -> Result<Vec<Clipboard>, ClipboardError> {
        let viewer = caller.map(|user| user.user_id.as_str());
        let clipboards = self
            .store
            .transaction(|tx| tx.list_visible(viewer, query.skip, query.limit))?;
        Ok(clipboards)
    }

    /// Apply the fields present in `changes`.
    pub fn update(
        &self,
        clipboard_id: &str,
        changes: ClipboardUpdate,
        caller: Option<&AuthenticatedUser>,
    ) -> Result<Clipboard, ClipboardError> {
        if changes.content.as_deref() == Some("") {
            return Err(ClipboardError::Invalid("content must not be empty"));
        }

        self.store.transaction(|tx| {
            let stored = tx
                .find(clipboard_id)?
                .ok_or_else(|| ClipboardError::NotFound(clipboard_id.to_string()))?;

            if !access::can_modify(&stored, caller) {
                return Err(ClipboardError::Forbidden(
                    "Not authorized to modify this clipboard.",
                ));
            }

            let mut clipboard = stored.clone();

            if let Some(requested) = changes.user {
                clipboard.owner = match requested.as_deref().filter(|u| !u.is_empty()) {
                    Some(requested) => Some(access::claim_owner(requested, caller)?),
                    None => None,
                };
            }

            // Visibility follows the modify rule checked against `stored` above.
            if let Some(is_public) = changes.is_public {
                clipboard.is_public = is_public;
            }

            if let Some(content) = changes.content {
                clipboard.content = content;
            }
            if let Some(expires_at) = changes.expires_at {
                clipboard.expires_at = expires_at;
            }
            if let Some(is_encrypted) = changes.is_encrypted {
                clipboard.is_encrypted = is_encrypted;
            }
            if let Some(encryption_key) = changes.encryption_key {
                clipboard.encryption_key = encryption_key;
            }

            clipboard.updated_at = Some(Utc::now());
            tx.save(&clipboard)?;

            tracing::info!(clipboard_id = %clipboard.clipboard_id, "Updated clipboard");
            Ok(clipboard)
        })
    }

    /// Delete a clipboard. Ownerless clipboards may be deleted by anyone.
    pub fn delete(
        &self,
        clipboard_id: &str,
        caller: Option<&AuthenticatedUser>,
    ) -> Result<(), ClipboardError> {
        self.store.transaction(|tx| {
            let clipboard = tx
                .find(clipboard_id)?
                .ok_or_else(|| ClipboardError::NotFound(clipboard_id.to_string()))?;

            if !access::can_modify(&clipboard, caller) {
                return Err(ClipboardError::Forbidden(
                    "Not authorized to delete this clipboard.",
                ));
            }

            tx.delete(clipboard_id)?;
            tracing::info!(clipboard_id = %clipboard_id, "Deleted clipboard");
            Ok(())
        })
    }
}
