use std::path::Path;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, Transaction};

use crate::models::clipboard::Clipboard;

/// SQLite-backed clipboard storage.
///
/// The connection sits behind a mutex; every unit of work runs inside
/// [`ClipboardStore::transaction`], which holds the lock for its duration.
pub struct ClipboardStore {
    conn: Mutex<Connection>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Clipboard id {0} already exists")]
    DuplicateId(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

/// Values for a row about to be inserted.
#[derive(Debug, Clone)]
pub struct NewClipboard {
    pub clipboard_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_encrypted: bool,
    pub encryption_key: Option<String>,
    pub owner: Option<String>,
    pub is_public: bool,
}

const COLUMNS: &str = "id, clipboard_id, content, created_at, updated_at, expires_at, \
                       is_encrypted, encryption_key, owner, is_public";

impl ClipboardStore {
    pub fn new(database_url: &str) -> Result<Self, StoreError> {
        // Parse sqlite: prefix if present
        let path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);

        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::IoError(e.to_string()))?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS clipboards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                clipboard_id TEXT NOT NULL UNIQUE,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT,
                expires_at TEXT,
                is_encrypted INTEGER NOT NULL DEFAULT 0,
                encryption_key TEXT,
                owner TEXT,
                is_public INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_clipboards_owner ON clipboards(owner)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_clipboards_is_public ON clipboards(is_public)",
            [],
        )?;

        tracing::info!("Clipboard store initialized with database: {}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` inside a transaction.
    ///
    /// The transaction commits when `f` returns `Ok` and rolls back when it
    /// returns `Err` (the uncommitted transaction is dropped).
    pub fn transaction<T, E>(
        &self,
        f: impl FnOnce(&ClipboardTx<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        // A panic mid-transaction leaves nothing committed, so the connection
        // is still usable after poisoning.
        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);

        let tx = ClipboardTx {
            tx: conn.transaction().map_err(StoreError::from)?,
        };

        let value = f(&tx)?;
        tx.tx.commit().map_err(StoreError::from)?;
        Ok(value)
    }
}

/// Clipboard operations scoped to one open transaction.
pub struct ClipboardTx<'c> {
    tx: Transaction<'c>,
}

impl ClipboardTx<'_> {
    /// Insert a clipboard. A taken `clipboard_id` yields
    /// [`StoreError::DuplicateId`].
    pub fn insert(&self, new: &NewClipboard) -> Result<Clipboard, StoreError> {
        let result = self.tx.execute(
            "INSERT INTO clipboards
                (clipboard_id, content, created_at, expires_at, is_encrypted, encryption_key, owner, is_public)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                new.clipboard_id,
                new.content,
                to_text(new.created_at),
                new.expires_at.map(to_text),
                new.is_encrypted,
                new.encryption_key,
                new.owner,
                new.is_public,
            ],
        );

        match result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                return Err(StoreError::DuplicateId(new.clipboard_id.clone()));
            }
            Err(e) => return Err(e.into()),
        }

        let id = self.tx.last_insert_rowid();
        tracing::debug!("Inserted clipboard {} (row {})", new.clipboard_id, id);

        Ok(Clipboard {
            id,
            clipboard_id: new.clipboard_id.clone(),
            content: new.content.clone(),
            created_at: new.created_at,
            updated_at: None,
            expires_at: new.expires_at,
            is_encrypted: new.is_encrypted,
            encryption_key: new.encryption_key.clone(),
            owner: new.owner.clone(),
            is_public: new.is_public,
        })
    }

    pub fn find(&self, clipboard_id: &str) -> Result<Option<Clipboard>, StoreError> {
        let clipboard = self
            .tx
            .query_row(
                &format!("SELECT {COLUMNS} FROM clipboards WHERE clipboard_id = ?1"),
                params![clipboard_id],
                row_to_clipboard,
            )
            .optional()?;
        Ok(clipboard)
    }

    /// Public clipboards plus, when `viewer` is set, the viewer's own.
    pub fn list_visible(
        &self,
        viewer: Option<&str>,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<Clipboard>, StoreError> {
        let mut stmt = self.tx.prepare(&format!(
            "SELECT {COLUMNS} FROM clipboards
             WHERE is_public = 1 OR (?1 IS NOT NULL AND owner = ?1)
             ORDER BY id
             LIMIT ?2 OFFSET ?3"
        ))?;

        let rows = stmt.query_map(params![viewer, limit, skip], row_to_clipboard)?;
        let clipboards = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(clipboards)
    }

    /// Write back every mutable column of `clipboard`.
    pub fn save(&self, clipboard: &Clipboard) -> Result<(), StoreError> {
        self.tx.execute(
            "UPDATE clipboards
             SET content = ?1, updated_at = ?2, expires_at = ?3, is_encrypted = ?4,
                 encryption_key = ?5, owner = ?6, is_public = ?7
             WHERE clipboard_id = ?8",
            params![
                clipboard.content,
                clipboard.updated_at.map(to_text),
                clipboard.expires_at.map(to_text),
                clipboard.is_encrypted,
                clipboard.encryption_key,
                clipboard.owner,
                clipboard.is_public,
                clipboard.clipboard_id,
            ],
        )?;
        Ok(())
    }

    /// Returns whether a row was removed.
    pub fn delete(&self, clipboard_id: &str) -> Result<bool, StoreError> {
        let removed = self.tx.execute(
            "DELETE FROM clipboards WHERE clipboard_id = ?1",
            params![clipboard_id],
        )?;
        Ok(removed > 0)
    }
}

fn to_text(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        DateTime::parse_from_rfc3339(&t)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn row_to_clipboard(row: &Row<'_>) -> rusqlite::Result<Clipboard> {
    let created_at = parse_time(row, 3)?.ok_or(rusqlite::Error::InvalidColumnType(
        3,
        "created_at".to_string(),
        Type::Null,
    ))?;

    Ok(Clipboard {
        id: row.get(0)?,
        clipboard_id: row.get(1)?,
        content: row.get(2)?,
        created_at,
        updated_at: parse_time(row, 4)?,
        expires_at: parse_time(row, 5)?,
        is_encrypted: row.get(6)?,
        encryption_key: row.get(7)?,
        owner: row.get(8)?,
        is_public: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn memory_store() -> ClipboardStore {
        ClipboardStore::new(":memory:").unwrap()
    }

    fn new_clipboard(code: &str, owner: Option<&str>, is_public: bool) -> NewClipboard {
        NewClipboard {
            clipboard_id: code.to_string(),
            content: format!("content of {code}"),
            created_at: Utc::now(),
            expires_at: None,
            is_encrypted: false,
            encryption_key: None,
            owner: owner.map(String::from),
            is_public,
        }
    }

    fn insert(store: &ClipboardStore, new: NewClipboard) -> Clipboard {
        store
            .transaction(|tx| tx.insert(&new))
            .unwrap()
    }

    #[test]
    fn test_store_usable_after_panic_in_transaction() {
        let store = memory_store();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _: Result<(), StoreError> = store.transaction(|tx| {
                tx.insert(&new_clipboard("PANIC1", None, true))?;
                panic!("handler bug");
            });
        }));
        assert!(result.is_err());

        insert(&store, new_clipboard("AFTER1", None, true));
        let (panicked, after) = store
            .transaction(|tx| Ok::<_, StoreError>((tx.find("PANIC1")?, tx.find("AFTER1")?)))
            .unwrap();
        assert!(panicked.is_none());
        assert!(after.is_some());
    }

    #[test]
    fn test_insert_and_find() {
        let store = memory_store();
        let mut new = new_clipboard("ABC123", Some("user-1"), true);
        new.expires_at = Some(Utc::now() + Duration::hours(1));
        new.encryption_key = Some("key".to_string());
        let inserted = insert(&store, new);

        let found = store
            .transaction(|tx| tx.find("ABC123"))
            .unwrap()
            .unwrap();
        assert_eq!(found, inserted);
        assert_eq!(found.owner.as_deref(), Some("user-1"));
        assert!(found.updated_at.is_none());
    }

    #[test]
    fn test_find_missing_returns_none() {
        let store = memory_store();
        assert!(store.transaction(|tx| tx.find("NOPE00")).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_code_is_reported() {
        let store = memory_store();
        insert(&store, new_clipboard("DUP000", None, false));

        let err = store
            .transaction(|tx| tx.insert(&new_clipboard("DUP000", None, false)))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(code) if code == "DUP000"));
    }

    #[test]
    fn test_list_visible_for_anonymous_and_owner() {
        let store = memory_store();
        insert(&store, new_clipboard("PUB001", None, true));
        insert(&store, new_clipboard("PRV001", Some("alice"), false));
        insert(&store, new_clipboard("PRV002", Some("bob"), false));
        insert(&store, new_clipboard("ANON01", None, false));

        let anonymous = store
            .transaction(|tx| tx.list_visible(None, 0, 100))
            .unwrap();
        let codes: Vec<_> = anonymous.iter().map(|c| c.clipboard_id.as_str()).collect();
        assert_eq!(codes, vec!["PUB001"]);

        let alice = store
            .transaction(|tx| tx.list_visible(Some("alice"), 0, 100))
            .unwrap();
        let codes: Vec<_> = alice.iter().map(|c| c.clipboard_id.as_str()).collect();
        assert_eq!(codes, vec!["PUB001", "PRV001"]);
    }

    #[test]
    fn test_list_visible_paginates() {
        let store = memory_store();
        for i in 0..5 {
            insert(&store, new_clipboard(&format!("PAGE0{i}"), None, true));
        }

        let page = store
            .transaction(|tx| tx.list_visible(None, 1, 2))
            .unwrap();
        let codes: Vec<_> = page.iter().map(|c| c.clipboard_id.as_str()).collect();
        assert_eq!(codes, vec!["PAGE01", "PAGE02"]);
    }

    #[test]
    fn test_save_and_delete() {
        let store = memory_store();
        let mut clipboard = insert(&store, new_clipboard("SAVE01", None, false));
        clipboard.content = "changed".to_string();
        clipboard.updated_at = Some(Utc::now());
        clipboard.owner = Some("carol".to_string());

        store.transaction(|tx| tx.save(&clipboard)).unwrap();
        let found = store
            .transaction(|tx| tx.find("SAVE01"))
            .unwrap()
            .unwrap();
        assert_eq!(found.content, "changed");
        assert_eq!(found.owner.as_deref(), Some("carol"));
        assert!(found.updated_at.is_some());

        assert!(store.transaction(|tx| tx.delete("SAVE01")).unwrap());
        assert!(!store.transaction(|tx| tx.delete("SAVE01")).unwrap());
    }

    #[test]
    fn test_failed_unit_of_work_rolls_back() {
        let store = memory_store();
        let result: Result<(), StoreError> = store.transaction(|tx| {
            tx.insert(&new_clipboard("ROLL01", None, true))?;
            Err(StoreError::DatabaseError("boom".to_string()))
        });
        assert!(result.is_err());
        assert!(store.transaction(|tx| tx.find("ROLL01")).unwrap().is_none());
    }
}
