mod sqlite;

pub use sqlite::{ClipboardStore, ClipboardTx, NewClipboard, StoreError};
