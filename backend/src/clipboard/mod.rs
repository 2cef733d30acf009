//! Clipboard access control and CRUD operations.

pub mod access;
mod service;

pub use service::{ClipboardService, IdGenerator};

use rand::Rng;

use crate::store::StoreError;

/// Length of a clipboard code.
pub const CODE_LENGTH: usize = 6;

/// Alphabet clipboard codes are drawn from.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Attempts made to find an unused code before giving up.
pub const MAX_ID_ATTEMPTS: usize = 10;

/// Draw a random clipboard code.
pub fn generate_clipboard_id() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("Clipboard {0} is not found.")]
    NotFound(String),
    #[error("Clipboard has expired.")]
    Expired,
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("{0}")]
    Invalid(&'static str),
    #[error("Failed to generate unique clipboard ID.")]
    IdSpaceExhausted,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_are_six_uppercase_alphanumerics() {
        for _ in 0..1000 {
            let code = generate_clipboard_id();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_generated_codes_vary() {
        let first = generate_clipboard_id();
        assert!((0..20).any(|_| generate_clipboard_id() != first));
    }
}
