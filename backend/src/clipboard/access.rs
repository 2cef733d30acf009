//! Ownership and visibility rules.
//!
//! Pure decisions over a clipboard and the (optional) caller; storage is
//! never touched here.

use super::ClipboardError;
use crate::models::clipboard::Clipboard;
use crate::models::user::AuthenticatedUser;

/// Resolve a requested owner to the id that will be stored.
///
/// Only an authenticated caller may claim a clipboard, and only for
/// themselves (named by user id or email). The caller's user id is stored
/// either way.
pub fn claim_owner(
    requested: &str,
    caller: Option<&AuthenticatedUser>,
) -> Result<String, ClipboardError> {
    match caller {
        Some(user) if user.is_known_as(requested) => Ok(user.user_id.clone()),
        _ => Err(ClipboardError::Forbidden(
            "Cannot assign clipboard to a different user.",
        )),
    }
}

/// Anonymous callers may only create clipboards that expire.
pub fn check_lifetime(
    has_expiry: bool,
    caller: Option<&AuthenticatedUser>,
) -> Result<(), ClipboardError> {
    if has_expiry || caller.is_some() {
        Ok(())
    } else {
        Err(ClipboardError::Unauthorized(
            "Authentication required to create a permanent clipboard.",
        ))
    }
}

pub fn is_owner(clipboard: &Clipboard, caller: Option<&AuthenticatedUser>) -> bool {
    match (&clipboard.owner, caller) {
        (Some(owner), Some(user)) => *owner == user.user_id,
        _ => false,
    }
}

/// Public and ownerless clipboards are readable by anyone, private owned
/// ones only by their owner.
pub fn can_view(clipboard: &Clipboard, caller: Option<&AuthenticatedUser>) -> bool {
    clipboard.owner.is_none() || clipboard.is_public || is_owner(clipboard, caller)
}

/// Ownerless clipboards are modifiable (and deletable) by anyone. Changing
/// visibility is a modification.
pub fn can_modify(clipboard: &Clipboard, caller: Option<&AuthenticatedUser>) -> bool {
    clipboard.owner.is_none() || is_owner(clipboard, caller)
}
