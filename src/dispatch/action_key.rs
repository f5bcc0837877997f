//! Deduplication key derivation.
//!
//! The key is `{actor}#{resource_id}#{action}#{timestamp}` where the
//! timestamp slot always holds the zero time. Repeated actions by the same
//! actor on the same resource therefore collapse onto one key no matter when
//! they happen. The sentinel keeps the key format stable for consumers that
//! already parse it.

use std::borrow::Cow;

/// Zero time in RFC 3339, occupying the timestamp slot of every key.
pub const TIMESTAMP_SENTINEL: &str = "0001-01-01T00:00:00Z";

const SEPARATOR: char = '#';
const ESCAPE: char = '\\';

/// Derive the deduplication key for an (actor, resource, action) triple.
pub fn derive_action_key(actor: &str, resource_id: &str, action: i32) -> String {
    format!(
        "{actor}{sep}{resource}{sep}{action}{sep}{TIMESTAMP_SENTINEL}",
        actor = escape(actor),
        resource = escape(resource_id),
        sep = SEPARATOR,
    )
}

/// Escape separator and escape characters so distinct triples never
/// concatenate to the same key. Plain ids are returned untouched.
fn escape(component: &str) -> Cow<'_, str> {
    if !component.contains([SEPARATOR, ESCAPE]) {
        return Cow::Borrowed(component);
    }

    let mut out = String::with_capacity(component.len() + 4);
    for c in component.chars() {
        if c == SEPARATOR || c == ESCAPE {
            out.push(ESCAPE);
        }
        out.push(c);
    }
    Cow::Owned(out)
}
