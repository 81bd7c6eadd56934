//! Record key utilities
//!
//! Conference, session and wishlist-entry keys are opaque strings to callers;
//! internally they are UUIDv4 in hyphenated form.

use uuid::Uuid;

/// Generate a new record key
pub fn generate() -> String {
    Uuid::new_v4().to_string()
}

/// True if `key` has the shape of a generated record key
///
/// Malformed keys can never match a stored record, so lookups use this to
/// answer NotFound without a round trip.
pub fn is_well_formed(key: &str) -> bool {
    Uuid::parse_str(key).is_ok()
}
