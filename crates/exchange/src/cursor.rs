//! Pagination cursor handling
//!
//! Synapse's quarantined-media listing returns `next_batch` tokens of the form
//! `<position>-<sub-ordering>`. The exchange keeps only the position and
//! resets the sub-ordering to `0`.
//!
//! The token is not validated. If Synapse ever changes the token format the
//! derived cursor may skip or repeat items.

/// Cursor used when there is no checkpoint yet
pub const INITIAL_CURSOR: &str = "0";

/// Derive the next cursor from a listing's `next_batch` token
///
/// Returns `None` for an empty token, meaning the feed's cursor stays put.
///
/// # Examples
/// ```
/// use exchange::cursor::advance_cursor;
///
/// assert_eq!(advance_cursor("150-3"), Some("150-0".to_string()));
/// assert_eq!(advance_cursor(""), None);
/// ```
pub fn advance_cursor(next_batch: &str) -> Option<String> {
    if next_batch.is_empty() {
        return None;
    }
    let position = next_batch.split('-').next().unwrap_or(next_batch);
    Some(format!("{}-0", position))
}

/// Next cursor for a feed: derived from `next_batch`, or `current` unchanged
pub fn next_cursor(current: &str, next_batch: &str) -> String {
    advance_cursor(next_batch).unwrap_or_else(|| current.to_string())
}
