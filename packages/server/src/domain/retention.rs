//! Domain logic for the retention window.
//!
//! Pure functions without side effects, so the sweep rule is testable on its own.

use super::{Message, MessageId};

/// Select the messages that fall outside the retention window.
///
/// # Arguments
///
/// * `messages_ascending` - All stored messages, oldest first
/// * `retention_limit` - Number of most recent messages to keep
///
/// # Returns
///
/// The ids of the oldest `len - retention_limit` messages, oldest first,
/// or an empty vector when the store is already within the window.
pub fn select_expired(messages_ascending: &[Message], retention_limit: usize) -> Vec<MessageId> {
    let excess = messages_ascending.len().saturating_sub(retention_limit);
    messages_ascending[..excess]
        .iter()
        .map(|message| message.id.clone())
        .collect()
}
