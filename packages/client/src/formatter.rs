//! Message formatting utilities for client display.

use sokdo_server::infrastructure::dto::websocket::MessageDto;
use sokdo_shared::time::{parse_timestamp, timestamp_to_local_display};

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format a chat message record
    ///
    /// # Arguments
    ///
    /// * `message` - The stored message record
    /// * `own_nickname` - This client's nickname (own messages are marked with "(me)")
    ///
    /// # Returns
    ///
    /// A formatted string with the chat message
    pub fn format_chat_message(message: &MessageDto, own_nickname: &str) -> String {
        let me_suffix = if message.nickname == own_nickname {
            " (me)"
        } else {
            ""
        };
        format!(
            "\n[{}] @{}{}: {}\n",
            Self::format_timestamp(&message.timestamp),
            message.nickname,
            me_suffix,
            message.content
        )
    }

    /// Wire timestamp in the local time zone, or verbatim when it does not parse
    pub fn format_timestamp(timestamp: &str) -> String {
        parse_timestamp(timestamp)
            .map(timestamp_to_local_display)
            .unwrap_or_else(|| timestamp.to_string())
    }

    /// Format an in-band error event from the server
    pub fn format_error(error: &str) -> String {
        format!("\n! {}\n", error)
    }

    /// Format a connection status notice
    pub fn format_notice(notice: &str) -> String {
        format!("\n* {}\n", notice)
    }

    /// Format the banner shown once after login
    pub fn format_welcome(nickname: &str, server: &str) -> String {
        format!(
            "\n============================================================\n\
             You are '{}' on {}.\n\
             Type messages and press Enter to send. Press Ctrl+C to exit.\n\
             ============================================================\n",
            nickname, server
        )
    }

    /// Format a raw text message (when parsing fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("\n← Received: {}\n", text)
    }
}
