//! Telegram Bot API transport.

mod client;
pub mod types;

pub use client::TelegramClient;
pub use types::{Message, Update};

/// Telegram `sendMessage` text limit (UTF-8 characters).
pub const MESSAGE_LIMIT: usize = 4096;

/// Caption limit for media messages.
pub const CAPTION_LIMIT: usize = 1024;

/// Truncate a message to fit within the Telegram character limit.
pub fn truncate_message(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let suffix = "\n\n[truncated]";
    let budget = limit.saturating_sub(suffix.len());
    let truncated: String = text.chars().take(budget).collect();
    format!("{truncated}{suffix}")
}
