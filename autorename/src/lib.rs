//! Telegram auto-rename bot.
//!
//! Inbound media is renamed from a per-user template (see the `media-naming`
//! crate), downloaded, probed, given a thumbnail and sent back. The library
//! exposes the pipeline and its collaborators for integration testing.

pub mod caption;
pub mod config;
pub mod debounce;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod format;
pub mod logging;
pub mod pipeline;
pub mod preferences;
pub mod probe;
pub mod progress;
pub mod services;
pub mod telegram;
pub mod thumbnail;
pub mod utils;

pub use error::{Error, Result};
