//! Process configuration.
//!
//! Everything is read from environment variables, optionally seeded from a
//! `.env` file in the working directory.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result};

const DEFAULT_API_URL: &str = "https://api.telegram.org";
const DEFAULT_DOWNLOAD_DIR: &str = "downloads";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_PREFERENCES_PATH: &str = "preferences.json";

/// Settings consumed by the rename pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Working directory for downloads and thumbnails.
    pub download_dir: PathBuf,
    /// Minimum gap between progress edits of the status message.
    pub progress_interval: Duration,
    /// Enables the bare track-number episode rule.
    pub track_number_fallback: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            progress_interval: crate::progress::DEFAULT_INTERVAL,
            track_number_fallback: false,
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bot_token: String,
    pub api_url: String,
    pub log_dir: PathBuf,
    pub preferences_path: PathBuf,
    pub debounce_window: Duration,
    pub debounce_max_entries: usize,
    pub thumbnail_max_width: u32,
    pub ffprobe_path: String,
    pub poll_timeout: Duration,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = get("BOT_TOKEN").ok_or_else(|| Error::config("BOT_TOKEN is not set"))?;

        let pipeline = PipelineConfig {
            download_dir: get("DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_DIR)),
            progress_interval: Duration::from_secs(parse_or(
                "PROGRESS_INTERVAL_SECS",
                get("PROGRESS_INTERVAL_SECS"),
                crate::progress::DEFAULT_INTERVAL.as_secs(),
            )?),
            track_number_fallback: parse_bool(
                "ENABLE_TRACK_NUMBER_FALLBACK",
                get("ENABLE_TRACK_NUMBER_FALLBACK"),
            )?,
        };

        Ok(Self {
            bot_token,
            api_url: get("TELEGRAM_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            log_dir: get("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
            preferences_path: get("PREFERENCES_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PREFERENCES_PATH)),
            debounce_window: Duration::from_secs(parse_or(
                "DEBOUNCE_WINDOW_SECS",
                get("DEBOUNCE_WINDOW_SECS"),
                crate::debounce::DEFAULT_WINDOW.as_secs(),
            )?),
            debounce_max_entries: parse_or(
                "DEBOUNCE_MAX_ENTRIES",
                get("DEBOUNCE_MAX_ENTRIES"),
                crate::debounce::DEFAULT_MAX_ENTRIES,
            )?,
            thumbnail_max_width: parse_or(
                "THUMBNAIL_MAX_WIDTH",
                get("THUMBNAIL_MAX_WIDTH"),
                crate::thumbnail::DEFAULT_MAX_WIDTH,
            )?,
            ffprobe_path: get("FFPROBE_PATH").unwrap_or_else(|| "ffprobe".to_string()),
            poll_timeout: Duration::from_secs(parse_or(
                "POLL_TIMEOUT_SECS",
                get("POLL_TIMEOUT_SECS"),
                30,
            )?),
            pipeline,
        })
    }
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::config(format!("{key} has an invalid value: {raw}"))),
    }
}

fn parse_bool(key: &str, value: Option<String>) -> Result<bool> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(Error::config(format!("{key} has an invalid value: {v}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("BOT_TOKEN", "123:abc")])).unwrap();
        assert_eq!(config.bot_token, "123:abc");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.debounce_window, Duration::from_secs(10));
        assert_eq!(config.thumbnail_max_width, 320);
        assert_eq!(config.pipeline.download_dir, PathBuf::from("downloads"));
        assert_eq!(config.pipeline.progress_interval, Duration::from_secs(5));
        assert!(!config.pipeline.track_number_fallback);
    }

    #[test]
    fn test_missing_token() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("BOT_TOKEN", "t"),
            ("TELEGRAM_API_URL", "http://localhost:8081/"),
            ("DOWNLOAD_DIR", "/tmp/dl"),
            ("DEBOUNCE_WINDOW_SECS", "30"),
            ("ENABLE_TRACK_NUMBER_FALLBACK", "yes"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "http://localhost:8081");
        assert_eq!(config.pipeline.download_dir, PathBuf::from("/tmp/dl"));
        assert_eq!(config.debounce_window, Duration::from_secs(30));
        assert!(config.pipeline.track_number_fallback);
    }

    #[test]
    fn test_invalid_number() {
        let err = AppConfig::from_lookup(lookup(&[
            ("BOT_TOKEN", "t"),
            ("THUMBNAIL_MAX_WIDTH", "wide"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("THUMBNAIL_MAX_WIDTH"));
    }
}
