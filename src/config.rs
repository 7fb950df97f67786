//! Client configuration loading: service endpoints, retry and reconnection tuning.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::services::{retry::RetryPolicy, synchronizer::SyncOptions};

/// Default location on disk where the client looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/sync.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "BRACKET_SYNC_CONFIG_PATH";
const API_URL_ENV: &str = "BRACKET_SYNC_API_URL";
const WS_URL_ENV: &str = "BRACKET_SYNC_WS_URL";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
/// Runtime configuration shared by the event store, channel and synchronizer.
pub struct SyncConfig {
    /// REST root, e.g. `http://localhost:3000/api`.
    pub api_base_url: String,
    /// WebSocket root, e.g. `ws://localhost:3000/ws`.
    pub ws_base_url: String,
    /// Per-request timeout for REST calls.
    pub request_timeout_ms: u64,
    /// Backoff for fetches and winner requests.
    pub fetch_retry: RetrySettings,
    /// Live channel settings.
    pub channel: ChannelSettings,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000/api".into(),
            ws_base_url: "ws://localhost:3000/ws".into(),
            request_timeout_ms: 10_000,
            fetch_retry: RetrySettings::default(),
            channel: ChannelSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
/// Backoff applied to fetches and winner requests.
pub struct RetrySettings {
    /// Wait after the first failed attempt.
    pub initial_delay_ms: u64,
    /// Cap for the doubling wait.
    pub max_delay_ms: u64,
    /// Total attempts including the first.
    pub max_attempts: u32,
    /// Randomise waits within their upper half.
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
            max_attempts: 6,
            jitter: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
/// Live channel reconnection settings.
pub struct ChannelSettings {
    /// First reconnection delay.
    pub reconnect_initial_ms: u64,
    /// Cap for the doubling reconnection delay.
    pub reconnect_max_ms: u64,
    /// Consecutive faults tolerated before the session reports a lost connection.
    pub fault_ceiling: u32,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            reconnect_initial_ms: 1_000,
            reconnect_max_ms: 10_000,
            fault_ceiling: 5,
        }
    }
}

impl SyncConfig {
    /// Load the configuration from disk, then apply environment overrides.
    ///
    /// A missing or invalid file falls back to the built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json_str(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), "loaded sync config");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.apply_overrides(|key| env::var(key).ok());
        config
    }

    /// Parse a JSON document; absent fields take their defaults.
    pub fn from_json_str(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url;
        }
        if let Some(url) = lookup(WS_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.ws_base_url = url;
        }
    }

    /// [`SyncConfig::request_timeout_ms`] as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Backoff policy for event service calls.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(self.fetch_retry.initial_delay_ms),
            max_delay: Duration::from_millis(self.fetch_retry.max_delay_ms),
            max_attempts: self.fetch_retry.max_attempts,
            jitter: self.fetch_retry.jitter,
        }
    }

    /// Options for a [`Synchronizer`](crate::services::synchronizer::Synchronizer).
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            retry: self.retry_policy(),
            fault_ceiling: self.channel.fault_ceiling,
        }
    }

    /// Settings for the REST event store.
    #[cfg(feature = "http-store")]
    pub fn http_config(&self) -> crate::dao::event_store::http::HttpConfig {
        crate::dao::event_store::http::HttpConfig::new(&self.api_base_url)
            .with_timeout(self.request_timeout())
    }

    /// Settings for the WebSocket channel.
    #[cfg(feature = "ws-channel")]
    pub fn channel_config(&self) -> crate::channel::websocket::ChannelConfig {
        crate::channel::websocket::ChannelConfig::new(&self.ws_base_url).with_backoff(
            Duration::from_millis(self.channel.reconnect_initial_ms),
            Duration::from_millis(self.channel.reconnect_max_ms),
        )
    }
}

/// Resolve the config file path using the environment override when present.
fn resolve_config_path() -> PathBuf {
    env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = SyncConfig::from_json_str(
            r#"{"api_base_url":"http://bracket.local/api","channel":{"fault_ceiling":2}}"#,
        )
        .unwrap();

        assert_eq!(config.api_base_url, "http://bracket.local/api");
        assert_eq!(config.ws_base_url, "ws://localhost:3000/ws");
        assert_eq!(config.channel.fault_ceiling, 2);
        assert_eq!(config.channel.reconnect_initial_ms, 1_000);
        assert_eq!(config.fetch_retry, RetrySettings::default());
    }

    #[test]
    fn env_overrides_urls_but_ignores_blank() {
        let mut config = SyncConfig::default();
        config.apply_overrides(|key| match key {
            API_URL_ENV => Some("https://events.example/api".into()),
            WS_URL_ENV => Some("  ".into()),
            _ => None,
        });

        assert_eq!(config.api_base_url, "https://events.example/api");
        assert_eq!(config.ws_base_url, "ws://localhost:3000/ws");
    }

    #[test]
    fn options_follow_settings() {
        let config = SyncConfig::default();
        let options = config.sync_options();
        assert_eq!(options.fault_ceiling, 5);
        assert_eq!(options.retry, RetryPolicy::default());
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }
}
