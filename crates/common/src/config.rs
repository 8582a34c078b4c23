use std::time::Duration;

use crate::{Error, Result};

/// Where the upstream notifications come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifySource {
    /// JSON-over-WebSocket endpoint.
    WebSocket(String),
    /// JSON-lines file replayed once.
    Replay(String),
}

/// Process settings loaded from environment variables at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bot definitions file path.
    pub bots_config_path: String,

    pub notify_source: NotifySource,

    /// Capacity of the channel between the transport and the dispatcher.
    pub event_buffer: usize,
    /// Capacity of the per-bot telemetry broadcast.
    pub telemetry_buffer: usize,

    /// Handler calls slower than this are reported on the per-bot log.
    pub slow_handler_threshold: Duration,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let notify_source = match (lookup("NOTIFY_URL"), lookup("NOTIFY_REPLAY_PATH")) {
            (Some(url), None) => NotifySource::WebSocket(url),
            (None, Some(path)) => NotifySource::Replay(path),
            (Some(_), Some(_)) => {
                return Err(Error::Config(
                    "set only one of NOTIFY_URL and NOTIFY_REPLAY_PATH".into(),
                ))
            }
            (None, None) => {
                return Err(Error::Config(
                    "one of NOTIFY_URL or NOTIFY_REPLAY_PATH must be set".into(),
                ))
            }
        };

        Ok(Config {
            bots_config_path: lookup("BOTS_CONFIG_PATH")
                .unwrap_or_else(|| "config/bots.toml".to_string()),
            notify_source,
            event_buffer: parse_or(&lookup, "EVENT_BUFFER", 1024)?,
            telemetry_buffer: parse_or(&lookup, "TELEMETRY_BUFFER", 1024)?,
            slow_handler_threshold: Duration::from_millis(parse_or(
                &lookup,
                "SLOW_HANDLER_MS",
                500,
            )?),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} must be a number, got '{raw}'"))),
        None => Ok(default),
    }
}
