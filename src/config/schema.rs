use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

use super::ConfigError;
use crate::metrics::{RecorderKind, RouteKey};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub log: LogSection,

    #[serde(default)]
    pub auth: AuthSection,

    #[serde(default)]
    pub events: EventsSection,

    #[serde(default)]
    pub monitor: MonitorSection,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.log.validate()?;
        self.auth.validate()?;
        self.monitor.validate()?;
        Ok(())
    }
}

// ─── server ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default)]
    pub mode: RunMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Debug,
    #[default]
    Release,
    Test,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
            Self::Test => "test",
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            mode: RunMode::default(),
        }
    }
}

impl ServerSection {
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("server.listen '{}' is not a socket address", self.listen)))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr().map(|_| ())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}

// ─── log ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    /// Filter directive; `RUST_LOG` wins when set.
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Also write logs to this file (appended, non-blocking).
    #[serde(default)]
    pub file: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

impl LogSection {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.level.trim().is_empty() {
            return Err(ConfigError::Invalid("log.level must not be empty".into()));
        }
        Ok(())
    }
}

fn default_level() -> String {
    "info".into()
}

// ─── auth ────────────────────────────────────────────────────────

/// Static bearer token check. Not a real token protocol.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthSection {
    #[serde(default = "default_token")]
    pub token: String,

    /// Identity attached to requests that present the token.
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            token: default_token(),
            user_id: default_user_id(),
        }
    }
}

impl AuthSection {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.token.is_empty() || self.token.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid(
                "auth.token must be non-empty and contain no whitespace".into(),
            ));
        }
        Ok(())
    }
}

fn default_token() -> String {
    "dummy-jwt-token".into()
}
fn default_user_id() -> String {
    "1".into()
}

// ─── events ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventsSection {
    /// Paths that never emit lifecycle events.
    #[serde(default = "default_exempt_paths")]
    pub exempt_paths: Vec<String>,

    #[serde(default = "default_slow_request_ms")]
    pub slow_request_ms: u64,
}

impl Default for EventsSection {
    fn default() -> Self {
        Self {
            exempt_paths: default_exempt_paths(),
            slow_request_ms: default_slow_request_ms(),
        }
    }
}

impl EventsSection {
    pub fn slow_request(&self) -> Duration {
        Duration::from_millis(self.slow_request_ms)
    }
}

fn default_exempt_paths() -> Vec<String> {
    vec!["/health".into(), "/metrics".into()]
}
fn default_slow_request_ms() -> u64 {
    500
}

// ─── monitor ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorSection {
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,

    #[serde(default)]
    pub sample_recorder: RecorderKind,

    /// Bucket per-route stats by raw path (default) or matched pattern.
    #[serde(default)]
    pub route_key: RouteKey,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            report_interval_secs: default_report_interval_secs(),
            sample_recorder: RecorderKind::default(),
            route_key: RouteKey::default(),
        }
    }
}

impl MonitorSection {
    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=86_400).contains(&self.report_interval_secs) {
            return Err(ConfigError::Invalid(
                "monitor.report_interval_secs must be between 1 and 86400".into(),
            ));
        }
        Ok(())
    }
}

fn default_report_interval_secs() -> u64 {
    60
}
