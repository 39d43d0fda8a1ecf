//! Service config loader (strict parsing, defaults for everything).

pub mod schema;

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use thiserror::Error;

pub use schema::{
    AuthSection, Config, EventsSection, LogFormat, LogSection, MonitorSection, RunMode,
    ServerSection,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid yaml: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Load `path`, falling back to defaults when the file does not exist.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(s) => load_from_str(&s),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Ok(Config::default())
        }
        Err(e) => Err(e.into()),
    }
}

pub fn load_from_str(s: &str) -> Result<Config, ConfigError> {
    // An empty document parses as unit, not as an empty mapping
    if s.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config = serde_yaml::from_str(s)?;
    cfg.validate()?;
    Ok(cfg)
}
