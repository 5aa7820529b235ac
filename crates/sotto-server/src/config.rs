//! Server configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the sotto server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `6000`).
    pub port: u16,
    /// Directory holding the model artifacts.
    pub model_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 6000,
            model_dir: sotto_transcription::model::default_model_dir(),
        }
    }
}

impl ServerConfig {
    /// Defaults with environment overrides applied.
    ///
    /// `SOTTO_HOST` and `SOTTO_PORT` override the bind address; the model
    /// directory already honors `CACHE_DIR` through
    /// [`sotto_transcription::model::default_model_dir`]. Invalid values are
    /// silently ignored so a typo falls back to the default instead of
    /// crashing the server.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = read_env_string("SOTTO_HOST") {
            cfg.host = v;
        }
        if let Some(v) = read_env_u16("SOTTO_PORT", 1, 65535) {
            cfg.port = v;
        }
        cfg
    }
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn read_env_u16(name: &str, min: u16, max: u16) -> Option<u16> {
    parse_u16(&std::env::var(name).ok()?, min, max)
}

fn parse_u16(value: &str, min: u16, max: u16) -> Option<u16> {
    let v: u16 = value.trim().parse().ok()?;
    (min..=max).contains(&v).then_some(v)
}
