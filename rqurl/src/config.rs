//! Runtime configuration: data directory and the optional `config.yaml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const APP_NAME: &str = "rqurl";
/// Environment variable overriding the data directory.
pub const HOME_ENV_VAR: &str = "RQURL_HOME";
pub const DATABASE_FILE: &str = "data.db";
pub const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Whole-request timeout in seconds. Unset means no timeout.
    #[serde(default)]
    pub timeout_secs: Option<f64>,
    #[serde(default)]
    pub connect_timeout_secs: Option<f64>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Config {
    /// Read `config.yaml` from `data_dir`. A missing file yields the defaults.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)?;
        Self::parse(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    fn parse(text: &str) -> std::result::Result<Self, String> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(text).map_err(|e| e.to_string())?;
        config.timeout()?;
        config.connect_timeout()?;
        Ok(config)
    }

    pub fn timeout(&self) -> std::result::Result<Option<Duration>, String> {
        seconds("timeout_secs", self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> std::result::Result<Option<Duration>, String> {
        seconds("connect_timeout_secs", self.connect_timeout_secs)
    }

    #[must_use]
    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("{}/{}", APP_NAME, env!("CARGO_PKG_VERSION")))
    }
}

/// Negative, non-finite and out of range values are rejected.
fn seconds(field: &str, value: Option<f64>) -> std::result::Result<Option<Duration>, String> {
    value
        .map(|secs| {
            Duration::try_from_secs_f64(secs).map_err(|_| {
                format!(
                    "{} must be a non-negative number of seconds, got {}",
                    field, secs
                )
            })
        })
        .transpose()
}

/// Resolve the data directory: explicit override, then `RQURL_HOME`, then
/// `~/.rqurl`. The directory is created when missing.
pub fn data_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    let dir = match explicit.or_else(|| std::env::var_os(HOME_ENV_VAR).map(PathBuf::from)) {
        Some(dir) => dir,
        None => dirs::home_dir()
            .map(|home| home.join(format!(".{}", APP_NAME)))
            .ok_or_else(|| Error::Config("unable to locate the home directory".to_string()))?,
    };
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
        tracing::debug!(dir = %dir.display(), "created data directory");
    }
    Ok(dir)
}
