use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::aws::sts::DEFAULT_REGION;
use crate::credentials::SecretConfig;
use crate::duration::{
    deserialize_duration, deserialize_duration_opt, serialize_duration, serialize_duration_opt,
};
use crate::models::Arn;

const CONFIG_FILE_NAME: &str = "gsaml.toml";

fn default_profile() -> String {
    "default".to_string()
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

/// Default HTTP timeout for each request to the identity provider (30 seconds).
fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Application configuration.
///
/// Every value can be overridden on the command line; the file only supplies
/// defaults so that a plain `gsaml login` works.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Google identity provider id (`idpid`).
    pub idp_id: Option<String>,

    /// Google service provider id (`spid`).
    pub sp_id: Option<String>,

    /// Account email. Prompted for when unset.
    pub username: Option<String>,

    /// Profile written in the shared credentials file.
    #[serde(default = "default_profile")]
    pub profile: String,

    /// Region of the STS endpoint.
    #[serde(default = "default_region")]
    pub region: String,

    /// Role to assume without asking.
    pub role_arn: Option<Arn>,

    /// SAML provider ARN. Taken from the assertion when unset.
    pub principal_arn: Option<Arn>,

    /// Requested credential lifetime. The provider's `SessionDuration`
    /// attribute is used when unset.
    #[serde(
        default,
        deserialize_with = "deserialize_duration_opt",
        serialize_with = "serialize_duration_opt"
    )]
    pub session_duration: Option<Duration>,

    #[serde(
        default = "default_request_timeout",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub request_timeout: Duration,

    /// Shared credentials file. Defaults to `~/.aws/credentials`.
    pub credentials_file: Option<PathBuf>,

    /// Where to read the password from instead of prompting.
    pub password: Option<SecretConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            idp_id: None,
            sp_id: None,
            username: None,
            profile: default_profile(),
            region: default_region(),
            role_arn: None,
            principal_arn: None,
            session_duration: None,
            request_timeout: default_request_timeout(),
            credentials_file: None,
            password: None,
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// `session_duration` in whole seconds, as STS expects it.
    pub fn session_duration_secs(&self) -> Result<Option<i32>> {
        self.session_duration
            .map(|d| {
                i32::try_from(d.as_secs()).context("session_duration is too large for STS")
            })
            .transpose()
    }

    /// Resolve `credentials_file` against the config file's directory.
    pub fn resolve_credentials_file(&self, config_dir: &Path) -> Option<PathBuf> {
        match &self.credentials_file {
            Some(path) if path.is_absolute() => Some(path.clone()),
            Some(path) => Some(config_dir.join(path)),
            None => None,
        }
    }
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./gsaml.toml` if it exists in current directory
/// 2. `gsaml/gsaml.toml` under the platform config directory
///    (`~/.config` on Linux)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from(CONFIG_FILE_NAME);
    if local_config.exists() {
        return local_config;
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("gsaml").join(CONFIG_FILE_NAME);
    }

    local_config
}
