//! Environment variable backend.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use super::SecretSource;

fn default_prefix() -> String {
    "GSAML_".to_string()
}

/// Keys map to `<prefix><KEY>` (`password` -> `GSAML_PASSWORD`) unless
/// `vars` names the variable explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,

    #[serde(default)]
    pub vars: HashMap<String, String>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            vars: HashMap::new(),
        }
    }
}

pub struct EnvSecretSource {
    config: EnvConfig,
}

impl EnvSecretSource {
    pub fn new(config: EnvConfig) -> Self {
        Self { config }
    }

    fn var_name(&self, key: &str) -> String {
        match self.config.vars.get(key) {
            Some(var) => var.clone(),
            None => format!("{}{}", self.config.prefix, key.to_uppercase()),
        }
    }
}

#[async_trait]
impl SecretSource for EnvSecretSource {
    async fn get(&self, key: &str) -> Result<Option<SecretString>> {
        let var = self.var_name(key);
        match std::env::var(&var) {
            Ok(value) if !value.is_empty() => Ok(Some(SecretString::from(value))),
            Ok(_) | Err(std::env::VarError::NotPresent) => Ok(None),
            Err(err @ std::env::VarError::NotUnicode(_)) => {
                Err(anyhow::Error::new(err).context(format!("Failed to read ${var}")))
            }
        }
    }

    fn describe(&self) -> String {
        format!("env:{}", self.var_name(super::PASSWORD_KEY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_var_names() {
        let mut config = EnvConfig::default();
        config
            .vars
            .insert("otp".to_string(), "WORK_TOTP".to_string());
        let source = EnvSecretSource::new(config);

        assert_eq!(source.var_name("password"), "GSAML_PASSWORD");
        assert_eq!(source.var_name("otp"), "WORK_TOTP");
        assert_eq!(source.describe(), "env:GSAML_PASSWORD");
    }

    #[tokio::test]
    async fn test_reads_set_variable() -> Result<()> {
        std::env::set_var("GSAML_TEST_ENV_SOURCE_PASSWORD", "from-env");
        std::env::set_var("GSAML_TEST_ENV_SOURCE_EMPTY", "");
        let source = EnvSecretSource::new(EnvConfig {
            prefix: "GSAML_TEST_ENV_SOURCE_".to_string(),
            vars: HashMap::new(),
        });

        let password = source.get("password").await?.expect("password");
        assert_eq!(password.expose_secret(), "from-env");
        assert!(source.get("empty").await?.is_none());
        assert!(source.get("unset").await?.is_none());
        Ok(())
    }
}
