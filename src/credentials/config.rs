use serde::{Deserialize, Serialize};

use super::env::{EnvConfig, EnvSecretSource};
use super::pass::{PassConfig, PassSecretSource};
use super::SecretSource;

/// Which backend a secret comes from.
///
/// ```toml
/// backend = "pass"
/// path = "google/work"
///
/// [fields]
/// password = "google-password"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum SecretConfig {
    Pass {
        #[serde(flatten)]
        config: PassConfig,
    },
    Env {
        #[serde(flatten)]
        config: EnvConfig,
    },
}

impl SecretConfig {
    pub fn build(&self) -> Box<dyn SecretSource> {
        match self {
            SecretConfig::Pass { config } => Box::new(PassSecretSource::new(config.clone())),
            SecretConfig::Env { config } => Box::new(EnvSecretSource::new(config.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_parse_pass_config() -> Result<()> {
        let config: SecretConfig = toml::from_str(
            r#"
backend = "pass"
path = "google/work"

[fields]
password = "google-password"
"#,
        )?;

        match &config {
            SecretConfig::Pass { config } => {
                assert_eq!(config.path, "google/work");
                assert_eq!(config.program, "pass");
                assert_eq!(
                    config.fields.get("password"),
                    Some(&"google-password".to_string())
                );
            }
            other => panic!("unexpected backend: {other:?}"),
        }
        assert_eq!(config.build().describe(), "pass:google/work");

        Ok(())
    }

    #[test]
    fn test_parse_minimal_env_config() -> Result<()> {
        let config: SecretConfig = toml::from_str("backend = \"env\"\n")?;

        match &config {
            SecretConfig::Env { config } => {
                assert_eq!(config.prefix, "GSAML_");
                assert!(config.vars.is_empty());
            }
            other => panic!("unexpected backend: {other:?}"),
        }
        assert_eq!(config.build().describe(), "env:GSAML_PASSWORD");

        Ok(())
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        assert!(toml::from_str::<SecretConfig>("backend = \"vault\"\n").is_err());
    }
}
