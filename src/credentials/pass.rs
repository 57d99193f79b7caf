//! Password-store (pass) backend.
//!
//! The first line of an entry is the password; later lines may hold extra
//! fields as `name: value`.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use super::{SecretSource, PASSWORD_KEY};

fn default_program() -> String {
    "pass".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassConfig {
    /// Entry path, e.g. `google/work`.
    pub path: String,

    /// Logical key -> field name in the entry. Unmapped keys are looked up
    /// under their own name.
    #[serde(default)]
    pub fields: HashMap<String, String>,

    /// Executable to run; `pass` unless overridden.
    #[serde(default = "default_program")]
    pub program: String,
}

impl PassConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            fields: HashMap::new(),
            program: default_program(),
        }
    }
}

pub struct PassSecretSource {
    config: PassConfig,
}

impl PassSecretSource {
    pub fn new(config: PassConfig) -> Self {
        Self { config }
    }

    fn field_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.config
            .fields
            .get(key)
            .map(|s| s.as_str())
            .unwrap_or(key)
    }

    async fn read_entry(&self) -> Result<PassEntry> {
        let output = Command::new(&self.config.program)
            .arg("show")
            .arg(&self.config.path)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.config.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "{} show {} failed: {}",
                self.config.program,
                self.config.path,
                stderr.trim()
            );
        }

        let content = String::from_utf8(output.stdout).context("Invalid UTF-8 in pass output")?;
        Ok(PassEntry::parse(&content))
    }
}

#[async_trait]
impl SecretSource for PassSecretSource {
    async fn get(&self, key: &str) -> Result<Option<SecretString>> {
        let field = self.field_name(key);
        let entry = self.read_entry().await?;
        Ok(entry.get(field).map(|v| SecretString::from(v.to_string())))
    }

    fn describe(&self) -> String {
        format!("pass:{}", self.config.path)
    }
}

#[derive(Debug, Default)]
struct PassEntry {
    password: Option<String>,
    fields: HashMap<String, String>,
}

impl PassEntry {
    fn parse(content: &str) -> Self {
        let mut lines = content.lines();
        let password = lines
            .next()
            .filter(|line| !line.is_empty())
            .map(str::to_string);

        let fields = lines
            .filter_map(|line| line.split_once(": "))
            .map(|(key, value)| (key.trim().to_string(), value.to_string()))
            .collect();

        Self { password, fields }
    }

    /// An explicit `password:` field wins over the first line.
    fn get(&self, field: &str) -> Option<&str> {
        match self.fields.get(field) {
            Some(value) => Some(value),
            None if field == PASSWORD_KEY => self.password.as_deref(),
            None => None,
        }
    }
}
