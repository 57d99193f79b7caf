//! Non-interactive secret lookup.
//!
//! The login password can come from a password store or the environment
//! instead of a prompt. The `[password]` table of `gsaml.toml` picks the
//! backend:
//!
//! ```toml
//! [password]
//! backend = "pass"
//! path = "google/work"
//! ```

mod config;
mod env;
mod pass;

pub use config::SecretConfig;
pub use env::{EnvConfig, EnvSecretSource};
pub use pass::{PassConfig, PassSecretSource};

use anyhow::Result;
use async_trait::async_trait;
use secrecy::SecretString;

/// Logical key of the login password.
pub const PASSWORD_KEY: &str = "password";

/// Read-only lookup of secrets by logical key.
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Returns `Ok(None)` if the backend has no value for `key`, and `Err`
    /// only when the backend itself could not be read.
    async fn get(&self, key: &str) -> Result<Option<SecretString>>;

    /// Short human-readable description for log lines.
    fn describe(&self) -> String;
}
