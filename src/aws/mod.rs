//! AWS side of the login: assertion inspection, the STS exchange and the
//! shared credentials file.

pub mod assertion;
pub mod profile;
pub mod sts;

use std::fmt;

use chrono::{DateTime, Utc};
use secrecy::SecretString;

pub use assertion::{AssertionError, RolePair, SamlAssertion};
pub use profile::CredentialsFile;
pub use sts::{AssumeRoleRequest, CredentialExchange, ExchangeError, StsExchange};

/// Temporary credentials returned by the federation exchange.
#[derive(Clone)]
pub struct TemporaryCredentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
    pub session_token: SecretString,
    pub expiration: Option<DateTime<Utc>>,
}

impl fmt::Debug for TemporaryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporaryCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("session_token", &"[REDACTED]")
            .field("expiration", &self.expiration)
            .finish()
    }
}
