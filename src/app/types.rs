use serde::Serialize;

use crate::models::{Account, Role};

/// JSON output for a successful login.
#[derive(Debug, Serialize)]
pub struct LoginOutput {
    pub profile: String,
    pub account: String,
    pub role_arn: String,
    pub credentials_file: String,
    pub expiration: Option<String>,
}

/// JSON output for one assumable role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleOutput {
    pub account: String,
    pub account_id: Option<String>,
    pub role: String,
    pub arn: String,
}

impl RoleOutput {
    pub fn new(account: &Account, role: &Role) -> Self {
        Self {
            account: account.name.clone(),
            account_id: Some(role.arn.account_id.clone()).filter(|id| !id.is_empty()),
            role: role.name.clone(),
            arn: role.arn.to_string(),
        }
    }

    /// Flatten accounts into one row per role, keeping page order.
    pub fn from_accounts(accounts: &[Account]) -> Vec<Self> {
        accounts
            .iter()
            .flat_map(|account| account.roles.iter().map(move |role| Self::new(account, role)))
            .collect()
    }

    /// Label used in the interactive role picker.
    pub fn label(&self) -> String {
        format!("{} / {}", self.account, self.role)
    }
}

/// JSON output for `gsaml config`.
#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    pub config_file: String,
    pub config_file_exists: bool,
    pub idp_id: Option<String>,
    pub sp_id: Option<String>,
    pub username: Option<String>,
    pub profile: String,
    pub region: String,
    pub role_arn: Option<String>,
    pub principal_arn: Option<String>,
    pub session_duration: Option<String>,
    pub request_timeout: String,
    pub credentials_file: String,
    pub password_source: Option<String>,
}
