use serde::{Deserialize, Serialize};

use super::Arn;

/// A role offered by the AWS sign-in page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Label shown next to the role's radio button.
    pub name: String,
    pub arn: Arn,
}

impl Role {
    pub fn new(name: impl Into<String>, arn: Arn) -> Self {
        Self {
            name: name.into(),
            arn,
        }
    }
}

/// An AWS account grouping from the sign-in page, with its roles in page order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl Account {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.push(role);
        self
    }

    /// Account id taken from the first role's ARN.
    ///
    /// The page only carries the id inside the account label text, so the
    /// role ARNs are the reliable source.
    pub fn account_id(&self) -> Option<&str> {
        self.roles
            .first()
            .map(|r| r.arn.account_id.as_str())
            .filter(|id| !id.is_empty())
    }
}

/// Find a role by ARN across a listing.
pub fn find_role<'a>(accounts: &'a [Account], arn: &Arn) -> Option<(&'a Account, &'a Role)> {
    accounts.iter().find_map(|account| {
        account
            .roles
            .iter()
            .find(|role| &role.arn == arn)
            .map(|role| (account, role))
    })
}
