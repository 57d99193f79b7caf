use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid ARN {value:?}: {reason}")]
pub struct ArnError {
    value: String,
    reason: &'static str,
}

/// A parsed Amazon Resource Name.
///
/// Layout: `arn:partition:service:region:account-id:resource`. Region and
/// account may be empty (IAM ARNs have no region); everything else must be
/// present. The resource part keeps any further `:` or `/` separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Arn {
    pub partition: String,
    pub service: String,
    pub region: String,
    pub account_id: String,
    pub resource: String,
}

impl Arn {
    pub fn parse(value: &str) -> Result<Self, ArnError> {
        let err = |reason| ArnError {
            value: value.to_string(),
            reason,
        };

        let mut parts = value.trim().splitn(6, ':');
        if parts.next() != Some("arn") {
            return Err(err("must start with \"arn:\""));
        }

        let (Some(partition), Some(service), Some(region), Some(account_id), Some(resource)) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(err("expected six ':'-separated sections"));
        };

        if partition.is_empty() {
            return Err(err("partition is empty"));
        }
        if service.is_empty() {
            return Err(err("service is empty"));
        }
        if resource.is_empty() {
            return Err(err("resource is empty"));
        }

        Ok(Self {
            partition: partition.to_string(),
            service: service.to_string(),
            region: region.to_string(),
            account_id: account_id.to_string(),
            resource: resource.to_string(),
        })
    }

    /// Trailing name of the resource (`role/path/Admin` -> `Admin`).
    pub fn resource_name(&self) -> &str {
        self.resource
            .rsplit(['/', ':'])
            .next()
            .unwrap_or(&self.resource)
    }

    /// True for `arn:*:iam::*:role/...`.
    pub fn is_role(&self) -> bool {
        self.service == "iam" && self.resource.starts_with("role/")
    }

    /// True for `arn:*:iam::*:saml-provider/...`.
    pub fn is_saml_provider(&self) -> bool {
        self.service == "iam" && self.resource.starts_with("saml-provider/")
    }
}

impl FromStr for Arn {
    type Err = ArnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Arn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arn:{}:{}:{}:{}:{}",
            self.partition, self.service, self.region, self.account_id, self.resource
        )
    }
}

impl Serialize for Arn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Arn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Arn::parse(&s).map_err(serde::de::Error::custom)
    }
}
