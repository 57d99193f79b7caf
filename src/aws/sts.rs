//! Federation exchange: SAML assertion -> temporary AWS credentials.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sts::error::DisplayErrorContext;
use aws_sdk_sts::Client as StsClient;
use chrono::{DateTime, Utc};
use secrecy::SecretString;

use super::TemporaryCredentials;
use crate::models::Arn;

pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// The federation service refused the assertion/role pairing. The
    /// message is the service's own.
    #[error("AssumeRoleWithSAML was rejected: {0}")]
    Rejected(String),

    #[error("AssumeRoleWithSAML returned no credentials")]
    MissingCredentials,

    #[error("no SAML provider is paired with role {0} in the assertion")]
    MissingPrincipal(Arn),
}

/// Everything `AssumeRoleWithSAML` needs.
#[derive(Debug, Clone)]
pub struct AssumeRoleRequest {
    pub principal_arn: Arn,
    pub role_arn: Arn,
    pub assertion: String,
    pub duration_seconds: Option<i32>,
}

/// Turns an assertion into temporary credentials.
#[async_trait]
pub trait CredentialExchange: Send + Sync {
    async fn assume_role(
        &self,
        request: &AssumeRoleRequest,
    ) -> Result<TemporaryCredentials, ExchangeError>;
}

/// [`CredentialExchange`] backed by AWS STS.
///
/// `AssumeRoleWithSAML` is an unsigned call, so no local AWS credentials are
/// loaded.
pub struct StsExchange {
    region: String,
}

impl StsExchange {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }

    async fn client(&self) -> StsClient {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .no_credentials()
            .load()
            .await;
        StsClient::new(&config)
    }
}

impl Default for StsExchange {
    fn default() -> Self {
        Self::new(DEFAULT_REGION)
    }
}

#[async_trait]
impl CredentialExchange for StsExchange {
    async fn assume_role(
        &self,
        request: &AssumeRoleRequest,
    ) -> Result<TemporaryCredentials, ExchangeError> {
        tracing::info!(
            role_arn = %request.role_arn,
            principal_arn = %request.principal_arn,
            region = %self.region,
            "Calling STS AssumeRoleWithSAML"
        );

        let response = self
            .client()
            .await
            .assume_role_with_saml()
            .role_arn(request.role_arn.to_string())
            .principal_arn(request.principal_arn.to_string())
            .saml_assertion(&request.assertion)
            .set_duration_seconds(request.duration_seconds)
            .send()
            .await
            .map_err(|err| ExchangeError::Rejected(DisplayErrorContext(&err).to_string()))?;

        let creds = response
            .credentials()
            .ok_or(ExchangeError::MissingCredentials)?;
        let expiration = DateTime::<Utc>::from_timestamp(
            creds.expiration().secs(),
            creds.expiration().subsec_nanos(),
        );

        Ok(TemporaryCredentials {
            access_key_id: creds.access_key_id().to_string(),
            secret_access_key: SecretString::from(creds.secret_access_key().to_string()),
            session_token: SecretString::from(creds.session_token().to_string()),
            expiration,
        })
    }
}
