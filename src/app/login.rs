use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use url::Url;

use super::prompt::{prompt_password, prompt_select_index, prompt_username, TerminalPrompter};
use super::types::{LoginOutput, RoleOutput};
use crate::aws::{
    AssumeRoleRequest, CredentialExchange, CredentialsFile, ExchangeError, SamlAssertion,
    StsExchange,
};
use crate::config::Config;
use crate::credentials::PASSWORD_KEY;
use crate::models::{find_role, Account, Arn, Role};
use crate::saml::{Authenticated, Identity, LoginFlow, Prompter, Provider, SessionOptions};

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct LoginRequest {
    pub idp_id: Option<String>,
    pub sp_id: Option<String>,
    pub username: Option<String>,
    pub profile: Option<String>,
    pub role_arn: Option<Arn>,
    /// Identity provider origin; production Google when unset.
    pub origin: Option<Url>,
}

impl LoginRequest {
    pub fn provider(&self, config: &Config) -> Result<Provider> {
        let idp_id = self
            .idp_id
            .clone()
            .or_else(|| config.idp_id.clone())
            .context("No identity provider id: pass --idp-id or set idp_id in the config")?;
        let sp_id = self
            .sp_id
            .clone()
            .or_else(|| config.sp_id.clone())
            .context("No service provider id: pass --sp-id or set sp_id in the config")?;

        let provider = Provider::google(idp_id, sp_id);
        Ok(match &self.origin {
            Some(origin) => provider.with_origin(origin.clone()),
            None => provider,
        })
    }

    pub fn profile<'a>(&'a self, config: &'a Config) -> &'a str {
        self.profile.as_deref().unwrap_or(&config.profile)
    }

    pub fn role_arn<'a>(&'a self, config: &'a Config) -> Option<&'a Arn> {
        self.role_arn.as_ref().or(config.role_arn.as_ref())
    }
}

/// Username from the request or config, password from the configured secret
/// source; whatever is missing is prompted for.
pub async fn resolve_identity(config: &Config, request: &LoginRequest) -> Result<Identity> {
    let username = match request.username.as_ref().or(config.username.as_ref()) {
        Some(username) => username.clone(),
        None => prompt_username()?,
    };

    let password = match &config.password {
        Some(source_config) => {
            let source = source_config.build();
            match source.get(PASSWORD_KEY).await? {
                Some(password) => {
                    tracing::debug!(source = %source.describe(), "Password read from secret source");
                    password
                }
                None => {
                    tracing::warn!(source = %source.describe(), "Secret source has no password");
                    prompt_password()?
                }
            }
        }
        None => prompt_password()?,
    };

    Ok(Identity::new(username, password))
}

/// Sign in and return the assertion with the roles it grants.
pub async fn authenticate(
    config: &Config,
    request: &LoginRequest,
    identity: Identity,
    prompter: &dyn Prompter,
) -> Result<Authenticated> {
    let provider = request.provider(config)?;
    let options = SessionOptions {
        timeout: config.request_timeout,
        ..SessionOptions::default()
    };

    let mut flow = LoginFlow::new(provider, identity, &options)?;
    let authenticated = flow.login(prompter).await.map_err(|err| {
        let stage = err.stage();
        anyhow::Error::new(err).context(format!("Sign-in failed at stage {stage}"))
    })?;

    Ok(authenticated)
}

/// Pick the role to assume: the requested one, the only one, or ask.
pub fn choose_role<'a>(
    accounts: &'a [Account],
    wanted: Option<&Arn>,
) -> Result<(&'a Account, &'a Role)> {
    if let Some(arn) = wanted {
        return find_role(accounts, arn)
            .with_context(|| format!("Role {arn} is not offered to this user"));
    }

    let rows: Vec<(&Account, &Role)> = accounts
        .iter()
        .flat_map(|account| account.roles.iter().map(move |role| (account, role)))
        .collect();
    match rows.as_slice() {
        [] => anyhow::bail!("No roles to choose from"),
        [only] => Ok(*only),
        _ => {
            let labels: Vec<String> = rows
                .iter()
                .map(|(account, role)| RoleOutput::new(account, role).label())
                .collect();
            let index = prompt_select_index("Role to assume", &labels)?
                .context("No role selected")?;
            Ok(rows[index])
        }
    }
}

/// Exchange the assertion for `role` and store the result under `profile`.
///
/// The provider ARN comes from the config when set, otherwise from the
/// assertion's role pairs. The requested lifetime comes from the config,
/// otherwise from the assertion's `SessionDuration`.
pub async fn exchange_and_save(
    config: &Config,
    assertion: &str,
    account: &Account,
    role: &Role,
    profile: &str,
    exchange: &dyn CredentialExchange,
    file: &CredentialsFile,
) -> Result<LoginOutput> {
    let decoded = SamlAssertion::decode(assertion).context("Failed to decode SAML assertion")?;

    let principal_arn = match &config.principal_arn {
        Some(arn) => arn.clone(),
        None => decoded
            .principal_for(&role.arn)
            .ok_or_else(|| ExchangeError::MissingPrincipal(role.arn.clone()))?,
    };

    let duration_seconds = match config.session_duration_secs()? {
        Some(secs) => Some(secs),
        None => decoded
            .session_duration()
            .and_then(|secs| i32::try_from(secs).ok()),
    };

    let request = AssumeRoleRequest {
        principal_arn,
        role_arn: role.arn.clone(),
        assertion: assertion.to_string(),
        duration_seconds,
    };
    let credentials = exchange
        .assume_role(&request)
        .await
        .with_context(|| format!("Failed to assume {}", role.arn))?;

    file.save(profile, &credentials)?;

    Ok(LoginOutput {
        profile: profile.to_string(),
        account: account.name.clone(),
        role_arn: role.arn.to_string(),
        credentials_file: file.path().display().to_string(),
        expiration: credentials.expiration.map(|t| t.to_rfc3339()),
    })
}

/// Credentials file from the config (relative to its directory) or the AWS
/// default location.
pub fn credentials_file(config: &Config, config_dir: &Path) -> Result<CredentialsFile> {
    let path: PathBuf = match config.resolve_credentials_file(config_dir) {
        Some(path) => path,
        None => CredentialsFile::default_path()?,
    };
    Ok(CredentialsFile::new(path))
}

/// Full interactive login: sign in, pick a role, write the profile.
pub async fn login(
    config: &Config,
    config_dir: &Path,
    request: &LoginRequest,
) -> Result<LoginOutput> {
    let identity = resolve_identity(config, request).await?;
    let authenticated = authenticate(config, request, identity, &TerminalPrompter).await?;
    let (account, role) = choose_role(&authenticated.accounts, request.role_arn(config))?;

    let exchange = StsExchange::new(config.region.clone());
    let file = credentials_file(config, config_dir)?;
    exchange_and_save(
        config,
        &authenticated.assertion,
        account,
        role,
        request.profile(config),
        &exchange,
        &file,
    )
    .await
}

/// Sign in and list the roles without assuming any.
pub async fn list_roles(config: &Config, request: &LoginRequest) -> Result<Vec<RoleOutput>> {
    let identity = resolve_identity(config, request).await?;
    let authenticated = authenticate(config, request, identity, &TerminalPrompter).await?;
    Ok(RoleOutput::from_accounts(&authenticated.accounts))
}
