//! Drives the sign-in sequence over a [`Session`].

use url::Url;

use super::error::FlowError;
use super::extract::CaptchaChallenge;
use super::session::{Session, SessionOptions};
use super::state::{FlowState, Identity, Stage, Submission};
use crate::models::Account;

/// Production identity provider origin.
pub const GOOGLE_ORIGIN: &str = "https://accounts.google.com";

/// The two static identifiers that select the SAML app, plus the origin
/// they live under.
#[derive(Debug, Clone)]
pub struct Provider {
    pub origin: Url,
    pub idp_id: String,
    pub sp_id: String,
}

impl Provider {
    pub fn google(idp_id: impl Into<String>, sp_id: impl Into<String>) -> Self {
        Self {
            origin: Url::parse(GOOGLE_ORIGIN).expect("static origin is a valid URL"),
            idp_id: idp_id.into(),
            sp_id: sp_id.into(),
        }
    }

    /// Point at a different origin (used against local mock servers).
    pub fn with_origin(mut self, origin: Url) -> Self {
        self.origin = origin;
        self
    }

    /// Single sign-on initiation URL.
    pub fn init_sso_url(&self) -> Result<Url, url::ParseError> {
        let mut url = self.origin.join("/o/saml2/initsso")?;
        url.query_pairs_mut()
            .append_pair("idpid", &self.idp_id)
            .append_pair("spid", &self.sp_id)
            .append_pair("forceauthn", "false");
        Ok(url)
    }
}

/// What the provider wants after the password (or a CAPTCHA answer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordOutcome {
    /// Solve this image and call [`LoginFlow::submit_captcha`].
    Captcha(CaptchaPrompt),
    /// Call [`LoginFlow::submit_mfa`] with a one-time code.
    MfaRequired,
}

/// CAPTCHA as shown to a human.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaPrompt {
    /// Image URL resolved against the provider origin.
    pub image_url: String,
    pub challenge: CaptchaChallenge,
}

/// Answers the questions a login can ask along the way.
pub trait Prompter: Send + Sync {
    fn captcha_solution(&self, prompt: &CaptchaPrompt) -> std::io::Result<String>;
    fn one_time_code(&self) -> std::io::Result<String>;
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct Authenticated {
    /// Base64 SAML assertion for the federation exchange.
    pub assertion: String,
    pub accounts: Vec<Account>,
}

/// One login attempt: owns its session and its state.
///
/// Steps must be called in order. Any failure leaves the flow in
/// [`Stage::Failed`]; start again with a new `LoginFlow`.
pub struct LoginFlow {
    provider: Provider,
    session: Session,
    state: FlowState,
    failure: Option<String>,
}

impl LoginFlow {
    pub fn new(
        provider: Provider,
        identity: Identity,
        options: &SessionOptions,
    ) -> Result<Self, FlowError> {
        let session = Session::new(provider.origin.clone(), options)?;
        Ok(Self {
            provider,
            session,
            state: FlowState::new(identity),
            failure: None,
        })
    }

    pub fn stage(&self) -> Stage {
        self.state.stage()
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    /// Why the flow failed, if it did.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn assertion(&self) -> Option<&str> {
        self.state.assertion()
    }

    /// Init -> FormFetched.
    pub async fn fetch_login_form(&mut self) -> Result<(), FlowError> {
        let result = self.fetch_login_form_inner().await;
        self.settle(result)
    }

    async fn fetch_login_form_inner(&self) -> Result<FlowState, FlowError> {
        self.state.ensure("fetch login form", &[Stage::Init])?;
        let url = self.provider.init_sso_url().map_err(|err| {
            FlowError::protocol(self.stage(), format!("invalid sign-on URL: {err}"))
        })?;
        let body = self.session.get(&url, self.stage()).await?;
        self.state.on_login_form(&body)
    }

    /// FormFetched -> EmailSubmitted.
    pub async fn submit_email(&mut self) -> Result<(), FlowError> {
        let result = self.submit_email_inner().await;
        self.settle(result)
    }

    async fn submit_email_inner(&self) -> Result<FlowState, FlowError> {
        let submission = self.state.email_submission()?;
        let body = self.post(&submission).await?;
        self.state.on_email_response(&body)
    }

    /// EmailSubmitted -> PasswordSubmitted, then straight on to either
    /// ChallengeRequired or MfaRequired.
    pub async fn submit_password(&mut self) -> Result<PasswordOutcome, FlowError> {
        let result = self.submit_password_inner().await;
        self.settle(result)?;
        Ok(self.outcome())
    }

    async fn submit_password_inner(&self) -> Result<FlowState, FlowError> {
        let submission = self.state.password_submission()?;
        let body = self.post(&submission).await?;
        self.state.on_password_response(&body)?.branch()
    }

    /// ChallengeRequired -> ChallengeResolved, or ChallengeRequired again if
    /// the provider wants another CAPTCHA.
    pub async fn submit_captcha(&mut self, solution: &str) -> Result<PasswordOutcome, FlowError> {
        let result = self.submit_captcha_inner(solution).await;
        self.settle(result)?;
        Ok(self.outcome())
    }

    async fn submit_captcha_inner(&self, solution: &str) -> Result<FlowState, FlowError> {
        let submission = self.state.captcha_submission(solution)?;
        let body = self.post(&submission).await?;
        self.state.on_captcha_response(&body)
    }

    /// MfaRequired | ChallengeResolved -> Authenticated.
    pub async fn submit_mfa(&mut self, code: &str) -> Result<(), FlowError> {
        let result = self.submit_mfa_inner(code).await;
        self.settle(result)
    }

    async fn submit_mfa_inner(&self, code: &str) -> Result<FlowState, FlowError> {
        let submission = self.state.mfa_submission(code)?;
        let body = self.post(&submission).await?;
        self.state.on_mfa_response(&body)
    }

    /// Authenticated -> RolesListed. An empty listing is not an error.
    pub async fn list_roles(&mut self) -> Result<Vec<Account>, FlowError> {
        let (next, accounts) = match self.list_roles_inner().await {
            Ok(listed) => listed,
            Err(err) => return Err(self.reject(err)),
        };
        self.settle(Ok(next))?;
        Ok(accounts)
    }

    async fn list_roles_inner(&self) -> Result<(FlowState, Vec<Account>), FlowError> {
        let submission = self.state.assertion_submission()?;
        let body = self.post(&submission).await?;
        self.state.on_roles_response(&body)
    }

    /// Run every step, asking `prompter` for CAPTCHA answers and the
    /// one-time code.
    pub async fn login(&mut self, prompter: &dyn Prompter) -> Result<Authenticated, FlowError> {
        self.fetch_login_form().await?;
        self.submit_email().await?;

        let mut outcome = self.submit_password().await?;
        while let PasswordOutcome::Captcha(prompt) = outcome {
            tracing::info!(image_url = %prompt.image_url, "Provider requested a CAPTCHA");
            let solution = self.ask(|| prompter.captcha_solution(&prompt))?;
            outcome = self.submit_captcha(solution.trim()).await?;
        }

        let code = self.ask(|| prompter.one_time_code())?;
        self.submit_mfa(code.trim()).await?;

        let accounts = self.list_roles().await?;
        let assertion = self.assertion().unwrap_or_default().to_string();
        tracing::info!(accounts = accounts.len(), "Signed in");

        Ok(Authenticated {
            assertion,
            accounts,
        })
    }

    fn ask(&mut self, f: impl FnOnce() -> std::io::Result<String>) -> Result<String, FlowError> {
        let stage = self.stage();
        f().map_err(|source| self.reject(FlowError::Prompt { stage, source }))
    }

    fn outcome(&self) -> PasswordOutcome {
        match (self.state.stage(), self.state.captcha()) {
            (Stage::ChallengeRequired, Some(challenge)) => {
                let image_url = self
                    .session
                    .resolve(&challenge.url, Stage::ChallengeRequired)
                    .map(String::from)
                    .unwrap_or_else(|_| challenge.url.clone());
                PasswordOutcome::Captcha(CaptchaPrompt {
                    image_url,
                    challenge: challenge.clone(),
                })
            }
            _ => PasswordOutcome::MfaRequired,
        }
    }

    /// Errors are tagged with the stage the flow is leaving.
    async fn post(&self, submission: &Submission) -> Result<String, FlowError> {
        let stage = self.stage();
        let url = self.session.resolve(&submission.action, stage)?;
        self.session.post_form(&url, &submission.fields, stage).await
    }

    /// Apply a transition result: keep the new state, or mark the flow failed.
    fn settle(&mut self, result: Result<FlowState, FlowError>) -> Result<(), FlowError> {
        match result {
            Ok(next) => {
                tracing::debug!(from = %self.state.stage(), to = %next.stage(), "Login advanced");
                self.state = next;
                Ok(())
            }
            Err(err) => Err(self.reject(err)),
        }
    }

    /// Move to `Failed` for anything but a call made out of order, which
    /// never reached the network.
    fn reject(&mut self, err: FlowError) -> FlowError {
        if matches!(err, FlowError::OutOfOrder { .. }) {
            return err;
        }
        let reason = error_chain(&err);
        tracing::warn!(stage = %err.stage(), error = %reason, "Login failed");
        self.failure = Some(reason);
        self.state = self.state.clone().failed();
        err
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
