//! Login flow state and its pure transitions.
//!
//! Each step is split in two: a `*_submission` method builds the form post
//! from the current state, and an `on_*` method takes the current state plus
//! the response body and returns the next state. Neither touches the
//! network, so every step can be driven from recorded pages. A failed
//! transition returns an error and leaves the state it was called on as it
//! was.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

use super::error::FlowError;
use super::extract::{CaptchaChallenge, Page};
use super::form::FormFields;
use crate::models::Account;

/// Path segment of the one-time code form action that precedes the
/// challenge id (`/signin/challenge/totp/2`).
pub const TOTP_DELIMITER: &str = "totp/";

// Field names the provider expects.
const EMAIL: &str = "Email";
const PASSWORD: &str = "Passwd";
const CAPTCHA_SOLUTION: &str = "logincaptcha";
const CAPTCHA_TOKEN: &str = "logintoken";
const CAPTCHA_URL: &str = "url";
const PIN: &str = "Pin";
const CHALLENGE_ID: &str = "challengeId";
const CHALLENGE_TYPE: &str = "challengeType";
const TRUST_DEVICE: &str = "TrustDevice";
const CHECKED_DOMAINS: &str = "checkedDomains";
pub const SAML_RESPONSE: &str = "SAMLResponse";

// Fixed values for the one-time code post.
const TOTP_CHALLENGE_TYPE: &str = "6";
const TRUST_DEVICE_ON: &str = "on";
const CHECKED_DOMAINS_VALUE: &str = "youtube";

/// Where a login attempt is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Init,
    FormFetched,
    EmailSubmitted,
    PasswordSubmitted,
    ChallengeRequired,
    ChallengeResolved,
    MfaRequired,
    Authenticated,
    RolesListed,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::FormFetched => "form-fetched",
            Stage::EmailSubmitted => "email-submitted",
            Stage::PasswordSubmitted => "password-submitted",
            Stage::ChallengeRequired => "challenge-required",
            Stage::ChallengeResolved => "challenge-resolved",
            Stage::MfaRequired => "mfa-required",
            Stage::Authenticated => "authenticated",
            Stage::RolesListed => "roles-listed",
            Stage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::RolesListed | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Username and password, supplied once per attempt.
#[derive(Clone)]
pub struct Identity {
    pub username: String,
    pub secret: SecretString,
}

impl Identity {
    pub fn new(username: impl Into<String>, secret: impl Into<SecretString>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("username", &self.username)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// A form post: target exactly as the page gave it, plus the fields to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub action: String,
    pub fields: FormFields,
}

/// Everything carried from one page to the next.
#[derive(Debug, Clone)]
pub struct FlowState {
    stage: Stage,
    form_action: String,
    form_fields: FormFields,
    relay: FormFields,
    identity: Identity,
    captcha: Option<CaptchaChallenge>,
    assertion: Option<String>,
}

impl FlowState {
    pub fn new(identity: Identity) -> Self {
        Self {
            stage: Stage::Init,
            form_action: String::new(),
            form_fields: FormFields::new(),
            relay: FormFields::new(),
            identity,
            captcha: None,
            assertion: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn form_action(&self) -> &str {
        &self.form_action
    }

    pub fn form_fields(&self) -> &FormFields {
        &self.form_fields
    }

    /// Relay fields captured from the last post-credentials page.
    pub fn relay_fields(&self) -> &FormFields {
        &self.relay
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn captcha(&self) -> Option<&CaptchaChallenge> {
        self.captcha.as_ref()
    }

    /// The signed assertion, once authenticated.
    pub fn assertion(&self) -> Option<&str> {
        self.assertion.as_deref()
    }

    /// Fail with `OutOfOrder` unless the state is in one of `allowed`.
    pub fn ensure(&self, operation: &'static str, allowed: &[Stage]) -> Result<(), FlowError> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(FlowError::OutOfOrder {
                operation,
                stage: self.stage,
            })
        }
    }

    /// Record a failure. Stage becomes `Failed`; everything else is kept for
    /// diagnostics.
    pub fn failed(self) -> Self {
        Self {
            stage: Stage::Failed,
            ..self
        }
    }

    // Init -> FormFetched

    pub fn on_login_form(&self, body: &str) -> Result<Self, FlowError> {
        self.ensure("login form", &[Stage::Init])?;
        let page = Page::parse(body);
        let form_action = page.login_form_action().map_err(|err| {
            FlowError::protocol(
                self.stage,
                format!("{err}; the sign-in page changed or the idp/sp ids are wrong"),
            )
        })?;

        Ok(Self {
            stage: Stage::FormFetched,
            form_action,
            form_fields: page.form_fields(),
            ..self.clone()
        })
    }

    // FormFetched -> EmailSubmitted

    pub fn email_submission(&self) -> Result<Submission, FlowError> {
        self.ensure("submit email", &[Stage::FormFetched])?;
        let mut fields = self.form_fields.clone();
        fields.set(EMAIL, &self.identity.username);
        Ok(Submission {
            action: self.form_action.clone(),
            fields,
        })
    }

    pub fn on_email_response(&self, body: &str) -> Result<Self, FlowError> {
        self.ensure("email response", &[Stage::FormFetched])?;
        let page = Page::parse(body);
        let form_action = page
            .login_form_action()
            .map_err(|err| FlowError::protocol(self.stage, err.to_string()))?;

        Ok(Self {
            stage: Stage::EmailSubmitted,
            form_action,
            form_fields: page.form_fields(),
            ..self.clone()
        })
    }

    // EmailSubmitted -> PasswordSubmitted

    pub fn password_submission(&self) -> Result<Submission, FlowError> {
        self.ensure("submit password", &[Stage::EmailSubmitted])?;
        Ok(Submission {
            action: self.form_action.clone(),
            fields: self.with_credentials(self.form_fields.clone()),
        })
    }

    pub fn on_password_response(&self, body: &str) -> Result<Self, FlowError> {
        self.ensure("password response", &[Stage::EmailSubmitted])?;
        let page = Page::parse(body);
        let form_action = page
            .challenge_form_action()
            .map_err(|err| FlowError::protocol(self.stage, err.to_string()))?;

        Ok(Self {
            stage: Stage::PasswordSubmitted,
            form_action,
            form_fields: page.form_fields(),
            relay: page.relay_fields(),
            captcha: page.captcha(),
            ..self.clone()
        })
    }

    /// PasswordSubmitted -> ChallengeRequired when the page showed a CAPTCHA,
    /// otherwise MfaRequired.
    pub fn branch(&self) -> Result<Self, FlowError> {
        self.ensure("branch", &[Stage::PasswordSubmitted])?;
        let stage = if self.captcha.is_some() {
            Stage::ChallengeRequired
        } else {
            Stage::MfaRequired
        };
        Ok(Self {
            stage,
            ..self.clone()
        })
    }

    // ChallengeRequired -> ChallengeResolved

    pub fn captcha_submission(&self, solution: &str) -> Result<Submission, FlowError> {
        self.ensure("submit captcha", &[Stage::ChallengeRequired])?;
        let challenge = self.captcha.as_ref().ok_or_else(|| {
            FlowError::protocol(self.stage, "no captcha challenge recorded")
        })?;

        let mut fields = self.with_credentials(self.relayed_fields());
        fields.set(CAPTCHA_SOLUTION, solution);
        fields.set(CAPTCHA_TOKEN, &challenge.token);
        fields.set(CAPTCHA_URL, &challenge.url);

        Ok(Submission {
            action: self.form_action.clone(),
            fields,
        })
    }

    /// A page that shows another CAPTCHA keeps the state in
    /// `ChallengeRequired`.
    pub fn on_captcha_response(&self, body: &str) -> Result<Self, FlowError> {
        self.ensure("captcha response", &[Stage::ChallengeRequired])?;
        let page = Page::parse(body);
        let form_action = page
            .challenge_form_action()
            .map_err(|err| FlowError::protocol(self.stage, err.to_string()))?;
        let captcha = page.captcha();
        let stage = if captcha.is_some() {
            Stage::ChallengeRequired
        } else {
            Stage::ChallengeResolved
        };

        Ok(Self {
            stage,
            form_action,
            form_fields: page.form_fields(),
            relay: page.relay_fields(),
            captcha,
            ..self.clone()
        })
    }

    // MfaRequired | ChallengeResolved -> Authenticated

    /// Challenge id embedded in the current form action.
    pub fn challenge_id(&self) -> Result<&str, FlowError> {
        let mut parts = self.form_action.split(TOTP_DELIMITER);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(id), None) => Ok(id),
            _ => Err(FlowError::protocol(
                self.stage,
                format!(
                    "could not find the challenge id in form action {:?}",
                    self.form_action
                ),
            )),
        }
    }

    pub fn mfa_submission(&self, code: &str) -> Result<Submission, FlowError> {
        self.ensure(
            "submit one-time code",
            &[Stage::MfaRequired, Stage::ChallengeResolved],
        )?;
        let challenge_id = self.challenge_id()?;

        let mut fields = self.with_credentials(self.relayed_fields());
        fields.set(TRUST_DEVICE, TRUST_DEVICE_ON);
        fields.set(CHALLENGE_ID, challenge_id);
        fields.set(CHALLENGE_TYPE, TOTP_CHALLENGE_TYPE);
        fields.set(PIN, code);
        fields.set(CHECKED_DOMAINS, CHECKED_DOMAINS_VALUE);

        Ok(Submission {
            action: self.form_action.clone(),
            fields,
        })
    }

    /// Any page without an assertion means the provider did not authenticate
    /// us; the cause (wrong code, locked account, ...) is not distinguished.
    pub fn on_mfa_response(&self, body: &str) -> Result<Self, FlowError> {
        self.ensure(
            "one-time code response",
            &[Stage::MfaRequired, Stage::ChallengeResolved],
        )?;
        let page = Page::parse(body);
        let assertion = page.saml_response().map_err(|_| {
            FlowError::protocol(
                self.stage,
                "authentication did not succeed: no SAML assertion in the response",
            )
        })?;
        let form_action = page
            .challenge_form_action()
            .map_err(|err| FlowError::protocol(self.stage, err.to_string()))?;

        Ok(Self {
            stage: Stage::Authenticated,
            form_action,
            form_fields: page.form_fields(),
            relay: FormFields::new(),
            captcha: None,
            assertion: Some(assertion),
            ..self.clone()
        })
    }

    // Authenticated -> RolesListed

    pub fn assertion_submission(&self) -> Result<Submission, FlowError> {
        self.ensure("post assertion", &[Stage::Authenticated])?;
        let assertion = self.assertion.as_deref().ok_or_else(|| {
            FlowError::protocol(self.stage, "no assertion recorded")
        })?;
        Ok(Submission {
            action: self.form_action.clone(),
            fields: FormFields::new().with(SAML_RESPONSE, assertion),
        })
    }

    pub fn on_roles_response(&self, body: &str) -> Result<(Self, Vec<Account>), FlowError> {
        self.ensure("role listing", &[Stage::Authenticated])?;
        let accounts = Page::parse(body).accounts();
        let next = Self {
            stage: Stage::RolesListed,
            ..self.clone()
        };
        Ok((next, accounts))
    }

    fn relayed_fields(&self) -> FormFields {
        let mut fields = self.form_fields.clone();
        fields.merge(&self.relay);
        fields
    }

    fn with_credentials(&self, mut fields: FormFields) -> FormFields {
        fields.set(EMAIL, &self.identity.username);
        fields.set(PASSWORD, self.identity.secret.expose_secret());
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_FORM: &str = r#"<form id="gaia_loginform" action="https://idp.test/lookup">
        <input type="hidden" name="GALX" value="g1"><input name="Email"></form>"#;
    const PASSWORD_FORM: &str = r#"<form id="gaia_loginform" action="https://idp.test/password">
        <input type="hidden" name="GALX" value="g2"><input name="Passwd"></form>"#;
    const TOTP_PAGE: &str = r#"<form action="/signin/challenge/totp/2" id="challenge">
        <input type="hidden" name="TL" value="tl-1"><input type="hidden" name="continue" value="https://idp.test/cont">
        <input name="Pin"></form>"#;
    const TOTP_PAGE_NO_DELIMITER: &str = r#"<form action="/signin/challenge/ipp/4">
        <input type="hidden" name="TL" value="tl-1"></form>"#;
    const CAPTCHA_PAGE: &str = r#"<form id="gaia_loginform" action="https://idp.test/captcha">
        <div class="captcha-container">
        <input type="hidden" name="url" value="/Captcha?ctoken=xyz">
        <input type="hidden" name="logintoken" value="lt-9"></div>
        <input type="hidden" name="sarp" value="1"></form>"#;
    const SAML_PAGE: &str = r#"<form action="https://sp.test/saml" method="post">
        <input type="hidden" name="SAMLResponse" value="QVNTRVJUSU9O"></form>"#;

    fn identity() -> Identity {
        Identity::new("user@example.com", "hunter2")
    }

    fn at_email_submitted() -> FlowState {
        FlowState::new(identity())
            .on_login_form(LOGIN_FORM)
            .unwrap()
            .on_email_response(PASSWORD_FORM)
            .unwrap()
    }

    #[test]
    fn test_login_form_sets_action_and_fields() {
        let state = FlowState::new(identity()).on_login_form(LOGIN_FORM).unwrap();
        assert_eq!(state.stage(), Stage::FormFetched);
        assert_eq!(state.form_action(), "https://idp.test/lookup");
        assert_eq!(state.form_fields().get("GALX"), Some("g1"));
    }

    #[test]
    fn test_login_form_missing_is_protocol_error() {
        let state = FlowState::new(identity());
        let err = state.on_login_form("<html>nope</html>").unwrap_err();
        assert!(err.is_protocol());
        assert_eq!(err.stage(), Stage::Init);
        assert_eq!(state.stage(), Stage::Init);
    }

    #[test]
    fn test_email_submission_merges_username() {
        let state = FlowState::new(identity()).on_login_form(LOGIN_FORM).unwrap();
        let submission = state.email_submission().unwrap();
        assert_eq!(submission.action, "https://idp.test/lookup");
        assert_eq!(submission.fields.get("Email"), Some("user@example.com"));
        assert_eq!(submission.fields.get("GALX"), Some("g1"));
        // The state's own fields still mirror the parsed page.
        assert_eq!(state.form_fields().get("Email"), Some(""));
    }

    #[test]
    fn test_password_submission_has_both_credentials() {
        let submission = at_email_submitted().password_submission().unwrap();
        assert_eq!(submission.action, "https://idp.test/password");
        assert_eq!(submission.fields.get("Email"), Some("user@example.com"));
        assert_eq!(submission.fields.get("Passwd"), Some("hunter2"));
        assert_eq!(submission.fields.get("GALX"), Some("g2"));
    }

    #[test]
    fn test_failed_extraction_keeps_previous_fields() {
        let state = at_email_submitted();
        assert!(state.on_password_response("<p>no form</p>").is_err());
        assert_eq!(state.stage(), Stage::EmailSubmitted);
        assert_eq!(state.form_fields().get("GALX"), Some("g2"));
    }

    #[test]
    fn test_password_without_captcha_branches_to_mfa() {
        let state = at_email_submitted()
            .on_password_response(TOTP_PAGE)
            .unwrap();
        assert_eq!(state.stage(), Stage::PasswordSubmitted);
        let state = state.branch().unwrap();
        assert_eq!(state.stage(), Stage::MfaRequired);
        assert_eq!(state.relay_fields().get("TL"), Some("tl-1"));
    }

    #[test]
    fn test_password_with_captcha_branches_to_challenge() {
        let state = at_email_submitted()
            .on_password_response(CAPTCHA_PAGE)
            .unwrap()
            .branch()
            .unwrap();
        assert_eq!(state.stage(), Stage::ChallengeRequired);

        let submission = state.captcha_submission("s0lved").unwrap();
        assert_eq!(submission.action, "https://idp.test/captcha");
        assert_eq!(submission.fields.get("logincaptcha"), Some("s0lved"));
        assert_eq!(submission.fields.get("logintoken"), Some("lt-9"));
        assert_eq!(submission.fields.get("url"), Some("/Captcha?ctoken=xyz"));
        assert_eq!(submission.fields.get("sarp"), Some("1"));
        assert_eq!(submission.fields.get("Passwd"), Some("hunter2"));

        let resolved = state.on_captcha_response(TOTP_PAGE).unwrap();
        assert_eq!(resolved.stage(), Stage::ChallengeResolved);
        assert!(resolved.captcha().is_none());

        let again = state.on_captcha_response(CAPTCHA_PAGE).unwrap();
        assert_eq!(again.stage(), Stage::ChallengeRequired);
    }

    #[test]
    fn test_mfa_submission_fields() {
        let state = at_email_submitted()
            .on_password_response(TOTP_PAGE)
            .unwrap()
            .branch()
            .unwrap();
        let submission = state.mfa_submission("123456").unwrap();
        assert_eq!(submission.action, "/signin/challenge/totp/2");
        let f = &submission.fields;
        assert_eq!(f.get("challengeId"), Some("2"));
        assert_eq!(f.get("challengeType"), Some("6"));
        assert_eq!(f.get("TrustDevice"), Some("on"));
        assert_eq!(f.get("checkedDomains"), Some("youtube"));
        assert_eq!(f.get("Pin"), Some("123456"));
        assert_eq!(f.get("Email"), Some("user@example.com"));
        assert_eq!(f.get("Passwd"), Some("hunter2"));
        assert_eq!(f.get("TL"), Some("tl-1"));
        assert_eq!(f.get("continue"), Some("https://idp.test/cont"));
        assert!(!f.contains("scc"));
    }

    #[test]
    fn test_mfa_without_delimiter_is_protocol_error() {
        let state = at_email_submitted()
            .on_password_response(TOTP_PAGE_NO_DELIMITER)
            .unwrap()
            .branch()
            .unwrap();
        let err = state.mfa_submission("123456").unwrap_err();
        assert!(err.is_protocol());
        assert!(state.assertion().is_none());
    }

    #[test]
    fn test_mfa_response_without_assertion_fails() {
        let state = at_email_submitted()
            .on_password_response(TOTP_PAGE)
            .unwrap()
            .branch()
            .unwrap();
        let err = state.on_mfa_response(TOTP_PAGE).unwrap_err();
        assert!(err.is_protocol());
        assert_eq!(err.stage(), Stage::MfaRequired);
        assert!(err.to_string().starts_with("mfa-required: "), "{err}");
        assert!(err.to_string().contains("authentication did not succeed"));
        assert!(state.assertion().is_none());
    }

    #[test]
    fn test_mfa_response_yields_assertion_and_acs_action() {
        let state = at_email_submitted()
            .on_password_response(TOTP_PAGE)
            .unwrap()
            .branch()
            .unwrap()
            .on_mfa_response(SAML_PAGE)
            .unwrap();
        assert_eq!(state.stage(), Stage::Authenticated);
        assert_eq!(state.assertion(), Some("QVNTRVJUSU9O"));

        let submission = state.assertion_submission().unwrap();
        assert_eq!(submission.action, "https://sp.test/saml");
        assert_eq!(submission.fields.get("SAMLResponse"), Some("QVNTRVJUSU9O"));
        assert_eq!(submission.fields.len(), 1);

        let (listed, accounts) = state.on_roles_response("<html></html>").unwrap();
        assert_eq!(listed.stage(), Stage::RolesListed);
        assert!(accounts.is_empty());
    }

    #[test]
    fn test_out_of_order_is_rejected() {
        let state = FlowState::new(identity());
        let err = state.mfa_submission("000000").unwrap_err();
        assert!(matches!(
            err,
            FlowError::OutOfOrder {
                stage: Stage::Init,
                ..
            }
        ));
        assert!(state.password_submission().is_err());
        assert!(state.assertion_submission().is_err());
    }

    #[test]
    fn test_identity_debug_redacts_secret() {
        let debug = format!("{:?}", identity());
        assert!(debug.contains("user@example.com"));
        assert!(!debug.contains("hunter2"));
    }
}
