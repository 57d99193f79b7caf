//! Page extraction for the Google sign-in and AWS role selection pages.
//!
//! Every function here is a pure read of a parsed document. Selectors for the
//! initial sign-in form and for the pages that follow the credentials step
//! are kept apart: after the password is accepted the provider renders a
//! different DOM root, and reading the action with the wrong selector yields
//! a stale or empty target.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::error::ExtractError;
use super::form::FormFields;
use crate::models::{Account, Arn, Role};

/// Hidden fields the provider expects echoed back unchanged after the
/// credentials step. Not every page variant carries all of them.
pub const RELAY_FIELDS: [&str; 5] = ["TL", "continue", "scc", "sarp", "gxf"];

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

static LOGIN_FORM: LazyLock<Selector> = LazyLock::new(|| selector("#gaia_loginform"));
static LOGIN_FORM_INPUTS: LazyLock<Selector> =
    LazyLock::new(|| selector("#gaia_loginform > input"));
static ANY_FORM: LazyLock<Selector> = LazyLock::new(|| selector("form"));
static CAPTCHA_URL: LazyLock<Selector> =
    LazyLock::new(|| selector(".captcha-container > input[name=url]"));
static CAPTCHA_TOKEN: LazyLock<Selector> =
    LazyLock::new(|| selector(".captcha-container > input[name=logintoken]"));
static SAML_RESPONSE: LazyLock<Selector> =
    LazyLock::new(|| selector("input[name='SAMLResponse']"));
static SAML_ACCOUNT: LazyLock<Selector> =
    LazyLock::new(|| selector("fieldset > div.saml-account"));
static SAML_ACCOUNT_NAME: LazyLock<Selector> =
    LazyLock::new(|| selector("div.saml-account-name"));
static LABEL: LazyLock<Selector> = LazyLock::new(|| selector("label"));
static INPUT: LazyLock<Selector> = LazyLock::new(|| selector("input"));

/// CAPTCHA the provider put in front of the next step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaChallenge {
    /// Image URL exactly as the page carries it (often relative).
    pub url: String,
    /// Token that must accompany the solution.
    pub token: String,
}

/// A parsed HTML page.
///
/// `Html` is not `Send`; keep a `Page` inside synchronous code and drop it
/// before the next await.
pub struct Page {
    html: Html,
}

impl Page {
    pub fn parse(body: &str) -> Self {
        Self {
            html: Html::parse_document(body),
        }
    }

    /// Action of the initial sign-in form (`#gaia_loginform`).
    pub fn login_form_action(&self) -> Result<String, ExtractError> {
        self.html
            .select(&LOGIN_FORM)
            .next()
            .and_then(|form| form.value().attr("action"))
            .map(str::to_string)
            .ok_or(ExtractError::NotFound("#gaia_loginform[action]"))
    }

    /// Action of the first form on pages after the credentials step.
    pub fn challenge_form_action(&self) -> Result<String, ExtractError> {
        self.html
            .select(&ANY_FORM)
            .next()
            .and_then(|form| form.value().attr("action"))
            .map(str::to_string)
            .ok_or(ExtractError::NotFound("form[action]"))
    }

    /// Named inputs of the sign-in form. Empty when there is no such form.
    pub fn form_fields(&self) -> FormFields {
        let mut fields = FormFields::new();
        for input in self.html.select(&LOGIN_FORM_INPUTS) {
            let name = input.value().attr("name").unwrap_or_default();
            if name.is_empty() {
                continue;
            }
            fields.set(name, input.value().attr("value").unwrap_or_default());
        }
        fields
    }

    /// The CAPTCHA challenge, if the page shows one.
    pub fn captcha(&self) -> Option<CaptchaChallenge> {
        let url = self
            .html
            .select(&CAPTCHA_URL)
            .next()?
            .value()
            .attr("value")?
            .to_string();
        let token = self
            .html
            .select(&CAPTCHA_TOKEN)
            .next()
            .and_then(|input| input.value().attr("value"))
            .unwrap_or_default()
            .to_string();
        Some(CaptchaChallenge { url, token })
    }

    /// Values of the relay fields present anywhere in the page.
    pub fn relay_fields(&self) -> FormFields {
        let mut fields = FormFields::new();
        for input in self.html.select(&INPUT) {
            let Some(name) = input.value().attr("name") else {
                continue;
            };
            if fields.contains(name) || !RELAY_FIELDS.contains(&name) {
                continue;
            }
            fields.set(name, input.value().attr("value").unwrap_or_default());
        }
        fields
    }

    /// The base64 SAML assertion posted on to the service provider.
    pub fn saml_response(&self) -> Result<String, ExtractError> {
        self.html
            .select(&SAML_RESPONSE)
            .next()
            .and_then(|input| input.value().attr("value"))
            .map(str::to_string)
            .ok_or(ExtractError::NotFound("input[name=SAMLResponse]"))
    }

    /// Accounts and roles from the AWS role selection page, in page order.
    pub fn accounts(&self) -> Vec<Account> {
        self.html
            .select(&SAML_ACCOUNT)
            .map(|block| {
                let name = block
                    .select(&SAML_ACCOUNT_NAME)
                    .next()
                    .map(text_of)
                    .unwrap_or_default();
                let mut account = Account::new(name);
                for label in block.select(&LABEL) {
                    let target = label.value().attr("for").unwrap_or_default();
                    match Arn::parse(target) {
                        Ok(arn) => account.roles.push(Role::new(text_of(label), arn)),
                        Err(err) => {
                            tracing::warn!(account = %account.name, error = %err, "Skipping role with unparseable ARN");
                        }
                    }
                }
                account
            })
            .collect()
    }
}

fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
