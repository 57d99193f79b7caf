#![allow(dead_code)]

use std::io;
use std::sync::Mutex;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use gsaml::saml::{CaptchaPrompt, Identity, Prompter, Provider, SessionOptions};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const INIT_SSO_PATH: &str = "/o/saml2/initsso";
pub const LOOKUP_PATH: &str = "/signin/v1/lookup";
pub const PASSWORD_PATH: &str = "/signin/challenge/sl/password";
pub const CAPTCHA_PATH: &str = "/signin/challenge/sl/captcha";
pub const TOTP_PATH: &str = "/signin/challenge/totp/2";
pub const SAML_PATH: &str = "/saml";

pub const ADMIN_ROLE: &str = "arn:aws:iam::111111111111:role/Admin";
pub const DEVELOPER_ROLE: &str = "arn:aws:iam::222222222222:role/Developer";
pub const PROVIDER_ARN: &str = "arn:aws:iam::111111111111:saml-provider/Google";

pub fn login_page() -> String {
    format!(
        r#"<html><body>
        <form id="gaia_loginform" action="{LOOKUP_PATH}" method="post">
            <input type="hidden" name="GALX" value="galx-1">
            <input type="hidden" name="continue" value="https://signin.aws.amazon.com/saml">
            <input type="email" name="Email">
        </form>
        </body></html>"#
    )
}

pub fn password_page() -> String {
    format!(
        r#"<html><body>
        <form id="gaia_loginform" action="{PASSWORD_PATH}" method="post">
            <input type="hidden" name="GALX" value="galx-2">
            <input type="hidden" name="ProfileInformation" value="profile-info">
            <input type="password" name="Passwd">
        </form>
        </body></html>"#
    )
}

/// Page asking for a one-time code, posting to `action`.
pub fn totp_page(action: &str) -> String {
    format!(
        r#"<html><body>
        <form action="{action}" method="post" id="challenge">
            <input type="hidden" name="TL" value="tl-relay">
            <input type="hidden" name="gxf" value="gxf-relay">
            <input type="hidden" name="continue" value="https://signin.aws.amazon.com/saml">
            <input type="tel" name="Pin">
        </form>
        </body></html>"#
    )
}

pub fn captcha_page() -> String {
    format!(
        r#"<html><body>
        <form id="gaia_loginform" action="{CAPTCHA_PATH}" method="post">
            <div class="captcha-container">
                <img src="/Captcha?ctoken=abc">
                <input type="hidden" name="url" value="/Captcha?ctoken=abc">
                <input type="hidden" name="logintoken" value="login-token-1">
                <input type="text" name="logincaptcha">
            </div>
            <input type="hidden" name="scc" value="1">
        </form>
        </body></html>"#
    )
}

pub fn assertion_page(assertion: &str) -> String {
    format!(
        r#"<html><body onload="document.forms[0].submit()">
        <form action="{SAML_PATH}" method="post">
            <input type="hidden" name="SAMLResponse" value="{assertion}">
            <input type="hidden" name="RelayState" value="">
        </form>
        </body></html>"#
    )
}

pub fn roles_page() -> String {
    format!(
        r#"<html><body><form id="saml_form" action="/saml" method="post">
        <fieldset>
            <div class="saml-account">
                <div class="saml-account-name">Account: prod (111111111111)</div>
                <div class="saml-role">
                    <input type="radio" name="roleIndex" value="{ADMIN_ROLE}">
                    <label for="{ADMIN_ROLE}">Admin</label>
                </div>
            </div>
            <div class="saml-account">
                <div class="saml-account-name">Account: dev (222222222222)</div>
                <div class="saml-role">
                    <label for="{DEVELOPER_ROLE}">Developer</label>
                </div>
            </div>
        </fieldset>
        </form></body></html>"#
    )
}

/// Base64 assertion granting the admin role through [`PROVIDER_ARN`].
pub fn encoded_assertion() -> String {
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<saml2p:Response xmlns:saml2p="urn:oasis:names:tc:SAML:2.0:protocol">
  <saml2:Assertion xmlns:saml2="urn:oasis:names:tc:SAML:2.0:assertion">
    <saml2:AttributeStatement>
      <saml2:Attribute Name="https://aws.amazon.com/SAML/Attributes/Role">
        <saml2:AttributeValue>{ADMIN_ROLE},{PROVIDER_ARN}</saml2:AttributeValue>
      </saml2:Attribute>
      <saml2:Attribute Name="https://aws.amazon.com/SAML/Attributes/SessionDuration">
        <saml2:AttributeValue>3600</saml2:AttributeValue>
      </saml2:Attribute>
    </saml2:AttributeStatement>
  </saml2:Assertion>
</saml2p:Response>"#
    );
    STANDARD.encode(xml)
}

pub fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

pub async fn mount_get(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

pub async fn mount_post(server: &MockServer, route: &str, body: String) {
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

/// Mount the pages of a sign-in without CAPTCHA, ending in `assertion`.
pub async fn mount_happy_path(server: &MockServer, assertion: &str) {
    mount_get(server, INIT_SSO_PATH, login_page()).await;
    mount_post(server, LOOKUP_PATH, password_page()).await;
    mount_post(server, PASSWORD_PATH, totp_page(TOTP_PATH)).await;
    mount_post(server, TOTP_PATH, assertion_page(assertion)).await;
    mount_post(server, SAML_PATH, roles_page()).await;
}

pub fn provider(server: &MockServer) -> Provider {
    let origin = Url::parse(&server.uri()).expect("mock server uri");
    Provider::google("idp-123", "sp-456").with_origin(origin)
}

pub fn identity() -> Identity {
    Identity::new("user@example.com", "hunter2")
}

pub fn options() -> SessionOptions {
    SessionOptions {
        timeout: std::time::Duration::from_secs(5),
        ..SessionOptions::default()
    }
}

/// Answers prompts from a script and records the CAPTCHA images it was shown.
pub struct ScriptedPrompter {
    captchas: Mutex<Vec<String>>,
    code: String,
    pub shown: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(code: &str) -> Self {
        Self {
            captchas: Mutex::new(Vec::new()),
            code: code.to_string(),
            shown: Mutex::new(Vec::new()),
        }
    }

    pub fn with_captcha(self, answer: &str) -> Self {
        self.captchas.lock().unwrap().push(answer.to_string());
        self
    }
}

impl Prompter for ScriptedPrompter {
    fn captcha_solution(&self, prompt: &CaptchaPrompt) -> io::Result<String> {
        self.shown.lock().unwrap().push(prompt.image_url.clone());
        let mut captchas = self.captchas.lock().unwrap();
        if captchas.is_empty() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no captcha answer"));
        }
        Ok(captchas.remove(0))
    }

    fn one_time_code(&self) -> io::Result<String> {
        Ok(self.code.clone())
    }
}

/// Body of the first request the server received for `route`.
pub async fn request_body(server: &MockServer, route: &str) -> Option<String> {
    server
        .received_requests()
        .await?
        .into_iter()
        .find(|request| request.url.path() == route)
        .map(|request| String::from_utf8_lossy(&request.body).into_owned())
}
