//! HTTP session for a single login attempt.

use std::time::Duration;

use reqwest::{Client, Response};
use url::Url;

use super::error::{FlowError, NetworkError};
use super::form::FormFields;
use super::Stage;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/145.0.0.0 Safari/537.36";

/// Transport settings for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Upper bound for each request, including reading the body.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// A cookie-bearing HTTP client bound to the identity provider's origin.
///
/// The sign-in pages only work when cookies set by one response come back on
/// the next request, so every session owns its own cookie store. Sessions
/// are not shared between login attempts.
pub struct Session {
    client: Client,
    origin: Url,
}

impl Session {
    pub fn new(origin: Url, options: &SessionOptions) -> Result<Self, FlowError> {
        let client = Client::builder()
            .user_agent(&options.user_agent)
            .cookie_store(true)
            .timeout(options.timeout)
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()
            .map_err(|source| {
                FlowError::network(
                    Stage::Init,
                    NetworkError::Transport {
                        url: origin.to_string(),
                        source,
                    },
                )
            })?;

        Ok(Self { client, origin })
    }

    /// Join a form action or link with the provider origin. Absolute targets
    /// are returned unchanged.
    pub fn resolve(&self, target: &str, stage: Stage) -> Result<Url, FlowError> {
        self.origin.join(target).map_err(|source| {
            FlowError::network(
                stage,
                NetworkError::InvalidUrl {
                    target: target.to_string(),
                    source,
                },
            )
        })
    }

    /// GET a page and return its body.
    pub async fn get(&self, url: &Url, stage: Stage) -> Result<String, FlowError> {
        tracing::debug!(%stage, %url, "GET");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| transport(stage, url, source))?;
        read_body(response, url, stage).await
    }

    /// POST `fields` form-encoded and return the response body.
    pub async fn post_form(
        &self,
        url: &Url,
        fields: &FormFields,
        stage: Stage,
    ) -> Result<String, FlowError> {
        tracing::debug!(%stage, %url, fields = fields.len(), "POST form");
        let response = self
            .client
            .post(url.clone())
            .form(fields)
            .send()
            .await
            .map_err(|source| transport(stage, url, source))?;
        read_body(response, url, stage).await
    }
}

fn transport(stage: Stage, url: &Url, source: reqwest::Error) -> FlowError {
    FlowError::network(
        stage,
        NetworkError::Transport {
            url: url.to_string(),
            source,
        },
    )
}

async fn read_body(response: Response, url: &Url, stage: Stage) -> Result<String, FlowError> {
    let status = response.status();
    if !status.is_success() {
        tracing::warn!(%stage, %url, %status, "Provider returned an error status");
        return Err(FlowError::network(
            stage,
            NetworkError::Status {
                url: url.to_string(),
                status,
            },
        ));
    }

    response
        .text()
        .await
        .map_err(|source| transport(stage, url, source))
}
