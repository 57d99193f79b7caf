use reqwest::StatusCode;

use super::Stage;

/// A required page element was missing.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("element not found: {0}")]
    NotFound(&'static str),
}

/// Transport-level failures. None of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },

    #[error("cannot resolve {target:?} against the provider origin")]
    InvalidUrl {
        target: String,
        #[source]
        source: url::ParseError,
    },
}

/// Why a login attempt stopped.
///
/// Every variant carries the stage it happened in, so a caller can tell a
/// changed provider page (`Protocol` early on) from rejected credentials
/// (`Protocol` at the MFA step).
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("{stage}: network error")]
    Network {
        stage: Stage,
        #[source]
        source: NetworkError,
    },

    #[error("{stage}: {message}")]
    Protocol { stage: Stage, message: String },

    #[error("{operation} is not valid while the login is {stage}")]
    OutOfOrder {
        operation: &'static str,
        stage: Stage,
    },

    #[error("{stage}: input was not provided")]
    Prompt {
        stage: Stage,
        #[source]
        source: std::io::Error,
    },
}

impl FlowError {
    pub(crate) fn protocol(stage: Stage, message: impl Into<String>) -> Self {
        Self::Protocol {
            stage,
            message: message.into(),
        }
    }

    pub(crate) fn network(stage: Stage, source: NetworkError) -> Self {
        Self::Network { stage, source }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::Network { stage, .. }
            | Self::Protocol { stage, .. }
            | Self::OutOfOrder { stage, .. }
            | Self::Prompt { stage, .. } => *stage,
        }
    }

    /// HTTP status of the failing response, when the provider answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Network {
                source: NetworkError::Status { status, .. },
                ..
            } => Some(*status),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }
}
