//! Google Workspace SAML sign-in.
//!
//! The provider's sign-in is a fixed sequence of HTML form posts:
//!
//! ```text
//! Init -> FormFetched -> EmailSubmitted -> PasswordSubmitted
//!      -> { ChallengeRequired -> ChallengeResolved | MfaRequired }
//!      -> Authenticated -> RolesListed
//! ```
//!
//! [`extract`] reads pages, [`Session`] carries cookies between requests,
//! [`FlowState`] holds the pure transitions and [`LoginFlow`] ties them
//! together for one attempt.

mod error;
pub mod extract;
mod flow;
mod form;
mod session;
mod state;

pub use error::{ExtractError, FlowError, NetworkError};
pub use extract::{CaptchaChallenge, Page};
pub use flow::{
    Authenticated, CaptchaPrompt, LoginFlow, PasswordOutcome, Prompter, Provider, GOOGLE_ORIGIN,
};
pub use form::FormFields;
pub use session::{Session, SessionOptions};
pub use state::{FlowState, Identity, Stage, Submission, SAML_RESPONSE, TOTP_DELIMITER};
