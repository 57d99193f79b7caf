mod config;
mod login;
mod prompt;
mod types;

pub use config::config_output;
pub use login::{
    authenticate, choose_role, credentials_file, exchange_and_save, list_roles, login,
    resolve_identity, LoginRequest,
};
pub use prompt::TerminalPrompter;
pub use types::{ConfigOutput, LoginOutput, RoleOutput};
