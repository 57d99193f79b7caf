mod account;
mod arn;

pub use account::{find_role, Account, Role};
pub use arn::{Arn, ArnError};
