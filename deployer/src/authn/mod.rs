//! Authentication module

pub mod access_token;
pub mod token_mngr;

pub use access_token::AccessToken;
pub use token_mngr::{Credentials, TokenManager, TokenManagerExt};
