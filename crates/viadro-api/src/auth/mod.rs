//! Token issuance and identity resolution.

pub mod identity;
pub mod tokens;

pub use identity::{parse_bearer, IdentityError, IdentityResolver};
pub use tokens::{hash_token, Token, TokenError, TokenService};
