//! Credential model: the token triple, its storage keys, and redacting secrets.

pub mod credential;
pub mod secret;

pub use credential::*;
pub use secret::*;
