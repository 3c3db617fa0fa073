/// Credential token exchange.

pub mod credentials;

pub use credentials::{CredentialStore, LookupError, TokenRecord, TokenStore};
