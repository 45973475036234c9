//! Payer credential management

mod manager;

pub use manager::{CredentialManager, TokenEndpoint};
