//! Request building, validation, and response normalization
//!
//! The pipeline is mapper → validator → wire rendering → (transport) →
//! normalizer. Everything here is pure: payer specifics come in through the
//! injected [`meridian_domain::PayerProfile`], never from call-site literals.

pub mod mapper;
pub mod normalizer;
pub mod validator;
pub mod wire;
