//! Error types used throughout the engine
//!
//! One tagged union separates expected business outcomes (unsupported payer,
//! validation failures) from operational faults (auth, upstream, internal) so
//! callers never have to string-match messages to tell them apart.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::validation::ValidationReport;

/// Main error type for the Meridian engine
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum EngineError {
    /// Payload failed structural/semantic pre-flight checks; never transmitted.
    #[error("Validation failed: {0}")]
    Validation(ValidationReport),

    /// Credential grant against the payer token endpoint failed.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Non-2xx or timeout from the payer API. Carries the upstream status
    /// code (None for transport-level failures) and response body.
    #[error("Upstream error (status {status:?}): {body}")]
    Upstream { status: Option<u16>, body: String },

    /// Internal data was insufficient to build a valid request.
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Payer is not in the supported list. An expected business outcome,
    /// surfaced to callers as a structured result rather than a fault.
    #[error("Unsupported payer: {0}")]
    UnsupportedPayer(String),

    /// The operation collides with one already in flight (per-order lease).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A referenced entity (order, task) does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Expected business outcomes must not be logged at error severity.
    pub fn is_expected_outcome(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::UnsupportedPayer(_) | Self::Conflict(_) | Self::NotFound(_)
        )
    }

    /// Stable kind label for structured logging.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Auth(_) => "auth",
            Self::Upstream { .. } => "upstream",
            Self::Mapping(_) => "mapping",
            Self::UnsupportedPayer(_) => "unsupported_payer",
            Self::Conflict(_) => "conflict",
            Self::NotFound(_) => "not_found",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
