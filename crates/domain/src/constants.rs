//! Domain constants
//!
//! Centralized location for code sets and limits shared across the engine.

/// Valid USPS two-letter state and territory codes.
pub const US_STATE_CODES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA", "KS",
    "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ", "NM", "NY",
    "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT", "VA", "WA", "WV",
    "WI", "WY", "DC", "AS", "GU", "MP", "PR", "VI",
];

/// Benefit qualifier codes that indicate a prior-authorization requirement.
///
/// AR = Authorization Required, G1 = Prior Authorization Number.
pub const PRIOR_AUTH_QUALIFIER_CODES: &[&str] = &["AR", "G1"];

/// Benefit name synonyms that indicate a prior-authorization requirement.
/// Matched case-insensitively against the benefit name.
pub const PRIOR_AUTH_BENEFIT_NAMES: &[&str] =
    &["pre-authorization", "prior authorization", "preauth"];

/// Number of digits in an NPI.
pub const NPI_LENGTH: usize = 10;

/// Default width of a zero-padded numeric control number.
pub const DEFAULT_CONTROL_NUMBER_WIDTH: usize = 9;

// Upstream call timeouts
pub const DEFAULT_CHECK_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SUBMIT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 5;

/// Tokens are considered stale this many seconds before their upstream
/// expiry so an in-flight request never carries a token that dies mid-call.
pub const TOKEN_EXPIRY_SAFETY_MARGIN_SECS: u64 = 60;

/// Fallback token lifetime when the grant response omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;
