//! Payer profile value objects
//!
//! One profile per supported payer gateway, constructed once at startup and
//! passed explicitly to the mapper, validator, and normalizer. The profile
//! consolidates every payer-specific decision — wire encoding, date
//! representation, code tables, status mappings, required fields — so no
//! component carries its own copy of a mapping table.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{
    DEFAULT_CHECK_TIMEOUT_SECS, DEFAULT_CONTROL_NUMBER_WIDTH, DEFAULT_SUBMIT_TIMEOUT_SECS,
};
use crate::types::eligibility::EligibilityStatus;
use crate::types::order::{FacilityKind, WoundType};

/// Body encoding the payer's eligibility endpoint expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    Json,
    FormUrlEncoded,
}

/// Date representation the payer's wire schema requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// `YYYYMMDD`
    CompactYmd,
    /// `YYYY-MM-DD`
    Iso8601,
}

impl DateFormat {
    pub fn format(self, date: NaiveDate) -> String {
        match self {
            Self::CompactYmd => date.format("%Y%m%d").to_string(),
            Self::Iso8601 => date.format("%Y-%m-%d").to_string(),
        }
    }
}

/// A payload rendered for transmission to one payer
#[derive(Debug, Clone, PartialEq)]
pub enum WirePayload {
    Json(Value),
    /// Ordered key/value pairs; empty values have already been dropped
    Form(Vec<(String, String)>),
}

impl WirePayload {
    /// Form-pair lookup helper for tests and logging.
    pub fn form_value(&self, key: &str) -> Option<&str> {
        match self {
            Self::Form(pairs) => {
                pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
            }
            Self::Json(_) => None,
        }
    }
}

/// Endpoint set for one payer gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerEndpoints {
    pub base_url: String,
    /// Full token endpoint URL (may live on a different host than base_url)
    pub token_url: String,
    pub eligibility_path: String,
    pub coverage_discovery_path: Option<String>,
    pub service_review_path: Option<String>,
    pub authorization_path: Option<String>,
    pub health_path: Option<String>,
}

/// Fields a payer's schema marks as mandatory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredField {
    MemberId,
    SubscriberDateOfBirth,
    SubscriberGender,
    SubscriberAddress,
    ProviderNpi,
    ProcedureCodes,
    PlaceOfService,
    TradingPartnerServiceId,
}

/// Payer-specific configuration consumed by the mapper, validator, and
/// normalizer.
#[derive(Debug, Clone)]
pub struct PayerProfile {
    /// Gateway identifier, e.g. `availity` or `optum`
    pub payer_id: String,
    pub display_name: String,
    pub wire_format: WireFormat,
    pub date_format: DateFormat,
    pub control_number_width: usize,
    /// Trading partner service id stamped on every request, when the payer
    /// assigns one
    pub trading_partner_service_id: Option<String>,
    /// OAuth2 scopes requested in the client-credentials grant
    pub scopes: Vec<String>,
    pub endpoints: PayerEndpoints,
    /// Lowercased status string → canonical status
    pub status_mappings: HashMap<String, EligibilityStatus>,
    /// Numeric status code → canonical status (e.g. `1` active, `6` inactive)
    pub status_code_mappings: HashMap<String, EligibilityStatus>,
    pub service_type_codes: HashMap<WoundType, Vec<String>>,
    pub place_of_service_codes: HashMap<FacilityKind, String>,
    pub provider_codes: HashMap<FacilityKind, String>,
    pub taxonomy_codes: HashMap<FacilityKind, String>,
    pub required_fields: Vec<RequiredField>,
    /// Whether the payer rejects empty strings for optional fields
    pub omit_empty_fields: bool,
    pub check_timeout: Duration,
    pub submit_timeout: Duration,
}

impl PayerProfile {
    /// Minimal profile with engine-wide defaults; builders in the payer
    /// gateway layer fill in the real tables.
    pub fn new(payer_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            payer_id: payer_id.into(),
            display_name: display_name.into(),
            wire_format: WireFormat::Json,
            date_format: DateFormat::Iso8601,
            control_number_width: DEFAULT_CONTROL_NUMBER_WIDTH,
            trading_partner_service_id: None,
            scopes: Vec::new(),
            endpoints: PayerEndpoints {
                base_url: String::new(),
                token_url: String::new(),
                eligibility_path: String::new(),
                coverage_discovery_path: None,
                service_review_path: None,
                authorization_path: None,
                health_path: None,
            },
            status_mappings: HashMap::new(),
            status_code_mappings: HashMap::new(),
            service_type_codes: HashMap::new(),
            place_of_service_codes: HashMap::new(),
            provider_codes: HashMap::new(),
            taxonomy_codes: HashMap::new(),
            required_fields: Vec::new(),
            omit_empty_fields: false,
            check_timeout: Duration::from_secs(DEFAULT_CHECK_TIMEOUT_SECS),
            submit_timeout: Duration::from_secs(DEFAULT_SUBMIT_TIMEOUT_SECS),
        }
    }

    /// Map a raw upstream status to the canonical enum.
    ///
    /// Lookup order: status string (case-insensitive substring-free exact
    /// match), then numeric status code. Anything unmatched maps to
    /// `NeedsReview` — never silently to `Eligible`.
    pub fn map_status(&self, raw_status: &str, raw_code: Option<&str>) -> EligibilityStatus {
        let normalized = raw_status.trim().to_lowercase();
        if let Some(status) = self.status_mappings.get(&normalized) {
            return *status;
        }
        if let Some(code) = raw_code {
            if let Some(status) = self.status_code_mappings.get(code.trim()) {
                return *status;
            }
        }
        EligibilityStatus::NeedsReview
    }

    /// Service-type codes for a wound classification; defaults to `30`
    /// (medical care / DME) when the table has no entry.
    pub fn service_type_codes_for(&self, wound_type: WoundType) -> Vec<String> {
        self.service_type_codes
            .get(&wound_type)
            .cloned()
            .unwrap_or_else(|| vec!["30".to_string()])
    }

    /// Place-of-service code for a facility kind; defaults to `11` (office).
    pub fn place_of_service_for(&self, kind: FacilityKind) -> String {
        self.place_of_service_codes.get(&kind).cloned().unwrap_or_else(|| "11".to_string())
    }

    /// Provider code for a facility kind; defaults to `PC` (clinic).
    pub fn provider_code_for(&self, kind: FacilityKind) -> String {
        self.provider_codes.get(&kind).cloned().unwrap_or_else(|| "PC".to_string())
    }

    pub fn taxonomy_code_for(&self, kind: FacilityKind) -> Option<String> {
        self.taxonomy_codes.get(&kind).cloned()
    }

    pub fn requires(&self, field: RequiredField) -> bool {
        self.required_fields.contains(&field)
    }

    pub fn format_date(&self, date: NaiveDate) -> String {
        self.date_format.format(date)
    }
}

/// Payer-scoped bearer credential.
///
/// Owned exclusively by the credential manager and never exposed outside the
/// engine boundary. `Debug` redacts the secret so it cannot leak into logs.
#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self { secret: secret.into(), expires_at }
    }

    /// Bearer value for the Authorization header.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True once the token is within `margin` of its upstream expiry.
    pub fn is_stale(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        let margin = chrono::Duration::from_std(margin).unwrap_or_else(|_| chrono::Duration::zero());
        now + margin >= self.expires_at
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
