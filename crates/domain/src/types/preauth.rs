//! Pre-authorization (service review) request/result types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::eligibility::{ProviderBlock, SubscriberBlock};

/// Canonical pre-authorization outcome status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreAuthStatus {
    Submitted,
    Approved,
    Denied,
    Pending,
    Cancelled,
    Error,
    UnsupportedPayer,
}

impl PreAuthStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Pending => "pending",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
            Self::UnsupportedPayer => "unsupported_payer",
        }
    }
}

/// Submission urgency
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    #[default]
    Routine,
    Urgent,
}

impl Urgency {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Routine => "routine",
            Self::Urgent => "urgent",
        }
    }
}

/// One diagnosis on the service review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosis {
    /// `ABK` for principal, `ABF` for secondary (ICD-10 qualifier codes)
    pub qualifier_code: String,
    pub code: String,
    pub description: String,
    pub date: Option<NaiveDate>,
}

/// One requested service line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLine {
    /// HCPCS/CPT procedure code
    pub procedure_code: String,
    pub description: String,
    pub diagnosis_code: Option<String>,
    pub quantity: u32,
    /// Quantity type code, e.g. `UN` for units
    pub quantity_type_code: String,
    pub service_date: NaiveDate,
    pub place_of_service_code: String,
}

/// Free-text note attached to the submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderNote {
    /// `CER` certification narrative, `ADD` additional info, `DCP` goals/
    /// treatment plan
    pub type_code: String,
    pub message: String,
}

/// Medicare Administrative Contractor jurisdiction metadata, resolved from
/// the patient address rather than the facility address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacInformation {
    pub jurisdiction: Option<String>,
    pub contractor: Option<String>,
    pub place_of_service_code: Option<String>,
}

/// Canonical pre-authorization (service review) request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreAuthorizationRequest {
    /// Unique per submission attempt
    pub submission_id: String,
    pub payer_id: String,
    pub payer_name: String,
    pub requesting_provider: ProviderBlock,
    pub subscriber: SubscriberBlock,
    pub diagnoses: Vec<Diagnosis>,
    pub service_lines: Vec<ServiceLine>,
    pub service_type_code: String,
    pub place_of_service_code: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub total_quantity: u32,
    pub urgency: Urgency,
    pub provider_notes: Vec<ProviderNote>,
    pub mac: Option<MacInformation>,
    /// Mirrors the eligibility-request flag; a flagged request must not be
    /// transmitted to a live payer.
    pub placeholder_demographics: bool,
}

/// Canonical pre-authorization outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreAuthorizationResult {
    pub status: PreAuthStatus,
    /// Authorization/certification number issued by the payer
    pub authorization_number: Option<String>,
    pub reference_number: Option<String>,
    pub tracking_numbers: Vec<String>,
    pub payer_transaction_id: Option<String>,
    pub certification_issue_date: Option<NaiveDate>,
    pub certification_effective_date: Option<NaiveDate>,
    pub certification_expiration_date: Option<NaiveDate>,
    pub estimated_decision_date: Option<NaiveDate>,
    pub error_message: Option<String>,
    /// Opaque upstream payload, retained for audit
    pub raw_response: Option<Value>,
    pub submitted_at: DateTime<Utc>,
}

impl PreAuthorizationResult {
    /// Structured outcome for a payer outside the supported list.
    pub fn unsupported_payer(submitted_at: DateTime<Utc>) -> Self {
        Self {
            status: PreAuthStatus::UnsupportedPayer,
            authorization_number: None,
            reference_number: None,
            tracking_numbers: Vec::new(),
            payer_transaction_id: None,
            certification_issue_date: None,
            certification_effective_date: None,
            certification_expiration_date: None,
            estimated_decision_date: None,
            error_message: None,
            raw_response: None,
            submitted_at,
        }
    }

    /// Terminal error outcome carrying the classified failure message.
    pub fn from_error(message: impl Into<String>, submitted_at: DateTime<Utc>) -> Self {
        Self {
            status: PreAuthStatus::Error,
            authorization_number: None,
            reference_number: None,
            tracking_numbers: Vec::new(),
            payer_transaction_id: None,
            certification_issue_date: None,
            certification_effective_date: None,
            certification_expiration_date: None,
            estimated_decision_date: None,
            error_message: Some(message.into()),
            raw_response: None,
            submitted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&PreAuthStatus::UnsupportedPayer).unwrap();
        assert_eq!(json, "\"unsupported_payer\"");
    }

    #[test]
    fn error_result_carries_message() {
        let result = PreAuthorizationResult::from_error("upstream timeout", Utc::now());
        assert_eq!(result.status, PreAuthStatus::Error);
        assert_eq!(result.error_message.as_deref(), Some("upstream timeout"));
        assert!(result.authorization_number.is_none());
    }
}
