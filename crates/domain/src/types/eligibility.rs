//! Canonical eligibility request/result types
//!
//! The canonical request is payer-agnostic: dates are real calendar dates and
//! code values are already resolved through the payer profile. Wire-level
//! formatting (date representation, JSON vs form encoding) happens when the
//! request is rendered for a specific payer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical eligibility outcome status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityStatus {
    Eligible,
    NotEligible,
    Pending,
    NeedsReview,
    Error,
    UnsupportedPayer,
}

impl EligibilityStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eligible => "eligible",
            Self::NotEligible => "not_eligible",
            Self::Pending => "pending",
            Self::NeedsReview => "needs_review",
            Self::Error => "error",
            Self::UnsupportedPayer => "unsupported_payer",
        }
    }
}

/// Subscriber/patient gender code accepted by the payer APIs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Gender {
    /// Single-letter wire code (`M`/`F`/`U`).
    pub const fn code(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
            Self::Unknown => "U",
        }
    }

    /// Parse from free-form demographic input (`male`, `F`, etc.).
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "m" | "male" => Self::Male,
            "f" | "female" => Self::Female,
            _ => Self::Unknown,
        }
    }
}

/// Postal address block shared by provider and subscriber sections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    pub city: String,
    /// Two-letter USPS state/territory code
    pub state: String,
    pub postal_code: String,
}

/// Rendering/billing provider identity and service location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderBlock {
    /// National Provider Identifier, exactly ten digits
    pub npi: String,
    pub organization_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Payer-specific provider code resolved from the facility type
    pub provider_code: String,
    pub taxonomy_code: Option<String>,
    pub service_location: Address,
}

/// Subscriber (member) identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberBlock {
    pub member_id: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub address: Option<Address>,
    pub group_number: Option<String>,
}

/// Service encounter being checked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterBlock {
    pub date_of_service: NaiveDate,
    pub service_type_codes: Vec<String>,
    pub place_of_service: String,
    pub procedure_codes: Vec<String>,
}

/// Canonical internal representation of one eligibility check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityRequest {
    /// Unique per submission attempt; numeric, zero-padded to the payer's width
    pub control_number: String,
    pub submitter_transaction_id: String,
    pub trading_partner_service_id: Option<String>,
    /// Gateway payer identifier the request targets
    pub payer_id: String,
    pub provider: ProviderBlock,
    pub subscriber: SubscriberBlock,
    pub encounter: EncounterBlock,
    /// Set when demographics were substituted because the patient record was
    /// unavailable; such a request must never reach a live payer.
    pub placeholder_demographics: bool,
}

/// One plan entry extracted from a payer response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenefitPlan {
    pub description: Option<String>,
    pub group_number: Option<String>,
    pub effective_date: Option<NaiveDate>,
    pub termination_date: Option<NaiveDate>,
    pub insurance_type: Option<String>,
    /// Plan-level authorization flag as reported by the payer
    pub authorization_required: bool,
}

/// One benefit line from a payer response, reduced to the fields the
/// prior-authorization predicate inspects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenefitEntry {
    pub name: Option<String>,
    /// Benefit qualifier code, e.g. `AR` (Authorization Required)
    pub qualifier: Option<String>,
    /// Benefit kind, e.g. `copay`, `deductible`
    pub kind: Option<String>,
    pub amount: Option<f64>,
}

/// Cost-sharing amounts; each is optional because payers report them unevenly
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostSharing {
    pub copay: Option<f64>,
    pub deductible: Option<f64>,
    pub coinsurance: Option<f64>,
    pub out_of_pocket_max: Option<f64>,
}

/// Payer identity as submitted vs. as confirmed by the payer response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerIdentity {
    pub submitted_id: Option<String>,
    pub submitted_name: Option<String>,
    pub confirmed_id: Option<String>,
    pub confirmed_name: Option<String>,
}

/// Canonical eligibility outcome
///
/// Created fresh per check invocation and immutable once returned; the
/// owning order persists it through the order repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub status: EligibilityStatus,
    pub control_number: Option<String>,
    pub coverage_id: Option<String>,
    pub payer: PayerIdentity,
    pub plans: Vec<BenefitPlan>,
    pub cost_sharing: CostSharing,
    pub prior_authorization_required: bool,
    pub validation_messages: Vec<String>,
    pub error_message: Option<String>,
    /// Opaque upstream payload, retained for audit
    pub raw_response: Option<Value>,
    pub checked_at: DateTime<Utc>,
}

impl EligibilityResult {
    /// Structured outcome for a payer outside the supported list.
    /// No upstream call was made.
    pub fn unsupported_payer(payer_id: impl Into<String>, checked_at: DateTime<Utc>) -> Self {
        let payer_id = payer_id.into();
        Self {
            status: EligibilityStatus::UnsupportedPayer,
            control_number: None,
            coverage_id: None,
            payer: PayerIdentity {
                submitted_id: Some(payer_id),
                submitted_name: None,
                confirmed_id: None,
                confirmed_name: None,
            },
            plans: Vec::new(),
            cost_sharing: CostSharing::default(),
            prior_authorization_required: false,
            validation_messages: Vec::new(),
            error_message: None,
            raw_response: None,
            checked_at,
        }
    }

    /// Terminal error outcome carrying the classified failure message.
    pub fn from_error(message: impl Into<String>, checked_at: DateTime<Utc>) -> Self {
        Self {
            status: EligibilityStatus::Error,
            control_number: None,
            coverage_id: None,
            payer: PayerIdentity::default(),
            plans: Vec::new(),
            cost_sharing: CostSharing::default(),
            prior_authorization_required: false,
            validation_messages: Vec::new(),
            error_message: Some(message.into()),
            raw_response: None,
            checked_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gender_parses_free_form_demographics() {
        assert_eq!(Gender::parse("male"), Gender::Male);
        assert_eq!(Gender::parse("F"), Gender::Female);
        assert_eq!(Gender::parse("nonbinary"), Gender::Unknown);
        assert_eq!(Gender::Unknown.code(), "U");
    }

    #[test]
    fn unsupported_payer_result_carries_submitted_identity() {
        let result = EligibilityResult::unsupported_payer("acme-health", Utc::now());
        assert_eq!(result.status, EligibilityStatus::UnsupportedPayer);
        assert_eq!(result.payer.submitted_id.as_deref(), Some("acme-health"));
        assert!(!result.prior_authorization_required);
        assert!(result.raw_response.is_none());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&EligibilityStatus::NeedsReview).unwrap();
        assert_eq!(json, "\"needs_review\"");
    }
}
