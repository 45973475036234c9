//! Order, patient, and workflow-state types
//!
//! The order snapshot is the engine's read model of the persisted order; the
//! order repository (an external collaborator) owns storage. Workflow state
//! enums encode the legal transitions so the orchestrator cannot move an
//! order into an unreachable state.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::eligibility::{Address, EligibilityResult, Gender};
use super::preauth::PreAuthorizationResult;

/// Order identifier assigned by the intake application
pub type OrderId = i64;

/// Wound classification driving service-type code selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WoundType {
    /// Diabetic foot ulcer
    Dfu,
    /// Venous leg ulcer
    Vlu,
    /// Pressure ulcer
    Pu,
    /// Traumatic wound
    Tw,
    /// Arterial ulcer
    Au,
    Other,
}

impl WoundType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dfu => "DFU",
            Self::Vlu => "VLU",
            Self::Pu => "PU",
            Self::Tw => "TW",
            Self::Au => "AU",
            Self::Other => "OTHER",
        }
    }
}

/// Facility classification driving provider/place-of-service code selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityKind {
    Hospital,
    HospitalOutpatient,
    Clinic,
    WoundCareCenter,
    AmbulatorySurgeryCenter,
    Other,
}

/// Service facility on record for the order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityRecord {
    pub npi: String,
    pub name: String,
    pub kind: FacilityKind,
    pub address: Address,
    pub phone: Option<String>,
    pub fax: Option<String>,
}

/// Ordering provider on record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRecord {
    pub npi: String,
    pub first_name: String,
    pub last_name: String,
    pub specialty: Option<String>,
    pub specialty_code: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// One product line selected on the order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductLine {
    /// HCPCS Q-code or CPT code for the product
    pub procedure_code: String,
    pub name: String,
    pub quantity: u32,
}

/// Demographic record returned by the patient directory collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub member_id: String,
    pub address: Option<Address>,
    pub group_number: Option<String>,
}

/// Diagnosis captured during clinical assessment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisInput {
    /// ICD-10 code
    pub code: String,
    pub description: String,
    pub date: Option<NaiveDate>,
}

/// Clinical documentation accompanying a pre-authorization submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalData {
    pub primary_diagnosis: Option<DiagnosisInput>,
    pub secondary_diagnoses: Vec<DiagnosisInput>,
    pub clinical_justification: Option<String>,
    pub wound_assessment: Option<String>,
    pub treatment_history: Option<String>,
}

/// Eligibility workflow state per order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityState {
    #[default]
    NotChecked,
    Checking,
    Eligible,
    NotEligible,
    Pending,
    NeedsReview,
    Error,
    UnsupportedPayer,
}

impl EligibilityState {
    /// Terminal states: a completed check, successful or not.
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::NotChecked | Self::Checking)
    }

    /// Whether a transition to `next` is legal.
    ///
    /// `Checking` may only be entered from a non-checking state (the
    /// per-order lease enforces at-most-one-in-flight); any terminal state
    /// is re-enterable via a fresh check.
    pub const fn can_transition_to(self, next: Self) -> bool {
        match next {
            Self::NotChecked => false,
            Self::Checking => !matches!(self, Self::Checking),
            _ => matches!(self, Self::Checking),
        }
    }
}

/// Pre-authorization workflow state per order
///
/// Absent entirely (`None` on the order) until an eligibility check
/// determines prior authorization is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreAuthState {
    NotStarted,
    Pending,
    InProgress,
    Completed,
    Error,
}

impl PreAuthState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::Pending)
                | (Self::Pending, Self::InProgress)
                | (Self::Pending, Self::Error)
                | (Self::InProgress, Self::Completed)
                | (Self::InProgress, Self::Error)
                // a failed submission can be retried from scratch
                | (Self::Error, Self::Pending)
        )
    }
}

/// Read model of one persisted order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub id: OrderId,
    /// Payer identifier as selected on the order, if already resolved
    pub payer_id: Option<String>,
    pub payer_name: String,
    /// Key into the patient directory collaborator
    pub patient_ref: String,
    pub provider: ProviderRecord,
    pub facility: FacilityRecord,
    pub wound_type: WoundType,
    pub expected_service_date: NaiveDate,
    pub product_lines: Vec<ProductLine>,
    pub clinical: ClinicalData,
    pub eligibility_state: EligibilityState,
    pub eligibility_result: Option<EligibilityResult>,
    pub pre_auth_state: Option<PreAuthState>,
    pub pre_auth_result: Option<PreAuthorizationResult>,
}
