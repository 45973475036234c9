//! # Meridian Domain
//!
//! Business domain types and models for the Meridian eligibility engine.
//!
//! This crate contains:
//! - Canonical request/result types (EligibilityRequest, PreAuthorizationResult, etc.)
//! - Domain error types and Result definitions
//! - Payer profile value objects and code tables
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other Meridian crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::{EngineError, Result};
pub use types::eligibility::{
    Address, BenefitEntry, BenefitPlan, CostSharing, EligibilityRequest, EligibilityResult,
    EligibilityStatus, EncounterBlock, Gender, PayerIdentity, ProviderBlock, SubscriberBlock,
};
pub use types::order::{
    ClinicalData, DiagnosisInput, EligibilityState, FacilityKind, FacilityRecord, OrderId,
    OrderSnapshot, PatientRecord, PreAuthState, ProductLine, ProviderRecord, WoundType,
};
pub use types::payer::{
    AccessToken, DateFormat, PayerEndpoints, PayerProfile, RequiredField, WireFormat, WirePayload,
};
pub use types::preauth::{
    Diagnosis, MacInformation, PreAuthStatus, PreAuthorizationRequest, PreAuthorizationResult,
    ProviderNote, ServiceLine, Urgency,
};
pub use types::task::{CoverageDiscoveryTask, TaskStatus};
pub use types::validation::{ValidationCode, ValidationIssue, ValidationReport};
