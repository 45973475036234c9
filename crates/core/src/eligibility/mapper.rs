//! Canonical request construction
//!
//! Maps internal order/patient data to canonical eligibility and
//! pre-authorization requests. Pure functions of their inputs: the control
//! number comes from an injected generator and all code tables from the
//! payer profile.
//!
//! Missing patient data fails fast with a mapping error. In dry-run mode the
//! mapper substitutes fixed placeholder demographics instead and flags the
//! request, so the validator can refuse it for live submission; fabricated
//! PII-shaped data never reaches a real payer.

use std::sync::Arc;

use chrono::NaiveDate;
use meridian_domain::{
    ClinicalData, Diagnosis, EligibilityRequest, EligibilityResult, EncounterBlock, EngineError,
    Gender, MacInformation, OrderSnapshot, PatientRecord, PayerProfile, PreAuthorizationRequest,
    ProviderBlock, ProviderNote, Result, ServiceLine, SubscriberBlock, Urgency,
};

use crate::ids::ControlNumberGenerator;

/// Skin-substitute HCPCS codes used when an order carries no product lines.
const FALLBACK_PROCEDURE_CODES: &[&str] = &["Q4100", "Q4101"];

/// Member id placed on placeholder requests; recognizably fake.
const PLACEHOLDER_MEMBER_ID: &str = "PLACEHOLDER000";

/// Builds canonical payer requests from order data
pub struct RequestMapper {
    ids: Arc<dyn ControlNumberGenerator>,
    dry_run: bool,
}

impl RequestMapper {
    pub fn new(ids: Arc<dyn ControlNumberGenerator>) -> Self {
        Self { ids, dry_run: false }
    }

    /// Enable dry-run mode: missing patient records are substituted with
    /// flagged placeholder demographics instead of failing the mapping.
    pub fn with_dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Build a canonical eligibility request for one order.
    ///
    /// A fresh control number is drawn per call; retrying the same logical
    /// attempt must reuse the request object, not call this again.
    pub fn map_eligibility(
        &self,
        order: &OrderSnapshot,
        patient: Option<&PatientRecord>,
        profile: &PayerProfile,
    ) -> Result<EligibilityRequest> {
        let (patient, placeholder) = self.resolve_patient(order, patient)?;

        let control_number = self.ids.next(profile.control_number_width);
        let submitter_transaction_id = format!("TXN-{control_number}");

        let facility = &order.facility;
        let provider = ProviderBlock {
            npi: facility.npi.clone(),
            organization_name: facility.name.clone(),
            first_name: Some(order.provider.first_name.clone()),
            last_name: Some(order.provider.last_name.clone()),
            provider_code: profile.provider_code_for(facility.kind),
            taxonomy_code: profile.taxonomy_code_for(facility.kind),
            service_location: facility.address.clone(),
        };

        let subscriber = SubscriberBlock {
            member_id: patient.member_id.clone(),
            first_name: patient.first_name.clone(),
            last_name: patient.last_name.clone(),
            date_of_birth: patient.birth_date,
            gender: patient.gender,
            // the payer wants an address even for homeless/unknown patients;
            // fall back to the service facility
            address: patient.address.clone().or_else(|| Some(facility.address.clone())),
            group_number: patient.group_number.clone(),
        };

        let encounter = EncounterBlock {
            date_of_service: order.expected_service_date,
            service_type_codes: profile.service_type_codes_for(order.wound_type),
            place_of_service: profile.place_of_service_for(facility.kind),
            procedure_codes: procedure_codes_for(order),
        };

        Ok(EligibilityRequest {
            control_number,
            submitter_transaction_id,
            trading_partner_service_id: profile.trading_partner_service_id.clone(),
            payer_id: profile.payer_id.clone(),
            provider,
            subscriber,
            encounter,
            placeholder_demographics: placeholder,
        })
    }

    /// Build a canonical pre-authorization (service review) request.
    ///
    /// The payer identity prefers what the eligibility response confirmed
    /// over what the order submitted.
    pub fn map_pre_auth(
        &self,
        order: &OrderSnapshot,
        eligibility: &EligibilityResult,
        patient: Option<&PatientRecord>,
        profile: &PayerProfile,
    ) -> Result<PreAuthorizationRequest> {
        let (patient, placeholder) = self.resolve_patient(order, patient)?;

        let control_number = self.ids.next(profile.control_number_width);
        let submission_id = format!("PA-{control_number}");

        let payer_id = eligibility
            .payer
            .confirmed_id
            .clone()
            .or_else(|| eligibility.payer.submitted_id.clone())
            .unwrap_or_else(|| profile.payer_id.clone());
        let payer_name = eligibility
            .payer
            .confirmed_name
            .clone()
            .or_else(|| eligibility.payer.submitted_name.clone())
            .unwrap_or_else(|| order.payer_name.clone());

        let facility = &order.facility;
        let requesting_provider = ProviderBlock {
            npi: order.provider.npi.clone(),
            organization_name: facility.name.clone(),
            first_name: Some(order.provider.first_name.clone()),
            last_name: Some(order.provider.last_name.clone()),
            provider_code: profile.provider_code_for(facility.kind),
            taxonomy_code: profile.taxonomy_code_for(facility.kind),
            service_location: facility.address.clone(),
        };

        let subscriber = SubscriberBlock {
            member_id: patient.member_id.clone(),
            first_name: patient.first_name.clone(),
            last_name: patient.last_name.clone(),
            date_of_birth: patient.birth_date,
            gender: patient.gender,
            address: patient.address.clone(),
            group_number: patient.group_number.clone(),
        };

        let place_of_service_code = profile.place_of_service_for(facility.kind);
        let service_lines = build_service_lines(order, &place_of_service_code);
        let total_quantity = service_lines.iter().map(|line| line.quantity).sum::<u32>().max(1);

        // MAC jurisdiction is addressed from the patient, not the facility
        let mac_state = patient.address.as_ref().map(|a| a.state.as_str());
        let mac = Some(MacInformation {
            jurisdiction: mac_state.and_then(dme_mac_jurisdiction),
            contractor: None,
            place_of_service_code: Some(place_of_service_code.clone()),
        });

        Ok(PreAuthorizationRequest {
            submission_id,
            payer_id,
            payer_name,
            requesting_provider,
            subscriber,
            diagnoses: build_diagnoses(&order.clinical, order.expected_service_date),
            service_lines,
            service_type_code: profile
                .service_type_codes_for(order.wound_type)
                .first()
                .cloned()
                .unwrap_or_else(|| "30".to_string()),
            place_of_service_code,
            from_date: order.expected_service_date,
            to_date: order.expected_service_date,
            total_quantity,
            urgency: Urgency::Routine,
            provider_notes: build_provider_notes(&order.clinical),
            mac,
            placeholder_demographics: placeholder,
        })
    }

    /// Resolve the patient record, applying the dry-run placeholder policy.
    fn resolve_patient(
        &self,
        order: &OrderSnapshot,
        patient: Option<&PatientRecord>,
    ) -> Result<(PatientRecord, bool)> {
        match patient {
            Some(record) => Ok((record.clone(), false)),
            None if self.dry_run => Ok((placeholder_patient(), true)),
            None => Err(EngineError::Mapping(format!(
                "patient record unavailable for order {} (ref {})",
                order.id, order.patient_ref
            ))),
        }
    }
}

fn procedure_codes_for(order: &OrderSnapshot) -> Vec<String> {
    let mut codes: Vec<String> = Vec::new();
    for line in &order.product_lines {
        if !line.procedure_code.is_empty() && !codes.contains(&line.procedure_code) {
            codes.push(line.procedure_code.clone());
        }
    }
    if codes.is_empty() {
        codes = FALLBACK_PROCEDURE_CODES.iter().map(|c| (*c).to_string()).collect();
    }
    codes
}

fn build_service_lines(order: &OrderSnapshot, place_of_service_code: &str) -> Vec<ServiceLine> {
    let primary_diagnosis =
        order.clinical.primary_diagnosis.as_ref().map(|diagnosis| diagnosis.code.clone());

    order
        .product_lines
        .iter()
        .map(|line| ServiceLine {
            procedure_code: line.procedure_code.clone(),
            description: line.name.clone(),
            diagnosis_code: primary_diagnosis.clone(),
            quantity: line.quantity.max(1),
            quantity_type_code: "UN".to_string(),
            service_date: order.expected_service_date,
            place_of_service_code: place_of_service_code.to_string(),
        })
        .collect()
}

fn build_diagnoses(clinical: &ClinicalData, default_date: NaiveDate) -> Vec<Diagnosis> {
    let mut diagnoses = Vec::new();

    if let Some(primary) = &clinical.primary_diagnosis {
        diagnoses.push(Diagnosis {
            qualifier_code: "ABK".to_string(),
            code: primary.code.clone(),
            description: primary.description.clone(),
            date: Some(primary.date.unwrap_or(default_date)),
        });
    }

    for secondary in &clinical.secondary_diagnoses {
        diagnoses.push(Diagnosis {
            qualifier_code: "ABF".to_string(),
            code: secondary.code.clone(),
            description: secondary.description.clone(),
            date: Some(secondary.date.unwrap_or(default_date)),
        });
    }

    diagnoses
}

fn build_provider_notes(clinical: &ClinicalData) -> Vec<ProviderNote> {
    let mut notes = Vec::new();

    if let Some(justification) = &clinical.clinical_justification {
        notes.push(ProviderNote { type_code: "CER".to_string(), message: justification.clone() });
    }
    if let Some(assessment) = &clinical.wound_assessment {
        notes.push(ProviderNote { type_code: "ADD".to_string(), message: assessment.clone() });
    }
    if let Some(history) = &clinical.treatment_history {
        notes.push(ProviderNote { type_code: "DCP".to_string(), message: history.clone() });
    }

    notes
}

/// DME MAC jurisdiction (A-D) for a patient state.
fn dme_mac_jurisdiction(state: &str) -> Option<String> {
    const JURISDICTION_A: &[&str] =
        &["CT", "DE", "DC", "ME", "MD", "MA", "NH", "NJ", "NY", "PA", "RI", "VT"];
    const JURISDICTION_B: &[&str] = &["IL", "IN", "KY", "MI", "MN", "OH", "WI"];
    const JURISDICTION_C: &[&str] = &[
        "AL", "AR", "CO", "FL", "GA", "LA", "MS", "NM", "NC", "OK", "PR", "SC", "TN", "TX", "VA",
        "VI", "WV",
    ];
    const JURISDICTION_D: &[&str] = &[
        "AK", "AZ", "CA", "HI", "ID", "IA", "KS", "MO", "MT", "NE", "NV", "ND", "OR", "SD", "UT",
        "WA", "WY", "AS", "GU", "MP",
    ];

    let state = state.to_uppercase();
    let jurisdiction = if JURISDICTION_A.contains(&state.as_str()) {
        "DME A"
    } else if JURISDICTION_B.contains(&state.as_str()) {
        "DME B"
    } else if JURISDICTION_C.contains(&state.as_str()) {
        "DME C"
    } else if JURISDICTION_D.contains(&state.as_str()) {
        "DME D"
    } else {
        return None;
    };
    Some(jurisdiction.to_string())
}

fn placeholder_patient() -> PatientRecord {
    PatientRecord {
        first_name: "Test".to_string(),
        last_name: "Patient".to_string(),
        birth_date: NaiveDate::from_ymd_opt(1980, 1, 1).unwrap_or_default(),
        gender: Gender::Unknown,
        member_id: PLACEHOLDER_MEMBER_ID.to_string(),
        address: None,
        group_number: None,
    }
}
