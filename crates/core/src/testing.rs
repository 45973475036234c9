//! Shared fixtures and in-memory fakes for core unit tests

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use meridian_domain::{
    Address, ClinicalData, CostSharing, CoverageDiscoveryTask, DateFormat, DiagnosisInput,
    EligibilityResult, EligibilityState, EligibilityStatus, FacilityKind, FacilityRecord, Gender,
    OrderSnapshot, PatientRecord, PayerIdentity, PayerProfile, ProductLine, ProviderRecord,
    RequiredField, Result, WireFormat, WoundType,
};
use serde_json::json;

use crate::ports::TaskRepository;

/// JSON-wire profile with the mapping tables the unit tests exercise.
pub(crate) fn test_profile() -> PayerProfile {
    let mut profile = PayerProfile::new("testpayer", "Test Payer");
    profile.wire_format = WireFormat::Json;
    profile.date_format = DateFormat::CompactYmd;

    profile.status_mappings.insert("active".into(), EligibilityStatus::Eligible);
    profile.status_mappings.insert("inactive".into(), EligibilityStatus::NotEligible);
    profile.status_mappings.insert("terminated".into(), EligibilityStatus::NotEligible);
    profile.status_mappings.insert("pending".into(), EligibilityStatus::Pending);
    profile.status_code_mappings.insert("1".into(), EligibilityStatus::Eligible);
    profile.status_code_mappings.insert("6".into(), EligibilityStatus::NotEligible);

    profile.service_type_codes.insert(WoundType::Dfu, vec!["30".into()]);
    profile.service_type_codes.insert(WoundType::Tw, vec!["1".into()]);
    profile.place_of_service_codes.insert(FacilityKind::Hospital, "21".into());
    profile.place_of_service_codes.insert(FacilityKind::HospitalOutpatient, "22".into());
    profile.place_of_service_codes.insert(FacilityKind::WoundCareCenter, "11".into());
    profile.provider_codes.insert(FacilityKind::Hospital, "H".into());
    profile.provider_codes.insert(FacilityKind::WoundCareCenter, "PC".into());
    profile.taxonomy_codes.insert(FacilityKind::WoundCareCenter, "261QP2300X".into());

    profile.required_fields =
        vec![RequiredField::MemberId, RequiredField::ProcedureCodes, RequiredField::PlaceOfService];
    profile
}

/// Form-wire profile (ISO dates, empty fields omitted).
pub(crate) fn form_profile() -> PayerProfile {
    let mut profile = test_profile();
    profile.payer_id = "formpayer".into();
    profile.display_name = "Form Payer".into();
    profile.wire_format = WireFormat::FormUrlEncoded;
    profile.date_format = DateFormat::Iso8601;
    profile.omit_empty_fields = true;
    profile
}

pub(crate) fn sample_order() -> OrderSnapshot {
    OrderSnapshot {
        id: 101,
        payer_id: Some("testpayer".into()),
        payer_name: "Test Payer".into(),
        patient_ref: "patient-1".into(),
        provider: ProviderRecord {
            npi: "1234567893".into(),
            first_name: "Alice".into(),
            last_name: "Rivera".into(),
            specialty: Some("Podiatry".into()),
            specialty_code: Some("213E00000X".into()),
            email: None,
            phone: None,
        },
        facility: FacilityRecord {
            npi: "1999999984".into(),
            name: "Summit Wound Care Center".into(),
            kind: FacilityKind::WoundCareCenter,
            address: Address {
                line1: "100 Main St".into(),
                city: "Austin".into(),
                state: "TX".into(),
                postal_code: "78701".into(),
            },
            phone: Some("512-555-0100".into()),
            fax: None,
        },
        wound_type: WoundType::Dfu,
        expected_service_date: NaiveDate::from_ymd_opt(2025, 7, 15).unwrap(),
        product_lines: vec![ProductLine {
            procedure_code: "Q4205".into(),
            name: "Membrane Graft".into(),
            quantity: 2,
        }],
        clinical: ClinicalData {
            primary_diagnosis: Some(DiagnosisInput {
                code: "E11.621".into(),
                description: "Type 2 diabetes mellitus with foot ulcer".into(),
                date: None,
            }),
            secondary_diagnoses: vec![DiagnosisInput {
                code: "L97.419".into(),
                description: "Non-pressure chronic ulcer of right heel".into(),
                date: None,
            }],
            clinical_justification: Some("Standard care failed after 4 weeks".into()),
            wound_assessment: None,
            treatment_history: None,
        },
        eligibility_state: EligibilityState::NotChecked,
        eligibility_result: None,
        pre_auth_state: None,
        pre_auth_result: None,
    }
}

pub(crate) fn sample_patient() -> PatientRecord {
    PatientRecord {
        first_name: "John".into(),
        last_name: "Doe".into(),
        birth_date: NaiveDate::from_ymd_opt(1980, 1, 15).unwrap(),
        gender: Gender::Male,
        member_id: "MBR12345".into(),
        address: Some(Address {
            line1: "200 Oak Ave".into(),
            city: "Austin".into(),
            state: "TX".into(),
            postal_code: "78702".into(),
        }),
        group_number: Some("G-100".into()),
    }
}

/// Mutex-backed task repository fake
#[derive(Default)]
pub(crate) struct InMemoryTaskRepo {
    tasks: Mutex<Vec<CoverageDiscoveryTask>>,
}

impl InMemoryTaskRepo {
    pub(crate) fn all(&self) -> Vec<CoverageDiscoveryTask> {
        self.tasks.lock().unwrap().clone()
    }

    pub(crate) fn find(&self, external_task_id: &str) -> Option<CoverageDiscoveryTask> {
        self.tasks
            .lock()
            .unwrap()
            .iter()
            .find(|task| task.external_task_id == external_task_id)
            .cloned()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepo {
    async fn tasks_for_order(&self, order_id: i64) -> Result<Vec<CoverageDiscoveryTask>> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|task| task.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn find_by_external_id(
        &self,
        external_task_id: &str,
    ) -> Result<Option<CoverageDiscoveryTask>> {
        Ok(self.find(external_task_id))
    }

    async fn insert_task(&self, task: &CoverageDiscoveryTask) -> Result<()> {
        self.tasks.lock().unwrap().push(task.clone());
        Ok(())
    }

    async fn update_task(&self, task: &CoverageDiscoveryTask) -> Result<()> {
        let mut tasks = self.tasks.lock().unwrap();
        if let Some(existing) =
            tasks.iter_mut().find(|t| t.external_task_id == task.external_task_id)
        {
            *existing = task.clone();
        }
        Ok(())
    }
}

pub(crate) fn sample_eligibility_result() -> EligibilityResult {
    EligibilityResult {
        status: EligibilityStatus::Eligible,
        control_number: Some("000000042".into()),
        coverage_id: Some("cov-77".into()),
        payer: PayerIdentity {
            submitted_id: Some("testpayer".into()),
            submitted_name: Some("Test Payer".into()),
            confirmed_id: None,
            confirmed_name: None,
        },
        plans: Vec::new(),
        cost_sharing: CostSharing::default(),
        prior_authorization_required: true,
        validation_messages: Vec::new(),
        error_message: None,
        raw_response: Some(json!({ "status": "Active" })),
        checked_at: Utc::now(),
    }
}
