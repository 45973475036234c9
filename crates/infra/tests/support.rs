//! Shared in-memory collaborator fakes for integration tests
#![allow(dead_code)] // not every test binary uses every helper

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use meridian_core::{CodeLookup, OrderRepository, PatientDirectory, TaskRepository};
use meridian_domain::{
    Address, ClinicalData, CoverageDiscoveryTask, DiagnosisInput, EligibilityResult,
    EligibilityState, FacilityKind, FacilityRecord, Gender, OrderId, OrderSnapshot, PatientRecord,
    PreAuthState, PreAuthorizationResult, ProductLine, ProviderRecord, Result, WoundType,
};

/// Single-order repository fake recording every state transition
pub struct InMemoryOrders {
    order: Mutex<OrderSnapshot>,
}

impl InMemoryOrders {
    pub fn new(order: OrderSnapshot) -> Self {
        Self { order: Mutex::new(order) }
    }

    pub fn snapshot(&self) -> OrderSnapshot {
        self.order.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrders {
    async fn load_order(&self, _order_id: OrderId) -> Result<OrderSnapshot> {
        Ok(self.snapshot())
    }

    async fn update_eligibility(
        &self,
        _order_id: OrderId,
        state: EligibilityState,
        result: Option<&EligibilityResult>,
    ) -> Result<()> {
        let mut order = self.order.lock().unwrap();
        order.eligibility_state = state;
        if let Some(result) = result {
            order.eligibility_result = Some(result.clone());
        }
        Ok(())
    }

    async fn update_pre_auth(
        &self,
        _order_id: OrderId,
        state: PreAuthState,
        result: Option<&PreAuthorizationResult>,
    ) -> Result<()> {
        let mut order = self.order.lock().unwrap();
        order.pre_auth_state = Some(state);
        if let Some(result) = result {
            order.pre_auth_result = Some(result.clone());
        }
        Ok(())
    }
}

/// Patient directory fake returning a fixed record
pub struct StaticPatients(pub Option<PatientRecord>);

#[async_trait]
impl PatientDirectory for StaticPatients {
    async fn lookup(&self, _patient_ref: &str) -> Result<Option<PatientRecord>> {
        Ok(self.0.clone())
    }
}

/// Code reference fake where every code exists
pub struct AllCodesKnown;

#[async_trait]
impl CodeLookup for AllCodesKnown {
    async fn icd10_exists(&self, _code: &str) -> Result<bool> {
        Ok(true)
    }

    async fn cpt_exists(&self, _code: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Vec-backed task repository fake
#[derive(Default)]
pub struct InMemoryTasks {
    tasks: Mutex<Vec<CoverageDiscoveryTask>>,
}

impl InMemoryTasks {
    pub fn all(&self) -> Vec<CoverageDiscoveryTask> {
        self.tasks.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTasks {
    async fn tasks_for_order(&self, order_id: OrderId) -> Result<Vec<CoverageDiscoveryTask>> {
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
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .find(|task| task.external_task_id == external_task_id)
            .cloned())
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

/// Wound-care order routed to Aetna (served through Availity)
pub fn aetna_order() -> OrderSnapshot {
    OrderSnapshot {
        id: 1,
        payer_id: None,
        payer_name: "Aetna".into(),
        patient_ref: "patient-1".into(),
        provider: ProviderRecord {
            npi: "1234567893".into(),
            first_name: "Alice".into(),
            last_name: "Rivera".into(),
            specialty: Some("Podiatry".into()),
            specialty_code: None,
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
            phone: None,
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
            secondary_diagnoses: Vec::new(),
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

pub fn sample_patient() -> PatientRecord {
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
        group_number: None,
    }
}
