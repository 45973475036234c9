//! Port interfaces for the eligibility engine
//!
//! These traits define the boundaries between core business logic and
//! infrastructure implementations. Persistence and patient lookup are
//! external collaborators; the engine only sees these interfaces.

use std::sync::Arc;

use async_trait::async_trait;
use meridian_domain::{
    AccessToken, CoverageDiscoveryTask, EligibilityResult, EligibilityState, EngineError, OrderId,
    OrderSnapshot, PatientRecord, PayerProfile, PreAuthState, PreAuthorizationResult, Result,
    WirePayload,
};
use serde_json::Value;

/// Trait for reading and updating persisted orders
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Load the current snapshot of an order
    async fn load_order(&self, order_id: OrderId) -> Result<OrderSnapshot>;

    /// Persist an eligibility state transition.
    ///
    /// `result` is `None` on error transitions so the order's last
    /// known-good result is retained.
    async fn update_eligibility(
        &self,
        order_id: OrderId,
        state: EligibilityState,
        result: Option<&EligibilityResult>,
    ) -> Result<()>;

    /// Persist a pre-authorization state transition.
    async fn update_pre_auth(
        &self,
        order_id: OrderId,
        state: PreAuthState,
        result: Option<&PreAuthorizationResult>,
    ) -> Result<()>;
}

/// Trait for persisting coverage-discovery tasks
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// All tasks owned by an order
    async fn tasks_for_order(&self, order_id: OrderId) -> Result<Vec<CoverageDiscoveryTask>>;

    /// Look up one task by its external (payer-assigned) identifier
    async fn find_by_external_id(
        &self,
        external_task_id: &str,
    ) -> Result<Option<CoverageDiscoveryTask>>;

    /// Insert a new task row
    async fn insert_task(&self, task: &CoverageDiscoveryTask) -> Result<()>;

    /// Update an existing task row (matched by external id)
    async fn update_task(&self, task: &CoverageDiscoveryTask) -> Result<()>;
}

/// Trait for the patient-record collaborator (demographics lookup)
#[async_trait]
pub trait PatientDirectory: Send + Sync {
    /// Demographic record for a patient reference, or `None` when the
    /// upstream record is unavailable
    async fn lookup(&self, patient_ref: &str) -> Result<Option<PatientRecord>>;
}

/// Trait for local code-reference lookups (ICD-10 / CPT)
#[async_trait]
pub trait CodeLookup: Send + Sync {
    async fn icd10_exists(&self, code: &str) -> Result<bool>;
    async fn cpt_exists(&self, code: &str) -> Result<bool>;
}

/// Provides payer-scoped bearer tokens for gateway calls
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Retrieve a valid token for the payer, re-authenticating if the cached
    /// one is stale
    async fn access_token(&self, payer_id: &str) -> Result<AccessToken>;
}

/// Transport-level client for one external payer API
///
/// Implementations own transport concerns only: bearer auth, content type,
/// request timeouts, and classification of non-2xx responses into
/// [`EngineError::Upstream`]. They never interpret business semantics of the
/// payload.
#[async_trait]
pub trait PayerGateway: Send + Sync {
    /// Profile describing this payer's wire conventions and code tables
    fn profile(&self) -> &PayerProfile;

    /// Submit an eligibility check payload
    async fn check_eligibility(&self, payload: &WirePayload) -> Result<Value>;

    /// Kick off asynchronous coverage discovery
    async fn start_coverage_discovery(&self, _payload: &Value) -> Result<Value> {
        Err(EngineError::Config(format!(
            "payer {} does not expose a coverage-discovery endpoint",
            self.profile().payer_id
        )))
    }

    /// Submit a service review (pre-authorization) request
    async fn submit_service_review(&self, _payload: &Value) -> Result<Value> {
        Err(EngineError::Config(format!(
            "payer {} does not expose a service-review endpoint",
            self.profile().payer_id
        )))
    }

    /// Poll the status of a submitted service review
    async fn poll_service_review(&self, _reference_id: &str) -> Result<Value> {
        Err(EngineError::Config(format!(
            "payer {} does not expose a service-review endpoint",
            self.profile().payer_id
        )))
    }

    /// Void a submitted service review; returns whether the payer accepted
    async fn void_service_review(&self, _reference_id: &str) -> Result<bool> {
        Ok(false)
    }

    /// Fetch coverage detail by the payer-assigned coverage id
    async fn get_coverage(&self, _coverage_id: &str) -> Result<Value> {
        Err(EngineError::Config(format!(
            "payer {} does not expose a coverage endpoint",
            self.profile().payer_id
        )))
    }

    /// Lightweight reachability probe against the payer health endpoint
    async fn check_health(&self) -> Result<bool> {
        Ok(false)
    }
}

/// Registry of configured payer gateways
///
/// Resolution is case-insensitive and accepts either a gateway payer id or a
/// payer display name as selected on the order.
pub trait GatewayRegistry: Send + Sync {
    /// Resolve an order's payer id/name to a gateway payer id
    fn resolve_payer_id(&self, payer_name_or_id: &str) -> Option<String>;

    /// Whether the payer is in the supported list
    fn is_supported(&self, payer_id: &str) -> bool;

    /// The gateway handling a supported payer
    fn gateway_for(&self, payer_id: &str) -> Option<Arc<dyn PayerGateway>>;
}
