//! Workflow orchestration - core business logic
//!
//! Drives an order from "check eligibility" through pre-authorization
//! tracking. The orchestrator is the error boundary: mapper, validator, and
//! gateway failures are classified here, logged with order correlation
//! fields, and converted into a terminal `error` state plus a result object
//! carrying the message and timestamp. Callers never see raw transport
//! errors, and an order's last known-good result survives a failed re-check.

use std::sync::Arc;

use meridian_common::Clock;
use meridian_domain::{
    EligibilityResult, EligibilityState, EligibilityStatus, EngineError, OrderId, OrderSnapshot,
    PreAuthState, PreAuthStatus, PreAuthorizationResult, Result,
};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::eligibility::mapper::RequestMapper;
use crate::eligibility::normalizer::{normalize_eligibility, normalize_pre_auth};
use crate::eligibility::validator::RequestValidator;
use crate::eligibility::wire::{render_coverage_discovery, render_eligibility, render_pre_auth};
use crate::ids::ControlNumberGenerator;
use crate::ports::{
    CodeLookup, GatewayRegistry, OrderRepository, PatientDirectory, PayerGateway, TaskRepository,
};
use crate::workflow::lease::LeaseRegistry;
use crate::workflow::tasks::TaskTracker;

/// Transport-level failures (no upstream status) are retried once with the
/// same rendered payload, keeping the control number stable for the attempt.
const MAX_SUBMIT_ATTEMPTS: usize = 2;

/// Sequences eligibility checks and pre-authorization workflows per order
pub struct WorkflowOrchestrator {
    orders: Arc<dyn OrderRepository>,
    patients: Arc<dyn PatientDirectory>,
    codes: Arc<dyn CodeLookup>,
    registry: Arc<dyn GatewayRegistry>,
    mapper: RequestMapper,
    validator: RequestValidator,
    tasks: TaskTracker,
    leases: LeaseRegistry,
    clock: Arc<dyn Clock>,
    dry_run: bool,
    discovery_callback_url: Option<String>,
}

impl WorkflowOrchestrator {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        patients: Arc<dyn PatientDirectory>,
        codes: Arc<dyn CodeLookup>,
        registry: Arc<dyn GatewayRegistry>,
        task_repo: Arc<dyn TaskRepository>,
        ids: Arc<dyn ControlNumberGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            orders,
            patients,
            codes,
            registry,
            mapper: RequestMapper::new(ids),
            validator: RequestValidator::new(),
            tasks: TaskTracker::new(task_repo, Arc::clone(&clock)),
            leases: LeaseRegistry::new(),
            clock,
            dry_run: false,
            discovery_callback_url: None,
        }
    }

    /// Run against a payer sandbox: missing patient records become flagged
    /// placeholders and the validator lets them through. Never enable this
    /// for a live payer environment.
    pub fn with_dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self.mapper = self.mapper.with_dry_run(enabled);
        self.validator = self.validator.allow_placeholder(enabled);
        self
    }

    /// Callback URL handed to the coverage-discovery service for live runs.
    pub fn with_discovery_callback_url(mut self, url: impl Into<String>) -> Self {
        self.discovery_callback_url = Some(url.into());
        self
    }

    /// Check eligibility for an order.
    ///
    /// At most one check runs per order at a time; a concurrent second call
    /// is rejected with a conflict rather than queued. Operational failures
    /// come back as a result with status `error`; the order keeps its last
    /// known-good result.
    pub async fn check_eligibility(&self, order_id: OrderId) -> Result<EligibilityResult> {
        let _lease = self.leases.try_acquire(order_id).ok_or_else(|| {
            EngineError::Conflict(format!("eligibility check already in flight for order {order_id}"))
        })?;

        let order = self.orders.load_order(order_id).await?;
        if order.eligibility_state == EligibilityState::Checking {
            // a prior attempt died after persisting `checking`; the lease is
            // authoritative for in-flight work, so recover instead of wedging
            warn!(order_id, "order was left in checking by a prior attempt, re-checking");
        }

        info!(order_id, payer = %order.payer_name, "starting eligibility check");
        self.orders.update_eligibility(order_id, EligibilityState::Checking, None).await?;

        match self.run_eligibility_check(&order).await {
            Ok(result) => {
                let state = eligibility_state_for(result.status);
                debug_assert!(EligibilityState::Checking.can_transition_to(state));
                self.orders.update_eligibility(order_id, state, Some(&result)).await?;

                if result.prior_authorization_required {
                    info!(order_id, "prior authorization required, opening pre-auth workflow");
                    self.orders
                        .update_pre_auth(order_id, PreAuthState::NotStarted, None)
                        .await?;
                }

                info!(
                    order_id,
                    status = result.status.as_str(),
                    pre_auth_required = result.prior_authorization_required,
                    "eligibility check completed"
                );
                Ok(result)
            }
            Err(err) => {
                self.log_classified(order_id, &err);
                // state goes terminal, stored result stays untouched so the
                // last known-good outcome survives a transient failure
                self.orders.update_eligibility(order_id, EligibilityState::Error, None).await?;

                let mut result =
                    EligibilityResult::from_error(err.to_string(), self.clock.utc_now());
                if let EngineError::Validation(report) = &err {
                    result.validation_messages = report
                        .issues
                        .iter()
                        .map(|issue| {
                            format!("{} [{}]: {}", issue.field, issue.code.as_str(), issue.message)
                        })
                        .collect();
                }
                Ok(result)
            }
        }
    }

    async fn run_eligibility_check(&self, order: &OrderSnapshot) -> Result<EligibilityResult> {
        let Some(gateway) = self.resolve_gateway(order) else {
            let submitted = order.payer_id.clone().unwrap_or_else(|| order.payer_name.clone());
            warn!(order_id = order.id, payer = %submitted, "payer not supported, skipping upstream call");
            return Ok(EligibilityResult::unsupported_payer(submitted, self.clock.utc_now()));
        };
        let profile = gateway.profile();

        let patient = self.patients.lookup(&order.patient_ref).await?;
        let request = self.mapper.map_eligibility(order, patient.as_ref(), profile)?;

        let report = self.validator.validate(&request, profile);
        if !report.is_empty() {
            return Err(EngineError::Validation(report));
        }

        let payload = render_eligibility(&request, profile);
        debug!(
            order_id = order.id,
            payer_id = %profile.payer_id,
            control_number = %request.control_number,
            "submitting eligibility request"
        );

        // bounded retry for transport-level failures only; the payload (and
        // with it the control number) is stable across attempts
        let mut last_err = None;
        for attempt in 1..=MAX_SUBMIT_ATTEMPTS {
            match gateway.check_eligibility(&payload).await {
                Ok(raw) => {
                    return Ok(normalize_eligibility(&raw, profile, self.clock.utc_now()));
                }
                Err(EngineError::Upstream { status: None, body }) if attempt < MAX_SUBMIT_ATTEMPTS => {
                    warn!(
                        order_id = order.id,
                        attempt,
                        "transport failure during eligibility check, retrying same payload"
                    );
                    last_err = Some(EngineError::Upstream { status: None, body });
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_err
            .unwrap_or_else(|| EngineError::Internal("eligibility retry loop exhausted".into())))
    }

    /// Submit a pre-authorization (service review) for an order that
    /// requires one.
    pub async fn submit_pre_authorization(
        &self,
        order_id: OrderId,
    ) -> Result<PreAuthorizationResult> {
        let _lease = self.leases.try_acquire(order_id).ok_or_else(|| {
            EngineError::Conflict(format!("pre-auth operation already in flight for order {order_id}"))
        })?;

        let order = self.orders.load_order(order_id).await?;
        let Some(eligibility) = order.eligibility_result.clone() else {
            return Err(EngineError::Mapping(format!(
                "order {order_id} has no eligibility result to submit a pre-authorization from"
            )));
        };

        // Completed is final; anything else may (re-)enter the submission
        // path, including Pending/InProgress rows left by a crashed attempt
        let current = order.pre_auth_state.unwrap_or(PreAuthState::NotStarted);
        if current == PreAuthState::Completed {
            return Err(EngineError::Conflict(format!(
                "order {order_id} pre-authorization is already completed"
            )));
        }

        info!(order_id, "starting pre-authorization submission");
        self.orders.update_pre_auth(order_id, PreAuthState::Pending, None).await?;

        match self.run_pre_auth_submission(&order, &eligibility).await {
            Ok(result) => {
                match result.status {
                    PreAuthStatus::Error | PreAuthStatus::UnsupportedPayer => {
                        self.orders
                            .update_pre_auth(order_id, PreAuthState::Error, Some(&result))
                            .await?;
                    }
                    status => {
                        self.orders
                            .update_pre_auth(order_id, PreAuthState::InProgress, Some(&result))
                            .await?;
                        // a synchronous decision settles the workflow immediately
                        if matches!(
                            status,
                            PreAuthStatus::Approved
                                | PreAuthStatus::Denied
                                | PreAuthStatus::Cancelled
                        ) {
                            self.orders
                                .update_pre_auth(order_id, PreAuthState::Completed, Some(&result))
                                .await?;
                        }
                    }
                }
                info!(
                    order_id,
                    status = result.status.as_str(),
                    authorization = result.authorization_number.as_deref().unwrap_or(""),
                    "pre-authorization submitted"
                );
                Ok(result)
            }
            Err(err) => {
                self.log_classified(order_id, &err);
                self.orders.update_pre_auth(order_id, PreAuthState::Error, None).await?;
                Ok(PreAuthorizationResult::from_error(err.to_string(), self.clock.utc_now()))
            }
        }
    }

    async fn run_pre_auth_submission(
        &self,
        order: &OrderSnapshot,
        eligibility: &EligibilityResult,
    ) -> Result<PreAuthorizationResult> {
        let Some(gateway) = self.resolve_gateway(order) else {
            warn!(order_id = order.id, "payer not supported for pre-authorization");
            return Ok(PreAuthorizationResult::unsupported_payer(self.clock.utc_now()));
        };
        let profile = gateway.profile();

        let patient = self.patients.lookup(&order.patient_ref).await?;
        let request = self.mapper.map_pre_auth(order, eligibility, patient.as_ref(), profile)?;

        let report = self.validator.validate_pre_auth(&request, profile);
        if !report.is_empty() {
            return Err(EngineError::Validation(report));
        }

        self.warn_on_unknown_codes(&request).await;

        let payload = render_pre_auth(&request, profile);
        debug!(
            order_id = order.id,
            payer_id = %profile.payer_id,
            submission_id = %request.submission_id,
            "submitting service review"
        );
        let raw = gateway.submit_service_review(&payload).await?;
        Ok(normalize_pre_auth(&raw, self.clock.utc_now()))
    }

    /// Kick off asynchronous coverage discovery for an order and record the
    /// returned sub-tasks. Idempotent per external task id.
    pub async fn run_coverage_discovery(&self, order_id: OrderId) -> Result<usize> {
        let _lease = self.leases.try_acquire(order_id).ok_or_else(|| {
            EngineError::Conflict(format!("pre-auth operation already in flight for order {order_id}"))
        })?;

        let order = self.orders.load_order(order_id).await?;
        let Some(eligibility) = order.eligibility_result.clone() else {
            return Err(EngineError::Mapping(format!(
                "order {order_id} has no eligibility result to run coverage discovery from"
            )));
        };

        let current = order.pre_auth_state.unwrap_or(PreAuthState::NotStarted);
        if current == PreAuthState::Completed {
            return Err(EngineError::Conflict(format!(
                "order {order_id} pre-authorization is already completed"
            )));
        }

        let Some(gateway) = self.resolve_gateway(&order) else {
            return Err(EngineError::UnsupportedPayer(
                order.payer_id.unwrap_or(order.payer_name),
            ));
        };

        info!(order_id, "starting coverage discovery");
        self.orders.update_pre_auth(order_id, PreAuthState::Pending, None).await?;

        let payload = render_coverage_discovery(
            &eligibility,
            self.dry_run,
            self.discovery_callback_url.as_deref(),
        );

        match gateway.start_coverage_discovery(&payload).await {
            Ok(raw) => {
                let created = self.tasks.create_from_discovery(order_id, &raw).await?;
                self.orders.update_pre_auth(order_id, PreAuthState::InProgress, None).await?;
                info!(order_id, tasks = created.len(), "coverage discovery in progress");
                Ok(created.len())
            }
            Err(err) => {
                self.log_classified(order_id, &err);
                self.orders.update_pre_auth(order_id, PreAuthState::Error, None).await?;
                Err(err)
            }
        }
    }

    /// Apply an inbound coverage-discovery callback and, when this settles
    /// the last pending task, complete the order's pre-auth workflow.
    pub async fn handle_discovery_callback(
        &self,
        external_task_id: &str,
        payload: &Value,
    ) -> Result<()> {
        let completion = self.tasks.handle_callback(external_task_id, payload).await?;
        if !completion.is_settled() {
            return Ok(());
        }

        let order = self.orders.load_order(completion.order_id).await?;
        // re-delivered callbacks may settle an already-settled order
        if order.pre_auth_state != Some(PreAuthState::InProgress) {
            debug!(
                order_id = completion.order_id,
                "callback settled tasks but pre-auth is not in progress, leaving state as-is"
            );
            return Ok(());
        }

        let state = if completion.has_failures() {
            PreAuthState::Error
        } else {
            PreAuthState::Completed
        };
        debug_assert!(PreAuthState::InProgress.can_transition_to(state));
        self.orders.update_pre_auth(completion.order_id, state, None).await?;
        info!(
            order_id = completion.order_id,
            failed = completion.failed,
            total = completion.total,
            "coverage discovery settled"
        );
        Ok(())
    }

    /// Poll the payer for the current status of a submitted pre-auth.
    pub async fn poll_pre_authorization(
        &self,
        order_id: OrderId,
    ) -> Result<PreAuthorizationResult> {
        let order = self.orders.load_order(order_id).await?;
        let Some(previous) = order.pre_auth_result.clone() else {
            return Err(EngineError::NotFound(format!(
                "order {order_id} has no submitted pre-authorization to poll"
            )));
        };
        let Some(reference) = previous
            .payer_transaction_id
            .clone()
            .or_else(|| previous.reference_number.clone())
        else {
            return Err(EngineError::NotFound(format!(
                "order {order_id} pre-authorization has no payer reference to poll"
            )));
        };

        let Some(gateway) = self.resolve_gateway(&order) else {
            return Err(EngineError::UnsupportedPayer(
                order.payer_id.unwrap_or(order.payer_name),
            ));
        };

        let raw = gateway.poll_service_review(&reference).await?;
        let result = normalize_pre_auth(&raw, self.clock.utc_now());

        let settled = matches!(
            result.status,
            PreAuthStatus::Approved | PreAuthStatus::Denied | PreAuthStatus::Cancelled
        );
        let state = if settled { PreAuthState::Completed } else { PreAuthState::InProgress };
        if order.pre_auth_state == Some(PreAuthState::InProgress) {
            self.orders.update_pre_auth(order_id, state, Some(&result)).await?;
        }

        debug!(order_id, status = result.status.as_str(), "pre-authorization polled");
        Ok(result)
    }

    /// Void a submitted pre-authorization with the payer.
    pub async fn cancel_pre_authorization(&self, order_id: OrderId) -> Result<bool> {
        let order = self.orders.load_order(order_id).await?;
        let Some(previous) = order.pre_auth_result.clone() else {
            return Err(EngineError::NotFound(format!(
                "order {order_id} has no submitted pre-authorization to cancel"
            )));
        };
        let Some(reference) = previous.payer_transaction_id.clone() else {
            return Err(EngineError::NotFound(format!(
                "order {order_id} pre-authorization has no payer reference to cancel"
            )));
        };
        let Some(gateway) = self.resolve_gateway(&order) else {
            return Err(EngineError::UnsupportedPayer(
                order.payer_id.unwrap_or(order.payer_name),
            ));
        };

        let accepted = gateway.void_service_review(&reference).await?;
        if accepted {
            let mut result = previous;
            result.status = PreAuthStatus::Cancelled;
            self.orders.update_pre_auth(order_id, PreAuthState::Completed, Some(&result)).await?;
            info!(order_id, "pre-authorization voided");
        }
        Ok(accepted)
    }

    /// Fetch coverage detail by payer coverage id.
    pub async fn coverage_details(&self, payer: &str, coverage_id: &str) -> Result<Value> {
        let payer_id = self
            .registry
            .resolve_payer_id(payer)
            .ok_or_else(|| EngineError::UnsupportedPayer(payer.to_string()))?;
        let gateway = self
            .registry
            .gateway_for(&payer_id)
            .ok_or_else(|| EngineError::UnsupportedPayer(payer.to_string()))?;
        gateway.get_coverage(coverage_id).await
    }

    /// Authenticated reachability probe against a payer's health endpoint.
    pub async fn payer_health(&self, payer: &str) -> Result<bool> {
        let payer_id = self
            .registry
            .resolve_payer_id(payer)
            .ok_or_else(|| EngineError::UnsupportedPayer(payer.to_string()))?;
        let gateway = self
            .registry
            .gateway_for(&payer_id)
            .ok_or_else(|| EngineError::UnsupportedPayer(payer.to_string()))?;
        gateway.check_health().await
    }

    fn resolve_gateway(&self, order: &OrderSnapshot) -> Option<Arc<dyn PayerGateway>> {
        let submitted = order.payer_id.as_deref().unwrap_or(&order.payer_name);
        let payer_id = self.registry.resolve_payer_id(submitted)?;
        if !self.registry.is_supported(&payer_id) {
            return None;
        }
        self.registry.gateway_for(&payer_id)
    }

    async fn warn_on_unknown_codes(&self, request: &meridian_domain::PreAuthorizationRequest) {
        for diagnosis in &request.diagnoses {
            match self.codes.icd10_exists(&diagnosis.code).await {
                Ok(true) => {}
                Ok(false) => {
                    warn!(code = %diagnosis.code, "ICD-10 code not found in reference data")
                }
                Err(err) => debug!(error = %err, "ICD-10 reference lookup unavailable"),
            }
        }
        for line in &request.service_lines {
            match self.codes.cpt_exists(&line.procedure_code).await {
                Ok(true) => {}
                Ok(false) => {
                    warn!(code = %line.procedure_code, "procedure code not found in reference data")
                }
                Err(err) => debug!(error = %err, "procedure reference lookup unavailable"),
            }
        }
    }

    fn log_classified(&self, order_id: OrderId, err: &EngineError) {
        if err.is_expected_outcome() {
            warn!(order_id, kind = err.kind(), error = %err, "workflow step ended with expected failure");
        } else {
            error!(order_id, kind = err.kind(), error = %err, "workflow step failed");
        }
    }
}

const fn eligibility_state_for(status: EligibilityStatus) -> EligibilityState {
    match status {
        EligibilityStatus::Eligible => EligibilityState::Eligible,
        EligibilityStatus::NotEligible => EligibilityState::NotEligible,
        EligibilityStatus::Pending => EligibilityState::Pending,
        EligibilityStatus::NeedsReview => EligibilityState::NeedsReview,
        EligibilityStatus::Error => EligibilityState::Error,
        EligibilityStatus::UnsupportedPayer => EligibilityState::UnsupportedPayer,
    }
}
