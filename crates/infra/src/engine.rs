//! Engine assembly
//!
//! Wires the credential manager, payer gateways, registry, and orchestrator
//! from one [`EngineConfig`]. The calling application supplies the
//! collaborator ports (order persistence, patient directory, code
//! reference, task persistence).

use std::sync::Arc;

use meridian_common::SystemClock;
use meridian_core::{
    CodeLookup, OrderRepository, PatientDirectory, RandomControlNumbers, TaskRepository,
    WorkflowOrchestrator,
};
use meridian_domain::Result;

use crate::config::EngineConfig;
use crate::credentials::{CredentialManager, TokenEndpoint};
use crate::http::HttpClient;
use crate::payers::{AvailityGateway, OptumGateway, PayerRegistry};

/// Build a fully-wired orchestrator from configuration.
pub fn build_orchestrator(
    config: &EngineConfig,
    orders: Arc<dyn OrderRepository>,
    patients: Arc<dyn PatientDirectory>,
    codes: Arc<dyn CodeLookup>,
    tasks: Arc<dyn TaskRepository>,
) -> Result<WorkflowOrchestrator> {
    let http = HttpClient::new()?;

    let credentials = Arc::new(
        CredentialManager::new(http)
            .register(
                "availity",
                TokenEndpoint {
                    url: config.availity.token_url.clone(),
                    client_id: config.availity.client_id.clone(),
                    client_secret: config.availity.client_secret.clone(),
                    scopes: vec!["hipaa".into()],
                },
            )
            .register(
                "optum",
                TokenEndpoint {
                    url: config.optum.token_url.clone(),
                    client_id: config.optum.client_id.clone(),
                    client_secret: config.optum.client_secret.clone(),
                    scopes: vec!["eligibility".into()],
                },
            ),
    );

    let availity = Arc::new(AvailityGateway::new(&config.availity, credentials.clone())?);
    let optum = Arc::new(OptumGateway::new(&config.optum, credentials)?);

    let registry = Arc::new(
        PayerRegistry::new().register(availity).register(optum).with_default_routes(),
    );

    let mut orchestrator = WorkflowOrchestrator::new(
        orders,
        patients,
        codes,
        registry,
        tasks,
        Arc::new(RandomControlNumbers),
        Arc::new(SystemClock),
    )
    .with_dry_run(config.dry_run);

    if let Some(url) = &config.discovery_callback_url {
        orchestrator = orchestrator.with_discovery_callback_url(url.clone());
    }

    Ok(orchestrator)
}
