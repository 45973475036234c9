//! End-to-end workflow tests against a mocked Availity API
//!
//! Exercises the wired engine: one OAuth grant shared across calls,
//! form-encoded coverage submission, prior-authorization detection, service
//! review submission, and the unsupported-payer short-circuit.

mod support;

use std::sync::Arc;

use meridian_domain::{
    EligibilityState, EligibilityStatus, PreAuthState, PreAuthStatus,
};
use meridian_infra::{build_orchestrator, AvailityConfig, EngineConfig, OptumConfig};
use serde_json::json;
use support::{aetna_order, sample_patient, AllCodesKnown, InMemoryOrders, StaticPatients};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn engine_config(server: &MockServer) -> EngineConfig {
    EngineConfig {
        dry_run: false,
        discovery_callback_url: None,
        availity: AvailityConfig {
            base_url: server.uri(),
            service_reviews_base_url: server.uri(),
            token_url: format!("{}/token", server.uri()),
            client_id: "av-client".into(),
            client_secret: "av-secret".into(),
        },
        optum: OptumConfig {
            base_url: server.uri(),
            token_url: format!("{}/token", server.uri()),
            client_id: "op-client".into(),
            client_secret: "op-secret".into(),
            ..OptumConfig::default()
        },
    }
}

async fn mount_token_endpoint(server: &MockServer, expected_grants: u64) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "integration-token",
            "token_type": "bearer",
            "expires_in": 3600
        })))
        .expect(expected_grants)
        .mount(server)
        .await;
}

#[tokio::test]
async fn eligibility_check_flows_through_token_and_coverages() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/coverages"))
        .and(header("Authorization", "Bearer integration-token"))
        .and(body_string_contains("providerNpi=1999999984"))
        .and(body_string_contains("patientBirthDate=1980-01-15"))
        .and(body_string_contains("memberId=MBR12345"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Active",
            "statusCode": "1",
            "controlNumber": "000000042",
            "payer": { "payerId": "AETNA", "name": "Aetna" },
            "plans": [{
                "description": "Open Choice PPO",
                "groupNumber": "G-7001",
                "eligibilityStartDate": "2025-01-01",
                "insuranceType": "PPO"
            }],
            "benefits": [
                { "type": "copay", "amount": 25.0 },
                { "name": "Medical Care", "benefitQualifier": "AR" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let orders = Arc::new(InMemoryOrders::new(aetna_order()));
    let config = engine_config(&server);
    let orchestrator = build_orchestrator(
        &config,
        orders.clone(),
        Arc::new(StaticPatients(Some(sample_patient()))),
        Arc::new(AllCodesKnown),
        Arc::new(support::InMemoryTasks::default()),
    )
    .unwrap();

    let result = orchestrator.check_eligibility(1).await.unwrap();

    assert_eq!(result.status, EligibilityStatus::Eligible);
    assert!(result.prior_authorization_required);
    assert_eq!(result.cost_sharing.copay, Some(25.0));
    assert_eq!(result.plans[0].group_number.as_deref(), Some("G-7001"));

    let order = orders.snapshot();
    assert_eq!(order.eligibility_state, EligibilityState::Eligible);
    assert_eq!(order.pre_auth_state, Some(PreAuthState::NotStarted));
    // raw payload retained for audit
    assert!(order.eligibility_result.unwrap().raw_response.is_some());
}

#[tokio::test]
async fn token_is_granted_once_across_check_and_submission() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/coverages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Active",
            "benefits": [ { "benefitQualifier": "AR" } ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/service-reviews"))
        .and(header("Authorization", "Bearer integration-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "SR-100",
            "status": "submitted",
            "certificationNumber": "CERT-77"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let orders = Arc::new(InMemoryOrders::new(aetna_order()));
    let config = engine_config(&server);
    let orchestrator = build_orchestrator(
        &config,
        orders.clone(),
        Arc::new(StaticPatients(Some(sample_patient()))),
        Arc::new(AllCodesKnown),
        Arc::new(support::InMemoryTasks::default()),
    )
    .unwrap();

    orchestrator.check_eligibility(1).await.unwrap();
    let pre_auth = orchestrator.submit_pre_authorization(1).await.unwrap();

    assert_eq!(pre_auth.status, PreAuthStatus::Submitted);
    assert_eq!(pre_auth.authorization_number.as_deref(), Some("CERT-77"));
    let order = orders.snapshot();
    assert_eq!(order.pre_auth_state, Some(PreAuthState::InProgress));
    // wiremock verifies the token endpoint served exactly one grant
}

#[tokio::test]
async fn unsupported_payer_never_reaches_the_network() {
    let server = MockServer::start().await;
    // no mocks mounted: any request would fail the test via wiremock's
    // unmatched-request accounting
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let mut order = aetna_order();
    order.payer_name = "Acme Regional Health".into();
    let orders = Arc::new(InMemoryOrders::new(order));
    let config = engine_config(&server);
    let orchestrator = build_orchestrator(
        &config,
        orders.clone(),
        Arc::new(StaticPatients(Some(sample_patient()))),
        Arc::new(AllCodesKnown),
        Arc::new(support::InMemoryTasks::default()),
    )
    .unwrap();

    let result = orchestrator.check_eligibility(1).await.unwrap();

    assert_eq!(result.status, EligibilityStatus::UnsupportedPayer);
    assert_eq!(orders.snapshot().eligibility_state, EligibilityState::UnsupportedPayer);
}

#[tokio::test]
async fn upstream_rejection_lands_in_error_state_with_prior_result_kept() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/coverages"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal payer error"))
        .expect(1)
        .mount(&server)
        .await;

    let mut order = aetna_order();
    order.eligibility_state = EligibilityState::Eligible;
    order.eligibility_result = Some(meridian_domain::EligibilityResult {
        status: EligibilityStatus::Eligible,
        error_message: None,
        ..meridian_domain::EligibilityResult::from_error("seed", chrono::Utc::now())
    });

    let orders = Arc::new(InMemoryOrders::new(order));
    let config = engine_config(&server);
    let orchestrator = build_orchestrator(
        &config,
        orders.clone(),
        Arc::new(StaticPatients(Some(sample_patient()))),
        Arc::new(AllCodesKnown),
        Arc::new(support::InMemoryTasks::default()),
    )
    .unwrap();

    let result = orchestrator.check_eligibility(1).await.unwrap();

    assert_eq!(result.status, EligibilityStatus::Error);
    assert!(result.error_message.as_deref().unwrap_or("").contains("internal payer error"));

    let order = orders.snapshot();
    assert_eq!(order.eligibility_state, EligibilityState::Error);
    // the stored result is still the prior known-good one
    assert_eq!(order.eligibility_result.unwrap().status, EligibilityStatus::Eligible);
}
