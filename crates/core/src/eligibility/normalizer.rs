//! Response normalization
//!
//! Maps heterogeneous payer responses into the canonical result model.
//! Status determination is table-driven through the payer profile; anything
//! the table does not recognize lands in `needs_review`, never silently in
//! `eligible`. Prior-authorization detection is one explicit predicate so
//! every call site shares the same (admittedly lossy) heuristic.

use chrono::{DateTime, NaiveDate, Utc};
use meridian_domain::constants::{PRIOR_AUTH_BENEFIT_NAMES, PRIOR_AUTH_QUALIFIER_CODES};
use meridian_domain::{
    BenefitEntry, BenefitPlan, CostSharing, EligibilityResult, PayerIdentity, PayerProfile,
    PreAuthStatus, PreAuthorizationResult,
};
use serde_json::Value;

/// Normalize a raw eligibility response into the canonical result.
pub fn normalize_eligibility(
    raw: &Value,
    profile: &PayerProfile,
    checked_at: DateTime<Utc>,
) -> EligibilityResult {
    let raw_status = extract_status_string(raw);
    let raw_code = raw.get("statusCode").and_then(Value::as_str);
    let status = profile.map_status(&raw_status, raw_code);

    let plans = extract_plans(raw);
    let benefits = extract_benefit_entries(raw);
    let prior_authorization_required = requires_prior_authorization(&plans, &benefits);

    EligibilityResult {
        status,
        control_number: raw.get("controlNumber").and_then(Value::as_str).map(String::from),
        coverage_id: raw.get("id").and_then(Value::as_str).map(String::from),
        payer: extract_payer_identity(raw),
        cost_sharing: extract_cost_sharing(&benefits),
        plans,
        prior_authorization_required,
        validation_messages: extract_validation_messages(raw),
        error_message: None,
        raw_response: Some(raw.clone()),
        checked_at,
    }
}

/// Explicit prior-authorization predicate.
///
/// True when any plan carries the payer's authorization flag, any benefit
/// qualifier is a known authorization code (`AR`, `G1`), or a benefit name
/// matches a known synonym. Unknown shapes yield `false`; the workflow
/// treats that as "no pre-auth indicated", matching the upstream contract.
pub fn requires_prior_authorization(plans: &[BenefitPlan], benefits: &[BenefitEntry]) -> bool {
    if plans.iter().any(|plan| plan.authorization_required) {
        return true;
    }

    benefits.iter().any(|benefit| {
        let qualifier_match = benefit
            .qualifier
            .as_deref()
            .is_some_and(|qualifier| PRIOR_AUTH_QUALIFIER_CODES.contains(&qualifier));
        let name_match = benefit.name.as_deref().is_some_and(|name| {
            let lowered = name.to_lowercase();
            PRIOR_AUTH_BENEFIT_NAMES.contains(&lowered.as_str())
        });
        qualifier_match || name_match
    })
}

/// Normalize a raw service-review / authorization response.
pub fn normalize_pre_auth(raw: &Value, submitted_at: DateTime<Utc>) -> PreAuthorizationResult {
    let raw_status = raw
        .get("status")
        .and_then(Value::as_str)
        .or_else(|| raw.pointer("/statusDetails/currentStatus").and_then(Value::as_str))
        .unwrap_or("submitted");

    let mut tracking_numbers: Vec<String> = raw
        .get("traceNumbers")
        .and_then(Value::as_array)
        .map(|numbers| {
            numbers.iter().filter_map(Value::as_str).map(String::from).collect::<Vec<_>>()
        })
        .unwrap_or_default();
    if let Some(tracking) = raw.get("trackingNumber").and_then(Value::as_str) {
        tracking_numbers.push(tracking.to_string());
    }

    PreAuthorizationResult {
        status: map_pre_auth_status(raw_status),
        authorization_number: first_string(
            raw,
            &["certificationNumber", "approvalNumber", "authorizationId"],
        ),
        reference_number: first_string(raw, &["referenceNumber", "payerReference"]),
        tracking_numbers,
        payer_transaction_id: first_string(raw, &["id", "authorizationId", "submissionId"]),
        certification_issue_date: date_field(raw, "certificationIssueDate"),
        certification_effective_date: date_field(raw, "certificationEffectiveDate"),
        certification_expiration_date: date_field(raw, "certificationExpirationDate"),
        estimated_decision_date: date_field(raw, "estimatedDecisionDate"),
        error_message: None,
        raw_response: Some(raw.clone()),
        submitted_at,
    }
}

/// Map a service-review status string to the canonical enum.
pub fn map_pre_auth_status(raw: &str) -> PreAuthStatus {
    match raw.trim().to_lowercase().as_str() {
        "approved" | "certified" | "certified in total" => PreAuthStatus::Approved,
        "denied" | "rejected" | "not certified" => PreAuthStatus::Denied,
        "cancelled" | "canceled" | "voided" => PreAuthStatus::Cancelled,
        "submitted" => PreAuthStatus::Submitted,
        // anything unrecognized stays pending for manual follow-up
        _ => PreAuthStatus::Pending,
    }
}

fn extract_status_string(raw: &Value) -> String {
    match raw.get("status") {
        Some(Value::String(status)) => status.clone(),
        // the Optum family nests it as { "status": { "value": "active" } }
        Some(Value::Object(map)) => {
            map.get("value").and_then(Value::as_str).unwrap_or_default().to_string()
        }
        _ => String::new(),
    }
}

fn extract_payer_identity(raw: &Value) -> PayerIdentity {
    let payer = raw.get("payer").cloned().unwrap_or(Value::Null);
    PayerIdentity {
        submitted_id: payer.get("payerId").and_then(Value::as_str).map(String::from),
        submitted_name: payer.get("name").and_then(Value::as_str).map(String::from),
        confirmed_id: payer.get("responsePayerId").and_then(Value::as_str).map(String::from),
        confirmed_name: payer.get("responseName").and_then(Value::as_str).map(String::from),
    }
}

fn extract_plans(raw: &Value) -> Vec<BenefitPlan> {
    let Some(plans) = raw.get("plans").and_then(Value::as_array) else {
        return Vec::new();
    };

    plans
        .iter()
        .map(|plan| BenefitPlan {
            description: plan.get("description").and_then(Value::as_str).map(String::from),
            group_number: plan.get("groupNumber").and_then(Value::as_str).map(String::from),
            effective_date: date_field(plan, "eligibilityStartDate"),
            termination_date: date_field(plan, "eligibilityEndDate"),
            insurance_type: plan.get("insuranceType").and_then(Value::as_str).map(String::from),
            authorization_required: plan
                .get("authorizationRequired")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
        .collect()
}

fn extract_benefit_entries(raw: &Value) -> Vec<BenefitEntry> {
    let Some(benefits) = raw.get("benefits").and_then(Value::as_array) else {
        return Vec::new();
    };

    benefits
        .iter()
        .map(|benefit| BenefitEntry {
            name: benefit.get("name").and_then(Value::as_str).map(String::from),
            qualifier: benefit.get("benefitQualifier").and_then(Value::as_str).map(String::from),
            kind: benefit.get("type").and_then(Value::as_str).map(String::from),
            amount: benefit.get("amount").and_then(Value::as_f64),
        })
        .collect()
}

fn extract_cost_sharing(benefits: &[BenefitEntry]) -> CostSharing {
    let mut cost_sharing = CostSharing::default();

    for benefit in benefits {
        let Some(kind) = benefit.kind.as_deref() else {
            continue;
        };
        match kind.to_lowercase().as_str() {
            "copay" | "copayment" => cost_sharing.copay = benefit.amount.or(cost_sharing.copay),
            "deductible" => cost_sharing.deductible = benefit.amount.or(cost_sharing.deductible),
            "coinsurance" => {
                cost_sharing.coinsurance = benefit.amount.or(cost_sharing.coinsurance);
            }
            "out_of_pocket_maximum" | "out-of-pocket maximum" => {
                cost_sharing.out_of_pocket_max =
                    benefit.amount.or(cost_sharing.out_of_pocket_max);
            }
            _ => {}
        }
    }

    cost_sharing
}

fn extract_validation_messages(raw: &Value) -> Vec<String> {
    raw.get("validationMessages")
        .and_then(Value::as_array)
        .map(|messages| {
            messages
                .iter()
                .filter_map(|message| match message {
                    Value::String(text) => Some(text.clone()),
                    Value::Object(map) => {
                        map.get("message").and_then(Value::as_str).map(String::from)
                    }
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn first_string(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| raw.get(*key).and_then(Value::as_str).map(String::from))
}

/// Parse a date field tolerating the formats payers actually send:
/// `YYYY-MM-DD`, `YYYYMMDD`, and RFC 3339 timestamps.
fn date_field(raw: &Value, key: &str) -> Option<NaiveDate> {
    let text = raw.get(key).and_then(Value::as_str)?;
    parse_payer_date(text)
}

fn parse_payer_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y%m%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive())
}
