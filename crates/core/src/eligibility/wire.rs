//! Wire-payload rendering
//!
//! Turns canonical requests into the exact shape each payer's API expects:
//! JSON for the Optum family, form-encoded key/value pairs for the Availity
//! coverages API. Date representation and empty-field handling follow the
//! payer profile, never the call site.

use meridian_domain::{
    EligibilityRequest, EligibilityResult, PayerProfile, PreAuthorizationRequest, WireFormat,
    WirePayload,
};
use serde_json::{json, Map, Value};

/// Render an eligibility request for transmission to the given payer.
pub fn render_eligibility(request: &EligibilityRequest, profile: &PayerProfile) -> WirePayload {
    match profile.wire_format {
        WireFormat::Json => WirePayload::Json(render_eligibility_json(request, profile)),
        WireFormat::FormUrlEncoded => {
            WirePayload::Form(render_eligibility_form(request, profile))
        }
    }
}

fn render_eligibility_json(request: &EligibilityRequest, profile: &PayerProfile) -> Value {
    let mut payload = json!({
        "controlNumber": request.control_number,
        "submitterTransactionIdentifier": request.submitter_transaction_id,
        "provider": {
            "npi": request.provider.npi,
            "organizationName": request.provider.organization_name,
            "providerCode": request.provider.provider_code,
            "serviceLocation": {
                "address": request.provider.service_location.line1,
                "city": request.provider.service_location.city,
                "state": request.provider.service_location.state,
                "postalCode": request.provider.service_location.postal_code,
            },
        },
        "subscriber": {
            "memberId": request.subscriber.member_id,
            "firstName": request.subscriber.first_name,
            "lastName": request.subscriber.last_name,
            "dateOfBirth": profile.format_date(request.subscriber.date_of_birth),
            "gender": request.subscriber.gender.code(),
        },
        "encounter": {
            "dateOfService": profile.format_date(request.encounter.date_of_service),
            "serviceTypeCodes": request.encounter.service_type_codes,
            "placeOfService": request.encounter.place_of_service,
            "procedureCodes": request.encounter.procedure_codes,
        },
    });

    if let Some(trading_partner) = &request.trading_partner_service_id {
        payload["tradingPartnerServiceId"] = json!(trading_partner);
    }

    if let Some(address) = &request.subscriber.address {
        payload["subscriber"]["address"] = json!({
            "address1": address.line1,
            "city": address.city,
            "state": address.state,
            "postalCode": address.postal_code,
        });
    }

    payload
}

fn render_eligibility_form(
    request: &EligibilityRequest,
    profile: &PayerProfile,
) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut push = |key: &str, value: String| {
        // the payer rejects empty strings for optional fields
        if !profile.omit_empty_fields || !value.is_empty() {
            pairs.push((key.to_string(), value));
        }
    };

    push("payerId", request.payer_id.clone());
    push("providerNpi", request.provider.npi.clone());
    push("providerFirstName", request.provider.first_name.clone().unwrap_or_default());
    push("providerLastName", request.provider.last_name.clone().unwrap_or_default());
    push("providerType", request.provider.provider_code.clone());
    push("providerCity", request.provider.service_location.city.clone());
    push("providerState", request.provider.service_location.state.clone());
    push("providerZipCode", request.provider.service_location.postal_code.clone());
    push("asOfDate", profile.format_date(request.encounter.date_of_service));
    push(
        "serviceType",
        request.encounter.service_type_codes.first().cloned().unwrap_or_default(),
    );
    for code in &request.encounter.procedure_codes {
        push("procedureCode", code.clone());
    }
    push("patientFirstName", request.subscriber.first_name.clone());
    push("patientLastName", request.subscriber.last_name.clone());
    push("patientBirthDate", profile.format_date(request.subscriber.date_of_birth));
    push("patientGender", request.subscriber.gender.code().to_string());
    push("memberId", request.subscriber.member_id.clone());
    push("groupNumber", request.subscriber.group_number.clone().unwrap_or_default());

    pairs
}

/// Render a pre-authorization (service review) request. Service reviews are
/// JSON for every supported payer.
pub fn render_pre_auth(request: &PreAuthorizationRequest, profile: &PayerProfile) -> Value {
    let diagnoses: Vec<Value> = request
        .diagnoses
        .iter()
        .map(|diagnosis| {
            json!({
                "qualifierCode": diagnosis.qualifier_code,
                "code": diagnosis.code,
                "value": diagnosis.description,
                "date": diagnosis.date.map(|d| profile.format_date(d)),
            })
        })
        .collect();

    let procedures: Vec<Value> = request
        .service_lines
        .iter()
        .map(|line| {
            json!({
                "qualifierCode": "HC",
                "code": line.procedure_code,
                "description": line.description,
                "diagnosisCode": line.diagnosis_code,
                "quantity": line.quantity.to_string(),
                "quantityTypeCode": line.quantity_type_code,
                "fromDate": profile.format_date(line.service_date),
                "toDate": profile.format_date(line.service_date),
                "placeOfServiceCode": line.place_of_service_code,
            })
        })
        .collect();

    let notes: Vec<Value> = request
        .provider_notes
        .iter()
        .map(|note| json!({ "typeCode": note.type_code, "message": note.message }))
        .collect();

    let mut payload = json!({
        "submissionId": request.submission_id,
        "payer": { "id": request.payer_id, "name": request.payer_name },
        "requestingProvider": {
            "npi": request.requesting_provider.npi,
            "organizationName": request.requesting_provider.organization_name,
            "firstName": request.requesting_provider.first_name,
            "lastName": request.requesting_provider.last_name,
            "taxonomyCode": request.requesting_provider.taxonomy_code,
            "addressLine1": request.requesting_provider.service_location.line1,
            "city": request.requesting_provider.service_location.city,
            "stateCode": request.requesting_provider.service_location.state,
            "zipCode": request.requesting_provider.service_location.postal_code,
        },
        "subscriber": {
            "memberId": request.subscriber.member_id,
            "firstName": request.subscriber.first_name,
            "lastName": request.subscriber.last_name,
        },
        "patient": {
            "firstName": request.subscriber.first_name,
            "lastName": request.subscriber.last_name,
            "birthDate": profile.format_date(request.subscriber.date_of_birth),
            "genderCode": request.subscriber.gender.code(),
            "subscriberRelationshipCode": "18",
        },
        "diagnoses": diagnoses,
        "procedures": procedures,
        "requestTypeCode": "AR",
        "serviceTypeCode": request.service_type_code,
        "placeOfServiceCode": request.place_of_service_code,
        "fromDate": profile.format_date(request.from_date),
        "toDate": profile.format_date(request.to_date),
        "quantity": request.total_quantity.to_string(),
        "quantityTypeCode": "UN",
        "urgency": request.urgency.as_str(),
        "providerNotes": notes,
    });

    if let Some(address) = &request.subscriber.address {
        payload["subscriber"]["addressLine1"] = json!(address.line1);
        payload["subscriber"]["city"] = json!(address.city);
        payload["subscriber"]["stateCode"] = json!(address.state);
        payload["subscriber"]["zipCode"] = json!(address.postal_code);
    }

    if let Some(mac) = &request.mac {
        payload["macInformation"] = json!({
            "jurisdiction": mac.jurisdiction,
            "contractor": mac.contractor,
            "placeOfServiceCode": mac.place_of_service_code,
        });
    }

    payload
}

/// Render the coverage-discovery kickoff payload from a prior eligibility
/// result. The callback URL is only attached for live (non-dry-run) runs.
pub fn render_coverage_discovery(
    eligibility: &EligibilityResult,
    dry_run: bool,
    callback_url: Option<&str>,
) -> Value {
    let mut payload = Map::new();
    payload.insert(
        "canonicalEligibilityResponse".to_string(),
        eligibility.raw_response.clone().unwrap_or(Value::Null),
    );
    payload.insert("dryRun".to_string(), Value::Bool(dry_run));

    if !dry_run {
        if let Some(url) = callback_url {
            payload.insert("callbackUrl".to_string(), Value::String(url.to_string()));
        }
    }

    Value::Object(payload)
}
