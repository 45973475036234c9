//! Built-in payer profiles
//!
//! Each builder consolidates the payer's wire conventions, code tables, and
//! status mappings into one value object; the mapper, validator, and
//! normalizer all read from the same instance.

use meridian_domain::{
    DateFormat, EligibilityStatus, FacilityKind, PayerProfile, RequiredField, WireFormat,
    WoundType,
};

use crate::config::{AvailityConfig, OptumConfig};

/// Availity coverages profile: form-encoded wire, ISO-8601 dates, empty
/// optional fields omitted entirely.
pub fn availity_profile(config: &AvailityConfig) -> PayerProfile {
    let mut profile = PayerProfile::new("availity", "Availity");
    profile.wire_format = WireFormat::FormUrlEncoded;
    profile.date_format = DateFormat::Iso8601;
    profile.omit_empty_fields = true;
    profile.scopes = vec!["hipaa".into()];

    profile.endpoints.base_url = config.base_url.clone();
    profile.endpoints.token_url = config.token_url.clone();
    profile.endpoints.eligibility_path = "/coverages".into();
    profile.endpoints.service_review_path = Some("/service-reviews".into());
    profile.endpoints.authorization_path = Some("/authorizations".into());

    profile.status_mappings.insert("active".into(), EligibilityStatus::Eligible);
    profile.status_mappings.insert("active coverage".into(), EligibilityStatus::Eligible);
    profile.status_mappings.insert("inactive".into(), EligibilityStatus::NotEligible);
    profile.status_mappings.insert("terminated".into(), EligibilityStatus::NotEligible);
    profile.status_mappings.insert("pending".into(), EligibilityStatus::Pending);
    profile.status_code_mappings.insert("1".into(), EligibilityStatus::Eligible);
    profile.status_code_mappings.insert("6".into(), EligibilityStatus::NotEligible);

    // every wound classification routes to DME on the Availity side
    for wound_type in
        [WoundType::Dfu, WoundType::Vlu, WoundType::Pu, WoundType::Tw, WoundType::Au]
    {
        profile.service_type_codes.insert(wound_type, vec!["30".into()]);
    }

    profile.place_of_service_codes.insert(FacilityKind::Hospital, "22".into());
    profile.place_of_service_codes.insert(FacilityKind::HospitalOutpatient, "22".into());
    profile.place_of_service_codes.insert(FacilityKind::Clinic, "11".into());
    profile.place_of_service_codes.insert(FacilityKind::WoundCareCenter, "11".into());
    profile.place_of_service_codes.insert(FacilityKind::AmbulatorySurgeryCenter, "24".into());

    profile.taxonomy_codes.insert(FacilityKind::Hospital, "282N00000X".into());
    profile.taxonomy_codes.insert(FacilityKind::Clinic, "261QP2300X".into());
    profile.taxonomy_codes.insert(FacilityKind::WoundCareCenter, "261QP2300X".into());
    profile
        .taxonomy_codes
        .insert(FacilityKind::AmbulatorySurgeryCenter, "261QA1903X".into());

    profile.required_fields = vec![RequiredField::MemberId, RequiredField::ProcedureCodes];
    profile
}

/// Optum enhanced-eligibility profile: JSON wire, compact `YYYYMMDD` dates.
pub fn optum_profile(config: &OptumConfig) -> PayerProfile {
    let mut profile = PayerProfile::new("optum", "Optum");
    profile.wire_format = WireFormat::Json;
    profile.date_format = DateFormat::CompactYmd;
    profile.scopes = vec!["eligibility".into()];
    profile.trading_partner_service_id = config.trading_partner_service_id.clone();

    profile.endpoints.base_url = config.base_url.clone();
    profile.endpoints.token_url = config.token_url.clone();
    profile.endpoints.eligibility_path = "/eligibility/v3/check".into();
    profile.endpoints.coverage_discovery_path = Some("/eligibility/v3/coverage-discovery".into());
    profile.endpoints.health_path = Some("/eligibility/v3/healthcheck".into());

    profile.status_mappings.insert("eligible".into(), EligibilityStatus::Eligible);
    profile.status_mappings.insert("active".into(), EligibilityStatus::Eligible);
    profile.status_mappings.insert("not_eligible".into(), EligibilityStatus::NotEligible);
    profile.status_mappings.insert("inactive".into(), EligibilityStatus::NotEligible);
    profile.status_mappings.insert("terminated".into(), EligibilityStatus::NotEligible);
    profile.status_mappings.insert("pending".into(), EligibilityStatus::Pending);
    profile.status_mappings.insert("unknown".into(), EligibilityStatus::NeedsReview);

    profile.service_type_codes.insert(WoundType::Dfu, vec!["30".into()]);
    profile.service_type_codes.insert(WoundType::Vlu, vec!["30".into()]);
    profile.service_type_codes.insert(WoundType::Pu, vec!["30".into()]);
    // traumatic wounds bill as surgery
    profile.service_type_codes.insert(WoundType::Tw, vec!["1".into()]);
    profile.service_type_codes.insert(WoundType::Au, vec!["30".into()]);

    profile.place_of_service_codes.insert(FacilityKind::Hospital, "21".into());
    profile.place_of_service_codes.insert(FacilityKind::HospitalOutpatient, "22".into());
    profile.place_of_service_codes.insert(FacilityKind::Clinic, "11".into());
    profile.place_of_service_codes.insert(FacilityKind::WoundCareCenter, "11".into());
    profile.place_of_service_codes.insert(FacilityKind::AmbulatorySurgeryCenter, "24".into());

    profile.provider_codes.insert(FacilityKind::Hospital, "H".into());
    profile.provider_codes.insert(FacilityKind::Clinic, "PC".into());
    profile.provider_codes.insert(FacilityKind::WoundCareCenter, "PC".into());
    profile.provider_codes.insert(FacilityKind::HospitalOutpatient, "PC".into());

    profile.required_fields = vec![
        RequiredField::MemberId,
        RequiredField::ProcedureCodes,
        RequiredField::PlaceOfService,
        RequiredField::SubscriberAddress,
    ];
    profile
}
