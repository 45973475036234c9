//! Pre-flight request validation
//!
//! Collects every violation rather than failing on the first, and is
//! parameterized by the payer profile: the same canonical request can have
//! different mandatory fields per target payer.

use chrono::NaiveDate;
use meridian_domain::constants::{NPI_LENGTH, US_STATE_CODES};
use meridian_domain::{
    Address, EligibilityRequest, Gender, PayerProfile, PreAuthorizationRequest, RequiredField,
    ValidationCode, ValidationIssue, ValidationReport,
};
use once_cell::sync::Lazy;
use regex::Regex;

static NPI_REGEX: Lazy<Regex> = Lazy::new(|| {
    // literal pattern, cannot fail at runtime
    #[allow(clippy::unwrap_used)]
    let regex = Regex::new(r"^\d{10}$").unwrap();
    regex
});

/// NPI must be exactly ten digits.
pub fn is_valid_npi(npi: &str) -> bool {
    npi.len() == NPI_LENGTH && NPI_REGEX.is_match(npi)
}

/// Two-letter USPS state/territory code check, case-sensitive uppercase.
pub fn is_valid_state(state: &str) -> bool {
    US_STATE_CODES.contains(&state)
}

/// Payer-parameterized request validator
pub struct RequestValidator {
    allow_placeholder: bool,
}

impl RequestValidator {
    pub fn new() -> Self {
        Self { allow_placeholder: false }
    }

    /// Permit flagged placeholder requests (dry-run mode only). The
    /// orchestrator enables this exclusively when the engine runs against a
    /// sandbox, never for live submissions.
    pub fn allow_placeholder(mut self, enabled: bool) -> Self {
        self.allow_placeholder = enabled;
        self
    }

    /// Validate an eligibility request against the payer profile.
    pub fn validate(
        &self,
        request: &EligibilityRequest,
        profile: &PayerProfile,
    ) -> ValidationReport {
        let mut report = ValidationReport::new();

        self.check_placeholder(request.placeholder_demographics, &mut report);
        check_npi("provider.npi", &request.provider.npi, &mut report);
        check_address("provider.serviceLocation", &request.provider.service_location, &mut report);
        check_control_number(
            &request.control_number,
            profile.control_number_width,
            &mut report,
        );
        check_birth_date(request.subscriber.date_of_birth, &mut report);

        if let Some(address) = &request.subscriber.address {
            check_address("subscriber.address", address, &mut report);
        } else if profile.requires(RequiredField::SubscriberAddress) {
            report.push(ValidationIssue::new(
                "subscriber.address",
                ValidationCode::MissingRequiredField,
                format!("{} requires a subscriber address", profile.display_name),
            ));
        }

        if request.subscriber.member_id.trim().is_empty() {
            report.push(ValidationIssue::new(
                "subscriber.memberId",
                ValidationCode::InvalidMemberId,
                "member ID must not be empty",
            ));
        }

        if profile.requires(RequiredField::SubscriberGender)
            && request.subscriber.gender == Gender::Unknown
        {
            report.push(ValidationIssue::new(
                "subscriber.gender",
                ValidationCode::InvalidGender,
                format!("{} does not accept an unknown gender code", profile.display_name),
            ));
        }

        if profile.requires(RequiredField::ProcedureCodes)
            && request.encounter.procedure_codes.is_empty()
        {
            report.push(ValidationIssue::new(
                "encounter.procedureCodes",
                ValidationCode::MissingRequiredField,
                "at least one procedure code is required",
            ));
        }

        if profile.requires(RequiredField::PlaceOfService)
            && request.encounter.place_of_service.trim().is_empty()
        {
            report.push(ValidationIssue::new(
                "encounter.placeOfService",
                ValidationCode::MissingRequiredField,
                "place of service code is required",
            ));
        }

        if profile.requires(RequiredField::TradingPartnerServiceId)
            && request.trading_partner_service_id.as_deref().unwrap_or("").trim().is_empty()
        {
            report.push(ValidationIssue::new(
                "tradingPartnerServiceId",
                ValidationCode::MissingRequiredField,
                format!("{} requires a trading partner service ID", profile.display_name),
            ));
        }

        report
    }

    /// Validate a pre-authorization request before submission.
    pub fn validate_pre_auth(
        &self,
        request: &PreAuthorizationRequest,
        profile: &PayerProfile,
    ) -> ValidationReport {
        let mut report = ValidationReport::new();

        self.check_placeholder(request.placeholder_demographics, &mut report);
        check_npi("requestingProvider.npi", &request.requesting_provider.npi, &mut report);
        check_address(
            "requestingProvider.serviceLocation",
            &request.requesting_provider.service_location,
            &mut report,
        );
        check_birth_date(request.subscriber.date_of_birth, &mut report);

        if request.subscriber.member_id.trim().is_empty() {
            report.push(ValidationIssue::new(
                "subscriber.memberId",
                ValidationCode::InvalidMemberId,
                "member ID must not be empty",
            ));
        }

        if let Some(address) = &request.subscriber.address {
            check_address("subscriber.address", address, &mut report);
        } else if profile.requires(RequiredField::SubscriberAddress) {
            report.push(ValidationIssue::new(
                "subscriber.address",
                ValidationCode::MissingRequiredField,
                "patient address is required for MAC jurisdiction addressing",
            ));
        }

        if request.service_lines.is_empty() {
            report.push(ValidationIssue::new(
                "procedures",
                ValidationCode::MissingRequiredField,
                "a service review needs at least one service line",
            ));
        }

        if request.diagnoses.is_empty() {
            report.push(ValidationIssue::new(
                "diagnoses",
                ValidationCode::MissingRequiredField,
                "a service review needs at least one diagnosis",
            ));
        }

        if request.from_date > request.to_date {
            report.push(ValidationIssue::new(
                "fromDate",
                ValidationCode::InvalidDate,
                "service period start is after its end",
            ));
        }

        report
    }

    fn check_placeholder(&self, flagged: bool, report: &mut ValidationReport) {
        if flagged && !self.allow_placeholder {
            report.push(ValidationIssue::new(
                "subscriber",
                ValidationCode::PlaceholderDemographics,
                "request carries placeholder demographics and cannot be transmitted",
            ));
        }
    }
}

impl Default for RequestValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn check_npi(field: &str, npi: &str, report: &mut ValidationReport) {
    if !is_valid_npi(npi) {
        report.push(ValidationIssue::new(
            field,
            ValidationCode::InvalidNpi,
            format!("NPI must be exactly {NPI_LENGTH} digits"),
        ));
    }
}

fn check_address(prefix: &str, address: &Address, report: &mut ValidationReport) {
    if !is_valid_state(&address.state) {
        report.push(ValidationIssue::new(
            format!("{prefix}.state"),
            ValidationCode::InvalidStateCode,
            format!("'{}' is not a USPS state/territory code", address.state),
        ));
    }
}

fn check_control_number(control_number: &str, width: usize, report: &mut ValidationReport) {
    if control_number.len() != width || !control_number.chars().all(|c| c.is_ascii_digit()) {
        report.push(ValidationIssue::new(
            "controlNumber",
            ValidationCode::InvalidControlNumber,
            format!("control number must be {width} digits, zero-padded"),
        ));
    }
}

fn check_birth_date(date_of_birth: NaiveDate, report: &mut ValidationReport) {
    // a DOB before 1900 or in the future is a data-entry error upstream
    let lower = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or_default();
    if date_of_birth < lower {
        report.push(ValidationIssue::new(
            "subscriber.dateOfBirth",
            ValidationCode::InvalidDate,
            "date of birth predates 1900",
        ));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ids::SequentialControlNumbers;
    use crate::testing::{sample_order, sample_patient, test_profile};
    use crate::RequestMapper;

    fn mapped_request() -> (EligibilityRequest, PayerProfile) {
        let profile = test_profile();
        let mapper =
            RequestMapper::new(Arc::new(SequentialControlNumbers::starting_at(1)));
        let request =
            mapper.map_eligibility(&sample_order(), Some(&sample_patient()), &profile).unwrap();
        (request, profile)
    }

    #[test]
    fn mapper_output_passes_validation() {
        let (request, profile) = mapped_request();
        let report = RequestValidator::new().validate(&request, &profile);
        assert!(report.is_empty(), "unexpected issues: {report}");
    }

    #[test]
    fn malformed_npi_is_reported_against_the_npi_field() {
        let (mut request, profile) = mapped_request();
        request.provider.npi = "12345".to_string();

        let report = RequestValidator::new().validate(&request, &profile);
        assert!(report.has_code(ValidationCode::InvalidNpi));
        assert!(report.mentions_field("provider.npi"));
    }

    #[test]
    fn non_numeric_npi_is_rejected() {
        assert!(!is_valid_npi("12345abcde"));
        assert!(!is_valid_npi("123456789"));
        assert!(!is_valid_npi("12345678901"));
        assert!(is_valid_npi("1234567890"));
    }

    #[test]
    fn bad_state_code_is_reported() {
        let (mut request, profile) = mapped_request();
        request.provider.service_location.state = "ZZ".to_string();

        let report = RequestValidator::new().validate(&request, &profile);
        assert!(report.has_code(ValidationCode::InvalidStateCode));
    }

    #[test]
    fn collects_all_violations_in_one_pass() {
        let (mut request, profile) = mapped_request();
        request.provider.npi = "bad".to_string();
        request.subscriber.member_id = "  ".to_string();
        request.control_number = "42".to_string();

        let report = RequestValidator::new().validate(&request, &profile);
        assert!(report.len() >= 3);
        assert!(report.has_code(ValidationCode::InvalidNpi));
        assert!(report.has_code(ValidationCode::InvalidMemberId));
        assert!(report.has_code(ValidationCode::InvalidControlNumber));
    }

    #[test]
    fn placeholder_requests_are_rejected_unless_allowed() {
        let (mut request, profile) = mapped_request();
        request.placeholder_demographics = true;

        let strict = RequestValidator::new().validate(&request, &profile);
        assert!(strict.has_code(ValidationCode::PlaceholderDemographics));

        let sandbox =
            RequestValidator::new().allow_placeholder(true).validate(&request, &profile);
        assert!(!sandbox.has_code(ValidationCode::PlaceholderDemographics));
    }

    #[test]
    fn required_fields_differ_per_payer_profile() {
        let (mut request, mut profile) = mapped_request();
        request.subscriber.gender = Gender::Unknown;

        // base profile tolerates an unknown gender
        let lenient = RequestValidator::new().validate(&request, &profile);
        assert!(!lenient.has_code(ValidationCode::InvalidGender));

        profile.required_fields.push(RequiredField::SubscriberGender);
        let strict = RequestValidator::new().validate(&request, &profile);
        assert!(strict.has_code(ValidationCode::InvalidGender));
    }

    #[test]
    fn pre_auth_requires_service_lines_and_diagnoses() {
        let profile = test_profile();
        let mapper =
            RequestMapper::new(Arc::new(SequentialControlNumbers::starting_at(1)));
        let mut request = mapper
            .map_pre_auth(
                &sample_order(),
                &crate::testing::sample_eligibility_result(),
                Some(&sample_patient()),
                &profile,
            )
            .unwrap();
        request.service_lines.clear();
        request.diagnoses.clear();

        let report = RequestValidator::new().validate_pre_auth(&request, &profile);
        assert!(report.mentions_field("procedures"));
        assert!(report.mentions_field("diagnoses"));
    }
}
