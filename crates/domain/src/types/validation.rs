//! Pre-flight validation types
//!
//! Structured issue codes for request validation. Consumers match on the
//! [`ValidationCode`] enum, not message strings; `as_str()` yields stable
//! codes for API responses and logs.

use serde::{Deserialize, Serialize};

/// Static validation codes for API stability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    /// A payer-required field is missing or empty
    MissingRequiredField,

    /// NPI is not exactly ten digits
    InvalidNpi,

    /// State is not a valid USPS state/territory code
    InvalidStateCode,

    /// Date is not a valid calendar date or lies outside the accepted window
    InvalidDate,

    /// Gender code is outside the allowed set
    InvalidGender,

    /// Member ID is missing or malformed
    InvalidMemberId,

    /// Control number does not match the payer's numeric fixed-width format
    InvalidControlNumber,

    /// Request carries placeholder demographics and may not be transmitted
    PlaceholderDemographics,
}

impl ValidationCode {
    /// Stable string code for API responses and structured logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            Self::InvalidNpi => "INVALID_NPI",
            Self::InvalidStateCode => "INVALID_STATE_CODE",
            Self::InvalidDate => "INVALID_DATE",
            Self::InvalidGender => "INVALID_GENDER",
            Self::InvalidMemberId => "INVALID_MEMBER_ID",
            Self::InvalidControlNumber => "INVALID_CONTROL_NUMBER",
            Self::PlaceholderDemographics => "PLACEHOLDER_DEMOGRAPHICS",
        }
    }
}

/// A single validation violation tied to a request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Dotted path of the offending field, e.g. `subscriber.memberId`
    pub field: String,
    pub code: ValidationCode,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        field: impl Into<String>,
        code: ValidationCode,
        message: impl Into<String>,
    ) -> Self {
        Self { field: field.into(), code, message: message.into() }
    }
}

/// All violations found in one validation pass.
///
/// Validation collects every issue rather than failing on the first, so a
/// caller can surface the complete list to the submitting clinician at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// True if any issue carries the given code.
    pub fn has_code(&self, code: ValidationCode) -> bool {
        self.issues.iter().any(|issue| issue.code == code)
    }

    /// True if any issue references the given field path.
    pub fn mentions_field(&self, field: &str) -> bool {
        self.issues.iter().any(|issue| issue.field == field)
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for issue in &self.issues {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{} [{}]: {}", issue.field, issue.code.as_str(), issue.message)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_collects_and_queries_issues() {
        let mut report = ValidationReport::new();
        assert!(report.is_empty());

        report.push(ValidationIssue::new(
            "provider.npi",
            ValidationCode::InvalidNpi,
            "NPI must be exactly 10 digits",
        ));
        report.push(ValidationIssue::new(
            "subscriber.memberId",
            ValidationCode::MissingRequiredField,
            "member ID is required",
        ));

        assert_eq!(report.len(), 2);
        assert!(report.has_code(ValidationCode::InvalidNpi));
        assert!(report.mentions_field("provider.npi"));
        assert!(!report.has_code(ValidationCode::InvalidGender));
    }

    #[test]
    fn report_display_joins_issues() {
        let mut report = ValidationReport::new();
        report.push(ValidationIssue::new("provider.npi", ValidationCode::InvalidNpi, "bad NPI"));
        report.push(ValidationIssue::new(
            "subscriber.gender",
            ValidationCode::InvalidGender,
            "unknown gender code",
        ));

        let rendered = report.to_string();
        assert!(rendered.contains("provider.npi [INVALID_NPI]: bad NPI"));
        assert!(rendered.contains("; subscriber.gender"));
    }
}
