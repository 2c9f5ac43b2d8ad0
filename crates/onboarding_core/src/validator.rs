use std::{collections::BTreeMap, fmt, sync::LazyLock};

use chrono::{Datelike, NaiveDate, Utc};
use regex::Regex;
use serde::Serialize;
use shared::{
    catalog::accreditation_descriptor,
    domain::{
        AccreditationClaim, AccreditedInvestor, AddressInfo, DocumentKind, PersonalInfo,
        SubmissionDraft,
    },
};

use crate::intake::UploadedDocument;

/// Field key (dot-path or flat, e.g. `address.street`, `annualIncome`) to a
/// user-facing message. Ordered so that two validations of the same input
/// serialize identically.
pub type ValidationErrorMap = BTreeMap<String, String>;

pub const MINIMUM_AGE_YEARS: i32 = 18;

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("phone pattern compiles"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Personal,
    Address,
    Documents,
    Accreditation,
    Review,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::Personal,
        Step::Address,
        Step::Documents,
        Step::Accreditation,
        Step::Review,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Step> {
        Step::ALL.get(index).copied()
    }

    pub fn next(self) -> Option<Step> {
        Step::from_index(self.index() + 1)
    }

    pub fn previous(self) -> Option<Step> {
        self.index().checked_sub(1).and_then(Step::from_index)
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::Personal => "Personal Information",
            Step::Address => "Address",
            Step::Documents => "Identity Documents",
            Step::Accreditation => "Accredited Investor",
            Step::Review => "Review & Submit",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Per-step validation rules. The reference year is captured at
/// construction so `validate` stays a pure function of its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepValidator {
    current_year: i32,
}

impl StepValidator {
    pub fn new(current_year: i32) -> Self {
        Self { current_year }
    }

    pub fn for_today() -> Self {
        Self::new(Utc::now().year())
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    pub fn validate(
        &self,
        step: Step,
        draft: &SubmissionDraft,
        documents: &[UploadedDocument],
    ) -> ValidationErrorMap {
        let mut errors = ValidationErrorMap::new();
        match step {
            Step::Personal => self.check_personal(&draft.personal, &mut errors),
            Step::Address => check_address(&draft.address, &mut errors),
            Step::Documents => check_documents(documents, &mut errors),
            // Review is the final gate and repeats the accreditation rules.
            Step::Accreditation | Step::Review => {
                check_accreditation(&draft.accredited_investor, documents, &mut errors)
            }
        }
        errors
    }

    pub fn validate_index(
        &self,
        index: usize,
        draft: &SubmissionDraft,
        documents: &[UploadedDocument],
    ) -> ValidationErrorMap {
        match Step::from_index(index) {
            Some(step) => self.validate(step, draft, documents),
            None => ValidationErrorMap::from([(
                "step".to_string(),
                format!("Unknown step index {index}"),
            )]),
        }
    }

    /// First step, in wizard order, whose rules do not pass.
    pub fn first_failing_step(
        &self,
        draft: &SubmissionDraft,
        documents: &[UploadedDocument],
    ) -> Option<(Step, ValidationErrorMap)> {
        Step::ALL.into_iter().find_map(|step| {
            let errors = self.validate(step, draft, documents);
            (!errors.is_empty()).then_some((step, errors))
        })
    }

    fn check_personal(&self, personal: &PersonalInfo, errors: &mut ValidationErrorMap) {
        require(errors, "personal.firstName", &personal.first_name, "First name is required");
        require(errors, "personal.lastName", &personal.last_name, "Last name is required");
        require(
            errors,
            "personal.nationality",
            &personal.nationality,
            "Nationality is required",
        );

        if require(
            errors,
            "personal.phoneNumber",
            &personal.phone_number,
            "Phone number is required",
        ) && !PHONE_PATTERN.is_match(personal.phone_number.trim())
        {
            errors.insert(
                "personal.phoneNumber".into(),
                "Phone number must be in international format, e.g. +12025551234".into(),
            );
        }

        if !require(
            errors,
            "personal.dateOfBirth",
            &personal.date_of_birth,
            "Date of birth is required",
        ) {
            return;
        }
        match NaiveDate::parse_from_str(personal.date_of_birth.trim(), "%Y-%m-%d") {
            // Whole calendar years only; the birthday within the year is ignored.
            Ok(born) if self.current_year - born.year() < MINIMUM_AGE_YEARS => {
                errors.insert(
                    "personal.dateOfBirth".into(),
                    format!("You must be at least {MINIMUM_AGE_YEARS} years old"),
                );
            }
            Ok(_) => {}
            Err(_) => {
                errors.insert(
                    "personal.dateOfBirth".into(),
                    "Date of birth must be a valid date (YYYY-MM-DD)".into(),
                );
            }
        }
    }
}

impl Default for StepValidator {
    fn default() -> Self {
        Self::for_today()
    }
}

/// Inserts `message` under `key` when `value` is blank. Returns whether the
/// value was present.
fn require(errors: &mut ValidationErrorMap, key: &str, value: &str, message: &str) -> bool {
    if value.trim().is_empty() {
        errors.insert(key.to_string(), message.to_string());
        false
    } else {
        true
    }
}

fn check_address(address: &AddressInfo, errors: &mut ValidationErrorMap) {
    require(errors, "address.street", &address.street, "Street address is required");
    require(errors, "address.city", &address.city, "City is required");
    require(errors, "address.state", &address.state, "State/Province is required");
    require(
        errors,
        "address.postalCode",
        &address.postal_code,
        "Postal code is required",
    );
    require(errors, "address.country", &address.country, "Country is required");
}

fn check_documents(documents: &[UploadedDocument], errors: &mut ValidationErrorMap) {
    if !documents.iter().any(|doc| doc.kind.is_identity()) {
        errors.insert(
            "documents".into(),
            "Upload at least one identity document (passport, driver's license or national ID)"
                .into(),
        );
    }
    if !documents
        .iter()
        .any(|doc| doc.kind == DocumentKind::ProofOfAddress)
    {
        errors.insert("proofOfAddress".into(), "Proof of address is required".into());
    }
}

fn check_accreditation(
    investor: &AccreditedInvestor,
    documents: &[UploadedDocument],
    errors: &mut ValidationErrorMap,
) {
    if !investor.claimed {
        return;
    }

    let Some(claim) = investor.active_claim() else {
        errors.insert(
            "accreditedType".into(),
            "Select how you qualify as an accredited investor".into(),
        );
        if !documents.iter().any(|doc| doc.kind.is_accreditation()) {
            errors.insert(
                "accreditedDocs".into(),
                "Upload documents supporting your accredited investor status".into(),
            );
        }
        return;
    };

    match claim {
        AccreditationClaim::Income { annual_income } => {
            if !is_positive(*annual_income) {
                errors.insert(
                    "annualIncome".into(),
                    "Annual income is required for income-based accreditation".into(),
                );
            }
        }
        AccreditationClaim::NetWorth { net_worth } => {
            if !is_positive(*net_worth) {
                errors.insert(
                    "netWorth".into(),
                    "Net worth is required for net-worth-based accreditation".into(),
                );
            }
        }
        AccreditationClaim::Professional { certification } => {
            if is_blank(certification.as_deref()) {
                errors.insert(
                    "professionalCertification".into(),
                    "Professional certification is required".into(),
                );
            }
        }
        AccreditationClaim::Entity { entity_type } => {
            if is_blank(entity_type.as_deref()) {
                errors.insert("entityType".into(), "Entity type is required".into());
            }
        }
    }

    let expected = accreditation_descriptor(claim.investor_type());
    if !documents.iter().any(|doc| doc.kind == expected.kind) {
        errors.insert(
            "accreditedDocs".into(),
            format!("Upload {} to support your claim", expected.label),
        );
    }
}

fn is_positive(value: Option<f64>) -> bool {
    value.is_some_and(|v| v.is_finite() && v > 0.0)
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

#[cfg(test)]
#[path = "tests/validator_tests.rs"]
mod tests;
