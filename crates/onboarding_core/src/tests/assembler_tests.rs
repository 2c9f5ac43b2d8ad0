use shared::domain::{AccreditedInvestor, DocumentKind};

use super::*;
use crate::fixtures::{baseline_documents, claimed, document, valid_draft};

fn field_names(payload: &OutboundPayload) -> Vec<&str> {
    payload.fields.iter().map(|(name, _)| name.as_str()).collect()
}

#[test]
fn unclaimed_draft_has_no_accreditation_fields() {
    let mut draft = valid_draft();
    draft.accredited_investor = AccreditedInvestor {
        claimed: false,
        claim: Some(AccreditationClaim::Income {
            annual_income: Some(250_000.0),
        }),
    };
    let payload = assemble(&draft, &baseline_documents()).expect("payload");

    assert_eq!(
        field_names(&payload),
        vec![
            "firstName",
            "lastName",
            "dateOfBirth",
            "nationality",
            "phoneNumber",
            "address.street",
            "address.city",
            "address.state",
            "address.postalCode",
            "address.country",
        ]
    );
    assert_eq!(payload.field("address.postalCode"), Some("62701"));
}

#[test]
fn claimed_draft_carries_only_the_selected_type_fields() {
    let mut draft = valid_draft();
    draft.accredited_investor = claimed(Some(AccreditationClaim::NetWorth {
        net_worth: Some(1_500_000.0),
    }));
    let payload = assemble(&draft, &[]).expect("payload");

    assert_eq!(payload.field("accreditedInvestor.claimed"), Some("true"));
    assert_eq!(payload.field("accreditedInvestor.type"), Some("net_worth"));
    assert_eq!(payload.field("accreditedInvestor.netWorth"), Some("1500000"));
    assert_eq!(payload.field("accreditedInvestor.annualIncome"), None);
    assert_eq!(payload.field("accreditedInvestor.entityType"), None);
}

#[test]
fn text_fields_are_trimmed() {
    let mut draft = valid_draft();
    draft.personal.first_name = "  Ada ".into();
    draft.accredited_investor = claimed(Some(AccreditationClaim::Entity {
        entity_type: Some(" LLC ".into()),
    }));
    let payload = assemble(&draft, &[]).expect("payload");
    assert_eq!(payload.field("firstName"), Some("Ada"));
    assert_eq!(payload.field("accreditedInvestor.entityType"), Some("LLC"));
}

#[test]
fn documents_sharing_a_key_become_separate_parts() {
    let documents = vec![
        document(1, DocumentKind::DriversLicense),
        document(2, DocumentKind::DriversLicense),
        document(3, DocumentKind::ProofOfAddress),
    ];
    let payload = assemble(&valid_draft(), &documents).expect("payload");

    assert_eq!(payload.files.len(), 3);
    assert_eq!(payload.files_named("drivers_license").count(), 2);
    assert_eq!(payload.files_named("proof_of_address").count(), 1);
    assert_eq!(payload.files[0].mime_type, "application/pdf");
}

#[test]
fn claim_without_type_is_malformed() {
    let mut draft = valid_draft();
    draft.accredited_investor = claimed(None);
    assert_eq!(
        assemble(&draft, &[]),
        Err(AssembleError::MissingInvestorType)
    );
}

#[test]
fn business_rule_violations_do_not_fail_assembly() {
    let mut draft = valid_draft();
    draft.personal.phone_number = "not a phone".into();
    draft.accredited_investor = claimed(Some(AccreditationClaim::Income {
        annual_income: None,
    }));
    let payload = assemble(&draft, &[]).expect("assembler does not validate");
    assert_eq!(payload.field("accreditedInvestor.type"), Some("income"));
    assert_eq!(payload.field("accreditedInvestor.annualIncome"), None);
}

#[test]
fn document_without_filename_is_malformed() {
    let mut unnamed = document(5, DocumentKind::Passport);
    unnamed.file.name = " ".into();
    assert_eq!(
        assemble(&valid_draft(), &[unnamed]),
        Err(AssembleError::UnnamedDocument(DocumentId(5)))
    );
}

#[test]
fn multipart_conversion_rejects_invalid_mime() {
    let payload = assemble(&valid_draft(), &baseline_documents()).expect("payload");
    assert!(payload.clone().into_multipart().is_ok());

    let mut broken = payload;
    broken.files[0].mime_type = "not a mime".into();
    assert!(broken.into_multipart().is_err());
}
