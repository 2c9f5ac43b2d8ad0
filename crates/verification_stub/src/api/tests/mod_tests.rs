use super::*;

fn ctx() -> ApiContext {
    ApiContext {
        store: KycStore::default(),
        sessions: SessionConfig {
            secret: "devsecret".into(),
            ttl_seconds: 60,
        },
    }
}

fn doc(kind: DocumentKind) -> ReceivedDocument {
    ReceivedDocument {
        kind,
        filename: format!("{}.pdf", kind.key()),
        mime_type: "application/pdf".into(),
        size: 1024,
    }
}

fn complete_submission() -> ParsedSubmission {
    let fields = [
        ("firstName", "Ada"),
        ("lastName", "Lovelace"),
        ("dateOfBirth", "1990-04-12"),
        ("nationality", "GB"),
        ("phoneNumber", "+12025551234"),
        ("address.street", "1 Main St"),
        ("address.city", "Springfield"),
        ("address.state", "IL"),
        ("address.postalCode", "62701"),
        ("address.country", "US"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    ParsedSubmission {
        fields,
        documents: vec![doc(DocumentKind::Passport), doc(DocumentKind::ProofOfAddress)],
    }
}

#[test]
fn accept_document_rejects_unknown_slot_and_mime() {
    let err = accept_document("selfie", Some("me.png"), Some("image/png"), 10)
        .expect_err("unknown slot");
    assert_eq!(err.code, Some(ErrorCode::Validation));

    let err = accept_document("passport", Some("p.docx"), Some("application/msword"), 10)
        .expect_err("bad mime");
    assert_eq!(err.code, Some(ErrorCode::Validation));
    assert!(err.message.contains("p.docx"));
}

#[test]
fn accept_document_enforces_catalog_size() {
    let err = accept_document(
        "passport",
        Some("p.pdf"),
        Some("application/pdf"),
        10 * 1024 * 1024 + 1,
    )
    .expect_err("too large");
    assert_eq!(err.code, Some(ErrorCode::PayloadTooLarge));

    let accepted = accept_document("bank_statement", Some("s.pdf"), Some("application/pdf"), 5)
        .expect("accepted");
    assert_eq!(accepted.kind, DocumentKind::BankStatement);
}

#[test]
fn check_submission_lists_missing_fields() {
    let mut submission = complete_submission();
    submission.fields.remove("lastName");
    submission
        .fields
        .insert("address.city".into(), "   ".into());

    let err = check_submission(&submission).expect_err("missing");
    assert_eq!(err.code, Some(ErrorCode::Validation));
    assert!(err.message.contains("lastName"));
    assert!(err.message.contains("address.city"));
}

#[test]
fn check_submission_requires_identity_and_proof_of_address() {
    let mut submission = complete_submission();
    submission.documents = vec![doc(DocumentKind::ProofOfAddress)];
    assert!(check_submission(&submission).is_err());

    submission.documents = vec![doc(DocumentKind::NationalId)];
    let err = check_submission(&submission).expect_err("no proof of address");
    assert!(err.message.contains("proof of address"));

    submission.documents.push(doc(DocumentKind::ProofOfAddress));
    assert!(check_submission(&submission).is_ok());
}

#[test]
fn check_submission_requires_matching_accreditation_document() {
    let mut submission = complete_submission();
    submission
        .fields
        .insert("accreditedInvestor.claimed".into(), "true".into());
    assert!(check_submission(&submission).is_err());

    submission
        .fields
        .insert("accreditedInvestor.type".into(), "net_worth".into());
    submission.documents.push(doc(DocumentKind::AccreditedIncome));
    assert!(check_submission(&submission).is_err());

    submission.documents.push(doc(DocumentKind::AccreditedNetWorth));
    assert!(check_submission(&submission).is_ok());
}

#[tokio::test]
async fn login_reuses_user_for_same_name() {
    let ctx = ctx();
    let first = login(&ctx, LoginRequest { username: "ada".into() })
        .await
        .expect("login");
    let second = login(&ctx, LoginRequest { username: " ada ".into() })
        .await
        .expect("login");
    assert_eq!(first.user_id, second.user_id);

    let err = login(&ctx, LoginRequest { username: "  ".into() })
        .await
        .expect_err("blank");
    assert_eq!(err.code, Some(ErrorCode::Validation));
}

#[tokio::test]
async fn submit_moves_status_to_pending_and_blocks_repeat() {
    let ctx = ctx();
    let user = ctx.store.user_for("ada").await;
    assert_eq!(status(&ctx, user).await.status, VerificationStatus::NotStarted);

    let receipt = submit_kyc(&ctx, user, complete_submission())
        .await
        .expect("receipt");
    assert_eq!(receipt.submission.status, VerificationStatus::Pending);
    assert_eq!(receipt.submission.documents_uploaded, 2);
    assert_eq!(status(&ctx, user).await.status, VerificationStatus::Pending);

    let err = submit_kyc(&ctx, user, complete_submission())
        .await
        .expect_err("repeat");
    assert_eq!(err.code, Some(ErrorCode::Conflict));
    assert_eq!(ctx.store.submissions_for(user).await.len(), 1);
}

#[tokio::test]
async fn rejected_user_may_resubmit() {
    let ctx = ctx();
    let user = ctx.store.user_for("ada").await;
    ctx.store.set_status(user, VerificationStatus::Rejected).await;

    submit_kyc(&ctx, user, complete_submission())
        .await
        .expect("resubmission");
    assert_eq!(ctx.store.submissions_for(user).await.len(), 1);
}

#[tokio::test]
async fn invalid_submission_leaves_status_untouched() {
    let ctx = ctx();
    let user = ctx.store.user_for("ada").await;
    let mut submission = complete_submission();
    submission.documents.clear();

    submit_kyc(&ctx, user, submission)
        .await
        .expect_err("invalid");
    assert_eq!(status(&ctx, user).await.status, VerificationStatus::NotStarted);
}
