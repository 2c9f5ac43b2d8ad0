use std::{collections::HashMap, str::FromStr};

use chrono::Utc;
use shared::{
    catalog::descriptor,
    domain::{DocumentKind, InvestorType, UserId, VerificationStatus},
    error::{ApiError, ErrorCode},
    protocol::{
        LoginRequest, SessionResponse, StatusResponse, SubmissionReceipt, SubmissionRecord,
    },
};
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{mint_session_token, SessionConfig},
    store::{KycStore, StoredSubmission},
};

const REQUIRED_FIELDS: [&str; 10] = [
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
];

#[derive(Clone)]
pub struct ApiContext {
    pub store: KycStore,
    pub sessions: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedDocument {
    pub kind: DocumentKind,
    pub filename: String,
    pub mime_type: String,
    pub size: usize,
}

/// Text fields and file parts pulled out of a `POST /kyc/submit` body.
#[derive(Debug, Clone, Default)]
pub struct ParsedSubmission {
    pub fields: HashMap<String, String>,
    pub documents: Vec<ReceivedDocument>,
}

impl ParsedSubmission {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn has_document(&self, predicate: impl Fn(DocumentKind) -> bool) -> bool {
        self.documents.iter().any(|doc| predicate(doc.kind))
    }
}

/// Checks a single file part against the document catalog.
pub fn accept_document(
    field_name: &str,
    filename: Option<&str>,
    mime_type: Option<&str>,
    size: usize,
) -> Result<ReceivedDocument, ApiError> {
    let kind = DocumentKind::from_str(field_name).map_err(|e| validation(e.to_string()))?;
    let descriptor = descriptor(kind);
    let filename = filename
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| validation(format!("{field_name} upload has no filename")))?;
    let mime_type = mime_type.unwrap_or("application/octet-stream");
    if !descriptor.accepts_mime(mime_type) {
        return Err(validation(format!(
            "{filename}: {mime_type} is not accepted for {}",
            descriptor.label
        )));
    }
    if size as u64 > descriptor.max_bytes {
        return Err(ApiError::new(
            ErrorCode::PayloadTooLarge,
            format!(
                "{filename} exceeds the {} byte limit for {}",
                descriptor.max_bytes, descriptor.label
            ),
        ));
    }
    Ok(ReceivedDocument {
        kind,
        filename: filename.to_string(),
        mime_type: mime_type.to_string(),
        size,
    })
}

/// Presence checks only; field formats are left to the client wizard.
pub fn check_submission(submission: &ParsedSubmission) -> Result<(), ApiError> {
    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|name| submission.field(name).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }

    if !submission.has_document(DocumentKind::is_identity) {
        return Err(validation(
            "an identity document (passport, driver's license or national id) is required",
        ));
    }
    if !submission.has_document(|kind| kind == DocumentKind::ProofOfAddress) {
        return Err(validation("proof of address is required"));
    }

    if submission.field("accreditedInvestor.claimed") == Some("true") {
        let investor_type = submission
            .field("accreditedInvestor.type")
            .ok_or_else(|| validation("accredited investor type is required"))
            .and_then(|raw| {
                InvestorType::from_str(raw).map_err(|e| validation(e.to_string()))
            })?;
        let required = investor_type.document_kind();
        if !submission.has_document(|kind| kind == required) {
            return Err(validation(format!(
                "{} is required for {investor_type} accreditation",
                descriptor(required).label
            )));
        }
    }

    Ok(())
}

pub async fn login(ctx: &ApiContext, req: LoginRequest) -> Result<SessionResponse, ApiError> {
    let username = req.username.trim();
    if username.is_empty() {
        return Err(validation("username cannot be empty"));
    }
    let user_id = ctx.store.user_for(username).await;
    info!(user_id = user_id.0, "session issued");
    session_for(ctx, user_id)
}

pub fn refresh(ctx: &ApiContext, user_id: UserId) -> Result<SessionResponse, ApiError> {
    session_for(ctx, user_id)
}

pub async fn status(ctx: &ApiContext, user_id: UserId) -> StatusResponse {
    StatusResponse {
        status: ctx.store.status(user_id).await,
    }
}

pub async fn submit_kyc(
    ctx: &ApiContext,
    user_id: UserId,
    submission: ParsedSubmission,
) -> Result<SubmissionReceipt, ApiError> {
    let current = ctx.store.status(user_id).await;
    if !matches!(
        current,
        VerificationStatus::NotStarted | VerificationStatus::Rejected
    ) {
        return Err(ApiError::new(
            ErrorCode::Conflict,
            format!("verification is already {current}"),
        ));
    }
    check_submission(&submission)?;
    let attempt = ctx.store.submissions_for(user_id).await.len() + 1;

    let record = StoredSubmission {
        id: Uuid::new_v4(),
        user_id,
        submitted_at: Utc::now(),
        document_keys: submission
            .documents
            .iter()
            .map(|doc| doc.kind.key().to_string())
            .collect(),
        fields: submission.fields,
    };
    let receipt = SubmissionReceipt {
        message: "KYC submission received".into(),
        submission: SubmissionRecord {
            id: record.id,
            status: VerificationStatus::Pending,
            submitted_at: record.submitted_at,
            documents_uploaded: record.document_keys.len() as u32,
        },
    };
    info!(
        user_id = user_id.0,
        submission_id = %record.id,
        documents = record.document_keys.len(),
        attempt,
        "kyc submission recorded"
    );
    ctx.store.record(record).await;
    Ok(receipt)
}

fn session_for(ctx: &ApiContext, user_id: UserId) -> Result<SessionResponse, ApiError> {
    let token = mint_session_token(&ctx.sessions, user_id)
        .map_err(|e| ApiError::new(ErrorCode::Internal, e.to_string()))?;
    Ok(SessionResponse { token, user_id })
}

fn validation(message: impl Into<String>) -> ApiError {
    ApiError::new(ErrorCode::Validation, message)
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
