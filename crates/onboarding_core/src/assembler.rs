//! Flattens a draft and its documents into the multipart transport form.

use std::{fmt, sync::Arc};

use reqwest::multipart::{Form, Part};
use shared::domain::{AccreditationClaim, DocumentId, SubmissionDraft};
use thiserror::Error;

use crate::intake::UploadedDocument;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleError {
    #[error("accredited investor status is claimed but no investor type is selected")]
    MissingInvestorType,
    #[error("document {0:?} has no filename")]
    UnnamedDocument(DocumentId),
}

#[derive(Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Multipart field name, i.e. the document type key.
    pub name: &'static str,
    pub filename: String,
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

impl fmt::Debug for FilePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePart")
            .field("name", &self.name)
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboundPayload {
    pub fields: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

impl OutboundPayload {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn files_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FilePart> + 'a {
        self.files.iter().filter(move |part| part.name == name)
    }

    pub fn into_multipart(self) -> reqwest::Result<Form> {
        let mut form = Form::new();
        for (name, value) in self.fields {
            form = form.text(name, value);
        }
        for file in self.files {
            let part = Part::bytes(file.bytes.to_vec())
                .file_name(file.filename)
                .mime_str(&file.mime_type)?;
            form = form.part(file.name, part);
        }
        Ok(form)
    }

    fn push(&mut self, name: &str, value: impl ToString) {
        self.fields.push((name.to_string(), value.to_string()));
    }
}

/// Builds the outbound payload. Business rules are the validator's job;
/// this only fails when the draft cannot be represented at all.
pub fn assemble(
    draft: &SubmissionDraft,
    documents: &[UploadedDocument],
) -> Result<OutboundPayload, AssembleError> {
    let mut payload = OutboundPayload::default();

    let personal = &draft.personal;
    payload.push("firstName", personal.first_name.trim());
    payload.push("lastName", personal.last_name.trim());
    payload.push("dateOfBirth", personal.date_of_birth.trim());
    payload.push("nationality", personal.nationality.trim());
    payload.push("phoneNumber", personal.phone_number.trim());

    let address = &draft.address;
    payload.push("address.street", address.street.trim());
    payload.push("address.city", address.city.trim());
    payload.push("address.state", address.state.trim());
    payload.push("address.postalCode", address.postal_code.trim());
    payload.push("address.country", address.country.trim());

    let investor = &draft.accredited_investor;
    if investor.claimed {
        let claim = investor
            .active_claim()
            .ok_or(AssembleError::MissingInvestorType)?;
        payload.push("accreditedInvestor.claimed", true);
        payload.push("accreditedInvestor.type", claim.investor_type());
        match claim {
            AccreditationClaim::Income { annual_income } => {
                if let Some(value) = annual_income {
                    payload.push("accreditedInvestor.annualIncome", value);
                }
            }
            AccreditationClaim::NetWorth { net_worth } => {
                if let Some(value) = net_worth {
                    payload.push("accreditedInvestor.netWorth", value);
                }
            }
            AccreditationClaim::Professional { certification } => {
                if let Some(value) = certification {
                    payload.push("accreditedInvestor.professionalCertification", value.trim());
                }
            }
            AccreditationClaim::Entity { entity_type } => {
                if let Some(value) = entity_type {
                    payload.push("accreditedInvestor.entityType", value.trim());
                }
            }
        }
    }

    for document in documents {
        if document.file.name.trim().is_empty() {
            return Err(AssembleError::UnnamedDocument(document.id));
        }
        payload.files.push(FilePart {
            name: document.document_type_key(),
            filename: document.file.name.clone(),
            mime_type: document.file.mime_type.clone(),
            bytes: Arc::clone(&document.file.bytes),
        });
    }

    Ok(payload)
}

#[cfg(test)]
#[path = "tests/assembler_tests.rs"]
mod tests;
