//! Static document catalogs consulted by the requirement resolver, the
//! intake pipeline and the step validator.

use crate::domain::{DocumentKind, InvestorType};

pub const MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;

pub const ACCEPTED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentTypeDescriptor {
    pub kind: DocumentKind,
    pub label: &'static str,
    /// Unconditionally required. Identity kinds are satisfied as a group.
    pub required: bool,
    pub accepted_mime_types: &'static [&'static str],
    pub max_bytes: u64,
}

impl DocumentTypeDescriptor {
    pub fn key(&self) -> &'static str {
        self.kind.key()
    }

    pub fn accepts_mime(&self, mime: &str) -> bool {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        self.accepted_mime_types.contains(&essence.as_str())
    }
}

const fn entry(kind: DocumentKind, label: &'static str, required: bool) -> DocumentTypeDescriptor {
    DocumentTypeDescriptor {
        kind,
        label,
        required,
        accepted_mime_types: ACCEPTED_MIME_TYPES,
        max_bytes: MAX_DOCUMENT_BYTES,
    }
}

pub static BASELINE_CATALOG: [DocumentTypeDescriptor; 5] = [
    entry(DocumentKind::Passport, "Passport", true),
    entry(DocumentKind::DriversLicense, "Driver's License", true),
    entry(DocumentKind::NationalId, "National ID Card", true),
    entry(DocumentKind::ProofOfAddress, "Proof of Address", true),
    entry(DocumentKind::BankStatement, "Bank Statement", false),
];

pub static ACCREDITATION_CATALOG: [DocumentTypeDescriptor; 4] = [
    entry(
        DocumentKind::AccreditedIncome,
        "Income Verification (tax returns, W-2s)",
        false,
    ),
    entry(
        DocumentKind::AccreditedNetWorth,
        "Net Worth Verification (bank/brokerage statements)",
        false,
    ),
    entry(
        DocumentKind::AccreditedProfessional,
        "Professional Certification (Series 7, 65, 82)",
        false,
    ),
    entry(
        DocumentKind::AccreditedEntity,
        "Entity Documentation (formation documents)",
        false,
    ),
];

pub fn descriptor(kind: DocumentKind) -> &'static DocumentTypeDescriptor {
    match kind {
        DocumentKind::Passport => &BASELINE_CATALOG[0],
        DocumentKind::DriversLicense => &BASELINE_CATALOG[1],
        DocumentKind::NationalId => &BASELINE_CATALOG[2],
        DocumentKind::ProofOfAddress => &BASELINE_CATALOG[3],
        DocumentKind::BankStatement => &BASELINE_CATALOG[4],
        DocumentKind::AccreditedIncome => &ACCREDITATION_CATALOG[0],
        DocumentKind::AccreditedNetWorth => &ACCREDITATION_CATALOG[1],
        DocumentKind::AccreditedProfessional => &ACCREDITATION_CATALOG[2],
        DocumentKind::AccreditedEntity => &ACCREDITATION_CATALOG[3],
    }
}

pub fn accreditation_descriptor(investor_type: InvestorType) -> &'static DocumentTypeDescriptor {
    descriptor(investor_type.document_kind())
}
