//! Which document slots to show for the current draft.
//!
//! The resolver never raises errors. Blocking decisions belong to the step
//! validator, which reads the same catalogs.

use shared::{
    catalog::{
        accreditation_descriptor, DocumentTypeDescriptor, ACCREDITATION_CATALOG, BASELINE_CATALOG,
    },
    domain::{AccreditedInvestor, SubmissionDraft},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentSlot {
    pub descriptor: &'static DocumentTypeDescriptor,
    pub required: bool,
}

pub fn resolve_accreditation_slots(investor: &AccreditedInvestor) -> Vec<DocumentSlot> {
    if !investor.claimed {
        return Vec::new();
    }

    match investor.selected_type() {
        None => ACCREDITATION_CATALOG
            .iter()
            .map(|descriptor| DocumentSlot {
                descriptor,
                required: false,
            })
            .collect(),
        Some(investor_type) => vec![DocumentSlot {
            descriptor: accreditation_descriptor(investor_type),
            required: true,
        }],
    }
}

/// Baseline slots followed by the currently active accreditation slots.
pub fn resolve_slots(draft: &SubmissionDraft) -> Vec<DocumentSlot> {
    BASELINE_CATALOG
        .iter()
        .map(|descriptor| DocumentSlot {
            descriptor,
            required: descriptor.required,
        })
        .chain(resolve_accreditation_slots(&draft.accredited_investor))
        .collect()
}
