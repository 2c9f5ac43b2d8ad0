//! Stepper controller: owns the draft for the lifetime of one wizard session
//! and gates every transition on the step validator.

use std::{collections::HashMap, sync::Arc};

use shared::{
    catalog::{descriptor, DocumentTypeDescriptor},
    domain::{
        AccreditationClaim, AddressInfo, DocumentId, DocumentKind, InvestorType, PersonalInfo,
        SubmissionDraft, VerificationStatus,
    },
    protocol::SubmissionReceipt,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    assembler::{assemble, AssembleError, OutboundPayload},
    intake::{
        intake_batch, BatchOutcome, DocumentIds, IntakeError, PreviewTasks, RawFile,
        UploadedDocument,
    },
    requirements::{resolve_slots, DocumentSlot},
    services::{StatusService, SubmissionError, SubmissionService},
    validator::{Step, StepValidator, ValidationErrorMap},
};

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("verification is already {0}; onboarding cannot be started again")]
    AlreadyInProgress(VerificationStatus),
    #[error("an upload for {0} is already in progress")]
    SlotBusy(DocumentKind),
    #[error("cannot set a {requested} field while the selected investor type is {selected:?}")]
    InvestorTypeMismatch {
        requested: InvestorType,
        selected: Option<InvestorType>,
    },
    #[error("submission is only possible from the review step (current step: {0})")]
    NotOnReview(Step),
    #[error("step '{step}' has {} validation error(s)", .errors.len())]
    Invalid {
        step: Step,
        errors: ValidationErrorMap,
    },
    #[error("a submission is already in flight")]
    SubmissionInFlight,
    #[error(transparent)]
    Assemble(#[from] AssembleError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

struct InFlightBatch {
    batch_id: u64,
    previews: PreviewTasks,
}

/// Grants exclusive use of one upload slot until the batch is merged back
/// with [`OnboardingWizard::finish_intake`].
pub struct IntakeTicket {
    batch_id: u64,
    generation: u64,
    descriptor: &'static DocumentTypeDescriptor,
    ids: DocumentIds,
    previews: PreviewTasks,
}

impl IntakeTicket {
    pub fn slot(&self) -> DocumentKind {
        self.descriptor.kind
    }

    /// Runs the batch. Borrows nothing from the wizard, so batches for
    /// different slots may be in flight at the same time.
    pub async fn run(self, files: Vec<RawFile>) -> CompletedBatch {
        let outcome = intake_batch(files, self.descriptor, &self.ids, &self.previews).await;
        CompletedBatch {
            batch_id: self.batch_id,
            generation: self.generation,
            outcome,
        }
    }
}

pub struct CompletedBatch {
    batch_id: u64,
    generation: u64,
    outcome: BatchOutcome,
}

/// What the caller learns after a batch is merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeReport {
    pub slot: DocumentKind,
    pub accepted: Vec<DocumentId>,
    pub rejected: Vec<IntakeError>,
    /// The batch finished after a reset or cancel and was dropped.
    pub discarded: bool,
}

pub struct PendingSubmission<S> {
    service: Arc<S>,
    payload: OutboundPayload,
    generation: u64,
}

impl<S: SubmissionService> PendingSubmission<S> {
    pub fn payload(&self) -> &OutboundPayload {
        &self.payload
    }

    pub async fn send(self) -> CompletedSubmission {
        let result = self.service.submit(self.payload).await;
        CompletedSubmission {
            generation: self.generation,
            result,
        }
    }
}

pub struct CompletedSubmission {
    generation: u64,
    result: Result<SubmissionReceipt, SubmissionError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotView {
    pub slot: DocumentSlot,
    pub documents: usize,
    pub busy: bool,
}

pub struct OnboardingWizard<S> {
    service: Arc<S>,
    validator: StepValidator,
    step: Step,
    draft: SubmissionDraft,
    documents: Vec<UploadedDocument>,
    last_errors: ValidationErrorMap,
    ids: DocumentIds,
    in_flight: HashMap<DocumentKind, InFlightBatch>,
    next_batch_id: u64,
    generation: u64,
    submitting: bool,
    known_status: Option<VerificationStatus>,
}

impl<S: SubmissionService> OnboardingWizard<S> {
    pub fn new(service: S) -> Self {
        Self::with_validator(service, StepValidator::for_today())
    }

    pub fn with_validator(service: S, validator: StepValidator) -> Self {
        Self {
            service: Arc::new(service),
            validator,
            step: Step::Personal,
            draft: SubmissionDraft::default(),
            documents: Vec::new(),
            last_errors: ValidationErrorMap::new(),
            ids: DocumentIds::default(),
            in_flight: HashMap::new(),
            next_batch_id: 0,
            generation: 0,
            submitting: false,
            known_status: None,
        }
    }

    /// Refuses to start when verification is already underway. A status
    /// backend that cannot be reached is treated as unknown and does not
    /// block.
    pub async fn start<T>(service: S, status: &T) -> Result<Self, WizardError>
    where
        T: StatusService + ?Sized,
    {
        let mut wizard = Self::new(service);
        match status.verification_status().await {
            Ok(VerificationStatus::NotStarted) => {
                wizard.known_status = Some(VerificationStatus::NotStarted);
            }
            Ok(current) => return Err(WizardError::AlreadyInProgress(current)),
            Err(error) => {
                warn!(%error, "verification status unavailable; continuing with unknown status");
            }
        }
        Ok(wizard)
    }

    pub fn known_status(&self) -> Option<VerificationStatus> {
        self.known_status
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn draft(&self) -> &SubmissionDraft {
        &self.draft
    }

    pub fn documents(&self) -> &[UploadedDocument] {
        &self.documents
    }

    pub fn last_errors(&self) -> &ValidationErrorMap {
        &self.last_errors
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn is_busy(&self, slot: DocumentKind) -> bool {
        self.in_flight.contains_key(&slot)
    }

    pub fn validate_current(&self) -> ValidationErrorMap {
        self.validator
            .validate(self.step, &self.draft, &self.documents)
    }

    // Form input.

    pub fn update_personal(&mut self, edit: impl FnOnce(&mut PersonalInfo)) {
        edit(&mut self.draft.personal);
    }

    pub fn update_address(&mut self, edit: impl FnOnce(&mut AddressInfo)) {
        edit(&mut self.draft.address);
    }

    /// Replaces the draft wholesale, e.g. from a prepared answers file.
    pub fn load_draft(&mut self, draft: SubmissionDraft) {
        self.draft = draft;
    }

    pub fn set_accredited_claim(&mut self, claimed: bool) {
        self.draft.accredited_investor.claimed = claimed;
    }

    /// Switching to a different type starts that type's fields from scratch.
    /// Re-selecting the current type keeps what was entered.
    pub fn select_investor_type(&mut self, investor_type: InvestorType) {
        let investor = &mut self.draft.accredited_investor;
        if investor.selected_type() != Some(investor_type) {
            debug!(%investor_type, "switching accreditation type");
            investor.claim = Some(AccreditationClaim::empty(investor_type));
        }
    }

    pub fn set_annual_income(&mut self, value: Option<f64>) -> Result<(), WizardError> {
        match &mut self.draft.accredited_investor.claim {
            Some(AccreditationClaim::Income { annual_income }) => {
                *annual_income = value;
                Ok(())
            }
            other => Err(type_mismatch(InvestorType::Income, other.as_ref())),
        }
    }

    pub fn set_net_worth(&mut self, value: Option<f64>) -> Result<(), WizardError> {
        match &mut self.draft.accredited_investor.claim {
            Some(AccreditationClaim::NetWorth { net_worth }) => {
                *net_worth = value;
                Ok(())
            }
            other => Err(type_mismatch(InvestorType::NetWorth, other.as_ref())),
        }
    }

    pub fn set_professional_certification(
        &mut self,
        value: Option<String>,
    ) -> Result<(), WizardError> {
        match &mut self.draft.accredited_investor.claim {
            Some(AccreditationClaim::Professional { certification }) => {
                *certification = value;
                Ok(())
            }
            other => Err(type_mismatch(InvestorType::Professional, other.as_ref())),
        }
    }

    pub fn set_entity_type(&mut self, value: Option<String>) -> Result<(), WizardError> {
        match &mut self.draft.accredited_investor.claim {
            Some(AccreditationClaim::Entity { entity_type }) => {
                *entity_type = value;
                Ok(())
            }
            other => Err(type_mismatch(InvestorType::Entity, other.as_ref())),
        }
    }

    // Navigation.

    /// Advances one step when the current step validates. On failure the
    /// step is unchanged and the errors are returned (and kept in
    /// `last_errors`).
    pub fn next(&mut self) -> Result<Step, ValidationErrorMap> {
        let errors = self.validate_current();
        if !errors.is_empty() {
            debug!(step = ?self.step, errors = errors.len(), "step blocked by validation");
            self.last_errors = errors.clone();
            return Err(errors);
        }
        self.last_errors.clear();
        if let Some(next) = self.step.next() {
            self.step = next;
        }
        Ok(self.step)
    }

    pub fn back(&mut self) -> Step {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
            self.last_errors.clear();
        }
        self.step
    }

    /// Drops the draft, documents and any in-flight uploads.
    pub fn reset(&mut self) {
        for (_, batch) in self.in_flight.drain() {
            batch.previews.abort_all();
        }
        self.generation += 1;
        self.step = Step::Personal;
        self.draft = SubmissionDraft::default();
        self.documents.clear();
        self.last_errors.clear();
        self.submitting = false;
    }

    // Documents.

    pub fn slots(&self) -> Vec<SlotView> {
        resolve_slots(&self.draft)
            .into_iter()
            .map(|slot| SlotView {
                documents: self
                    .documents
                    .iter()
                    .filter(|doc| doc.kind == slot.descriptor.kind)
                    .count(),
                busy: self.is_busy(slot.descriptor.kind),
                slot,
            })
            .collect()
    }

    /// Marks `slot` busy. A second batch for the same slot is refused until
    /// the first one is merged or cancelled.
    pub fn begin_intake(&mut self, slot: DocumentKind) -> Result<IntakeTicket, WizardError> {
        if self.is_busy(slot) {
            return Err(WizardError::SlotBusy(slot));
        }
        self.next_batch_id += 1;
        let previews = PreviewTasks::default();
        self.in_flight.insert(
            slot,
            InFlightBatch {
                batch_id: self.next_batch_id,
                previews: previews.clone(),
            },
        );
        Ok(IntakeTicket {
            batch_id: self.next_batch_id,
            generation: self.generation,
            descriptor: descriptor(slot),
            ids: self.ids.clone(),
            previews,
        })
    }

    /// Aborts the in-flight batch for `slot`; its result will be discarded.
    pub fn cancel_intake(&mut self, slot: DocumentKind) {
        if let Some(batch) = self.in_flight.remove(&slot) {
            batch.previews.abort_all();
            info!(%slot, "upload cancelled");
        }
    }

    /// The only place batch output enters the draft. Batches that outlived
    /// a reset or cancel are dropped.
    pub fn finish_intake(&mut self, completed: CompletedBatch) -> IntakeReport {
        let CompletedBatch {
            batch_id,
            generation,
            outcome,
        } = completed;
        let slot = outcome.slot;

        let current = self
            .in_flight
            .get(&slot)
            .is_some_and(|batch| batch.batch_id == batch_id);
        if current {
            self.in_flight.remove(&slot);
        }

        if !current || generation != self.generation || outcome.cancelled {
            debug!(%slot, batch_id, "discarding stale upload batch");
            return IntakeReport {
                slot,
                accepted: Vec::new(),
                rejected: outcome.rejected,
                discarded: true,
            };
        }

        let accepted = outcome.accepted.iter().map(|doc| doc.id).collect();
        info!(
            %slot,
            accepted = outcome.accepted.len(),
            rejected = outcome.rejected.len(),
            "upload batch merged"
        );
        self.documents.extend(outcome.accepted);
        IntakeReport {
            slot,
            accepted,
            rejected: outcome.rejected,
            discarded: false,
        }
    }

    /// Convenience for callers that process one batch at a time.
    pub async fn intake(
        &mut self,
        slot: DocumentKind,
        files: Vec<RawFile>,
    ) -> Result<IntakeReport, WizardError> {
        let ticket = self.begin_intake(slot)?;
        let completed = ticket.run(files).await;
        Ok(self.finish_intake(completed))
    }

    /// Removes a document immediately. Validation waits for the next `next`.
    pub fn remove_document(&mut self, id: DocumentId) -> Option<UploadedDocument> {
        let position = self.documents.iter().position(|doc| doc.id == id)?;
        Some(self.documents.remove(position))
    }

    // Submission.

    /// Validates every step and assembles the payload exactly once. The
    /// wizard stays marked as submitting until `finish_submit`.
    pub fn begin_submit(&mut self) -> Result<PendingSubmission<S>, WizardError> {
        if self.submitting {
            return Err(WizardError::SubmissionInFlight);
        }
        if self.step != Step::Review {
            return Err(WizardError::NotOnReview(self.step));
        }
        if let Some((step, errors)) = self
            .validator
            .first_failing_step(&self.draft, &self.documents)
        {
            self.last_errors = errors.clone();
            return Err(WizardError::Invalid { step, errors });
        }

        let payload = assemble(&self.draft, &self.documents)?;
        self.submitting = true;
        Ok(PendingSubmission {
            service: Arc::clone(&self.service),
            payload,
            generation: self.generation,
        })
    }

    /// Success resets the wizard. Failure keeps the review step, draft and
    /// documents so the user can retry.
    pub fn finish_submit(
        &mut self,
        completed: CompletedSubmission,
    ) -> Result<SubmissionReceipt, WizardError> {
        if completed.generation != self.generation {
            debug!("submission finished after wizard reset; leaving state untouched");
            return completed.result.map_err(WizardError::from);
        }
        self.submitting = false;
        match completed.result {
            Ok(receipt) => {
                info!(
                    submission_id = %receipt.submission.id,
                    documents = receipt.submission.documents_uploaded,
                    "kyc submission accepted"
                );
                self.reset();
                self.known_status = Some(receipt.submission.status);
                Ok(receipt)
            }
            Err(error) => {
                warn!(%error, retryable = error.is_retryable(), "kyc submission failed");
                Err(error.into())
            }
        }
    }

    pub async fn submit(&mut self) -> Result<SubmissionReceipt, WizardError> {
        let pending = self.begin_submit()?;
        let completed = pending.send().await;
        self.finish_submit(completed)
    }
}

fn type_mismatch(requested: InvestorType, current: Option<&AccreditationClaim>) -> WizardError {
    WizardError::InvestorTypeMismatch {
        requested,
        selected: current.map(AccreditationClaim::investor_type),
    }
}

#[cfg(test)]
#[path = "tests/wizard_tests.rs"]
mod tests;
