//! Client-side KYC onboarding engine: step validation, accredited-investor
//! branching, document intake and submission.

pub mod assembler;
pub mod http;
pub mod intake;
pub mod requirements;
pub mod services;
pub mod validator;
mod wizard;

pub use assembler::{assemble, AssembleError, OutboundPayload};
pub use http::KycHttpClient;
pub use intake::{IntakeError, RawFile, UploadedDocument};
pub use services::{
    AuthProvider, MissingStatusService, Session, StatusService, SubmissionError, SubmissionService,
};
pub use validator::{Step, StepValidator, ValidationErrorMap};
pub use wizard::{
    CompletedBatch, CompletedSubmission, IntakeReport, IntakeTicket, OnboardingWizard,
    PendingSubmission, SlotView, WizardError,
};

#[cfg(test)]
#[path = "tests/fixtures.rs"]
mod fixtures;
