//! Seams to the collaborators the wizard does not own.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use shared::{
    domain::{UserId, VerificationStatus},
    protocol::SubmissionReceipt,
};
use thiserror::Error;

use crate::assembler::OutboundPayload;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("submission rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("verification service unavailable ({status}): {message}")]
    Unavailable { status: u16, message: String },
    #[error("failed to reach verification service: {0}")]
    Transport(String),
    #[error("unexpected response from verification service: {0}")]
    Decode(String),
}

impl SubmissionError {
    /// Whether retrying the same payload later can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Transport(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Rejected { message, .. } | Self::Unavailable { message, .. } => message,
            Self::Transport(message) | Self::Decode(message) => message,
        }
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn login(&self, username: &str) -> Result<Session>;
    async fn refresh(&self) -> Result<Session>;
    async fn current_session(&self) -> Option<Session>;
}

#[async_trait]
pub trait SubmissionService: Send + Sync {
    async fn submit(&self, payload: OutboundPayload) -> Result<SubmissionReceipt, SubmissionError>;
}

#[async_trait]
pub trait StatusService: Send + Sync {
    async fn verification_status(&self) -> Result<VerificationStatus>;
}

#[async_trait]
impl<T> SubmissionService for Arc<T>
where
    T: SubmissionService + ?Sized,
{
    async fn submit(&self, payload: OutboundPayload) -> Result<SubmissionReceipt, SubmissionError> {
        (**self).submit(payload).await
    }
}

#[async_trait]
impl<T> StatusService for Arc<T>
where
    T: StatusService + ?Sized,
{
    async fn verification_status(&self) -> Result<VerificationStatus> {
        (**self).verification_status().await
    }
}

/// Used when no status backend is configured; every check reports unknown.
pub struct MissingStatusService;

#[async_trait]
impl StatusService for MissingStatusService {
    async fn verification_status(&self) -> Result<VerificationStatus> {
        Err(anyhow::anyhow!("verification status service is unavailable"))
    }
}
