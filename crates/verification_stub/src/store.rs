//! In-memory records. Nothing survives a restart.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use shared::domain::{UserId, VerificationStatus};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct StoredSubmission {
    pub id: Uuid,
    pub user_id: UserId,
    pub submitted_at: DateTime<Utc>,
    pub fields: HashMap<String, String>,
    pub document_keys: Vec<String>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, UserId>,
    statuses: HashMap<UserId, VerificationStatus>,
    submissions: Vec<StoredSubmission>,
}

#[derive(Clone, Default)]
pub struct KycStore {
    inner: Arc<RwLock<Inner>>,
}

impl KycStore {
    /// Returns the id for `username`, creating the user on first sight.
    pub async fn user_for(&self, username: &str) -> UserId {
        let mut inner = self.inner.write().await;
        if let Some(user_id) = inner.users.get(username) {
            return *user_id;
        }
        let user_id = UserId(inner.users.len() as i64 + 1);
        inner.users.insert(username.to_string(), user_id);
        user_id
    }

    pub async fn status(&self, user_id: UserId) -> VerificationStatus {
        self.inner
            .read()
            .await
            .statuses
            .get(&user_id)
            .copied()
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub async fn set_status(&self, user_id: UserId, status: VerificationStatus) {
        self.inner.write().await.statuses.insert(user_id, status);
    }

    /// Stores the submission and moves the user to `pending`.
    pub async fn record(&self, submission: StoredSubmission) {
        let mut inner = self.inner.write().await;
        inner
            .statuses
            .insert(submission.user_id, VerificationStatus::Pending);
        inner.submissions.push(submission);
    }

    pub async fn submissions_for(&self, user_id: UserId) -> Vec<StoredSubmission> {
        self.inner
            .read()
            .await
            .submissions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }
}
