//! reqwest-backed client for the verification backend. One instance covers
//! auth, status and submission.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use shared::{
    domain::VerificationStatus,
    error::ApiError,
    protocol::{LoginRequest, SessionResponse, StatusResponse, SubmissionReceipt},
};
use tokio::sync::RwLock;
use tracing::{info, warn};
use url::Url;

use crate::{
    assembler::OutboundPayload,
    services::{AuthProvider, Session, StatusService, SubmissionError, SubmissionService},
};

pub struct KycHttpClient {
    http: Client,
    base_url: Url,
    session: RwLock<Option<Session>>,
}

impl KycHttpClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("invalid server url '{base_url}'"))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base_url,
            session: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("failed to build url for '{path}'"))
    }

    async fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.read().await.as_ref() {
            Some(session) => request.bearer_auth(&session.token),
            None => request,
        }
    }

    async fn store_session(&self, body: SessionResponse) -> Session {
        let session = Session {
            token: body.token,
            user_id: body.user_id,
        };
        *self.session.write().await = Some(session.clone());
        session
    }

    async fn send_submission(&self, payload: OutboundPayload) -> Result<Response, SubmissionError> {
        let url = self
            .endpoint("kyc/submit")
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;
        let form = payload
            .into_multipart()
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;
        self.authorized(self.http.post(url).multipart(form))
            .await
            .send()
            .await
            .map_err(|e| SubmissionError::Transport(e.to_string()))
    }
}

async fn error_message(response: Response) -> String {
    let status = response.status();
    match response.json::<ApiError>().await {
        Ok(body) if !body.message.trim().is_empty() => body.message,
        _ => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    }
}

#[async_trait]
impl AuthProvider for KycHttpClient {
    async fn login(&self, username: &str) -> Result<Session> {
        let body: SessionResponse = self
            .http
            .post(self.endpoint("auth/login")?)
            .json(&LoginRequest {
                username: username.to_string(),
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let session = self.store_session(body).await;
        info!(user_id = session.user_id.0, "signed in to verification service");
        Ok(session)
    }

    async fn refresh(&self) -> Result<Session> {
        if self.session.read().await.is_none() {
            return Err(anyhow!("no session to refresh; sign in first"));
        }
        let request = self.http.post(self.endpoint("auth/refresh")?);
        let body: SessionResponse = self
            .authorized(request)
            .await
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(self.store_session(body).await)
    }

    async fn current_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }
}

#[async_trait]
impl StatusService for KycHttpClient {
    async fn verification_status(&self) -> Result<VerificationStatus> {
        let request = self.http.get(self.endpoint("kyc/status")?);
        let body: StatusResponse = self
            .authorized(request)
            .await
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.status)
    }
}

#[async_trait]
impl SubmissionService for KycHttpClient {
    async fn submit(&self, payload: OutboundPayload) -> Result<SubmissionReceipt, SubmissionError> {
        let mut response = self.send_submission(payload.clone()).await?;

        if response.status() == StatusCode::UNAUTHORIZED && self.session.read().await.is_some() {
            warn!("submission unauthorized; refreshing session and retrying once");
            match self.refresh().await {
                Ok(_) => response = self.send_submission(payload).await?,
                Err(error) => warn!(%error, "session refresh failed"),
            }
        }

        let status = response.status();
        if status.is_success() {
            return response
                .json::<SubmissionReceipt>()
                .await
                .map_err(|e| SubmissionError::Decode(e.to_string()));
        }

        let message = error_message(response).await;
        if status.is_server_error() {
            Err(SubmissionError::Unavailable {
                status: status.as_u16(),
                message,
            })
        } else {
            Err(SubmissionError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
